use anyhow::Result;
use clap::Parser;
use meetmind::answer::client::build_client;
use meetmind::answer::AnswerOrchestrator;
use meetmind::audio::capture::{list_devices, CpalAudioSource};
use meetmind::cli::{Cli, Commands, ConfigAction};
use meetmind::config::Config;
use meetmind::output;
use meetmind::pipeline::{Pipeline, PipelineConfig};
use meetmind::present::TerminalSurface;
use meetmind::signal::{ChunkEmitterConfig, SilenceTriggerConfig};
use meetmind::stt::HttpTranscriptionClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            let config = apply_cli_overrides(config, &cli);
            run_listen(config, cli.config.clone(), cli.quiet).await?;
        }
        Some(Commands::Devices) => {
            let devices = list_devices()?;
            output::device_list(&devices);
        }
        Some(Commands::Ask { ref question }) => {
            let question = question.join(" ");
            let config = load_config(cli.config.as_deref())?;
            let config = apply_cli_overrides(config, &cli);
            run_ask(config, cli.config.clone(), &question, cli.quiet).await?;
        }
        Some(Commands::Config { ref action }) => match action {
            ConfigAction::Path => {
                let path = cli.config.clone().unwrap_or_else(Config::default_path);
                println!("{}", path.display());
            }
            ConfigAction::Init => {
                let path = cli.config.clone().unwrap_or_else(Config::default_path);
                init_config(&path)?;
            }
        },
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&path)?.with_env_overrides();
    Ok(config)
}

/// CLI flags win over file and environment.
fn apply_cli_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(device) = &cli.device {
        config.audio.device = Some(device.clone());
    }
    if let Some(language) = &cli.language {
        config.transcription.language = Some(language.clone());
    }
    if let Some(provider) = &cli.provider {
        config.answer.provider = provider.clone();
    }
    if let Some(dismiss) = cli.dismiss {
        config.answer.dismiss_secs = dismiss;
    }
    config
}

/// Factory that re-resolves provider, credential and model per request,
/// so config edits take effect without a restart.
fn answer_client_factory(
    config_path: Option<PathBuf>,
    cli_provider: Option<String>,
) -> meetmind::answer::ClientFactory {
    Box::new(move || {
        let path = config_path.clone().unwrap_or_else(Config::default_path);
        let mut config = Config::load_or_default(&path)?.with_env_overrides();
        if let Some(provider) = &cli_provider {
            config.answer.provider = provider.clone();
        }
        build_client(config.resolve_answer()?)
    })
}

async fn run_listen(config: Config, config_path: Option<PathBuf>, quiet: bool) -> Result<()> {
    // Fail on missing credentials before touching the audio device
    let transcription_resolved = config.resolve_transcription()?;
    config.resolve_answer()?;

    let transcription = Arc::new(HttpTranscriptionClient::new(transcription_resolved.clone())?);

    let surface = Arc::new(TerminalSurface::new(quiet));
    let mut orchestrator = AnswerOrchestrator::new(answer_client_factory(
        config_path,
        Some(config.answer.provider.clone()),
    ));
    orchestrator.add_surface(surface.clone());
    let orchestrator = Arc::new(orchestrator);

    let pipeline_config = PipelineConfig {
        chunk_interval: Duration::from_millis(config.audio.chunk_interval_ms),
        emitter: ChunkEmitterConfig {
            energy_threshold: config.audio.chunk_energy_threshold,
            sample_rate: config.audio.sample_rate,
            ..Default::default()
        },
        silence: SilenceTriggerConfig {
            threshold: config.audio.silence_trigger_threshold,
            silence_duration_ms: config.audio.silence_duration_ms,
            ..Default::default()
        },
        denylist: config.hallucination_phrases().into_iter().collect(),
        dismiss_secs: config.answer.dismiss_secs,
        quiet,
        ..Default::default()
    };

    let audio_source = Box::new(CpalAudioSource::new(
        config.audio.device.as_deref(),
        config.audio.sample_rate,
    )?);

    if !quiet {
        output::listening_banner(
            config.audio.device.as_deref(),
            &transcription_resolved.model,
        );
    }

    let mut pipeline = Pipeline::new(pipeline_config);
    pipeline.add_surface(surface);
    let handle = pipeline.start(audio_source, transcription, orchestrator)?;

    tokio::signal::ctrl_c().await?;
    handle.stop().await;
    if !quiet {
        output::stopped();
    }
    Ok(())
}

async fn run_ask(
    config: Config,
    config_path: Option<PathBuf>,
    question: &str,
    quiet: bool,
) -> Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("nothing to ask");
    }

    let surface = Arc::new(TerminalSurface::new(quiet));
    let mut orchestrator = AnswerOrchestrator::new(answer_client_factory(
        config_path,
        Some(config.answer.provider.clone()),
    ));
    orchestrator.add_surface(surface);

    match orchestrator.request_answer(question, question).await? {
        Some(_) => Ok(()),
        None => {
            eprintln!("no answer (the model found no question)");
            Ok(())
        }
    }
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("config already exists at {}", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, toml)?;
    println!("wrote {}", path.display());
    Ok(())
}
