use crate::defaults;
use crate::error::{MeetmindError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
    pub answer: AnswerConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
    pub chunk_interval_ms: u64,
    /// Per-segment energy floor: drained segments below this RMS are dropped.
    pub chunk_energy_threshold: f32,
    /// Sustained-quiet threshold for the end-of-utterance trigger.
    pub silence_trigger_threshold: f32,
    pub silence_duration_ms: u64,
}

/// Remote speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// "groq" or "openai"
    pub provider: String,
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Language hint for the provider (None = auto-detect).
    pub language: Option<String>,
    /// Extra hallucination phrases merged with the built-in denylist.
    pub extra_hallucination_phrases: Vec<String>,
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnswerConfig {
    /// "groq", "openai" or "claude"
    pub provider: String,
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub groq_model: String,
    pub openai_model: String,
    pub claude_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Seconds before a shown answer auto-dismisses. 0 = never.
    pub dismiss_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            chunk_interval_ms: defaults::CHUNK_INTERVAL_MS,
            chunk_energy_threshold: defaults::CHUNK_ENERGY_THRESHOLD,
            silence_trigger_threshold: defaults::SILENCE_TRIGGER_THRESHOLD,
            silence_duration_ms: defaults::SILENCE_DURATION_MS,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: defaults::DEFAULT_TRANSCRIPTION_PROVIDER.to_string(),
            groq_api_key: None,
            openai_api_key: None,
            language: None,
            extra_hallucination_phrases: Vec::new(),
        }
    }
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            provider: defaults::DEFAULT_ANSWER_PROVIDER.to_string(),
            groq_api_key: None,
            openai_api_key: None,
            anthropic_api_key: None,
            groq_model: "llama-3.1-70b-versatile".to_string(),
            openai_model: "gpt-4o".to_string(),
            claude_model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 2048,
            temperature: 0.3,
            dismiss_secs: defaults::DISMISS_SECS,
        }
    }
}

/// A transcription provider resolved from configuration at call time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTranscription {
    pub provider: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub language: Option<String>,
}

/// An answer provider resolved from configuration at call time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAnswer {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MeetmindError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                MeetmindError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(MeetmindError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - MEETMIND_TRANSCRIPTION_PROVIDER → transcription.provider
    /// - MEETMIND_ANSWER_PROVIDER → answer.provider
    /// - MEETMIND_GROQ_API_KEY → transcription.groq_api_key + answer.groq_api_key
    /// - MEETMIND_OPENAI_API_KEY → transcription.openai_api_key + answer.openai_api_key
    /// - MEETMIND_ANTHROPIC_API_KEY → answer.anthropic_api_key
    /// - MEETMIND_LANGUAGE → transcription.language
    /// - MEETMIND_AUDIO_DEVICE → audio.device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(provider) = std::env::var("MEETMIND_TRANSCRIPTION_PROVIDER")
            && !provider.is_empty()
        {
            self.transcription.provider = provider;
        }

        if let Ok(provider) = std::env::var("MEETMIND_ANSWER_PROVIDER")
            && !provider.is_empty()
        {
            self.answer.provider = provider;
        }

        if let Ok(key) = std::env::var("MEETMIND_GROQ_API_KEY")
            && !key.is_empty()
        {
            self.transcription.groq_api_key = Some(key.clone());
            self.answer.groq_api_key = Some(key);
        }

        if let Ok(key) = std::env::var("MEETMIND_OPENAI_API_KEY")
            && !key.is_empty()
        {
            self.transcription.openai_api_key = Some(key.clone());
            self.answer.openai_api_key = Some(key);
        }

        if let Ok(key) = std::env::var("MEETMIND_ANTHROPIC_API_KEY")
            && !key.is_empty()
        {
            self.answer.anthropic_api_key = Some(key);
        }

        if let Ok(language) = std::env::var("MEETMIND_LANGUAGE")
            && !language.is_empty()
        {
            self.transcription.language = Some(language);
        }

        if let Ok(device) = std::env::var("MEETMIND_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/meetmind/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("meetmind")
            .join("config.toml")
    }

    /// Resolve the transcription provider and credential for one call.
    ///
    /// Credential absence is a local precondition failure: no remote call
    /// is attempted without a key.
    pub fn resolve_transcription(&self) -> Result<ResolvedTranscription> {
        let t = &self.transcription;
        match t.provider.as_str() {
            "openai" => {
                let api_key = t.openai_api_key.clone().filter(|k| !k.is_empty()).ok_or(
                    MeetmindError::MissingCredential {
                        provider: "openai".to_string(),
                    },
                )?;
                Ok(ResolvedTranscription {
                    provider: "openai".to_string(),
                    api_key,
                    base_url: "https://api.openai.com/v1".to_string(),
                    model: "whisper-1".to_string(),
                    language: t.language.clone(),
                })
            }
            // Groq is the default: free keys, whisper-large-v3.
            _ => {
                let api_key = t.groq_api_key.clone().filter(|k| !k.is_empty()).ok_or(
                    MeetmindError::MissingCredential {
                        provider: "groq".to_string(),
                    },
                )?;
                Ok(ResolvedTranscription {
                    provider: "groq".to_string(),
                    api_key,
                    base_url: "https://api.groq.com/openai/v1".to_string(),
                    model: "whisper-large-v3".to_string(),
                    language: t.language.clone(),
                })
            }
        }
    }

    /// Resolve the answer provider, credential and model for one call.
    pub fn resolve_answer(&self) -> Result<ResolvedAnswer> {
        let a = &self.answer;
        let (provider, key, model) = match a.provider.as_str() {
            "openai" => ("openai", &a.openai_api_key, &a.openai_model),
            "claude" => ("claude", &a.anthropic_api_key, &a.claude_model),
            _ => ("groq", &a.groq_api_key, &a.groq_model),
        };
        let api_key =
            key.clone()
                .filter(|k| !k.is_empty())
                .ok_or(MeetmindError::MissingCredential {
                    provider: provider.to_string(),
                })?;
        Ok(ResolvedAnswer {
            provider: provider.to_string(),
            api_key,
            model: model.clone(),
            max_tokens: a.max_tokens,
            temperature: a.temperature,
        })
    }

    /// Full hallucination denylist: built-in phrases plus config extras,
    /// pre-lowercased for exact-match comparison.
    pub fn hallucination_phrases(&self) -> Vec<String> {
        let mut phrases: Vec<String> = defaults::HALLUCINATION_PHRASES
            .iter()
            .map(|p| p.to_string())
            .collect();
        phrases.extend(
            self.transcription
                .extra_hallucination_phrases
                .iter()
                .map(|p| p.trim().to_lowercase()),
        );
        phrases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_meetmind_env() {
        remove_env("MEETMIND_TRANSCRIPTION_PROVIDER");
        remove_env("MEETMIND_ANSWER_PROVIDER");
        remove_env("MEETMIND_GROQ_API_KEY");
        remove_env("MEETMIND_OPENAI_API_KEY");
        remove_env("MEETMIND_ANTHROPIC_API_KEY");
        remove_env("MEETMIND_LANGUAGE");
        remove_env("MEETMIND_AUDIO_DEVICE");
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.audio.device, None);
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.chunk_interval_ms, 3000);
        assert_eq!(config.audio.chunk_energy_threshold, 0.01);
        assert_eq!(config.audio.silence_trigger_threshold, 0.01);
        assert_eq!(config.audio.silence_duration_ms, 1500);

        assert_eq!(config.transcription.provider, "groq");
        assert_eq!(config.transcription.language, None);

        assert_eq!(config.answer.provider, "groq");
        assert_eq!(config.answer.max_tokens, 2048);
        assert_eq!(config.answer.dismiss_secs, 30);
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml_content = r#"
            [audio]
            device = "pipewire"
            sample_rate = 44100
            chunk_interval_ms = 2000
            silence_duration_ms = 2000

            [transcription]
            provider = "openai"
            openai_api_key = "sk-test"
            language = "de"

            [answer]
            provider = "claude"
            anthropic_api_key = "sk-ant-test"
            dismiss_secs = 0
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.audio.device, Some("pipewire".to_string()));
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.audio.chunk_interval_ms, 2000);
        assert_eq!(config.audio.silence_duration_ms, 2000);

        assert_eq!(config.transcription.provider, "openai");
        assert_eq!(config.transcription.language, Some("de".to_string()));

        assert_eq!(config.answer.provider, "claude");
        assert_eq!(config.answer.dismiss_secs, 0);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let toml_content = r#"
            [answer]
            provider = "openai"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.answer.provider, "openai");

        // Everything else should be defaults
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.transcription.provider, "groq");
        assert_eq!(config.answer.max_tokens, 2048);
    }

    #[test]
    fn test_env_override_keys() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_meetmind_env();

        set_env("MEETMIND_GROQ_API_KEY", "gsk-abc");
        set_env("MEETMIND_ANSWER_PROVIDER", "groq");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.transcription.groq_api_key, Some("gsk-abc".to_string()));
        assert_eq!(config.answer.groq_api_key, Some("gsk-abc".to_string()));
        assert_eq!(config.answer.provider, "groq");

        clear_meetmind_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_meetmind_env();

        set_env("MEETMIND_LANGUAGE", "");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.transcription.language, None);

        clear_meetmind_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let invalid_toml = r#"
            [audio
            device = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());

        assert!(result.is_err());
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();

        assert!(path_str.contains("meetmind"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_load_missing_file_is_config_file_not_found() {
        let result = Config::load(Path::new("/tmp/nonexistent_meetmind_config_12345.toml"));
        assert!(matches!(
            result,
            Err(MeetmindError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_meetmind_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_errors_on_invalid_toml() {
        let invalid_toml = r#"
            [audio
            device = "broken
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();

        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_resolve_transcription_missing_credential() {
        let config = Config::default();
        let result = config.resolve_transcription();

        match result {
            Err(MeetmindError::MissingCredential { provider }) => {
                assert_eq!(provider, "groq");
            }
            other => panic!("Expected MissingCredential, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_transcription_groq() {
        let mut config = Config::default();
        config.transcription.groq_api_key = Some("gsk-test".to_string());
        config.transcription.language = Some("en".to_string());

        let resolved = config.resolve_transcription().unwrap();
        assert_eq!(resolved.provider, "groq");
        assert_eq!(resolved.api_key, "gsk-test");
        assert_eq!(resolved.model, "whisper-large-v3");
        assert!(resolved.base_url.contains("api.groq.com"));
        assert_eq!(resolved.language, Some("en".to_string()));
    }

    #[test]
    fn test_resolve_transcription_openai() {
        let mut config = Config::default();
        config.transcription.provider = "openai".to_string();
        config.transcription.openai_api_key = Some("sk-test".to_string());

        let resolved = config.resolve_transcription().unwrap();
        assert_eq!(resolved.provider, "openai");
        assert_eq!(resolved.model, "whisper-1");
        assert!(resolved.base_url.contains("api.openai.com"));
    }

    #[test]
    fn test_resolve_answer_claude() {
        let mut config = Config::default();
        config.answer.provider = "claude".to_string();
        config.answer.anthropic_api_key = Some("sk-ant".to_string());

        let resolved = config.resolve_answer().unwrap();
        assert_eq!(resolved.provider, "claude");
        assert_eq!(resolved.model, "claude-sonnet-4-20250514");
        assert_eq!(resolved.max_tokens, 2048);
    }

    #[test]
    fn test_resolve_answer_empty_key_is_missing() {
        let mut config = Config::default();
        config.answer.groq_api_key = Some(String::new());

        assert!(matches!(
            config.resolve_answer(),
            Err(MeetmindError::MissingCredential { .. })
        ));
    }

    #[test]
    fn test_hallucination_phrases_include_extras() {
        let mut config = Config::default();
        config
            .transcription
            .extra_hallucination_phrases
            .push("Okay Then.".to_string());

        let phrases = config.hallucination_phrases();
        assert!(phrases.contains(&"thank you.".to_string()));
        assert!(phrases.contains(&"okay then.".to_string()));
    }
}
