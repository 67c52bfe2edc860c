//! Shared event rendering for terminal output.
//! Everything goes to stderr so stdout stays clean for piping.

use crate::answer::StructuredAnswer;
use crate::error::MeetmindError;

const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Startup banner for listen mode.
pub fn listening_banner(device: Option<&str>, model: &str) {
    let device = device.unwrap_or("default input");
    eprintln!("{GREEN}{BOLD}listening{RESET} {DIM}({device}, {model}){RESET}");
    eprintln!("{DIM}Ctrl-C to stop{RESET}");
}

/// One accepted transcript fragment with the live word count.
pub fn transcript_line(text: &str, word_count: usize) {
    eprintln!("{DIM}[{word_count} words]{RESET} {text}");
}

/// Inline error notice, visually distinct from an answer card.
///
/// Transient remote errors render yellow (the pipeline keeps going);
/// everything else renders red.
pub fn error_notice(err: &MeetmindError, quiet: bool) {
    if quiet && err.is_transient() {
        return;
    }
    let color = if err.is_transient() { YELLOW } else { RED };
    eprintln!("{color}! {err}{RESET}");
}

/// Render the device list from the `devices` subcommand.
pub fn device_list(devices: &[String]) {
    if devices.is_empty() {
        eprintln!("{DIM}no input devices found{RESET}");
        return;
    }
    for device in devices {
        if let Some(name) = device.strip_suffix(" [system audio]") {
            println!("{name} {YELLOW}[system audio]{RESET}");
        } else if let Some(name) = device.strip_suffix(" [recommended]") {
            println!("{name} {GREEN}[recommended]{RESET}");
        } else {
            println!("{device}");
        }
    }
}

/// Plain answer text on stdout for the copy action, so it can be piped
/// or captured.
pub fn answer_text(answer: &StructuredAnswer) {
    println!("{}", answer.answer);
    if let Some(code) = &answer.code_snippet {
        println!();
        println!("{}", code);
    }
}

/// Shutdown status line.
pub fn stopped() {
    eprintln!("{DIM}stopped{RESET}");
}
