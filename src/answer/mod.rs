//! Answer generation: provider clients, response parsing, orchestration.

pub mod client;
pub mod orchestrator;
pub mod parse;

pub use client::{AnswerClient, AnthropicClient, MockAnswerClient, OpenAiCompatClient};
pub use orchestrator::{AnswerOrchestrator, ClientFactory};
pub use parse::{parse_response, ParseOutcome};

use serde::{Deserialize, Serialize};

/// The one shape presentation ever receives.
///
/// Wire format is camelCase, matching the JSON contract in the system
/// prompt. `answer` and `code_snippet` are guaranteed flat strings by the
/// time parsing hands this out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuredAnswer {
    pub has_question: bool,
    pub question: String,
    pub answer: String,
    pub code_snippet: Option<String>,
    pub language: Option<String>,
}
