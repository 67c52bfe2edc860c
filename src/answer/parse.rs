//! Robust parsing of model replies.
//!
//! Models are prompted to return a single JSON object but routinely wrap
//! it in prose, fences, or emit structured values where flat strings were
//! asked for. Parsing here never fails hard: worst case the reply is
//! tagged unparseable and suppressed downstream.

use crate::answer::StructuredAnswer;
use crate::defaults;
use serde_json::Value;

/// How a model reply was turned into a [`StructuredAnswer`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The reply contained valid JSON honored as-is.
    Parsed(StructuredAnswer),
    /// The reply was missing or denied a question, but the utterance
    /// lexically looks like one; an answer was synthesized from the raw
    /// text.
    Synthesized(StructuredAnswer),
    /// No JSON and no question-shaped utterance; raw text kept for
    /// diagnostics.
    Unparseable(String),
}

impl ParseOutcome {
    /// The structured answer, if one was produced.
    pub fn answer(&self) -> Option<&StructuredAnswer> {
        match self {
            ParseOutcome::Parsed(a) | ParseOutcome::Synthesized(a) => Some(a),
            ParseOutcome::Unparseable(_) => None,
        }
    }
}

/// Parse a free-form model reply against the utterance that prompted it.
pub fn parse_response(text: &str, utterance: &str) -> ParseOutcome {
    let span = find_json_span(text);
    let parsed: Option<StructuredAnswer> = span
        .and_then(|(start, end)| serde_json::from_str::<Value>(&text[start..end]).ok())
        .map(answer_from_value);

    let json_ok = parsed.is_some();
    let mut answer = parsed.unwrap_or_default();

    if answer.has_question {
        return ParseOutcome::Parsed(answer);
    }

    if looks_like_question(utterance) {
        answer.has_question = true;
        if answer.question.is_empty() {
            answer.question =
                truncate_chars(utterance.trim(), defaults::QUESTION_TRUNCATE_CHARS);
        }
        if answer.answer.is_empty() {
            let remainder = span
                .map(|(_, end)| text[end..].trim())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| text.trim());
            answer.answer = truncate_chars(remainder, defaults::ANSWER_TRUNCATE_CHARS);
        }
        return ParseOutcome::Synthesized(answer);
    }

    if json_ok {
        // Valid JSON that says "no question here"; honored and suppressed
        ParseOutcome::Parsed(answer)
    } else {
        ParseOutcome::Unparseable(text.to_string())
    }
}

/// Build a StructuredAnswer from an arbitrary JSON value, flattening
/// non-string `answer` and `codeSnippet` fields.
fn answer_from_value(value: Value) -> StructuredAnswer {
    let has_question = value
        .get("hasQuestion")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let question = value
        .get("question")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let answer = match value.get("answer") {
        None | Some(Value::Null) => String::new(),
        Some(v) => flatten_to_string(v),
    };
    let code_snippet = match value.get("codeSnippet") {
        None | Some(Value::Null) => None,
        Some(v) => Some(flatten_to_string(v)).filter(|s| !s.is_empty()),
    };
    let language = value
        .get("language")
        .and_then(Value::as_str)
        .map(|s| s.to_string());

    StructuredAnswer {
        has_question,
        question,
        answer,
        code_snippet,
        language,
    }
}

/// Render any JSON value as a flat display string.
///
/// Arrays join with newlines; object entries render as `key\nvalue`
/// joined with blank lines. Matches what the system prompt asks the model
/// to produce itself.
pub fn flatten_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(flatten_to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}\n{}", k, flatten_to_string(v)))
            .collect::<Vec<_>>()
            .join("\n\n"),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
    }
}

/// Byte range of the first balanced top-level `{...}` span, skipping
/// string literals and escapes.
fn find_json_span(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset + 1));
                }
            }
            _ => {}
        }
    }
    None
}

const QUESTION_OPENERS: &[&str] = &[
    "what", "how", "why", "when", "where", "explain", "define", "tell me", "describe",
    "compare", "difference", "implement",
];

/// Lexical check for whether an utterance is question-shaped.
pub fn looks_like_question(utterance: &str) -> bool {
    if utterance.contains('?') {
        return true;
    }
    let lower = utterance.trim().to_lowercase();
    QUESTION_OPENERS
        .iter()
        .any(|opener| lower.starts_with(opener))
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
