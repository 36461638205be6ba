//! Request payload construction for commit message generation.

use serde::Serialize;

use crate::changes::assemble::ChangeRecord;

/// Task description sent with every request.
pub const INSTRUCTION: &str = "Create a concise git commit message based on the following \
changes. Each record lists a changed path, how it changed, and its content before and after \
the change. Follow every rule exactly and reply with the commit message only.";

/// Formatting rules sent with every request, in order.
pub const RULES: [&str; 5] = [
    "The message has two parts: a header (first line) and an optional body.",
    "The header format is `<type>: <description>`.",
    "`<type>` is one of: `feat`, `chore`, `enhancement`, `fix`, `docs`.",
    "`<description>` is a short summary, not capitalized at the first letter.",
    "The body, if present, is a bullet list giving additional context.",
];

/// Everything the generation backend receives for one run.
///
/// Field order here is the serialized field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestPayload {
    pub instruction: &'static str,
    pub records: Vec<ChangeRecord>,
    pub rules: &'static [&'static str],
}

impl RequestPayload {
    /// Serialize to the prompt text handed to the backend.
    ///
    /// Pretty-printed JSON; the same records always produce the same bytes.
    pub fn to_prompt(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Combine change records with the fixed instruction and rules.
pub fn build_request(records: Vec<ChangeRecord>) -> RequestPayload {
    RequestPayload {
        instruction: INSTRUCTION,
        records,
        rules: &RULES,
    }
}
