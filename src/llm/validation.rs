//! Structured validation of free-text answers.
//!
//! The gateway is asked for `{"accepted": bool, "feedback": "..."}`. Models
//! do not always comply, so [`Verdict::parse`] also understands the older
//! two-line form:
//!
//! ```text
//! OK: Ja
//! Feedback: ...
//! ```
//!
//! The text form is a fallback only; JSON always wins when present.

use serde::Deserialize;

use crate::llm::gateway::{GatewayError, LanguageModelGateway};
use crate::llm::prompt::PromptBuilder;

/// Outcome of validating one free-text answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Verdict {
    pub accepted: bool,
    #[serde(default)]
    pub feedback: String,
}

impl Verdict {
    /// Parse a gateway reply into a verdict.
    ///
    /// Accepts bare JSON, JSON wrapped in prose or a code fence, and the
    /// legacy `OK:`/`Feedback:` lines.
    pub fn parse(reply: &str) -> Result<Self, GatewayError> {
        if let Some(verdict) = parse_json_object(reply) {
            return Ok(verdict);
        }
        if let Some(verdict) = parse_legacy(reply) {
            log::debug!("validation: structured reply missing, used legacy text form");
            return Ok(verdict);
        }
        Err(GatewayError::Parse(format!(
            "unrecognised validation reply: {}",
            reply.chars().take(80).collect::<String>()
        )))
    }
}

fn parse_json_object(reply: &str) -> Option<Verdict> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

fn parse_legacy(reply: &str) -> Option<Verdict> {
    let verdict = reply.lines().find_map(|l| {
        let line = l.trim();
        let line = line.strip_prefix('-').unwrap_or(line).trim_start().to_lowercase();
        line.strip_prefix("ok:").map(|v| v.trim().to_string())
    })?;
    let accepted = verdict.starts_with("ja") || verdict.starts_with("yes");

    let feedback = reply
        .lines()
        .find_map(|l| {
            l.trim()
                .strip_prefix("Feedback:")
                .or_else(|| l.trim().strip_prefix("- Feedback:"))
        })
        .map(|f| f.trim().to_string())
        .unwrap_or_default();

    Some(Verdict { accepted, feedback })
}

/// Ask the gateway whether `input` is a sufficient answer for `attribute`.
pub async fn validate_answer(
    gateway: &dyn LanguageModelGateway,
    prompts: &PromptBuilder,
    attribute: &str,
    input: &str,
    options: &[String],
) -> Result<Verdict, GatewayError> {
    let (system, user) = prompts.validation(attribute, input, options);
    let reply = gateway.complete(&system, &user).await?;
    let verdict = Verdict::parse(&reply)?;
    log::debug!(
        "validation: '{attribute}' answer accepted={}",
        verdict.accepted
    );
    Ok(verdict)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
