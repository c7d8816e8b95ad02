//! The presentation contract between the dialogue runner and a frontend.

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::CandidateRecord;
use crate::engine::{Question, RankedMatch};

use super::state::DialoguePhase;

// ---------------------------------------------------------------------------
// PresenterError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PresenterError {
    #[error("presenter I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The other side of the presenter went away.
    #[error("presenter closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// View types
// ---------------------------------------------------------------------------

/// Everything needed to show one question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub question: Question,
    /// Natural-language phrasing; `None` when the model was unavailable.
    pub phrasing: Option<String>,
    /// `(term, explanation)` glossary entries relevant to the options.
    pub glossary: Vec<(String, String)>,
    /// Fish still in play.
    pub remaining: usize,
}

impl QuestionView {
    /// The phrasing, or a plain fallback built from the attribute name.
    pub fn prompt_text(&self) -> String {
        match &self.phrasing {
            Some(text) => text.clone(),
            None => format!("Which {} does the fish have?", self.question.attribute),
        }
    }
}

/// A fish still in play, with its catalog summary for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RemainingCandidate {
    pub record: CandidateRecord,
    /// Stored description or `"attribute: value, ..."` pairs.
    pub summary: String,
}

/// How a session ended.
///
/// `identification` is the language model's own guess from the collected
/// answers. It is `None` when it was not requested or the request failed.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueOutcome {
    /// Exactly one fish matches.
    Identified(CandidateRecord),
    /// No fish matches the answers.
    NoMatch,
    /// Similarity fallback results, best first.
    Ranked {
        matches: Vec<RankedMatch>,
        identification: Option<String>,
    },
    /// All attributes asked, several fish left and no ranking available.
    BestRemaining {
        candidates: Vec<RemainingCandidate>,
        identification: Option<String>,
    },
}

/// What the user did at a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Answer(String),
    Restart,
    Quit,
}

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

/// A frontend the runner drives.
///
/// Implementations only display and collect; all decisions stay in the
/// runner and the engine.
#[async_trait]
pub trait Presenter: Send {
    async fn render_question(&mut self, view: &QuestionView) -> Result<(), PresenterError>;

    /// Show the model's explanation of the current options.
    async fn render_clarification(&mut self, attribute: &str, text: &str) -> Result<(), PresenterError>;

    /// Show a transient message (gateway failure, rejected answer, ...).
    async fn render_notice(&mut self, message: &str) -> Result<(), PresenterError>;

    /// Phase updates. Frontends without a status line ignore them.
    async fn render_status(&mut self, _phase: DialoguePhase) -> Result<(), PresenterError> {
        Ok(())
    }

    async fn render_result(&mut self, outcome: &DialogueOutcome) -> Result<(), PresenterError>;

    /// Wait for the next user action.
    async fn capture_answer(&mut self) -> Result<UserInput, PresenterError>;

    /// Clear everything shown for the previous session.
    async fn restart(&mut self) -> Result<(), PresenterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(phrasing: Option<&str>) -> QuestionView {
        QuestionView {
            question: Question {
                step: 0,
                total: 2,
                attribute: "habitat".into(),
                values: vec!["fresh".into()],
                unsure_label: None,
                skip_label: None,
            },
            phrasing: phrasing.map(str::to_string),
            glossary: Vec::new(),
            remaining: 3,
        }
    }

    #[test]
    fn prompt_text_prefers_phrasing() {
        assert_eq!(view(Some("Where does it live?")).prompt_text(), "Where does it live?");
    }

    #[test]
    fn prompt_text_falls_back_to_attribute() {
        assert_eq!(view(None).prompt_text(), "Which habitat does the fish have?");
    }
}
