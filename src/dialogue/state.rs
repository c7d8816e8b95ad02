//! Dialogue phase as seen by a presenter.
//!
//! The runner reports a [`DialoguePhase`] before every step that may wait on
//! the language model, so the window can show a spinner and block input.

// ---------------------------------------------------------------------------
// DialoguePhase
// ---------------------------------------------------------------------------

/// States of one identification session.
///
/// ```text
/// Idle ──start──▶ Phrasing ──▶ AwaitingAnswer
///                                 ──free text──▶ Validating ──▶ AwaitingAnswer
///                                 ──unsure────▶ Clarifying ──▶ AwaitingAnswer
///                                 ──exhausted─▶ Ranking ──▶ Finished
/// any ──restart──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialoguePhase {
    /// No session yet, or just restarted.
    Idle,
    /// The next question is being phrased by the language model.
    Phrasing,
    /// A question is on screen.
    AwaitingAnswer,
    /// A free-text answer is being checked.
    Validating,
    /// An explanation of the current options is being requested.
    Clarifying,
    /// The similarity fallback is running.
    Ranking,
    /// An outcome has been shown.
    Finished,
}

impl DialoguePhase {
    /// Returns `true` while the runner waits on the language model.
    ///
    /// ```
    /// use finfinder::dialogue::DialoguePhase;
    ///
    /// assert!(DialoguePhase::Phrasing.is_busy());
    /// assert!(DialoguePhase::Ranking.is_busy());
    /// assert!(!DialoguePhase::AwaitingAnswer.is_busy());
    /// assert!(!DialoguePhase::Finished.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            DialoguePhase::Phrasing
                | DialoguePhase::Validating
                | DialoguePhase::Clarifying
                | DialoguePhase::Ranking
        )
    }

    /// A short label for the status line.
    pub fn label(&self) -> &'static str {
        match self {
            DialoguePhase::Idle => "Ready",
            DialoguePhase::Phrasing => "Preparing question",
            DialoguePhase::AwaitingAnswer => "Waiting for answer",
            DialoguePhase::Validating => "Checking answer",
            DialoguePhase::Clarifying => "Explaining options",
            DialoguePhase::Ranking => "Comparing with catalog",
            DialoguePhase::Finished => "Done",
        }
    }
}

impl Default for DialoguePhase {
    fn default() -> Self {
        DialoguePhase::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(DialoguePhase::default(), DialoguePhase::Idle);
    }

    #[test]
    fn waiting_for_the_user_is_not_busy() {
        assert!(!DialoguePhase::Idle.is_busy());
        assert!(!DialoguePhase::AwaitingAnswer.is_busy());
        assert!(DialoguePhase::Validating.is_busy());
        assert!(DialoguePhase::Clarifying.is_busy());
    }

    #[test]
    fn labels() {
        assert_eq!(DialoguePhase::Finished.label(), "Done");
        assert_eq!(DialoguePhase::Ranking.label(), "Comparing with catalog");
    }
}
