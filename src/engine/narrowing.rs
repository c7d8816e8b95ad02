//! The constraint-narrowing engine.
//!
//! A greedy, one-attribute-at-a-time decision procedure over the shared
//! [`CandidateStore`]: ask the attributes in catalog order, keep the records
//! whose value equals each literal answer, stop as soon as one or zero
//! records remain or the attributes run out. No backtracking and no
//! reordering by information gain.
//!
//! All operations are pure functions of their inputs; sessions hold their
//! own [`SessionState`] values.

use std::sync::Arc;

use thiserror::Error;

use crate::catalog::{CandidateRecord, CandidateStore};
use crate::config::EngineConfig;

use super::clarify::may_clarify;
use super::session::{Answer, CandidateSet, SessionState, TerminalStatus};

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Queried past the last attribute without checking termination first.
    #[error("all attributes have been asked")]
    ExhaustedAttributes,

    /// The answer names a different attribute than the one being asked.
    #[error("expected an answer for '{expected}', got one for '{got}'")]
    AttributeMismatch { expected: String, got: String },

    /// "Unsure" after the clarification budget for this attribute ran out.
    #[error("please pick one of the options for '{0}'")]
    ChoiceRequired(String),
}

// ---------------------------------------------------------------------------
// Question
// ---------------------------------------------------------------------------

/// What to ask next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Zero-based step index.
    pub step: usize,
    /// Number of attributes in the catalog.
    pub total: usize,
    pub attribute: String,
    /// Distinct non-missing values across the current candidates, in first
    /// encountered order.
    pub values: Vec<String>,
    /// Synthetic "unsure" option; `None` when a literal choice is forced.
    pub unsure_label: Option<String>,
    /// Synthetic "skip" option, when enabled.
    pub skip_label: Option<String>,
}

impl Question {
    /// Options as presented: literal values, then the synthetic ones.
    pub fn choices(&self) -> Vec<String> {
        self.values
            .iter()
            .cloned()
            .chain(self.unsure_label.clone())
            .chain(self.skip_label.clone())
            .collect()
    }

    /// `true` when "unsure" is no longer on offer.
    pub fn is_forced(&self) -> bool {
        self.unsure_label.is_none()
    }
}

// ---------------------------------------------------------------------------
// NarrowingEngine
// ---------------------------------------------------------------------------

/// Shared, stateless engine. One instance serves any number of sessions.
#[derive(Debug, Clone)]
pub struct NarrowingEngine {
    store: Arc<CandidateStore>,
    unsure_label: String,
    skip_label: Option<String>,
    max_clarifications: u32,
}

impl NarrowingEngine {
    pub fn new(store: Arc<CandidateStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            unsure_label: config.unsure_label.clone(),
            skip_label: config.allow_skip.then(|| config.skip_label.clone()),
            max_clarifications: config.max_clarifications,
        }
    }

    pub fn store(&self) -> &Arc<CandidateStore> {
        &self.store
    }

    /// A fresh session over every record.
    pub fn start(&self) -> SessionState {
        SessionState::new(CandidateSet::all(self.store.len()))
    }

    pub fn is_unsure(&self, answer: &str) -> bool {
        answer.trim().eq_ignore_ascii_case(self.unsure_label.trim())
    }

    pub fn is_skip(&self, answer: &str) -> bool {
        self.skip_label
            .as_deref()
            .is_some_and(|label| answer.trim().eq_ignore_ascii_case(label.trim()))
    }

    fn current_attribute(&self, state: &SessionState) -> Result<&str, EngineError> {
        self.store
            .catalog()
            .get(state.step)
            .ok_or(EngineError::ExhaustedAttributes)
    }

    /// Distinct values of `attribute` across the current candidates.
    fn values_for(&self, state: &SessionState, attribute: &str) -> Vec<String> {
        let mut values: Vec<String> = Vec::new();
        for record in state.candidates.records(&self.store) {
            if let Some(v) = record.value(attribute) {
                if !values.iter().any(|seen| seen == v) {
                    values.push(v.to_string());
                }
            }
        }
        values
    }

    /// The question for the current step.
    ///
    /// Callers check [`is_terminal`](Self::is_terminal) first; past the last
    /// attribute this fails with [`EngineError::ExhaustedAttributes`].
    pub fn next_question(&self, state: &SessionState) -> Result<Question, EngineError> {
        let attribute = self.current_attribute(state)?;
        let values = self.values_for(state, attribute);

        let unsure_label = may_clarify(state.clarifications, self.max_clarifications)
            .then(|| self.unsure_label.clone());

        Ok(Question {
            step: state.step,
            total: self.store.catalog().len(),
            attribute: attribute.to_string(),
            values,
            unsure_label,
            skip_label: self.skip_label.clone(),
        })
    }

    /// Apply one answer and return the resulting state.
    ///
    /// * unsure label: same step and candidates, `uncertain` set, one more
    ///   clarification counted; refused once the budget is spent.
    /// * skip label: next step, candidates unchanged, recorded as not given.
    /// * anything else: keep the candidates whose value equals `answer`
    ///   and move to the next step. The answer is not checked against the
    ///   offered values, so an unknown value empties the set.
    pub fn accept_answer(
        &self,
        state: &SessionState,
        attribute: &str,
        answer: &str,
    ) -> Result<SessionState, EngineError> {
        let current = self.current_attribute(state)?;
        if current != attribute {
            return Err(EngineError::AttributeMismatch {
                expected: current.to_string(),
                got: attribute.to_string(),
            });
        }

        if self.is_unsure(answer) {
            if !may_clarify(state.clarifications, self.max_clarifications) {
                return Err(EngineError::ChoiceRequired(attribute.to_string()));
            }
            let mut next = state.clone();
            next.uncertain = true;
            next.clarifications += 1;
            log::debug!(
                "engine: unsure about '{attribute}' ({} of {})",
                next.clarifications,
                self.max_clarifications
            );
            return Ok(next);
        }

        if self.is_skip(answer) {
            log::debug!("engine: '{attribute}' skipped");
            return Ok(state.advance(attribute, Answer::NotGiven, state.candidates.clone()));
        }

        let answer = answer.trim();
        let candidates = state
            .candidates
            .filter(&self.store, |r| r.matches(attribute, answer));
        log::debug!(
            "engine: '{attribute}' = '{answer}' narrows {} → {}",
            state.candidates.len(),
            candidates.len()
        );
        Ok(state.advance(attribute, Answer::Value(answer.to_string()), candidates))
    }

    /// Apply an already validated free-text answer.
    ///
    /// Text that equals an offered value (ignoring case and surrounding
    /// whitespace) is handled as that literal value; other text is recorded
    /// and the step advances without filtering.
    pub fn accept_free_text(
        &self,
        state: &SessionState,
        attribute: &str,
        text: &str,
    ) -> Result<SessionState, EngineError> {
        let current = self.current_attribute(state)?;
        if current != attribute {
            return Err(EngineError::AttributeMismatch {
                expected: current.to_string(),
                got: attribute.to_string(),
            });
        }

        if self.is_unsure(text) || self.is_skip(text) {
            return self.accept_answer(state, attribute, text);
        }

        if let Some(value) = self.match_value(state, attribute, text) {
            return self.accept_answer(state, attribute, &value);
        }

        log::debug!("engine: free-text answer for '{attribute}', no filter applied");
        Ok(state.advance(
            attribute,
            Answer::FreeText(text.trim().to_string()),
            state.candidates.clone(),
        ))
    }

    /// The offered value equal to `text`, ignoring case and whitespace.
    pub fn match_value(&self, state: &SessionState, attribute: &str, text: &str) -> Option<String> {
        let wanted = text.trim().to_lowercase();
        self.values_for(state, attribute)
            .into_iter()
            .find(|v| v.to_lowercase() == wanted)
    }

    /// Where the session stands. Unique and Empty win over exhaustion.
    pub fn is_terminal(&self, state: &SessionState) -> TerminalStatus {
        match state.candidates.len() {
            0 => TerminalStatus::Empty,
            1 => state
                .candidates
                .records(&self.store)
                .next()
                .cloned()
                .map(TerminalStatus::Unique)
                .unwrap_or(TerminalStatus::Empty),
            _ if state.step >= self.store.catalog().len() => TerminalStatus::Exhausted,
            _ => TerminalStatus::InProgress,
        }
    }

    /// The records still in play, in catalog order.
    pub fn remaining(&self, state: &SessionState) -> Vec<CandidateRecord> {
        state.candidates.records(&self.store).cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
