//! Per-session state of the narrowing dialogue.
//!
//! [`SessionState`] is a value: the engine never mutates one in place, it
//! returns a new state for every accepted answer. The presenter only reads
//! it.

use std::fmt;

use crate::catalog::{CandidateRecord, CandidateStore};

use super::clarify::Phase;

// ---------------------------------------------------------------------------
// CandidateSet
// ---------------------------------------------------------------------------

/// Indices of the records still in play, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    indices: Vec<usize>,
}

impl CandidateSet {
    /// Every record of a store with `len` records.
    pub fn all(len: usize) -> Self {
        Self {
            indices: (0..len).collect(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// A new set with the records that satisfy `keep`. Never larger than
    /// `self`.
    pub(crate) fn filter<F>(&self, store: &CandidateStore, keep: F) -> Self
    where
        F: Fn(&CandidateRecord) -> bool,
    {
        let indices = self
            .indices
            .iter()
            .copied()
            .filter(|&i| store.get(i).is_some_and(&keep))
            .collect();
        Self { indices }
    }

    pub fn records<'a>(&'a self, store: &'a CandidateStore) -> impl Iterator<Item = &'a CandidateRecord> + 'a {
        self.indices.iter().filter_map(move |&i| store.get(i))
    }
}

// ---------------------------------------------------------------------------
// Answer
// ---------------------------------------------------------------------------

/// What the user said for one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// One of the offered literal values; used for filtering.
    Value(String),
    /// Accepted free text that matched no offered value; not filtered on.
    FreeText(String),
    /// The user skipped the attribute.
    NotGiven,
}

impl Answer {
    pub fn text(&self) -> Option<&str> {
        match self {
            Answer::Value(v) | Answer::FreeText(v) => Some(v),
            Answer::NotGiven => None,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Some(text) => f.write_str(text),
            None => f.write_str("not given"),
        }
    }
}

/// One entry of the answer log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedAnswer {
    pub attribute: String,
    pub answer: Answer,
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Everything one identification session knows.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub(crate) step: usize,
    pub(crate) candidates: CandidateSet,
    pub(crate) answers: Vec<CollectedAnswer>,
    pub(crate) uncertain: bool,
    pub(crate) clarifications: u32,
}

impl SessionState {
    pub(crate) fn new(candidates: CandidateSet) -> Self {
        Self {
            step: 0,
            candidates,
            answers: Vec::new(),
            uncertain: false,
            clarifications: 0,
        }
    }

    /// Index of the attribute currently being asked.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn candidates(&self) -> &CandidateSet {
        &self.candidates
    }

    /// Answers in the order they were given.
    pub fn answers(&self) -> &[CollectedAnswer] {
        &self.answers
    }

    /// `true` after "unsure" until a concrete answer is accepted.
    pub fn is_uncertain(&self) -> bool {
        self.uncertain
    }

    /// Clarification requests issued for the current attribute.
    pub fn clarifications(&self) -> u32 {
        self.clarifications
    }

    pub fn phase(&self) -> Phase {
        if self.uncertain {
            Phase::Clarifying
        } else {
            Phase::Answering
        }
    }

    /// State after recording `answer` and moving to the next attribute.
    pub(crate) fn advance(&self, attribute: &str, answer: Answer, candidates: CandidateSet) -> Self {
        let mut answers = self.answers.clone();
        answers.push(CollectedAnswer {
            attribute: attribute.to_string(),
            answer,
        });
        Self {
            step: self.step + 1,
            candidates,
            answers,
            uncertain: false,
            clarifications: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// TerminalStatus
// ---------------------------------------------------------------------------

/// Completion state of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalStatus {
    /// Exactly one candidate left.
    Unique(CandidateRecord),
    /// No candidate matches the answers. Only a restart leaves this state.
    Empty,
    /// All attributes asked, several candidates left.
    Exhausted,
    /// Keep asking.
    InProgress,
}

impl TerminalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TerminalStatus::InProgress)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
