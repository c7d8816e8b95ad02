//! Uncertainty resolution: the answering/clarifying phase and the glossary.
//!
//! ```text
//! Answering ──unsure──▶ Clarifying        (one explanation request)
//! Clarifying ──unsure──▶ Clarifying       (one more request, until the
//!                                          per-attribute budget is used up)
//! Clarifying ──literal option──▶ Answering (filters and advances)
//! ```
//!
//! Once the budget is spent the question is offered without the unsure
//! option and the engine refuses another "unsure".

use std::collections::BTreeMap;

/// Which half of the sub-flow a session is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Answering,
    Clarifying,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Answering
    }
}

/// Whether another clarification may be requested after `issued` ones.
pub fn may_clarify(issued: u32, max: u32) -> bool {
    issued < max
}

// ---------------------------------------------------------------------------
// Glossary
// ---------------------------------------------------------------------------

/// Static term explanations shown next to a question.
///
/// A term applies when it occurs (case-insensitive) in the attribute name
/// or in one of the offered values.
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    entries: BTreeMap<String, String>,
}

impl Glossary {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(term, text)| (term.to_lowercase(), text))
            .collect();
        Self { entries }
    }

    /// `(term, explanation)` pairs relevant to this question, sorted by term.
    pub fn lookup(&self, attribute: &str, values: &[String]) -> Vec<(String, String)> {
        let haystack: Vec<String> = std::iter::once(attribute)
            .chain(values.iter().map(String::as_str))
            .map(str::to_lowercase)
            .collect();

        self.entries
            .iter()
            .filter(|(term, _)| haystack.iter().any(|h| h.contains(term.as_str())))
            .map(|(term, text)| (term.clone(), text.clone()))
            .collect()
    }
}
