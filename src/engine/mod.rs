//! Identification engine: progressive narrowing, uncertainty handling and
//! the similarity fallback.
//!
//! ```text
//! start ─▶ next_question ─▶ accept_answer ─▶ is_terminal
//!              ▲                  │              │
//!              └──── InProgress ◀─┘              ├─ Unique / Empty
//!                                                └─ Exhausted ─▶ SimilarityRanker
//! ```

pub mod clarify;
pub mod narrowing;
pub mod ranker;
pub mod session;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use clarify::{Glossary, Phase};
pub use narrowing::{EngineError, NarrowingEngine, Question};
pub use ranker::{
    composite_description, cosine_similarity, EmbeddingIndex, RankedMatch, SimilarityRanker,
};
pub use session::{Answer, CandidateSet, CollectedAnswer, SessionState, TerminalStatus};
