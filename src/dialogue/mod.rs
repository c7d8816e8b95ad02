//! Dialogue orchestration and presentation.
//!
//! # Architecture
//!
//! ```text
//! DialogueRunner::run(presenter)   ← async, one task per session loop
//!        │
//!        ├─ NarrowingEngine        (pure, synchronous)
//!        ├─ LanguageModelGateway   (phrase / clarify / validate / identify)
//!        └─ SimilarityRanker       (exhausted sessions only)
//!
//! Presenter
//!  ├─ TerminalPresenter   stdin/stdout, numbered options
//!  └─ ChannelPresenter    DialogueEvent ──▶ egui window
//!                         DialogueCommand ◀── egui window
//! ```

pub mod channel;
pub mod presenter;
pub mod runner;
pub mod state;
pub mod terminal;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use channel::{ChannelPresenter, DialogueCommand, DialogueEvent};
pub use presenter::{
    DialogueOutcome, Presenter, PresenterError, QuestionView, RemainingCandidate, UserInput,
};
pub use runner::{DialogueError, DialogueRunner};
pub use state::DialoguePhase;
pub use terminal::TerminalPresenter;
