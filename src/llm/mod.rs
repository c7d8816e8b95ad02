//! Language model gateway for FinFinder.
//!
//! This module provides:
//! * [`LanguageModelGateway`]: async trait with `complete` and `embed`.
//! * [`ApiGateway`]: OpenAI-compatible REST implementation.
//! * [`PromptBuilder`]: question / clarification / validation /
//!   justification prompts in English or German.
//! * [`Verdict`] / [`validate_answer`]: structured free-text validation.
//! * [`GatewayError`]: error variants for gateway operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use finfinder::config::AppConfig;
//! use finfinder::llm::{ApiGateway, LanguageModelGateway, PromptBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let gateway = ApiGateway::from_config(&config.llm);
//!     let prompts = PromptBuilder::new(&config.llm.language);
//!
//!     let (system, user) = prompts.question("habitat", &["freshwater".to_string()]);
//!     let question = gateway.complete(&system, &user).await.unwrap();
//!     println!("{question}");
//! }
//! ```

pub mod gateway;
pub mod prompt;
pub mod validation;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use gateway::{ApiGateway, GatewayError, LanguageModelGateway};
pub use prompt::PromptBuilder;
pub use validation::{validate_answer, Verdict};
