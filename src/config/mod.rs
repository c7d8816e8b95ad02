//! Configuration module for FinFinder.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform data directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save` (`--save-config`).

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, CatalogConfig, EngineConfig, Frontend, LlmConfig, LlmProvider, UiConfig,
    ValidationMode, API_KEY_ENV,
};
