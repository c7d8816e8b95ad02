//! FinFinder: identify a fish through a short guided dialogue.
//!
//! The catalog is narrowed one attribute at a time; a language model
//! phrases questions, explains options and, when the attributes run out,
//! ranks the whole catalog by embedding similarity.

pub mod app;
pub mod catalog;
pub mod config;
pub mod dialogue;
pub mod engine;
pub mod llm;
