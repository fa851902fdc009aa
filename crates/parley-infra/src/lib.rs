//! Infrastructure layer for Parley.
//!
//! Contains the OpenAI-compatible implementation of the `LlmProvider` trait
//! defined in `parley-core`, chat file loading and validation, and assembly
//! of a runnable group chat from a loaded configuration.

pub mod assembly;
pub mod config;
pub mod llm;
