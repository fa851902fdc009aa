//! Shared domain types for Parley.
//!
//! This crate contains the types used across the Parley workspace: chat
//! messages, agent identities, run state, events, configuration, LLM
//! request/response shapes, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod agent;
pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod llm;
pub mod message;
