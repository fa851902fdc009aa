//! Group chat orchestration.
//!
//! - `GroupChat`: history, roster, strategies and the turn loop
//! - `TurnTracker`: iteration budget and lifecycle status
//! - `SharedGroupChat`: a chat shared between tasks, one run at a time

pub mod group;
pub mod shared;
pub mod tracker;

pub use group::{GroupChat, GroupChatBuilder, TerminationDiagnostic};
pub use shared::SharedGroupChat;
pub use tracker::TurnTracker;
