//! Group chat run state types for Parley.
//!
//! These types describe where a group chat is in its lifecycle: how many
//! agent turns have completed, the iteration budget, and whether (and why)
//! the chat has stopped.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Why a chat reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// The termination strategy reported its goal as met.
    Satisfied,
    /// The iteration budget ran out before the goal was met.
    BudgetExhausted,
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionReason::Satisfied => write!(f, "satisfied"),
            CompletionReason::BudgetExhausted => write!(f, "budget_exhausted"),
        }
    }
}

/// What happens when the iteration budget is reached without the
/// termination strategy being satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetBehavior {
    /// Mark the chat complete with `CompletionReason::BudgetExhausted`.
    #[default]
    Complete,
    /// Stop the loop but leave the chat resumable; raising the maximum
    /// and invoking again continues the conversation.
    Pause,
}

impl fmt::Display for BudgetBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetBehavior::Complete => write!(f, "complete"),
            BudgetBehavior::Pause => write!(f, "pause"),
        }
    }
}

impl FromStr for BudgetBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "complete" => Ok(BudgetBehavior::Complete),
            "pause" => Ok(BudgetBehavior::Pause),
            other => Err(format!("invalid budget behavior: '{other}'")),
        }
    }
}

/// Lifecycle status of a group chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatStatus {
    /// Constructed, no agent turn has run yet.
    #[default]
    Idle,
    /// At least one turn has run and the chat can continue.
    Running,
    /// The budget ran out under `BudgetBehavior::Pause`. Resumable.
    Paused,
    /// Terminal. No further turns run until the chat is explicitly reset.
    Complete { reason: CompletionReason },
}

impl fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatStatus::Idle => write!(f, "idle"),
            ChatStatus::Running => write!(f, "running"),
            ChatStatus::Paused => write!(f, "paused"),
            ChatStatus::Complete { reason } => write!(f, "complete ({reason})"),
        }
    }
}

/// Snapshot of a chat's run state.
///
/// `iteration_count` only moves forward (one per completed agent turn) and
/// never exceeds `maximum_iterations` during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRunState {
    pub status: ChatStatus,
    pub iteration_count: u32,
    pub maximum_iterations: u32,
}

impl ChatRunState {
    pub fn new(maximum_iterations: u32) -> Self {
        Self {
            status: ChatStatus::Idle,
            iteration_count: 0,
            maximum_iterations,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, ChatStatus::Complete { .. })
    }

    pub fn is_paused(&self) -> bool {
        self.status == ChatStatus::Paused
    }

    /// The reason the chat completed, if it has.
    pub fn completion_reason(&self) -> Option<CompletionReason> {
        match self.status {
            ChatStatus::Complete { reason } => Some(reason),
            _ => None,
        }
    }

    /// Whether the iteration budget has been used up.
    pub fn budget_reached(&self) -> bool {
        self.iteration_count >= self.maximum_iterations
    }

    /// Turns left before the budget is reached (saturating).
    pub fn remaining_iterations(&self) -> u32 {
        self.maximum_iterations.saturating_sub(self.iteration_count)
    }
}
