//! Turn tracking and lifecycle for a group chat.
//!
//! `TurnTracker` owns the chat's run state: the iteration counter, the
//! budget, and the status transitions (idle, running, paused, complete).

use parley_types::chat::{BudgetBehavior, ChatRunState, ChatStatus, CompletionReason};

/// Counts completed turns and decides when the chat stops.
#[derive(Debug, Clone)]
pub struct TurnTracker {
    state: ChatRunState,
    budget_behavior: BudgetBehavior,
}

impl TurnTracker {
    pub fn new(maximum_iterations: u32, budget_behavior: BudgetBehavior) -> Self {
        Self {
            state: ChatRunState::new(maximum_iterations),
            budget_behavior,
        }
    }

    pub fn state(&self) -> &ChatRunState {
        &self.state
    }

    pub fn status(&self) -> ChatStatus {
        self.state.status
    }

    pub fn iteration_count(&self) -> u32 {
        self.state.iteration_count
    }

    pub fn maximum_iterations(&self) -> u32 {
        self.state.maximum_iterations
    }

    pub fn budget_behavior(&self) -> BudgetBehavior {
        self.budget_behavior
    }

    /// Whether another turn may run now.
    pub fn can_run(&self) -> bool {
        !self.state.is_complete() && !self.state.budget_reached()
    }

    /// Record one completed turn and return the new status.
    ///
    /// A satisfied turn completes the chat. Otherwise reaching the budget
    /// completes or pauses it, depending on the budget behavior.
    pub fn record_turn(&mut self, satisfied: bool) -> ChatStatus {
        self.state.iteration_count += 1;
        self.state.status = if satisfied {
            ChatStatus::Complete {
                reason: CompletionReason::Satisfied,
            }
        } else if self.state.budget_reached() {
            self.budget_status()
        } else {
            ChatStatus::Running
        };
        self.state.status
    }

    /// Apply the budget behavior when a run finds the budget already used up
    /// (e.g. a zero budget, or a budget lowered between runs).
    ///
    /// Returns the new status if it changed.
    pub fn exhaust(&mut self) -> Option<ChatStatus> {
        if self.state.is_complete() || !self.state.budget_reached() {
            return None;
        }
        let next = self.budget_status();
        if next == self.state.status {
            return None;
        }
        self.state.status = next;
        Some(next)
    }

    /// Change the budget. A paused chat with room left becomes runnable.
    pub fn set_maximum_iterations(&mut self, maximum_iterations: u32) {
        self.state.maximum_iterations = maximum_iterations;
        if self.state.is_paused() && !self.state.budget_reached() {
            self.state.status = ChatStatus::Running;
        }
    }

    /// Back to idle with a fresh iteration count. The budget is kept.
    pub fn reset(&mut self) {
        self.state.iteration_count = 0;
        self.state.status = ChatStatus::Idle;
    }

    fn budget_status(&self) -> ChatStatus {
        match self.budget_behavior {
            BudgetBehavior::Complete => ChatStatus::Complete {
                reason: CompletionReason::BudgetExhausted,
            },
            BudgetBehavior::Pause => ChatStatus::Paused,
        }
    }
}
