//! A group chat shared between tasks.
//!
//! Runs on one chat must never interleave. `SharedGroupChat` holds the chat
//! behind an async mutex and the `try_*` entry points fail fast with
//! `ChatError::RunInProgress` instead of queueing behind a running turn.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use parley_types::chat::ChatRunState;
use parley_types::error::ChatError;
use parley_types::message::ChatMessage;

use super::GroupChat;
use crate::agent::Agent;
use crate::history::HistorySnapshot;

/// Cloneable handle to a chat. Clones refer to the same chat.
#[derive(Debug, Clone)]
pub struct SharedGroupChat {
    inner: Arc<Mutex<GroupChat>>,
}

impl SharedGroupChat {
    pub fn new(chat: GroupChat) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chat)),
        }
    }

    /// Start a managed run, or fail with `RunInProgress` if another run (or
    /// any other holder of the chat) is active.
    ///
    /// The returned stream keeps the chat locked until it is dropped.
    pub fn try_run(
        &self,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = Result<ChatMessage, ChatError>> + Send + 'static, ChatError> {
        let guard = self.acquire()?;
        Ok(async_stream::stream! {
            let mut guard = guard;
            let mut run = std::pin::pin!(guard.run(cancel));
            while let Some(item) = run.next().await {
                yield item;
            }
        })
    }

    /// Run a single turn (optionally with a specific agent), or fail with
    /// `RunInProgress` if the chat is busy.
    pub fn try_run_one_turn(
        &self,
        agent: Option<Arc<dyn Agent>>,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = Result<ChatMessage, ChatError>> + Send + 'static, ChatError> {
        let guard = self.acquire()?;
        Ok(async_stream::stream! {
            let mut guard = guard;
            let mut turn = std::pin::pin!(guard.run_one_turn(agent, cancel));
            while let Some(item) = turn.next().await {
                yield item;
            }
        })
    }

    /// Wait for exclusive access, e.g. to seed or reconfigure between runs.
    pub async fn lock(&self) -> MutexGuard<'_, GroupChat> {
        self.inner.lock().await
    }

    /// Exclusive access if nothing else holds the chat.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, GroupChat>, ChatError> {
        self.inner.try_lock().map_err(|_| ChatError::RunInProgress)
    }

    /// Whether a run (or another holder) currently has the chat.
    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    pub async fn snapshot(&self) -> HistorySnapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn run_state(&self) -> ChatRunState {
        self.inner.lock().await.run_state().clone()
    }

    fn acquire(&self) -> Result<OwnedMutexGuard<GroupChat>, ChatError> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .map_err(|_| ChatError::RunInProgress)
    }
}

impl From<GroupChat> for SharedGroupChat {
    fn from(chat: GroupChat) -> Self {
        Self::new(chat)
    }
}
