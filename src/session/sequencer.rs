//! Per-conversation turn lock.
//!
//! Operations that append to one conversation's message list hold its turn
//! from the first local mutation until the last, so a second send cannot
//! interleave with the first. Waiters are served in FIFO order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub(crate) struct ConversationSequencer {
    turns: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ConversationSequencer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for the turn on `conversation_id`. The turn is released when the
    /// guard drops.
    pub(crate) async fn acquire(&self, conversation_id: &str) -> OwnedMutexGuard<()> {
        let turn = {
            let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody holds or waits on are only referenced by the map.
            turns.retain(|_, turn| Arc::strong_count(turn) > 1);
            Arc::clone(turns.entry(conversation_id.to_string()).or_default())
        };
        turn.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn same_conversation_waits_for_release() {
        let sequencer = ConversationSequencer::new();
        let first = sequencer.acquire("c1").await;

        let blocked = timeout(Duration::from_millis(50), sequencer.acquire("c1")).await;
        assert!(blocked.is_err(), "second turn must wait");

        drop(first);
        let second = timeout(Duration::from_millis(50), sequencer.acquire("c1")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn different_conversations_are_independent() {
        let sequencer = ConversationSequencer::new();
        let _a = sequencer.acquire("a").await;
        let b = timeout(Duration::from_millis(50), sequencer.acquire("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let sequencer = ConversationSequencer::new();
        drop(sequencer.acquire("a").await);
        drop(sequencer.acquire("b").await);
        let _c = sequencer.acquire("c").await;
        assert_eq!(sequencer.tracked(), 1);
    }
}
