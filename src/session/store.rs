//! ConversationStore — the client-side view of conversations and the active
//! conversation's messages, kept in sync with the conversation service.

use std::sync::Arc;

use tokio::sync::{OwnedMutexGuard, RwLock, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{Conversation, ConversationApi, DeliveryStatus, Message};
use crate::notify::{Notification, Notifier};

use super::sequencer::ConversationSequencer;
use super::state::{RestorePoint, SessionEvent, SessionState};

/// Owns the session state. Every mutation goes through this type.
///
/// Public operations never fail outward: errors are logged, reported once
/// through the notifier, and the previous state is kept.
pub struct ConversationStore {
    api: Arc<dyn ConversationApi>,
    notifier: Arc<dyn Notifier>,
    state: RwLock<SessionState>,
    turns: ConversationSequencer,
    tx: broadcast::Sender<SessionEvent>,
}

impl ConversationStore {
    pub fn new(
        api: Arc<dyn ConversationApi>,
        notifier: Arc<dyn Notifier>,
        event_capacity: usize,
    ) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(event_capacity.max(1));
        Arc::new(Self {
            api,
            notifier,
            state: RwLock::new(SessionState::default()),
            turns: ConversationSequencer::new(),
            tx,
        })
    }

    /// Subscribe to state-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn active_conversation_id(&self) -> Option<String> {
        self.state.read().await.active_conversation_id.clone()
    }

    pub async fn conversations(&self) -> Vec<Conversation> {
        self.state.read().await.conversations.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages.clone()
    }

    pub async fn input(&self) -> String {
        self.state.read().await.input.clone()
    }

    // ── Input box ───────────────────────────────────────────────────

    pub async fn set_input(&self, text: impl Into<String>) {
        self.state.write().await.input = text.into();
        self.emit(SessionEvent::InputChanged);
    }

    /// Empty the input box if it still holds `sent`. A draft typed since
    /// then is left alone.
    pub(crate) async fn clear_sent_input(&self, sent: &str) {
        let changed = {
            let mut state = self.state.write().await;
            let changed = state.input == sent;
            if changed {
                state.input.clear();
            }
            changed
        };
        if changed {
            self.emit(SessionEvent::InputChanged);
        }
    }

    // ── Conversations ───────────────────────────────────────────────

    /// Replace the local list with the server's. On failure the previous
    /// list is kept.
    pub async fn load_conversations(&self) -> bool {
        match self.api.list_conversations().await {
            Ok(conversations) => {
                let count = conversations.len();
                self.state.write().await.conversations = conversations;
                info!(count, "Conversations loaded");
                self.emit(SessionEvent::ConversationsLoaded { count });
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to load conversations");
                self.notify(Notification::error("Could not load conversations"));
                false
            }
        }
    }

    /// Create a conversation, put it first in the list and make it active
    /// with an empty message list. Returns `None` if the server refused.
    pub async fn create_conversation(&self) -> Option<Conversation> {
        let conversation = match self.api.create_conversation().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to create conversation");
                self.notify(Notification::error("Could not create a new conversation"));
                return None;
            }
        };

        {
            let mut state = self.state.write().await;
            state.conversations.retain(|c| c.id != conversation.id);
            state.conversations.insert(0, conversation.clone());
            state.active_conversation_id = Some(conversation.id.clone());
            state.messages.clear();
            state.messages_loading = false;
            state.restore_point = None;
            state.selection_epoch += 1;
        }

        info!(conversation_id = %conversation.id, "Conversation created");
        self.emit(SessionEvent::ConversationCreated {
            id: conversation.id.clone(),
        });
        self.emit(SessionEvent::ActiveConversationChanged {
            id: Some(conversation.id.clone()),
        });
        self.notify(Notification::success("New conversation created"));
        Some(conversation)
    }

    /// Switch to `conversation_id` and load its messages.
    ///
    /// The switch is visible immediately with an empty, loading message
    /// list. If the load fails the last settled conversation comes back,
    /// including exchanges that finished while loading. A response that
    /// arrives after another switch is dropped.
    pub async fn select_conversation(&self, conversation_id: &str) -> bool {
        let epoch = {
            let mut state = self.state.write().await;
            state.selection_epoch += 1;
            let previous_id = state
                .active_conversation_id
                .replace(conversation_id.to_string());
            let previous_messages = std::mem::take(&mut state.messages);
            // A selection interrupting another load keeps the settled restore point.
            if !state.messages_loading {
                state.restore_point = Some(RestorePoint {
                    conversation_id: previous_id,
                    messages: previous_messages,
                });
            }
            state.messages_loading = true;
            state.selection_epoch
        };
        self.emit(SessionEvent::ActiveConversationChanged {
            id: Some(conversation_id.to_string()),
        });

        // Sends already in flight for this conversation land first.
        let _turn = self.turns.acquire(conversation_id).await;
        let result = self.api.list_messages(conversation_id).await;

        let mut state = self.state.write().await;
        if state.selection_epoch != epoch {
            debug!(conversation_id, "Discarding messages for superseded selection");
            drop(state);
            if let Err(e) = result {
                warn!(conversation_id, error = %e, "Failed to load messages");
                self.notify(Notification::error("Could not load conversation messages"));
            }
            return false;
        }

        match result {
            Ok(messages) => {
                let count = messages.len();
                // Anything appended while waiting for the turn is in the server's list too.
                state.messages = messages;
                state.messages_loading = false;
                state.restore_point = None;
                drop(state);
                info!(conversation_id, count, "Conversation selected");
                self.emit(SessionEvent::MessagesReplaced {
                    conversation_id: conversation_id.to_string(),
                    count,
                });
                true
            }
            Err(e) => {
                let RestorePoint {
                    conversation_id: previous_id,
                    messages,
                } = state.restore_point.take().unwrap_or_default();
                state.active_conversation_id = previous_id.clone();
                state.messages = messages;
                state.messages_loading = false;
                drop(state);
                warn!(conversation_id, error = %e, "Failed to load messages, reverting selection");
                self.emit(SessionEvent::ActiveConversationChanged { id: previous_id });
                self.notify(Notification::error("Could not load conversation messages"));
                false
            }
        }
    }

    /// Delete a conversation. The local entry is only removed once the
    /// server confirms; deleting the active one clears the selection.
    pub async fn delete_conversation(&self, conversation_id: &str) -> bool {
        if let Err(e) = self.api.delete_conversation(conversation_id).await {
            warn!(conversation_id, error = %e, "Failed to delete conversation");
            self.notify(Notification::error("Could not delete conversation"));
            return false;
        }

        let was_active = {
            let mut state = self.state.write().await;
            state.conversations.retain(|c| c.id != conversation_id);
            let was_active = state.is_active(conversation_id);
            if was_active {
                state.active_conversation_id = None;
                state.messages.clear();
                state.messages_loading = false;
                state.restore_point = None;
                state.selection_epoch += 1;
            } else if let Some(point) = state
                .restore_point
                .as_mut()
                .filter(|point| point.conversation_id.as_deref() == Some(conversation_id))
            {
                *point = RestorePoint::default();
            }
            was_active
        };

        info!(conversation_id, was_active, "Conversation deleted");
        self.emit(SessionEvent::ConversationDeleted {
            id: conversation_id.to_string(),
        });
        if was_active {
            self.emit(SessionEvent::ActiveConversationChanged { id: None });
        }
        self.notify(Notification::success("Conversation deleted"));
        true
    }

    // ── Message list (used by the exchange controller) ──────────────

    pub(crate) fn api(&self) -> &Arc<dyn ConversationApi> {
        &self.api
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    pub(crate) async fn acquire_turn(&self, conversation_id: &str) -> OwnedMutexGuard<()> {
        self.turns.acquire(conversation_id).await
    }

    /// Append messages to the tail of `conversation_id`'s list. Skipped if
    /// that conversation is neither active nor the restore point.
    pub(crate) async fn append_messages(&self, conversation_id: &str, messages: Vec<Message>) {
        {
            let mut state = self.state.write().await;
            let visible = state.is_active(conversation_id);
            let Some(list) = state.messages_of_mut(conversation_id) else {
                debug!(conversation_id, "Conversation no longer active; not displaying messages");
                return;
            };
            list.extend(messages.iter().cloned());
            if !visible {
                debug!(conversation_id, "Selection loading; kept messages for restore");
                return;
            }
        }
        for message in messages {
            self.emit(SessionEvent::MessageAppended {
                conversation_id: conversation_id.to_string(),
                message,
            });
        }
    }

    /// Optimistically append a user message awaiting confirmation.
    pub(crate) async fn insert_pending(&self, conversation_id: &str, text: &str) -> Uuid {
        let local_id = Uuid::new_v4();
        self.append_messages(conversation_id, vec![Message::pending_user(local_id, text)])
            .await;
        local_id
    }

    /// Mark a pending message as delivered and append the reply after it.
    pub(crate) async fn confirm_pending(&self, conversation_id: &str, local_id: Uuid, reply: Message) {
        let confirmed = {
            let mut state = self.state.write().await;
            match state.local_message_mut(local_id) {
                Some((list, pos)) => {
                    list[pos].status = DeliveryStatus::Confirmed;
                    true
                }
                None => false,
            }
        };
        if confirmed {
            self.emit(SessionEvent::MessageConfirmed { local_id });
        }
        self.append_messages(conversation_id, vec![reply]).await;
    }

    /// Remove a pending message the server never accepted. Its text goes
    /// back into the input box unless the user already typed something new.
    pub(crate) async fn revert_pending(&self, local_id: Uuid, text: &str) {
        let (reverted, input_restored) = {
            let mut state = self.state.write().await;
            let reverted = match state.local_message_mut(local_id) {
                Some((list, pos)) => {
                    list.remove(pos);
                    true
                }
                None => false,
            };
            let input_restored = state.input.is_empty();
            if input_restored {
                state.input = text.to_string();
            }
            (reverted, input_restored)
        };
        if reverted {
            self.emit(SessionEvent::MessageReverted { local_id });
        }
        if input_restored {
            self.emit(SessionEvent::InputChanged);
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}
