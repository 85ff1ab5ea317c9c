//! Session state — what the front end renders from.

use uuid::Uuid;

use crate::api::{Conversation, Message};

/// Where the active conversation is in its lifecycle.
///
/// `None → (create) → Empty → (first exchange) → Active`, and back to `None`
/// when the active conversation is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationPhase {
    None,
    Empty,
    Active,
}

/// Process-wide UI session state. Owned by the `ConversationStore`;
/// consumers only ever see clones.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Current contents of the chat input box.
    pub input: String,
    pub active_conversation_id: Option<String>,
    /// Newest first.
    pub conversations: Vec<Conversation>,
    /// Messages of the active conversation only.
    pub messages: Vec<Message>,
    /// The active conversation's messages are being fetched.
    pub messages_loading: bool,
    pub(crate) selection_epoch: u64,
    /// What a failed selection falls back to. Present only while a
    /// selection is loading.
    pub(crate) restore_point: Option<RestorePoint>,
}

/// The last settled selection, kept while another one loads.
///
/// Exchanges for that conversation that finish in the meantime are applied
/// here, so restoring it never brings back a stale list.
#[derive(Debug, Clone, Default)]
pub(crate) struct RestorePoint {
    pub(crate) conversation_id: Option<String>,
    pub(crate) messages: Vec<Message>,
}

impl SessionState {
    pub fn phase(&self) -> ConversationPhase {
        match (&self.active_conversation_id, self.messages.is_empty()) {
            (None, _) => ConversationPhase::None,
            (Some(_), true) => ConversationPhase::Empty,
            (Some(_), false) => ConversationPhase::Active,
        }
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        let id = self.active_conversation_id.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }

    /// Messages a front end should render (system context is hidden).
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_displayed())
    }

    pub fn has_pending_messages(&self) -> bool {
        self.messages.iter().any(Message::is_pending)
    }

    pub(crate) fn is_active(&self, conversation_id: &str) -> bool {
        self.active_conversation_id.as_deref() == Some(conversation_id)
    }

    /// The list holding `conversation_id`'s messages: the visible one if it
    /// is active, or the restore point's while a selection away from it loads.
    pub(crate) fn messages_of_mut(&mut self, conversation_id: &str) -> Option<&mut Vec<Message>> {
        if self.is_active(conversation_id) {
            return Some(&mut self.messages);
        }
        self.restore_point
            .as_mut()
            .filter(|point| point.conversation_id.as_deref() == Some(conversation_id))
            .map(|point| &mut point.messages)
    }

    /// Find an optimistic message by its local id, in the visible list or the
    /// restore point.
    pub(crate) fn local_message_mut(&mut self, local_id: Uuid) -> Option<(&mut Vec<Message>, usize)> {
        if let Some(pos) = position_of_local(&self.messages, local_id) {
            return Some((&mut self.messages, pos));
        }
        let point = self.restore_point.as_mut()?;
        let pos = position_of_local(&point.messages, local_id)?;
        Some((&mut point.messages, pos))
    }
}

fn position_of_local(messages: &[Message], local_id: Uuid) -> Option<usize> {
    messages.iter().position(|m| m.local_id == Some(local_id))
}

/// Change notifications for read-only consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ConversationsLoaded { count: usize },
    ConversationCreated { id: String },
    /// The active conversation changed (`None` = nothing selected).
    ActiveConversationChanged { id: Option<String> },
    ConversationDeleted { id: String },
    MessagesReplaced { conversation_id: String, count: usize },
    MessageAppended { conversation_id: String, message: Message },
    MessageConfirmed { local_id: Uuid },
    MessageReverted { local_id: Uuid },
    InputChanged,
}
