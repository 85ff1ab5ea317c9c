//! MessageExchangeController — drives the profile submission and chat turns.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::Message;
use crate::error::PreconditionError;
use crate::notify::Notification;
use crate::profile::ProfileDraft;

use super::store::ConversationStore;

/// Lead-in of the first message of a profile conversation.
const PROFILE_INSTRUCTION: &str = "Here is my information. Please let me know what else I \
should provide to build a complete and detailed professional profile:";

/// Format a profile draft as the instruction message sent to the assistant.
pub fn profile_instruction(record: &ProfileDraft) -> Result<String, serde_json::Error> {
    let body = serde_json::to_string_pretty(record)?;
    Ok(format!("{PROFILE_INSTRUCTION}\n\n{body}"))
}

/// Sends messages on behalf of the user and records the exchange in the
/// store.
///
/// Every send ensures a conversation exists first, then holds that
/// conversation's turn until its messages are in the list, so the list
/// order is the order in which sends were started.
pub struct MessageExchangeController {
    store: Arc<ConversationStore>,
    /// Serializes "create a conversation if none is active".
    creating: Mutex<()>,
}

impl MessageExchangeController {
    pub fn new(store: Arc<ConversationStore>) -> Self {
        Self {
            store,
            creating: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Submit the finished profile as the opening message.
    ///
    /// Nothing is shown until the server replies; then the instruction and
    /// the reply are appended together.
    pub async fn submit_profile(&self, record: &ProfileDraft) -> bool {
        let instruction = match profile_instruction(record) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize profile");
                self.store
                    .notify(Notification::error("Could not prepare the profile"));
                return false;
            }
        };

        let Some(conversation_id) = self.ensure_conversation().await else {
            warn!(reason = %PreconditionError::NoActiveConversation, "Profile not submitted");
            return false;
        };

        let _turn = self.store.acquire_turn(&conversation_id).await;
        match self.store.api().post_message(&conversation_id, &instruction).await {
            Ok(reply) => {
                self.store
                    .append_messages(&conversation_id, vec![Message::confirmed_user(instruction), reply])
                    .await;
                info!(conversation_id = %conversation_id, fields = record.len(), "Profile submitted");
                self.store.notify(Notification::success("Profile submitted"));
                true
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to submit profile");
                self.store
                    .notify(Notification::error("Could not submit the profile"));
                false
            }
        }
    }

    /// Send one chat turn.
    ///
    /// Blank input is ignored. The user message shows up at once as pending;
    /// it is confirmed when the reply arrives, or removed again on failure
    /// with its text handed back to the input box.
    pub async fn send_chat_message(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            debug!(reason = %PreconditionError::BlankInput, "Ignoring chat message");
            return false;
        }

        let Some(conversation_id) = self.ensure_conversation().await else {
            warn!(reason = %PreconditionError::NoActiveConversation, "Chat message not sent");
            return false;
        };

        let _turn = self.store.acquire_turn(&conversation_id).await;
        let local_id = self.store.insert_pending(&conversation_id, text).await;
        self.store.clear_sent_input(text).await;

        match self.store.api().post_message(&conversation_id, text).await {
            Ok(reply) => {
                self.store
                    .confirm_pending(&conversation_id, local_id, reply)
                    .await;
                debug!(conversation_id = %conversation_id, "Chat turn completed");
                true
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to send chat message");
                self.store.revert_pending(local_id, text).await;
                self.store
                    .notify(Notification::error("Message could not be sent"));
                false
            }
        }
    }

    /// Send whatever is in the input box.
    pub async fn submit_input(&self) -> bool {
        let text = self.store.input().await;
        self.send_chat_message(&text).await
    }

    /// The active conversation, creating one if none is active.
    async fn ensure_conversation(&self) -> Option<String> {
        let _creating = self.creating.lock().await;
        if let Some(id) = self.store.active_conversation_id().await {
            return Some(id);
        }
        debug!("No active conversation, creating one");
        self.store.create_conversation().await.map(|c| c.id)
    }
}
