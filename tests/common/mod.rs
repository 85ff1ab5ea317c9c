//! Shared test doubles for the session integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;

use career_assist::api::{
    Conversation, ConversationApi, HealthReport, Message, MessageContent, Role,
};
use career_assist::error::ApiError;
use career_assist::notify::{BroadcastNotifier, Notification};
use career_assist::session::{ConversationStore, MessageExchangeController};

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Service calls the fake can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Create,
    List,
    Messages,
    Post,
    Delete,
}

#[derive(Default)]
struct FakeState {
    conversations: Vec<Conversation>,
    messages: HashMap<String, Vec<Message>>,
    next_id: usize,
    failing: HashSet<Op>,
    post_delays: VecDeque<Duration>,
    message_delays: HashMap<String, Duration>,
    calls: Vec<Op>,
    posted: Vec<(String, String)>,
}

/// In-memory conversation service.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, op: Op) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.state.lock().unwrap().failing.remove(&op);
    }

    /// Delay the next `post_message` calls, one entry per call.
    pub fn delay_posts(&self, delays: &[Duration]) {
        self.state.lock().unwrap().post_delays.extend(delays.iter().copied());
    }

    pub fn delay_messages_for(&self, conversation_id: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .message_delays
            .insert(conversation_id.to_string(), delay);
    }

    pub fn seed_conversation(&self, id: &str) -> Conversation {
        let conversation = Conversation {
            id: id.to_string(),
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().unwrap();
        state.conversations.insert(0, conversation.clone());
        state.messages.entry(id.to_string()).or_default();
        conversation
    }

    pub fn seed_messages(&self, conversation_id: &str, messages: Vec<Message>) {
        self.state
            .lock()
            .unwrap()
            .messages
            .insert(conversation_id.to_string(), messages);
    }

    pub fn call_count(&self, op: Op) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| **c == op).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// `(conversation_id, message)` pairs received by `post_message`.
    pub fn posted(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().posted.clone()
    }

    pub fn server_conversations(&self) -> Vec<Conversation> {
        self.state.lock().unwrap().conversations.clone()
    }

    fn begin(&self, op: Op, endpoint: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        if state.failing.contains(&op) {
            return Err(ApiError::Transport {
                endpoint: endpoint.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

pub fn reply_text(message: &str) -> String {
    format!("echo: {message}")
}

pub fn assistant(text: &str) -> Message {
    Message {
        id: Some(format!("a-{text}")),
        role: Role::Assistant,
        content: MessageContent::Text(text.to_string()),
        created_at: Some(Utc::now()),
        local_id: None,
        status: Default::default(),
    }
}

pub fn user(text: &str) -> Message {
    Message {
        id: Some(format!("u-{text}")),
        role: Role::User,
        content: MessageContent::Text(text.to_string()),
        created_at: Some(Utc::now()),
        local_id: None,
        status: Default::default(),
    }
}

#[async_trait]
impl ConversationApi for FakeApi {
    async fn create_conversation(&self) -> Result<Conversation, ApiError> {
        self.begin(Op::Create, "POST /conversations")?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let conversation = Conversation {
            id: format!("conv-{}", state.next_id),
            created_at: Utc::now(),
        };
        state.conversations.insert(0, conversation.clone());
        state.messages.insert(conversation.id.clone(), Vec::new());
        Ok(conversation)
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.begin(Op::List, "GET /conversations")?;
        Ok(self.server_conversations())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        let delay = self
            .state
            .lock()
            .unwrap()
            .message_delays
            .get(conversation_id)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.begin(Op::Messages, "GET /conversations/{id}/messages")?;
        let state = self.state.lock().unwrap();
        state
            .messages
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                endpoint: "GET /conversations/{id}/messages".to_string(),
                status: 404,
                body: "Conversation not found".to_string(),
            })
    }

    async fn post_message(&self, conversation_id: &str, message: &str) -> Result<Message, ApiError> {
        let delay = self.state.lock().unwrap().post_delays.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.begin(Op::Post, "POST /conversations/{id}/messages")?;
        let mut state = self.state.lock().unwrap();
        state
            .posted
            .push((conversation_id.to_string(), message.to_string()));
        let reply = assistant(&reply_text(message));
        let history = state.messages.entry(conversation_id.to_string()).or_default();
        history.push(user(message));
        history.push(reply.clone());
        Ok(reply)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError> {
        self.begin(Op::Delete, "DELETE /conversations/{id}")?;
        let mut state = self.state.lock().unwrap();
        state.conversations.retain(|c| c.id != conversation_id);
        state.messages.remove(conversation_id);
        Ok(())
    }

    async fn health(&self) -> Result<HealthReport, ApiError> {
        Ok(HealthReport {
            status: "healthy".to_string(),
            components: Default::default(),
        })
    }
}

/// Everything a session test needs.
pub struct Harness {
    pub api: Arc<FakeApi>,
    pub store: Arc<ConversationStore>,
    pub controller: MessageExchangeController,
    pub notices: broadcast::Receiver<Notification>,
}

pub fn harness() -> Harness {
    let api = FakeApi::new();
    let notifier = Arc::new(BroadcastNotifier::new(64));
    let notices = notifier.subscribe();
    let store = ConversationStore::new(api.clone(), notifier, 64);
    let controller = MessageExchangeController::new(Arc::clone(&store));
    Harness {
        api,
        store,
        controller,
        notices,
    }
}

/// Everything notified so far.
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut seen = Vec::new();
    while let Ok(n) = rx.try_recv() {
        seen.push(n);
    }
    seen
}

/// Text of a message's content.
pub fn text_of(message: &Message) -> &str {
    match &message.content {
        MessageContent::Text(text) => text,
        MessageContent::Structured(reply) => &reply.next_question,
    }
}
