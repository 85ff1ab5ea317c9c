//! Wire types for the conversation service.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A server-tracked conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Context for the assistant; never displayed.
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A job posting suggested by the assistant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
}

/// Structured assistant payload: a follow-up question with examples, or
/// job suggestions once the profile is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    #[serde(default, alias = "message")]
    pub next_question: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub jobs_list: Vec<JobListing>,
}

impl AssistantReply {
    /// Render as markdown.
    pub fn to_markdown(&self) -> String {
        let mut parts = Vec::new();
        if !self.next_question.is_empty() {
            parts.push(self.next_question.clone());
        }
        if !self.examples.is_empty() {
            let examples: Vec<String> = self.examples.iter().map(|e| format!("- {e}")).collect();
            parts.push(examples.join("\n"));
        }
        for job in &self.jobs_list {
            let mut lines = vec![format!("**{}** at {}", job.title, job.company)];
            if !job.location.is_empty() {
                lines[0].push_str(&format!(" ({})", job.location));
            }
            if !job.description.is_empty() {
                lines.push(job.description.clone());
            }
            if !job.url.is_empty() {
                lines.push(job.url.clone());
            }
            parts.push(lines.join("\n"));
        }
        parts.join("\n\n")
    }
}

/// Message body: free text (markdown allowed) or a structured reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(AssistantReply),
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Delivery state of a message in the local list. Client-side only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryStatus {
    /// Inserted locally, awaiting server confirmation.
    Pending,
    /// Known to the server.
    #[default]
    Confirmed,
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server id; absent for optimistic local messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: Role,
    pub content: MessageContent,
    #[serde(
        default,
        deserialize_with = "de_optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Client-side handle used to reconcile optimistic inserts.
    #[serde(skip)]
    pub local_id: Option<Uuid>,
    #[serde(skip)]
    pub status: DeliveryStatus,
}

impl Message {
    /// A user message inserted before the server has seen it, tracked by
    /// `local_id` until it is confirmed or reverted.
    pub fn pending_user(local_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::User,
            content: MessageContent::Text(text.into()),
            created_at: None,
            local_id: Some(local_id),
            status: DeliveryStatus::Pending,
        }
    }

    /// A user message the server has accepted.
    pub fn confirmed_user(text: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Role::User,
            content: MessageContent::Text(text.into()),
            created_at: Some(Utc::now()),
            local_id: None,
            status: DeliveryStatus::Confirmed,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == DeliveryStatus::Pending
    }

    /// Whether a front end should render this message.
    pub fn is_displayed(&self) -> bool {
        self.role != Role::System
    }

    /// Markdown for display.
    ///
    /// Assistant messages loaded from history hold the structured payload as
    /// raw JSON text; those are rendered like a live structured reply.
    pub fn display_text(&self) -> String {
        match &self.content {
            MessageContent::Structured(reply) => reply.to_markdown(),
            MessageContent::Text(text) => {
                if self.role == Role::Assistant && text.trim_start().starts_with('{') {
                    if let Ok(reply) = serde_json::from_str::<AssistantReply>(text) {
                        return reply.to_markdown();
                    }
                }
                text.clone()
            }
        }
    }
}

// ── Envelopes ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationList {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(flatten)]
    pub components: BTreeMap<String, serde_json::Value>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

// ── Timestamps ──────────────────────────────────────────────────────

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
}

fn de_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}"))),
    }
}
