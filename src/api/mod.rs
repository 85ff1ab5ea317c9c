//! Remote conversation service: wire types and HTTP contract.

pub mod client;
pub mod types;

pub use client::{ConversationApi, HttpConversationApi};
pub use types::{
    AssistantReply, Conversation, DeliveryStatus, HealthReport, JobListing, Message,
    MessageContent, Role,
};
