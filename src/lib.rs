//! Career Assist — client core for the AI career assistant.
//!
//! Collects a professional profile through a staged form, submits it as the
//! opening message of a conversation, and keeps the conversation list and
//! active message history in sync with the conversation service.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod notify;
pub mod profile;
pub mod session;
