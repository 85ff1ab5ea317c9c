//! Conversation session core.
//!
//! `ConversationStore` owns the session state and is the only place it is
//! mutated; `MessageExchangeController` drives message sends through it.
//! Front ends read snapshots and subscribe to `SessionEvent`s.

pub mod exchange;
mod sequencer;
pub mod state;
pub mod store;

pub use exchange::{MessageExchangeController, profile_instruction};
pub use state::{ConversationPhase, SessionEvent, SessionState};
pub use store::ConversationStore;
