//! Profile wizard — collects the user's professional profile stage by stage.
//!
//! The wizard walks a fixed list of stages. Each completed stage is merged
//! into a flat draft by the `ProfileFormAggregator`; at the end the draft is
//! submitted as the first message of a conversation.

pub mod draft;
pub mod model;
pub mod stage;

pub use draft::{ProfileDraft, ProfileFormAggregator};
pub use model::{Certificate, Experience, ProfileRecord};
pub use stage::{RepeatableGroup, WizardStage};
