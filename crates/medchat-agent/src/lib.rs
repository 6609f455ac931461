//! medchat-agent: conversation controller for streamed chat generations
//!
//! This crate owns the conversation log, turns user input into outbound
//! requests, folds decoded stream events into the in-flight assistant reply
//! and exposes cancellation.

pub mod controller;
pub mod conversation;
pub mod error;
pub mod events;
pub mod handle;
pub mod session;
pub mod transport;

pub use controller::{ChatConfig, ChatController, RejectReason, SendOutcome};
pub use conversation::Conversation;
pub use error::Error;
pub use events::ChatEvent;
pub use handle::ChatHandle;
pub use session::{AccumulationMode, Fold, GenerationSession, ReasoningMode};
pub use transport::{HttpTransport, Transport};
