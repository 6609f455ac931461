//! Controller event types

use medchat_ai::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::controller::SendOutcome;

/// Events broadcast to observers of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A message was appended to the log
    MessageAppended { message: Message },

    /// A generation session started
    SessionStart { session_id: Uuid },

    /// The in-flight assistant reply changed
    MessageUpdate { session_id: Uuid, message: Message },

    /// A generation session ended
    SessionEnd {
        session_id: Uuid,
        outcome: SendOutcome,
    },

    /// The staged image set changed
    StagedImagesChanged { count: usize },

    /// Sending was enabled or disabled
    EnabledChanged { enabled: bool },

    /// The log was cleared
    Cleared,
}

impl ChatEvent {
    /// Check if this event ends a session
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::SessionEnd { .. })
    }
}
