//! Conversation log: ordered messages, tail replaced while a reply streams in.

use medchat_ai::Message;

/// Ordered message log.
///
/// Append-only, except that the last entry may be replaced while the
/// assistant reply it holds is still streaming.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the last message in one step. Returns `false` on an empty log.
    pub fn replace_last(&mut self, message: Message) -> bool {
        match self.messages.last_mut() {
            Some(last) => {
                *last = message;
                true
            }
            None => false,
        }
    }

    /// All messages, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The newest message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop every message
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
