//! Generation session: per-request accumulation state

use medchat_ai::{Message, StreamEvent, Usage};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Which buffer incoming deltas are appended to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationMode {
    Thinking,
    Content,
}

/// How a session decides whether a reply has a reasoning phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningMode {
    /// The stream decides: text before the first boundary is reasoning,
    /// and a reply that never sends one is all content
    #[default]
    Auto,
    /// Every reply opens with a reasoning phase
    Always,
    /// Boundaries are ignored; everything is content
    Never,
}

/// Result of folding one event into the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    /// More events may follow
    Continue,
    /// A terminal event was folded
    Finished,
}

/// Bookkeeping for one send-to-completion lifecycle.
///
/// Owns the content and thinking buffers. Only the first boundary event
/// has an effect: it moves the mode from `Thinking` to `Content`, or under
/// [`ReasoningMode::Auto`] reclassifies the text streamed so far as thinking.
#[derive(Debug)]
pub struct GenerationSession {
    id: Uuid,
    cancel: CancellationToken,
    reasoning: ReasoningMode,
    mode: AccumulationMode,
    boundary_seen: bool,
    content: String,
    thinking: String,
    usage: Option<Usage>,
    error: bool,
    finished: bool,
    timestamp: i64,
}

impl GenerationSession {
    /// Start a session. `Always` sessions accumulate into `thinking` until
    /// the boundary; the others stream into `content`.
    pub fn new(reasoning: ReasoningMode, timestamp: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            reasoning,
            mode: match reasoning {
                ReasoningMode::Always => AccumulationMode::Thinking,
                ReasoningMode::Auto | ReasoningMode::Never => AccumulationMode::Content,
            },
            boundary_seen: false,
            content: String::new(),
            thinking: String::new(),
            usage: None,
            error: false,
            finished: false,
            timestamp,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn mode(&self) -> AccumulationMode {
        self.mode
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    /// Whether a terminal event (Done or Error) has been folded
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn thinking(&self) -> &str {
        &self.thinking
    }

    /// Fold one decoded event into the buffers
    pub fn fold(&mut self, event: &StreamEvent) -> Fold {
        if self.finished {
            return Fold::Finished;
        }

        match event {
            StreamEvent::ContentDelta(delta) if delta.is_empty() => self.leave_thinking(),
            StreamEvent::ContentDelta(delta) => match self.mode {
                AccumulationMode::Thinking => self.thinking.push_str(delta),
                AccumulationMode::Content => self.content.push_str(delta),
            },
            StreamEvent::ThinkingBoundary => self.leave_thinking(),
            StreamEvent::Usage(usage) => self.usage = Some(usage.clone()),
            StreamEvent::Done => self.finished = true,
            StreamEvent::Error(message) => self.fail(message),
        }

        if self.finished {
            Fold::Finished
        } else {
            Fold::Continue
        }
    }

    /// End the session with a failure; content becomes the error text
    pub fn fail(&mut self, message: &str) {
        self.content = message.to_string();
        self.error = true;
        self.finished = true;
    }

    fn leave_thinking(&mut self) {
        if self.boundary_seen {
            return;
        }
        self.boundary_seen = true;
        match (self.reasoning, self.mode) {
            (ReasoningMode::Always, AccumulationMode::Thinking) => {
                self.mode = AccumulationMode::Content;
            }
            (ReasoningMode::Auto, _) => {
                // Everything before the first boundary was reasoning
                self.thinking = std::mem::take(&mut self.content);
            }
            _ => return,
        }
        tracing::trace!(
            session_id = %self.id,
            thinking_len = self.thinking.len(),
            "reasoning phase ended"
        );
    }

    /// The assistant message as accumulated so far
    pub fn snapshot(&self) -> Message {
        Message {
            content: self.content.clone(),
            thinking: if self.thinking.is_empty() {
                None
            } else {
                Some(self.thinking.clone())
            },
            error: self.error,
            usage: self.usage.clone(),
            timestamp: self.timestamp,
            ..Message::assistant_empty()
        }
    }
}
