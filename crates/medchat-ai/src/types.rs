//! Core types for the chat conversation

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Get the role as the wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// An image ready to be sent, held as a `data:` URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    /// Encode raw image bytes as a base64 `data:` URL
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Image("image data is empty".to_string()));
        }
        if !mime_type.starts_with("image/") {
            return Err(Error::Image(format!("not an image type: {}", mime_type)));
        }
        let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(Self(format!("data:{};base64,{}", mime_type, b64)))
    }

    /// Wrap an already encoded `data:image/...;base64,` URL
    pub fn from_data_url(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let valid = url
            .strip_prefix("data:image/")
            .and_then(|rest| rest.split_once(";base64,"))
            .is_some_and(|(_, payload)| !payload.is_empty());
        if !valid {
            return Err(Error::Image("expected a base64 image data URL".to_string()));
        }
        Ok(Self(url))
    }

    /// The `data:` URL
    pub fn as_url(&self) -> &str {
        &self.0
    }

    /// MIME type embedded in the URL
    pub fn mime_type(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .unwrap_or_default()
    }

    /// Size of the decoded image in bytes (approximate for padded input)
    pub fn byte_len(&self) -> usize {
        let payload = self.0.split_once(',').map(|(_, p)| p).unwrap_or_default();
        payload.len() / 4 * 3
    }
}

/// Timing statistics reported alongside usage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perf {
    pub queue_ms: Option<u64>,
    pub ttft_ms: Option<u64>,
    pub generation_ms: Option<u64>,
}

/// Token usage reported at the end of a generation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    #[serde(default)]
    pub perf: Option<Perf>,
}

/// A single entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<EncodedImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(default)]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub timestamp: i64,
}

impl Message {
    /// Create a user message with text only
    pub fn user(text: impl Into<String>) -> Self {
        Self::user_with_images(text, vec![])
    }

    /// Create a user message carrying images
    pub fn user_with_images(text: impl Into<String>, images: Vec<EncodedImage>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            images,
            thinking: None,
            error: false,
            usage: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create an assistant message with final text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            ..Self::assistant_empty()
        }
    }

    /// Create the empty placeholder for a reply that is about to stream in
    pub fn assistant_empty() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            images: vec![],
            thinking: None,
            error: false,
            usage: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create an error-flagged assistant message
    pub fn assistant_error(text: impl Into<String>) -> Self {
        Self {
            error: true,
            ..Self::assistant(text)
        }
    }

    /// Whether the message carries any images
    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Thinking text, empty when there is none
    pub fn thinking_text(&self) -> &str {
        self.thinking.as_deref().unwrap_or_default()
    }
}
