//! Outbound chat-completion request types

use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatRequest {
    /// Build a streaming request from the conversation log
    pub fn streaming(log: &[Message], max_tokens: u32, temperature: f32) -> Self {
        Self {
            messages: build_payload(log),
            max_tokens,
            temperature,
            stream: true,
        }
    }
}

/// One message in the external API's shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: WireContent,
}

/// Message content: plain text, or typed parts when images are attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A typed content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Project the conversation log into the external API's message list.
///
/// Messages with images become a part list: one image part per image in
/// order, then a single text part if the text is non-blank. Messages without
/// images keep plain string content. Thinking text is never sent.
pub fn build_payload(log: &[Message]) -> Vec<WireMessage> {
    log.iter().map(convert_message).collect()
}

fn convert_message(msg: &Message) -> WireMessage {
    let content = if msg.has_images() {
        let mut parts: Vec<ContentPart> = msg
            .images
            .iter()
            .map(|img| ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: img.as_url().to_string(),
                },
            })
            .collect();
        if !msg.content.trim().is_empty() {
            parts.push(ContentPart::Text {
                text: msg.content.clone(),
            });
        }
        WireContent::Parts(parts)
    } else {
        WireContent::Text(msg.content.clone())
    };

    WireMessage {
        role: msg.role.as_str().to_string(),
        content,
    }
}
