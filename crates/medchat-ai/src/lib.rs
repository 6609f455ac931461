//! medchat-ai: wire layer for the MedChat streaming protocol
//!
//! This crate provides the message model, the outbound chat-completion
//! payload, the incremental server-sent event decoder and the HTTP client
//! that talks to the MedChat backend.

pub mod client;
pub mod error;
pub mod payload;
pub mod stream;
pub mod types;

pub use client::{ByteStream, ChatClient, ClientConfig, HealthStatus};
pub use error::{Error, Result};
pub use payload::{ChatRequest, ContentPart, ImageUrl, WireContent, WireMessage, build_payload};
pub use stream::{LineOutcome, StreamDecoder, StreamEvent, StreamEventStream, decode_stream};
pub use types::*;
