//! /history command

use medchat_agent::ChatController;
use medchat_ai::{Message, Role};

use super::CommandResult;

const PREVIEW_CHARS: usize = 72;

pub struct HistoryCommand;

impl HistoryCommand {
    pub fn execute(controller: &ChatController) -> CommandResult {
        let messages = controller.messages();
        if messages.is_empty() {
            return CommandResult::Message("No messages yet.".to_string());
        }
        let lines: Vec<String> = messages
            .iter()
            .enumerate()
            .map(|(i, m)| format!("  {}: {}", i, summarize(m)))
            .collect();
        CommandResult::Message(format!("Conversation:\n{}", lines.join("\n")))
    }
}

fn summarize(message: &Message) -> String {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant if message.error => "error",
        Role::Assistant => "assistant",
    };
    let time = chrono::DateTime::from_timestamp_millis(message.timestamp)
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M").to_string())
        .unwrap_or_default();
    let images = if message.has_images() {
        format!(" [{} image(s)]", message.images.len())
    } else {
        String::new()
    };
    format!(
        "{} [{}]{} {}",
        time,
        role,
        images,
        crate::utils::truncate_chars(&message.content.replace('\n', " "), PREVIEW_CHARS)
    )
}
