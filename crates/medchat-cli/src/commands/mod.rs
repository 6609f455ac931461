//! Slash commands for interactive mode

mod history;
mod image;

pub use history::HistoryCommand;
pub use image::ImageCommand;

use medchat_agent::ChatController;

/// Result of executing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Clear the conversation
    Clear,
    /// Load and stage an image file
    StageImage(String),
    /// Show a message to the user (not sent to the model)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, controller: &ChatController) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        "image" | "i" => ImageCommand::stage(args),

        "unstage" | "u" => ImageCommand::unstage(args, controller),

        "images" => ImageCommand::list(controller),

        "history" => HistoryCommand::execute(controller),

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /image, /i <path>    Attach an image to the next message
  /unstage, /u <n>     Remove attached image number n
  /images              List attached images
  /history             Show the conversation so far
  /clear, /c           Clear conversation history
  /quit, /exit, /q     Exit medchat

Press Ctrl-C while a reply is streaming to stop it; at the prompt it exits.

Examples:
  /image ~/scans/chest-xray.png
  /unstage 1"#
        .to_string()
}
