//! /image, /unstage and /images commands

use medchat_agent::ChatController;

use super::CommandResult;

pub struct ImageCommand;

impl ImageCommand {
    /// Stage an image file; loading happens in the caller
    pub fn stage(args: &str) -> CommandResult {
        if args.is_empty() {
            return CommandResult::Message("Usage: /image <path>".to_string());
        }
        CommandResult::StageImage(args.to_string())
    }

    /// Remove a staged image by its 1-based number
    pub fn unstage(args: &str, controller: &ChatController) -> CommandResult {
        let Ok(number) = args.parse::<usize>() else {
            return CommandResult::Message("Usage: /unstage <n>".to_string());
        };
        match number
            .checked_sub(1)
            .and_then(|index| controller.unstage_image(index))
        {
            Some(_) => CommandResult::Message(format!(
                "Removed image {} ({} attached)",
                number,
                controller.staged_images().len()
            )),
            None => CommandResult::Message(format!("No attached image {}", number)),
        }
    }

    /// List staged images
    pub fn list(controller: &ChatController) -> CommandResult {
        let staged = controller.staged_images();
        if staged.is_empty() {
            return CommandResult::Message("No images attached.".to_string());
        }
        let lines: Vec<String> = staged
            .iter()
            .enumerate()
            .map(|(i, img)| format!("  {}: {} (~{} KB)", i + 1, img.mime_type(), img.byte_len() / 1024))
            .collect();
        CommandResult::Message(format!("Attached images:\n{}", lines.join("\n")))
    }
}
