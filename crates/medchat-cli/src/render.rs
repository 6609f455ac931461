//! Incremental printing of streamed replies

use std::io::{self, Write};

use medchat_agent::{ChatEvent, RejectReason, SendOutcome};
use medchat_ai::{Message, Usage};

use crate::utils::suffix_after_chars;

/// Prints only the part of each reply update not yet on screen.
///
/// Updates carry the whole accumulated reply, so the printer remembers
/// how many characters of thinking and content it has written.
#[derive(Debug, Default)]
pub struct ReplyPrinter {
    thinking_len: usize,
    content_len: usize,
    usage: Option<Usage>,
    show_stats: bool,
}

impl ReplyPrinter {
    pub fn new(show_stats: bool) -> Self {
        Self {
            show_stats,
            ..Self::default()
        }
    }

    pub fn handle(&mut self, event: &ChatEvent, out: &mut impl Write) -> io::Result<()> {
        match event {
            ChatEvent::SessionStart { .. } => {
                self.thinking_len = 0;
                self.content_len = 0;
                self.usage = None;
            }
            ChatEvent::MessageUpdate { message, .. } => {
                self.print_update(message, out)?;
            }
            ChatEvent::SessionEnd { outcome, .. } => {
                self.print_end(outcome, out)?;
            }
            _ => {}
        }
        out.flush()
    }

    fn print_update(&mut self, message: &Message, out: &mut impl Write) -> io::Result<()> {
        self.usage = message.usage.clone();
        if message.error {
            // Failure text is reported once the session ends
            return Ok(());
        }

        let thinking = message.thinking_text();
        if self.thinking_len == 0 && self.content_len > 0 && !thinking.is_empty() {
            // Text already shown as the answer turned out to be reasoning
            writeln!(out)?;
            write!(out, "[end of thinking]")?;
            self.thinking_len = self.content_len;
            self.content_len = 0;
        }
        let new_thinking = suffix_after_chars(thinking, self.thinking_len);
        if !new_thinking.is_empty() {
            if self.thinking_len == 0 {
                write!(out, "[thinking] ")?;
            }
            write!(out, "{}", new_thinking)?;
            self.thinking_len += new_thinking.chars().count();
        }

        let new_content = suffix_after_chars(&message.content, self.content_len);
        if !new_content.is_empty() {
            if self.content_len == 0 && self.thinking_len > 0 {
                writeln!(out)?;
                writeln!(out)?;
            }
            write!(out, "{}", new_content)?;
            self.content_len += new_content.chars().count();
        }
        Ok(())
    }

    fn print_end(&mut self, outcome: &SendOutcome, out: &mut impl Write) -> io::Result<()> {
        if self.thinking_len > 0 || self.content_len > 0 {
            writeln!(out)?;
        }
        match outcome {
            SendOutcome::Completed => {
                if let Some(usage) = self.usage.as_ref().filter(|_| self.show_stats) {
                    writeln!(out, "{}", format_usage(usage))?;
                }
            }
            SendOutcome::Cancelled => writeln!(out, "[stopped]")?,
            SendOutcome::Failed { message } => writeln!(out, "Error: {}", message)?,
            SendOutcome::Rejected { reason } => writeln!(out, "{}", reject_text(*reason))?,
        }
        Ok(())
    }
}

/// One-line token and timing summary
pub fn format_usage(usage: &Usage) -> String {
    let mut line = format!(
        "[{} in, {} out",
        usage.prompt_tokens, usage.completion_tokens
    );
    if let Some(perf) = &usage.perf {
        if let Some(ttft) = perf.ttft_ms {
            line.push_str(&format!(" | first token {}ms", ttft));
        }
        if let Some(generation) = perf.generation_ms {
            line.push_str(&format!(" | {}ms", generation));
        }
    }
    line.push(']');
    line
}

/// Message shown when a send is refused
pub fn reject_text(reason: RejectReason) -> &'static str {
    match reason {
        RejectReason::EmptyInput => "Nothing to send.",
        RejectReason::Busy => "Still generating; press Ctrl-C to stop.",
        RejectReason::Disabled => "The model is not ready yet.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medchat_ai::Perf;

    fn update(thinking: &str, content: &str) -> ChatEvent {
        let mut message = Message::assistant(content);
        if !thinking.is_empty() {
            message.thinking = Some(thinking.to_string());
        }
        ChatEvent::MessageUpdate {
            session_id: Default::default(),
            message,
        }
    }

    fn end(outcome: SendOutcome) -> ChatEvent {
        ChatEvent::SessionEnd {
            session_id: Default::default(),
            outcome,
        }
    }

    fn render(printer: &mut ReplyPrinter, events: &[ChatEvent]) -> String {
        let mut out = Vec::new();
        for event in events {
            printer.handle(event, &mut out).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_prints_only_new_text() {
        let mut printer = ReplyPrinter::new(false);
        let text = render(
            &mut printer,
            &[
                ChatEvent::SessionStart {
                    session_id: Default::default(),
                },
                update("", "Hel"),
                update("", "Hello wörld"),
                update("", "Hello wörld"),
                end(SendOutcome::Completed),
            ],
        );
        assert_eq!(text, "Hello wörld\n");
    }

    #[test]
    fn test_thinking_then_content() {
        let mut printer = ReplyPrinter::new(false);
        let text = render(
            &mut printer,
            &[update("Let me", ""), update("Let me think", "Answer"), end(SendOutcome::Completed)],
        );
        assert_eq!(text, "[thinking] Let me think\n\nAnswer\n");
    }

    #[test]
    fn test_streamed_text_reclassified_as_thinking() {
        let mut printer = ReplyPrinter::new(false);
        let text = render(
            &mut printer,
            &[
                update("", "reasoning..."),
                update("reasoning...", ""),
                update("reasoning...", "Answer"),
                end(SendOutcome::Completed),
            ],
        );
        assert_eq!(text, "reasoning...\n[end of thinking]\n\nAnswer\n");
    }

    #[test]
    fn test_failure_and_stop() {
        let mut printer = ReplyPrinter::new(false);
        let failed = Message::assistant_error("Model not loaded");
        let text = render(
            &mut printer,
            &[
                ChatEvent::MessageUpdate {
                    session_id: Default::default(),
                    message: failed,
                },
                end(SendOutcome::Failed {
                    message: "Model not loaded".into(),
                }),
            ],
        );
        assert_eq!(text, "Error: Model not loaded\n");

        let mut printer = ReplyPrinter::new(false);
        let text = render(&mut printer, &[update("", "partial"), end(SendOutcome::Cancelled)]);
        assert_eq!(text, "partial\n[stopped]\n");
    }

    #[test]
    fn test_usage_line() {
        let usage = Usage {
            prompt_tokens: 12,
            completion_tokens: 3,
            perf: Some(Perf {
                queue_ms: None,
                ttft_ms: Some(40),
                generation_ms: Some(250),
            }),
        };
        assert_eq!(format_usage(&usage), "[12 in, 3 out | first token 40ms | 250ms]");

        let mut printer = ReplyPrinter::new(true);
        let mut message = Message::assistant("ok");
        message.usage = Some(usage);
        let text = render(
            &mut printer,
            &[
                ChatEvent::MessageUpdate {
                    session_id: Default::default(),
                    message,
                },
                end(SendOutcome::Completed),
            ],
        );
        assert!(text.ends_with("ok\n[12 in, 3 out | first token 40ms | 250ms]\n"));
    }
}
