//! medchat - terminal client for a multimodal medical chat backend

mod commands;
mod config;
mod health;
mod images;
mod render;
mod utils;

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use clap::Parser;
use medchat_agent::{ChatConfig, ChatController, HttpTransport, ReasoningMode, SendOutcome};
use medchat_ai::{ChatClient, ClientConfig, EncodedImage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::broadcast::error::TryRecvError;
use tracing_subscriber::EnvFilter;

use crate::commands::CommandResult;
use crate::render::ReplyPrinter;

/// medchat - chat with a medical vision-language model
#[derive(Parser, Debug)]
#[command(name = "medchat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend URL (default: http://localhost:8500)
    #[arg(short, long)]
    url: Option<String>,

    /// Maximum tokens per reply
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Reasoning phase handling (auto, always, never)
    #[arg(short, long)]
    reasoning: Option<String>,

    /// Send a single message and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Attach an image (repeatable)
    #[arg(short, long = "image")]
    images: Vec<String>,

    /// Do not poll backend health; always allow sending
    #[arg(long)]
    no_health: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

fn parse_reasoning_mode(s: &str) -> Option<ReasoningMode> {
    match s.to_lowercase().as_str() {
        "auto" => Some(ReasoningMode::Auto),
        "always" | "on" | "true" => Some(ReasoningMode::Always),
        "never" | "off" | "false" => Some(ReasoningMode::Never),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they never mix with streamed replies
    let filter = if args.verbose {
        EnvFilter::new("medchat=debug,medchat_ai=debug,medchat_agent=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    let client = ChatClient::new(ClientConfig {
        base_url: args
            .url
            .clone()
            .or_else(|| cfg.base_url.clone())
            .unwrap_or_else(|| medchat_ai::client::DEFAULT_BASE_URL.to_string()),
        request_timeout: cfg.request_timeout(),
    })?;

    let defaults = ChatConfig::default();
    let chat_config = ChatConfig {
        max_tokens: args.max_tokens.or(cfg.max_tokens).unwrap_or(defaults.max_tokens),
        temperature: args
            .temperature
            .or(cfg.temperature)
            .unwrap_or(defaults.temperature),
        reasoning: match args.reasoning.as_deref().or(cfg.reasoning.as_deref()) {
            Some(s) => parse_reasoning_mode(s)
                .ok_or_else(|| anyhow::anyhow!("unknown reasoning mode: {}", s))?,
            None => defaults.reasoning,
        },
    };
    tracing::debug!(base_url = client.base_url(), ?chat_config, "starting");

    let transport = HttpTransport::with_client(client.clone());
    let controller = Arc::new(ChatController::new(chat_config, Arc::new(transport)));

    let mut attached = Vec::with_capacity(args.images.len());
    for path in &args.images {
        attached.push(images::load_image(path).await?);
    }

    // Non-interactive mode
    if let Some(command) = args.command {
        if !args.no_health {
            health::check_once(&client, &controller).await;
        }
        let mut printer = ReplyPrinter::new(io::stderr().is_terminal());
        let outcome = run_turn(&controller, &mut printer, &command, Some(attached)).await?;
        if !matches!(outcome, SendOutcome::Completed | SendOutcome::Cancelled) {
            std::process::exit(1);
        }
        return Ok(());
    }

    for image in attached {
        controller.stage_image(image);
    }

    let poller = (!args.no_health)
        .then(|| health::spawn_poller(client.clone(), controller.clone(), cfg.health_interval()));

    let result = run_interactive(&controller, client.base_url()).await;

    if let Some(poller) = poller {
        poller.abort();
    }
    result
}

/// Send one message and print the reply as it streams.
///
/// Ctrl-C while the reply is streaming stops the generation.
async fn run_turn(
    controller: &ChatController,
    printer: &mut ReplyPrinter,
    text: &str,
    images: Option<Vec<EncodedImage>>,
) -> anyhow::Result<SendOutcome> {
    let mut events = controller.subscribe();

    let send = async {
        match images {
            Some(images) if !images.is_empty() => controller.send_with_images(text, images).await,
            _ => controller.send(text).await,
        }
    };
    tokio::pin!(send);

    let outcome = loop {
        tokio::select! {
            outcome = &mut send => break outcome,
            _ = tokio::signal::ctrl_c() => {
                if let Some(session_id) = controller.handle().session_id() {
                    tracing::debug!(%session_id, "interrupt");
                }
                controller.stop();
            }
            event = events.recv() => match event {
                Ok(event) => printer.handle(&event, &mut io::stdout().lock())?,
                Err(e) => tracing::warn!("event stream: {}", e),
            }
        }
    };

    // Every event of the send was published before it returned
    loop {
        match events.try_recv() {
            Ok(event) => {
                printer.handle(&event, &mut io::stdout().lock())?;
                if event.is_terminal() {
                    break;
                }
            }
            Err(TryRecvError::Lagged(n)) => tracing::warn!("missed {} events", n),
            Err(_) => break,
        }
    }

    if let SendOutcome::Rejected { reason } = &outcome {
        println!("{}", render::reject_text(*reason));
    }
    Ok(outcome)
}

/// Next input line, or `None` on EOF or when `interrupt` fires first
async fn next_input<R>(
    lines: &mut Lines<R>,
    interrupt: impl std::future::Future<Output = ()>,
) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => Ok(None),
    }
}

async fn run_interactive(controller: &ChatController, base_url: &str) -> anyhow::Result<()> {
    if io::stderr().is_terminal() {
        let config = controller.config();
        eprintln!(
            "medchat ({}) max_tokens: {}, temperature: {}, reasoning: {:?}",
            base_url, config.max_tokens, config.temperature, config.reasoning
        );
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    let mut printer = ReplyPrinter::new(io::stderr().is_terminal());
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        let staged = controller.staged_images().len();
        if staged > 0 {
            print!("[{} image(s)] > ", staged);
        } else {
            print!("> ");
        }
        io::stdout().flush()?;

        // Ctrl-C only stops generation while a reply streams; at the prompt it exits
        let interrupt = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        let Some(line) = next_input(&mut lines, interrupt).await? else {
            println!();
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(result) = commands::execute_command(input, controller) {
            match result {
                CommandResult::Clear => {
                    if controller.clear() {
                        println!("Cleared conversation.");
                    } else {
                        println!("Cannot clear while a reply is streaming.");
                    }
                }
                CommandResult::StageImage(path) => match images::load_image(&path).await {
                    Ok(image) => {
                        let kb = image.byte_len() / 1024;
                        controller.stage_image(image);
                        println!("Attached {} (~{} KB)", path, kb);
                    }
                    Err(e) => println!("Failed to attach image: {:#}", e),
                },
                CommandResult::Message(msg) => {
                    println!("{}", msg);
                }
                CommandResult::Exit => {
                    break;
                }
                CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            println!();
            continue;
        }

        println!();
        run_turn(controller, &mut printer, input, None).await?;
        println!();
    }

    Ok(())
}
