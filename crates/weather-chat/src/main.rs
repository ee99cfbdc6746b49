//! A terminal chat client for a Mastra weather agent.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::{select, signal};
use weather_chat::core::{
    FailureKind, SessionController, SessionControllerBuilder, SessionHandle,
    SessionStatus, SubmitError,
};
use weather_chat::render::{DeltaPrinter, format_time};
use weather_chat::{SUGGESTED_QUERIES, pick_suggestion};
use weather_chat_mastra::{MastraConfigBuilder, MastraTransport};

const BAR_CHAR: &str = "▎";
const REJECTED_NOTICE: &str = "Failed to send message. Please try again.";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(endpoint) = env::var("WEATHER_AGENT_URL") else {
        eprintln!("WEATHER_AGENT_URL environment variable is not set");
        return;
    };

    let mut config = MastraConfigBuilder::with_endpoint(endpoint);
    if let Ok(api_key) = env::var("WEATHER_AGENT_API_KEY") {
        config = config.with_api_key(api_key);
    }
    let transport = MastraTransport::new(config.build());

    let mut builder = SessionControllerBuilder::with_transport(transport);
    if let Ok(thread_id) = env::var("WEATHER_AGENT_THREAD_ID") {
        builder = builder.with_thread_id(thread_id);
    }
    let mut controller = builder.build();
    info!("using thread {}", controller.thread_id());

    let mut lines = io::BufReader::new(io::stdin()).lines();

    loop {
        if controller.store().is_empty() {
            print_suggestions();
        }
        print!("> ");
        std::io::stdout().flush().ok();

        let line = select! {
            line = lines.next_line() => line,
            _ = signal::ctrl_c() => break,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!("error reading input: {}", err);
                break;
            }
        };

        let text = match line.trim() {
            "/quit" => break,
            "/clear" => {
                controller.clear_conversation();
                println!("{}", "Conversation cleared.".dimmed());
                continue;
            }
            text if controller.store().is_empty() => {
                pick_suggestion(text).unwrap_or(text)
            }
            text => text,
        };

        let handle = match controller.submit(text) {
            Ok(handle) => handle,
            Err(SubmitError::EmptyInput) => continue,
            Err(err) => {
                eprintln!("{}", err.red());
                continue;
            }
        };
        stream_reply(&controller, &handle).await;
    }
}

fn print_suggestions() {
    println!("{}", "Try asking:".bright_white().bold());
    for (i, query) in SUGGESTED_QUERIES.iter().enumerate() {
        println!("  {} {}", format!("{}.", i + 1).dimmed(), query);
    }
}

fn new_spinner() -> ProgressBar {
    let style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(style);
    spinner.set_message("🌤  Checking the skies...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Prints the reply of `handle` as it streams in, until the session ends.
/// Ctrl-C cancels the reply.
async fn stream_reply<T>(
    controller: &SessionController<T>,
    handle: &SessionHandle,
) {
    let mut messages = controller.store().subscribe();
    let mut printer = DeltaPrinter::new();
    let mut spinner = Some(new_spinner());

    loop {
        // Print whatever arrived since the last wake-up. The store is read
        // through `get` so no borrow is held across `cancel`.
        let message = controller
            .store()
            .get(handle.message_id())
            .filter(|message| !message.is_error());
        if let Some(message) = message {
            let delta = printer.advance(message.content());
            if !delta.is_empty() {
                if let Some(spinner) = spinner.take() {
                    spinner.finish_and_clear();
                    print!(
                        "{}{} 🤖 ",
                        BAR_CHAR.bright_cyan(),
                        format_time(&message).dimmed()
                    );
                }
                print!("{}", delta.bright_white());
                std::io::stdout().flush().ok();
            }
        }
        if handle.is_terminal() {
            break;
        }

        select! {
            biased;
            _ = signal::ctrl_c() => {
                handle.cancel();
            }
            changed = messages.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = handle.finished() => {}
        }
    }

    if let Some(spinner) = spinner.take() {
        spinner.finish_and_clear();
    }

    let status = handle.status();
    debug!("session {} ended: {}", handle.message_id(), status);
    match status {
        SessionStatus::Completed => println!(),
        SessionStatus::Cancelled => {
            if printer.has_printed() {
                println!();
            }
            println!("{}", "(cancelled)".dimmed());
        }
        SessionStatus::Failed(kind) => {
            if printer.has_printed() {
                println!();
            }
            let error_message = controller
                .store()
                .get(handle.message_id())
                .filter(|message| message.is_error());
            match error_message {
                Some(message) => {
                    println!(
                        "{}{} {}",
                        BAR_CHAR.red(),
                        format_time(&message).dimmed(),
                        message.content().red()
                    );
                }
                None => println!("{}", "(the reply was cut short)".red()),
            }
            if kind == FailureKind::TransportRejected {
                eprintln!("{}", REJECTED_NOTICE.yellow());
            }
        }
        SessionStatus::Opening | SessionStatus::Streaming => {}
    }
}
