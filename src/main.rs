//! chatline - chat demo with a simulated automated reply
//!
//! A terminal front end over a conversation state machine: type a message,
//! attach an image, get a canned reply two seconds later, export any
//! message as an HTML document.

mod attachment;
mod config;
mod export;
mod navigation;
mod reply;
mod runtime;
mod state_machine;

use attachment::PathImagePicker;
use config::SessionConfig;
use export::FileExporter;
use navigation::{Navigator, Screen, MENU_ENTRIES};
use reply::{CannedReplies, LoggingReplySource};
use runtime::{spawn_session, Outcome, SendOutcome, SessionEvent, SessionHandle};
use state_machine::{Message, Origin, SessionContext, MAX_CHARACTERS};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

type InputLines = Lines<BufReader<Stdin>>;

/// How the user left a screen
enum ScreenExit {
    Back,
    Quit,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SessionConfig::from_env()?;
    init_logging(config.log_json);

    tracing::info!(
        policy = ?config.send_policy,
        export_dir = %config.export_dir.display(),
        "Starting chatline"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut navigator = Navigator::new();

    loop {
        match navigator.current() {
            Screen::Menu => {
                print_menu();
                let Some(line) = lines.next_line().await? else {
                    break;
                };
                let choice = line.trim();
                if matches!(choice, "q" | "quit" | "/quit") {
                    break;
                }
                match choice.parse::<usize>().ok().and_then(|n| navigator.select(n)) {
                    Some(screen) => tracing::debug!(screen = screen.title(), "Opened screen"),
                    None => println!("Pick a number from the menu, or q to quit."),
                }
            }
            Screen::Conversation => match run_conversation(&config, &mut lines).await? {
                ScreenExit::Back => {
                    navigator.back();
                }
                ScreenExit::Quit => break,
            },
        }
    }

    tracing::info!("Goodbye");
    Ok(())
}

/// Logs go to stderr so they do not interleave with the conversation
fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chatline=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_menu() {
    println!();
    println!("== {} ==", Screen::Menu.title());
    for (i, entry) in MENU_ENTRIES.iter().enumerate() {
        println!("  {}. {}  >", i + 1, entry.label);
    }
    println!("  q. Quit");
}

/// Shown until the first message is sent
fn print_welcome() {
    println!("Welcome! Ask anything to get started.");
    println!("Replies are simulated and arrive after a short pause.");
}

fn print_conversation_help() {
    println!("Type a message and press enter to send it.");
    println!("  /attach <path-or-uri>  attach an image (replaces any previous one)");
    println!("  /detach                remove the attachment");
    println!("  /reveal <n>            show or hide actions on message n");
    println!("  /export <n>            export message n as a document");
    println!("  /back                  return to the menu");
    println!("  /quit                  leave the app");
}

/// One visit to the conversation screen; every visit starts a new session
async fn run_conversation(
    config: &SessionConfig,
    lines: &mut InputLines,
) -> Result<ScreenExit, Box<dyn std::error::Error>> {
    let context = SessionContext::new(Uuid::new_v4().to_string(), config.send_policy);
    let replies = LoggingReplySource::new(Arc::new(CannedReplies::new()));
    let exporter = Arc::new(FileExporter::new(config.export_dir.clone()));
    let session = spawn_session(context, replies, exporter);

    println!();
    println!("== {} ==", Screen::Conversation.title());
    print_welcome();
    print_conversation_help();

    let renderer = tokio::spawn(render_events(session.subscribe()));
    let exit = conversation_loop(&session, lines).await;
    renderer.abort();
    exit
}

async fn conversation_loop(
    session: &SessionHandle,
    lines: &mut InputLines,
) -> Result<ScreenExit, Box<dyn std::error::Error>> {
    while let Some(line) = lines.next_line().await? {
        let input = line.trim_end();
        let (command, argument) = match input.split_once(' ') {
            Some((command, argument)) => (command, argument.trim()),
            None => (input, ""),
        };

        match command {
            "/back" => return Ok(ScreenExit::Back),
            "/quit" => return Ok(ScreenExit::Quit),
            "/help" => {
                if !session.snapshot().has_started() {
                    print_welcome();
                }
                print_conversation_help();
            }
            "/attach" => {
                let cwd = std::env::current_dir()?;
                let picker = PathImagePicker::new(argument, cwd);
                match session.pick_and_attach(&picker).await? {
                    Outcome::Applied => {
                        if let Some(attachment) = session.snapshot().draft().attachment.clone() {
                            println!("Attached {}", attachment.location);
                        }
                    }
                    Outcome::Unchanged => println!("No new image attached."),
                    Outcome::Ignored(reason) => println!("Not attached: {reason}"),
                }
            }
            "/detach" => match session.clear_attachment().await? {
                Outcome::Applied => println!("Attachment removed."),
                Outcome::Unchanged => println!("Nothing is attached."),
                Outcome::Ignored(reason) => println!("Not removed: {reason}"),
            },
            "/reveal" => match message_at(session, argument) {
                Some(id) => match session.toggle_reveal_actions(id).await? {
                    Outcome::Applied | Outcome::Unchanged => {}
                    Outcome::Ignored(reason) => println!("Cannot reveal: {reason}"),
                },
                None => println!("No message {argument}."),
            },
            "/export" => match message_at(session, argument) {
                Some(id) => match session.export_message(id).await {
                    Some(path) => println!("Saved {}", path.display()),
                    None => println!("Export failed."),
                },
                None => println!("No message {argument}."),
            },
            _ if command.starts_with('/') => {
                println!("Unknown command {command}. Try /help.");
            }
            _ => {
                session.update_draft_text(input).await?;
                let draft_len = session.snapshot().draft().char_count();
                if input.chars().count() > MAX_CHARACTERS {
                    println!("({draft_len}/{MAX_CHARACTERS}, the rest was cut off)");
                } else {
                    println!("({draft_len}/{MAX_CHARACTERS})");
                }
                if let SendOutcome::Ignored(reason) = session.send().await? {
                    tracing::debug!(%reason, "Send ignored");
                }
            }
        }
    }

    Ok(ScreenExit::Quit)
}

/// Resolve a 1-based message number typed by the user
fn message_at(session: &SessionHandle, argument: &str) -> Option<Uuid> {
    let index = argument.parse::<usize>().ok()?.checked_sub(1)?;
    session.snapshot().messages().get(index).map(|m| m.id)
}

/// Print session events as they arrive
async fn render_events(mut events: broadcast::Receiver<SessionEvent>) {
    let mut numbers: HashMap<Uuid, usize> = HashMap::new();
    let mut awaiting = false;

    loop {
        match events.recv().await {
            Ok(SessionEvent::MessageAppended { message }) => {
                let number = numbers.len() + 1;
                numbers.insert(message.id, number);
                println!("[{number}] {}", describe(&message));
            }
            Ok(SessionEvent::MessageUpdated { message }) => {
                let number = numbers.get(&message.id).copied().unwrap_or_default();
                if message.export_action_visible() {
                    println!("[{number}] actions: /export {number}");
                } else if message.reveal_actions {
                    println!("[{number}] no actions for your own messages");
                } else {
                    println!("[{number}] actions hidden");
                }
            }
            Ok(SessionEvent::StateChanged {
                awaiting_reply,
                draft,
                ..
            }) => {
                if awaiting_reply && !awaiting {
                    println!("Loading...");
                }
                awaiting = awaiting_reply;
                if let Some(attachment) = &draft.attachment {
                    tracing::debug!(location = %attachment.location, "Draft attachment");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn describe(message: &Message) -> String {
    let who = match message.origin {
        Origin::User => "You",
        Origin::System => "Bot",
    };
    let mut parts = Vec::new();
    if let Some(text) = &message.text {
        parts.push(text.clone());
    }
    if let Some(attachment) = &message.attachment {
        parts.push(format!("[image: {}]", attachment.location));
    }
    format!("{who}: {}", parts.join(" "))
}
