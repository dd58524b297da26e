//! parley - terminal client for streaming chat servers

mod commands;
mod config;
mod repl;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use parley_protocol::{HttpChatClient, decode_str};
use parley_session::{JsonFileStickyErrors, NotificationCenter, Session, SessionConfig};
use tokio::sync::broadcast;

/// parley - chat with a streaming conversation server
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server base URL (overrides the config file)
    #[arg(short, long)]
    server: Option<String>,

    /// Bearer token (overrides PARLEY_TOKEN and the config file)
    #[arg(short, long)]
    token: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat (the default)
    Chat {
        /// Resume an existing conversation
        #[arg(short, long)]
        conversation: Option<String>,
    },
    /// List conversations
    List,
    /// Print a conversation transcript
    Show { id: String },
    /// Delete a conversation
    Delete { id: String },
    /// Decode a captured event stream and print one JSON event per line
    Decode { file: String },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("parley_cli=debug,parley_session=debug,parley_protocol=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_session(
    args: &Args,
    config: &config::Config,
    notifications: Arc<NotificationCenter>,
) -> anyhow::Result<Session> {
    let server = args.server.as_deref().unwrap_or(&config.server_url);
    let mut client = HttpChatClient::new(server)?;
    if let Some(token) = args.token.clone().or_else(|| config.token()) {
        client = client.with_token(token);
    }

    let sticky = JsonFileStickyErrors::new(config.sticky_dir());
    tracing::debug!("Sticky errors at {}", sticky.path().display());

    Ok(Session::new(Arc::new(client), Arc::new(sticky), notifications).with_config(
        SessionConfig {
            notification_ms: config.notification_ms,
        },
    ))
}

/// Print notifications to stderr as they are raised
fn spawn_notification_printer(center: &NotificationCenter) {
    let mut rx = center.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notification) => eprintln!("[{:?}] {}", notification.severity, notification.message),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn load(session: &Session, id: &str) -> anyhow::Result<()> {
    match session.load_conversation(id).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => anyhow::bail!("No conversation with id {}", id),
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.init_config {
        let path = config::Config::init().context("creating config file")?;
        println!("Config file at: {}", path.display());
        println!("\nExample config:\n{}", config::example_config());
        return Ok(());
    }

    // Decoding a capture needs no server
    if let Some(Command::Decode { file }) = &args.command {
        let bytes = std::fs::read(file).with_context(|| format!("reading {}", file))?;
        for event in decode_str(&String::from_utf8_lossy(&bytes)) {
            println!("{}", serde_json::to_string(&event)?);
        }
        return Ok(());
    }

    let config = config::Config::load();
    let notifications = Arc::new(NotificationCenter::new());
    let session = Arc::new(build_session(&args, &config, notifications.clone())?);

    match args.command {
        None => {
            spawn_notification_printer(&notifications);
            repl::run(session).await
        }
        Some(Command::Chat { conversation }) => {
            spawn_notification_printer(&notifications);
            if let Some(id) = conversation {
                load(&session, &id).await?;
                repl::print_transcript(&session.transcript());
            }
            repl::run(session).await
        }
        Some(Command::List) => {
            let list = session.refresh_conversations().await?;
            repl::print_conversations(&list);
            Ok(())
        }
        Some(Command::Show { id }) => {
            load(&session, &id).await?;
            repl::print_transcript(&session.transcript());
            Ok(())
        }
        Some(Command::Delete { id }) => {
            session.delete_conversation(&id).await?;
            println!("Deleted {}", id);
            Ok(())
        }
        Some(Command::Decode { .. }) => Ok(()),
    }
}
