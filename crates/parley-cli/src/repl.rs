//! Interactive chat loop

use std::io::Write;
use std::sync::Arc;

use parley_protocol::{ConversationSummary, Message, Role};
use parley_session::{Session, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::commands::{ReplCommand, help_message, parse_command};

/// Run the REPL until `/quit` or end of input
pub async fn run(session: Arc<Session>) -> anyhow::Result<()> {
    let mut events = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Type a message, or /help for commands.");
    prompt();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Some(ReplCommand::Quit) => break,
            Some(ReplCommand::Say(text)) => send(&session, &mut events, &text).await,
            Some(command) => run_command(&session, command).await,
            None if line.trim().is_empty() => {}
            None => send(&session, &mut events, &line).await,
        }
        drain(&mut events);
        prompt();
    }
    Ok(())
}

async fn send(session: &Session, events: &mut broadcast::Receiver<SessionEvent>, text: &str) {
    let send = session.send(text);
    tokio::pin!(send);

    let outcome = loop {
        tokio::select! {
            outcome = &mut send => break outcome,
            Ok(event) = events.recv() => render(&event),
            _ = tokio::signal::ctrl_c() => session.cancel(),
        }
    };
    drain(events);
    tracing::debug!("Send finished: {:?}", outcome);
}

async fn run_command(session: &Session, command: ReplCommand) {
    match command {
        ReplCommand::New => {
            session.new_conversation();
            println!("Started a new conversation.");
        }
        ReplCommand::Load(id) => {
            if session.load_conversation(&id).await.is_ok() {
                print_transcript(&session.transcript());
            }
        }
        ReplCommand::List => {
            if let Ok(list) = session.refresh_conversations().await {
                print_conversations(&list);
            }
        }
        ReplCommand::Delete(id) => {
            if session.delete_conversation(&id).await.is_ok() {
                println!("Deleted {}", id);
            }
        }
        ReplCommand::Help => println!("{}", help_message()),
        ReplCommand::Invalid(message) => eprintln!("{}", message),
        ReplCommand::Say(_) | ReplCommand::Quit => {}
    }
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => render(&event),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                tracing::warn!("Missed {} session events", n);
            }
            Err(_) => break,
        }
    }
}

fn render(event: &SessionEvent) {
    match event {
        SessionEvent::Delta { content } => {
            print!("{}", content);
            let _ = std::io::stdout().flush();
        }
        SessionEvent::CycleCompleted { .. } => println!(),
        SessionEvent::CycleFailed { content } => println!("\n! {}", content),
        SessionEvent::CycleCancelled => println!("\n[cancelled]"),
        SessionEvent::ConversationBound { id, is_new: true } => {
            eprintln!("[new conversation {}]", id);
        }
        SessionEvent::TitleUpdated { title, .. } => eprintln!("[title: {}]", title),
        _ => {}
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Print a transcript, one message per block
pub fn print_transcript(messages: &[Message]) {
    for message in messages {
        let label = match message.role {
            Role::User => "you",
            Role::Model => "model",
            Role::Error => "error",
        };
        println!("[{}] {}\n", label, message.content);
    }
}

/// Print the conversation list
pub fn print_conversations(list: &[ConversationSummary]) {
    if list.is_empty() {
        println!("No conversations yet.");
        return;
    }
    for conversation in list {
        println!("{}  {}", conversation.id, conversation.display_title());
    }
}
