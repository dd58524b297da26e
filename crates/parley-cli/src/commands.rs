//! Slash commands for interactive mode

/// A parsed slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Start a new conversation
    New,
    /// Switch to an existing conversation
    Load(String),
    /// Show the conversation list
    List,
    /// Delete a conversation
    Delete(String),
    /// Show help
    Help,
    /// Exit the application
    Quit,
    /// Chat text escaped with a leading `//`; carries the text with one slash
    Say(String),
    /// Missing argument or unknown command; carries the message to show
    Invalid(String),
}

/// Parse a slash command. Returns `None` for plain chat input.
pub fn parse_command(input: &str) -> Option<ReplCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;
    if rest.starts_with('/') {
        return Some(ReplCommand::Say(rest.to_string()));
    }

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next().unwrap_or("").to_lowercase();
    let arg = parts.next().map(str::trim).unwrap_or("");

    let with_id = |make: fn(String) -> ReplCommand| {
        if arg.is_empty() {
            ReplCommand::Invalid(format!("/{} needs a conversation id", command))
        } else {
            make(arg.to_string())
        }
    };

    Some(match command.as_str() {
        "new" | "n" => ReplCommand::New,
        "load" | "open" => with_id(ReplCommand::Load),
        "list" | "ls" => ReplCommand::List,
        "delete" | "rm" => with_id(ReplCommand::Delete),
        "help" | "h" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!(
            "Unknown command: /{} (start with // to send a message beginning with /)",
            other
        )),
    })
}

pub fn help_message() -> String {
    [
        "Commands:",
        "  /new          start a new conversation",
        "  /load <id>    switch to a conversation",
        "  /list         list conversations",
        "  /delete <id>  delete a conversation",
        "  /quit         exit",
        "Anything else is sent as a message; use // to send one starting with /.",
        "Ctrl-C stops a streaming reply.",
    ]
    .join("\n")
}
