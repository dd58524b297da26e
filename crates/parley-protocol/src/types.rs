//! Core wire types shared by client and server

use serde::{Deserialize, Serialize};

/// Title the server reports for a conversation that has not been titled yet
pub const DEFAULT_TITLE: &str = "New Chat";

/// Longest title kept verbatim by [`derive_title`]
const MAX_TITLE_CHARS: usize = 50;

/// Author of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "assistant")]
    Model,
    /// Synthetic, client-only entry representing a failed turn
    Error,
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: Role::Error,
            content: content.into(),
        }
    }
}

/// Entry in the conversation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl ConversationSummary {
    pub fn new(id: impl Into<String>, title: Option<String>) -> Self {
        Self {
            id: id.into(),
            title,
        }
    }

    /// Title to show, falling back to the server default
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }
}

/// A conversation with its persisted message history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Body of a send-cycle request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, conversation_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id,
        }
    }
}

/// Derive a conversation title from its first user message.
///
/// Whitespace is trimmed and newlines collapse to spaces. Titles longer
/// than 50 characters are cut to 47 and suffixed with `...`.
pub fn derive_title(first_message: &str) -> String {
    let mut title = first_message.trim().to_string();
    if title.chars().count() > MAX_TITLE_CHARS {
        title = title.chars().take(MAX_TITLE_CHARS - 3).collect::<String>() + "...";
    }
    let title = title.replace('\n', " ").trim().to_string();
    if title.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_accepts_assistant_alias() {
        let msg: Message =
            serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert_eq!(msg.role, Role::Model);
        assert_eq!(serde_json::to_string(&msg.role).unwrap(), "\"model\"");
    }

    #[test]
    fn test_conversation_detail_missing_fields() {
        let detail: ConversationDetail = serde_json::from_str(r#"{"id":"c1"}"#).unwrap();
        assert_eq!(detail.title, None);
        assert!(detail.messages.is_empty());
    }

    #[test]
    fn test_chat_request_serializes_null_id() {
        let body = serde_json::to_value(ChatRequest::new("hello", None)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"message": "hello", "conversation_id": null})
        );
    }

    #[test]
    fn test_derive_title_short() {
        assert_eq!(derive_title("  What is Rust?\n"), "What is Rust?");
    }

    #[test]
    fn test_derive_title_truncates() {
        let long = "a".repeat(60);
        let title = derive_title(&long);
        assert_eq!(title.chars().count(), 50);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_derive_title_collapses_newlines() {
        assert_eq!(derive_title("line one\nline two"), "line one line two");
    }

    #[test]
    fn test_derive_title_empty() {
        assert_eq!(derive_title("   "), DEFAULT_TITLE);
    }

    #[test]
    fn test_display_title_fallback() {
        assert_eq!(ConversationSummary::new("c1", None).display_title(), "New Chat");
    }
}
