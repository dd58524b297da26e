//! Protocol events carried by a send-cycle response stream

use serde::{Deserialize, Serialize};

/// Events emitted by the server during one send-cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// Conversation the cycle belongs to; `is_new` when the server just minted it
    Conversation { conversation_id: String, is_new: bool },
    /// Chunk of model output
    Delta { content: String },
    /// Server-assigned title for the bound conversation
    Title { title: String },
    /// Cycle finished successfully
    Done,
    /// Producer failed mid-cycle
    Error { message: String },
}

/// Discriminant of a [`ProtocolEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Conversation,
    Delta,
    Title,
    Done,
    Error,
}

impl EventKind {
    /// Name written to the `event:` line of a record
    pub fn wire_name(&self) -> &'static str {
        match self {
            EventKind::Conversation => "session",
            EventKind::Delta => "delta",
            EventKind::Title => "title",
            EventKind::Done => "done",
            EventKind::Error => "error",
        }
    }

    /// Map an `event:` name to a kind. Both `session` and `conversation`
    /// name the conversation-binding event.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "session" | "conversation" => Some(EventKind::Conversation),
            "delta" => Some(EventKind::Delta),
            "title" => Some(EventKind::Title),
            "done" => Some(EventKind::Done),
            "error" => Some(EventKind::Error),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ConversationPayload {
    conversation_id: String,
    #[serde(default)]
    is_new: bool,
}

#[derive(Deserialize)]
struct DeltaPayload {
    content: String,
}

#[derive(Deserialize)]
struct TitlePayload {
    title: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    message: String,
}

impl ProtocolEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ProtocolEvent::Conversation { .. } => EventKind::Conversation,
            ProtocolEvent::Delta { .. } => EventKind::Delta,
            ProtocolEvent::Title { .. } => EventKind::Title,
            ProtocolEvent::Done => EventKind::Done,
            ProtocolEvent::Error { .. } => EventKind::Error,
        }
    }

    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProtocolEvent::Done | ProtocolEvent::Error { .. })
    }

    /// Decode a payload whose kind is known from the record's `event:` name.
    ///
    /// Returns `None` when the payload does not have that kind's shape.
    pub fn from_tagged(kind: EventKind, payload: serde_json::Value) -> Option<Self> {
        match kind {
            EventKind::Conversation => serde_json::from_value::<ConversationPayload>(payload)
                .ok()
                .map(|p| ProtocolEvent::Conversation {
                    conversation_id: p.conversation_id,
                    is_new: p.is_new,
                }),
            EventKind::Delta => serde_json::from_value::<DeltaPayload>(payload)
                .ok()
                .map(|p| ProtocolEvent::Delta { content: p.content }),
            EventKind::Title => serde_json::from_value::<TitlePayload>(payload)
                .ok()
                .map(|p| ProtocolEvent::Title { title: p.title }),
            EventKind::Done => payload.is_object().then_some(ProtocolEvent::Done),
            EventKind::Error => serde_json::from_value::<ErrorPayload>(payload)
                .ok()
                .map(|p| ProtocolEvent::Error { message: p.message }),
        }
    }

    /// JSON payload carried on the `data:` line
    pub fn payload(&self) -> serde_json::Value {
        match self {
            ProtocolEvent::Conversation {
                conversation_id,
                is_new,
            } => serde_json::json!({ "conversation_id": conversation_id, "is_new": is_new }),
            ProtocolEvent::Delta { content } => serde_json::json!({ "content": content }),
            ProtocolEvent::Title { title } => serde_json::json!({ "title": title }),
            ProtocolEvent::Done => serde_json::json!({}),
            ProtocolEvent::Error { message } => serde_json::json!({ "message": message }),
        }
    }

    /// Encode as one server-sent-events record
    pub fn to_sse(&self) -> String {
        format!(
            "event: {}\ndata: {}\n\n",
            self.kind().wire_name(),
            self.payload()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_sse_conversation() {
        let event = ProtocolEvent::Conversation {
            conversation_id: "c1".into(),
            is_new: true,
        };
        assert_eq!(
            event.to_sse(),
            "event: session\ndata: {\"conversation_id\":\"c1\",\"is_new\":true}\n\n"
        );
    }

    #[test]
    fn test_to_sse_done() {
        assert_eq!(ProtocolEvent::Done.to_sse(), "event: done\ndata: {}\n\n");
    }

    #[test]
    fn test_from_tagged_missing_is_new_defaults_false() {
        let event = ProtocolEvent::from_tagged(
            EventKind::Conversation,
            json!({"conversation_id": "c9"}),
        );
        assert_eq!(
            event,
            Some(ProtocolEvent::Conversation {
                conversation_id: "c9".into(),
                is_new: false
            })
        );
    }

    #[test]
    fn test_from_tagged_wrong_shape() {
        assert_eq!(
            ProtocolEvent::from_tagged(EventKind::Delta, json!({"title": "x"})),
            None
        );
        assert_eq!(ProtocolEvent::from_tagged(EventKind::Done, json!("x")), None);
    }

    #[test]
    fn test_wire_name_aliases() {
        assert_eq!(
            EventKind::from_wire_name("conversation"),
            Some(EventKind::Conversation)
        );
        assert_eq!(EventKind::from_wire_name("session"), Some(EventKind::Conversation));
        assert_eq!(EventKind::from_wire_name("message"), None);
    }

    #[test]
    fn test_terminal_events() {
        assert!(ProtocolEvent::Done.is_terminal());
        assert!(ProtocolEvent::Error { message: "x".into() }.is_terminal());
        assert!(!ProtocolEvent::Delta { content: "x".into() }.is_terminal());
    }
}
