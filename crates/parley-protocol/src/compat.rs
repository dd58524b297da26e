//! Shape-based event inference for records without a usable `event:` name.
//!
//! Older servers and some proxies drop the event name, leaving only the JSON
//! payload. The kind is then inferred from which fields are present, in this
//! order: `conversation_id`, `content`, `title`, `message`, and finally an
//! empty object meaning `done`. A field counts as present when the key exists
//! with a non-null value.

use serde_json::{Map, Value};

use crate::event::ProtocolEvent;

/// Infer an event from its payload shape alone
pub fn infer_event(payload: &Value) -> Option<ProtocolEvent> {
    let object = payload.as_object()?;

    if let Some(id) = field(object, "conversation_id") {
        let is_new = object
            .get("is_new")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        return Some(ProtocolEvent::Conversation {
            conversation_id: scalar_text(id)?,
            is_new,
        });
    }
    if let Some(content) = field(object, "content") {
        return Some(ProtocolEvent::Delta {
            content: scalar_text(content)?,
        });
    }
    if let Some(title) = field(object, "title") {
        return Some(ProtocolEvent::Title {
            title: scalar_text(title)?,
        });
    }
    if let Some(message) = field(object, "message") {
        return Some(ProtocolEvent::Error {
            message: scalar_text(message)?,
        });
    }
    if object.is_empty() {
        return Some(ProtocolEvent::Done);
    }
    None
}

fn field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|v| !v.is_null())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_conversation() {
        assert_eq!(
            infer_event(&json!({"conversation_id": "c1", "is_new": true})),
            Some(ProtocolEvent::Conversation {
                conversation_id: "c1".into(),
                is_new: true
            })
        );
    }

    #[test]
    fn test_conversation_id_takes_precedence() {
        let event = infer_event(&json!({"conversation_id": "c1", "content": "hi"}));
        assert!(matches!(event, Some(ProtocolEvent::Conversation { .. })));
    }

    #[test]
    fn test_content_before_title_and_message() {
        let event = infer_event(&json!({"content": "hi", "title": "t", "message": "m"}));
        assert_eq!(event, Some(ProtocolEvent::Delta { content: "hi".into() }));
    }

    #[test]
    fn test_title_before_message() {
        let event = infer_event(&json!({"title": "t", "message": "m"}));
        assert_eq!(event, Some(ProtocolEvent::Title { title: "t".into() }));
    }

    #[test]
    fn test_infer_error() {
        assert_eq!(
            infer_event(&json!({"message": "boom"})),
            Some(ProtocolEvent::Error { message: "boom".into() })
        );
    }

    #[test]
    fn test_empty_object_is_done() {
        assert_eq!(infer_event(&json!({})), Some(ProtocolEvent::Done));
    }

    #[test]
    fn test_null_field_is_absent() {
        assert_eq!(
            infer_event(&json!({"conversation_id": null, "content": "x"})),
            Some(ProtocolEvent::Delta { content: "x".into() })
        );
    }

    #[test]
    fn test_unknown_shape_dropped() {
        assert_eq!(infer_event(&json!({"usage": 12})), None);
        assert_eq!(infer_event(&json!([1, 2])), None);
        assert_eq!(infer_event(&json!({"content": {"nested": true}})), None);
    }
}
