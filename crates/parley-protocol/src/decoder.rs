//! Server-sent-events decoding and event classification.
//!
//! Line framing comes from `eventsource-stream`, which buffers partial lines
//! and split UTF-8 sequences across chunks. [`classify`] turns each record
//! into a typed [`ProtocolEvent`].

use std::convert::Infallible;
use std::pin::Pin;

use async_stream::stream;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::StreamExt;
use serde_json::Value;
use tokio_stream::Stream;

use crate::{
    compat,
    event::{EventKind, ProtocolEvent},
};

/// A stream of decoded protocol events
pub type ProtocolEventStream = Pin<Box<dyn Stream<Item = ProtocolEvent> + Send>>;

/// Appended to every body so a record cut off by end of stream is dispatched
const END_OF_STREAM: &[u8] = b"\n\n";

/// One raw record: optional `event:` name plus joined `data:` lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseRecord {
    pub event: Option<String>,
    pub data: String,
}

impl SseRecord {
    pub fn new(event: Option<&str>, data: impl Into<String>) -> Self {
        Self {
            event: event.map(str::to_string),
            data: data.into(),
        }
    }
}

impl From<Event> for SseRecord {
    fn from(event: Event) -> Self {
        // "message" is the type the parser assigns when no `event:` line was sent
        let name = (!event.event.is_empty() && event.event != "message").then_some(event.event);
        Self {
            event: name,
            data: event.data,
        }
    }
}

/// Turn a raw record into a typed event.
///
/// A known `event:` name whose payload has the matching shape decides the
/// kind. Unnamed records, and known names whose payload does not fit, go
/// through shape inference. Unknown names and unparseable payloads are
/// dropped with a warning.
pub fn classify(record: &SseRecord) -> Option<ProtocolEvent> {
    let named = match record.event.as_deref() {
        None => None,
        Some(name) => match EventKind::from_wire_name(name) {
            Some(kind) => Some(kind),
            None => {
                tracing::warn!("Dropping SSE record with unknown event name '{}'", name);
                return None;
            }
        },
    };
    let data = record.data.trim();

    let payload = if data.is_empty() {
        if named.is_none() {
            tracing::warn!("Dropping unnamed SSE record with empty payload");
            return None;
        }
        Value::Object(Default::default())
    } else {
        match serde_json::from_str::<Value>(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Dropping malformed SSE payload ({}): {}", e, data);
                return None;
            }
        }
    };

    if let Some(kind) = named {
        if let Some(event) = ProtocolEvent::from_tagged(kind, payload.clone()) {
            return Some(event);
        }
        tracing::debug!(
            "Payload does not match event name '{}', inferring from shape",
            kind.wire_name()
        );
    }

    let event = compat::infer_event(&payload);
    if event.is_none() {
        tracing::warn!("Dropping SSE payload of unknown shape: {}", data);
    }
    event
}

/// Decode a complete in-memory capture
pub fn decode_str(text: &str) -> Vec<ProtocolEvent> {
    let body = text.as_bytes().to_vec();
    let chunks = futures::stream::once(async move { Ok::<_, Infallible>(body) });
    futures::executor::block_on(decode_stream(chunks).collect())
}

/// Decode a byte stream into protocol events.
///
/// An error from the byte stream ends decoding with an [`ProtocolEvent::Error`]
/// carrying the error text.
pub fn decode_stream<S, B, E>(bytes: S) -> ProtocolEventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let bytes = bytes
        .map(|chunk| chunk.map(|b| b.as_ref().to_vec()))
        .chain(futures::stream::once(async {
            Ok::<_, E>(END_OF_STREAM.to_vec())
        }));

    Box::pin(stream! {
        let mut records = Box::pin(bytes.eventsource());

        while let Some(record) = records.next().await {
            match record {
                Ok(record) => {
                    if let Some(event) = classify(&record.into()) {
                        yield event;
                    }
                }
                Err(e) => {
                    let message = match e {
                        EventStreamError::Transport(e) => e.to_string(),
                        other => other.to_string(),
                    };
                    tracing::warn!("Response stream failed: {}", message);
                    yield ProtocolEvent::Error { message };
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&str]) -> Vec<std::result::Result<Vec<u8>, String>> {
        parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
    }

    async fn collect(parts: Vec<std::result::Result<Vec<u8>, String>>) -> Vec<ProtocolEvent> {
        decode_stream(futures::stream::iter(parts)).collect().await
    }

    #[test]
    fn test_crlf_and_comments() {
        let events = decode_str(": keepalive\r\nevent: done\r\ndata: {}\r\n\r\n");
        assert_eq!(events, vec![ProtocolEvent::Done]);
    }

    #[test]
    fn test_bare_cr_line_endings() {
        let events = decode_str("event: delta\rdata: {\"content\":\"a\"}\r\revent: done\rdata: {}\r\r");
        assert_eq!(
            events,
            vec![ProtocolEvent::Delta { content: "a".into() }, ProtocolEvent::Done]
        );
    }

    #[test]
    fn test_multiline_data_joined() {
        let events = decode_str("data: {\"content\":\ndata: \"x\"}\n\n");
        assert_eq!(events, vec![ProtocolEvent::Delta { content: "x".into() }]);
    }

    #[test]
    fn test_unterminated_record_flushed() {
        let events = decode_str("event: done\ndata: {}");
        assert_eq!(events, vec![ProtocolEvent::Done]);
    }

    #[test]
    fn test_unnamed_record_is_not_message_kind() {
        let record: SseRecord = Event {
            event: "message".into(),
            data: "{}".into(),
            id: String::new(),
            retry: None,
        }
        .into();
        assert_eq!(record.event, None);
    }

    #[test]
    fn test_classify_named_wins_over_shape() {
        let record = SseRecord::new(Some("title"), r#"{"title":"Rust","content":"ignored"}"#);
        assert_eq!(classify(&record), Some(ProtocolEvent::Title { title: "Rust".into() }));
    }

    #[test]
    fn test_classify_unnamed_uses_shape() {
        let record = SseRecord::new(None, r#"{"message":"boom"}"#);
        assert_eq!(classify(&record), Some(ProtocolEvent::Error { message: "boom".into() }));
    }

    #[test]
    fn test_classify_named_mismatch_falls_back() {
        let record = SseRecord::new(Some("delta"), r#"{"title":"Rust"}"#);
        assert_eq!(classify(&record), Some(ProtocolEvent::Title { title: "Rust".into() }));
    }

    #[test]
    fn test_classify_named_done_without_data() {
        let record = SseRecord::new(Some("done"), "");
        assert_eq!(classify(&record), Some(ProtocolEvent::Done));
    }

    #[test]
    fn test_classify_drops_garbage() {
        assert_eq!(classify(&SseRecord::new(None, "not json")), None);
        assert_eq!(classify(&SseRecord::new(Some("ping"), r#"{"ts":1}"#)), None);
    }

    #[test]
    fn test_unknown_event_name_is_not_inferred() {
        assert_eq!(classify(&SseRecord::new(Some("ping"), "{}")), None);

        let events = decode_str("event: ping\ndata: {}\n\nevent: delta\ndata: {\"content\":\"a\"}\n\n");
        assert_eq!(events, vec![ProtocolEvent::Delta { content: "a".into() }]);
    }

    #[test]
    fn test_decode_str_full_exchange() {
        let capture = concat!(
            "event: session\ndata: {\"conversation_id\": \"c1\", \"is_new\": true}\n\n",
            "event: delta\ndata: {\"content\": \"Hel\"}\n\n",
            "event: delta\ndata: {\"content\": \"lo\"}\n\n",
            "event: title\ndata: {\"title\": \"Greeting\"}\n\n",
            "event: done\ndata: {}\n\n",
        );
        let events = decode_str(capture);
        assert_eq!(
            events,
            vec![
                ProtocolEvent::Conversation {
                    conversation_id: "c1".into(),
                    is_new: true
                },
                ProtocolEvent::Delta { content: "Hel".into() },
                ProtocolEvent::Delta { content: "lo".into() },
                ProtocolEvent::Title { title: "Greeting".into() },
                ProtocolEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_decode_stream_across_chunk_boundaries() {
        let events = collect(chunks(&[
            "event: del",
            "ta\ndata: {\"content\"",
            ": \"a\"}\n",
            "\nevent: done\ndata: {}\n\n",
        ]))
        .await;
        assert_eq!(
            events,
            vec![ProtocolEvent::Delta { content: "a".into() }, ProtocolEvent::Done]
        );
    }

    #[tokio::test]
    async fn test_multibyte_split_across_chunks() {
        let text = "data: {\"content\":\"héllo\"}\n\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let parts = vec![Ok(text[..split].to_vec()), Ok(text[split..].to_vec())];
        let events = collect(parts).await;
        assert_eq!(events, vec![ProtocolEvent::Delta { content: "héllo".into() }]);
    }

    #[tokio::test]
    async fn test_decode_stream_skips_malformed_and_continues() {
        let events = collect(chunks(&[
            "data: {broken\n\n",
            "data: {\"content\":\"ok\"}\n\n",
            "data: {}\n\n",
        ]))
        .await;
        assert_eq!(
            events,
            vec![ProtocolEvent::Delta { content: "ok".into() }, ProtocolEvent::Done]
        );
    }

    #[tokio::test]
    async fn test_decode_stream_io_error_becomes_error_event() {
        let parts = vec![
            Ok(b"data: {\"content\":\"a\"}\n\n".to_vec()),
            Err("connection reset".to_string()),
            Ok(b"data: {}\n\n".to_vec()),
        ];
        let events = collect(parts).await;
        assert_eq!(
            events,
            vec![
                ProtocolEvent::Delta { content: "a".into() },
                ProtocolEvent::Error {
                    message: "connection reset".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_decode_stream_flushes_at_end() {
        let events = collect(chunks(&["data: {\"title\":\"t\"}"])).await;
        assert_eq!(events, vec![ProtocolEvent::Title { title: "t".into() }]);
    }
}
