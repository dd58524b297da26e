//! parley-protocol: Streaming chat protocol
//!
//! Wire types shared by client and server, the server-sent-events decoder
//! that turns a response body into typed [`ProtocolEvent`]s, and the HTTP
//! client implementing [`ChatBackend`].

pub mod client;
pub mod compat;
pub mod decoder;
pub mod error;
pub mod event;
pub mod types;

pub use client::{ChatBackend, HttpChatClient};
pub use decoder::{ProtocolEventStream, SseRecord, classify, decode_str, decode_stream};
pub use error::{Error, Result};
pub use event::{EventKind, ProtocolEvent};
pub use types::*;
