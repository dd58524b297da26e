//! parley-session: Client-side conversation session
//!
//! Drives send-cycles against a [`parley_protocol::ChatBackend`], reconciles
//! streamed events with the local transcript, keeps the conversation list in
//! sync with server-assigned titles, and records per-conversation sticky
//! errors that survive restarts.

pub mod classify;
pub mod conversation_list;
pub mod error;
pub mod events;
pub mod handle;
pub mod notify;
pub mod session;
pub mod state;
pub mod sticky;

pub use classify::{QUOTA_BANNER, classify_stream_error};
pub use conversation_list::ConversationList;
pub use error::{Error, Result};
pub use events::SessionEvent;
pub use handle::SessionHandle;
pub use notify::{Notification, NotificationCenter, Notifier, Severity};
pub use session::{SendOutcome, Session, SessionConfig};
pub use state::{Phase, SessionState};
pub use sticky::{JsonFileStickyErrors, MemoryStickyErrors, StickyError, StickyErrorStore};
