//! Session event types

use parley_protocol::Message;

/// Events emitted while a session runs send-cycles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A send was accepted and the user message appended
    CycleStarted,

    /// The server bound the cycle to a conversation. When `is_new` is set
    /// the embedding UI should point its navigation at `id`.
    ConversationBound { id: String, is_new: bool },

    /// Model output chunk
    Delta { content: String },

    /// Server assigned a title
    TitleUpdated { id: String, title: String },

    /// Cycle finished; `message` is the committed model reply, if any output arrived
    CycleCompleted { message: Option<Message> },

    /// Stream reported an error; `content` is what the transcript shows
    CycleFailed { content: String },

    /// No stream could be established; the user message was rolled back
    TransportFailed { message: String },

    /// Cycle stopped before reaching a terminal event
    CycleCancelled,

    /// A conversation's history replaced the transcript
    ConversationLoaded { id: String },

    /// A conversation was deleted
    ConversationDeleted { id: String },
}

impl SessionEvent {
    /// Check if this event ends a send-cycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::CycleCompleted { .. }
                | SessionEvent::CycleFailed { .. }
                | SessionEvent::TransportFailed { .. }
                | SessionEvent::CycleCancelled
        )
    }
}
