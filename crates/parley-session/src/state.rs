//! Session state: active conversation, transcript and in-flight cycle status.

use parley_protocol::Message;

/// Where the session is in a send-cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Request issued, no stream yet
    Sending,
    /// Consuming the response stream
    Streaming,
}

/// Process-local session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Conversation the transcript belongs to (`None` for a new chat)
    pub active_conversation_id: Option<String>,
    /// Loaded history plus messages from this process
    pub transcript: Vec<Message>,
    /// A send-cycle is in flight
    pub loading: bool,
    /// Model output received so far in the current cycle
    pub streaming_buffer: String,
    pub phase: Phase,
}

impl SessionState {
    /// Return to idle, dropping any uncommitted output
    pub(crate) fn settle(&mut self) {
        self.loading = false;
        self.phase = Phase::Idle;
        self.streaming_buffer.clear();
    }
}

/// State plus the cycle generation guarding it
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub state: SessionState,
    /// Bumped when a cycle starts and whenever the transcript is replaced;
    /// a cycle only mutates state while its generation is current.
    pub generation: u64,
}
