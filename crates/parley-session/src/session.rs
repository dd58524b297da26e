//! Conversation session: drives send-cycles and reconciles their events
//! against the locally held transcript.

use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use parley_protocol::{ChatBackend, ChatRequest, ConversationSummary, Message, ProtocolEvent, Role};

use crate::{
    classify::classify_stream_error,
    conversation_list::ConversationList,
    error::Result,
    events::SessionEvent,
    handle::SessionHandle,
    notify::{Notifier, Severity},
    state::{Phase, SessionState, Shared},
    sticky::StickyErrorStore,
};

/// Failure recorded when a stream ends without `done` or `error`
pub const TRUNCATED_STREAM: &str = "stream ended before the response completed";

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long transient failure notifications stay up
    pub notification_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            notification_ms: 5000,
        }
    }
}

/// How a call to [`Session::send`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty input, or another cycle was already in flight
    Rejected,
    /// `done` received
    Completed,
    /// Stream-level error; carries the transcript content
    Failed(String),
    /// No stream established; carries the notification text
    TransportFailed(String),
    /// Cancelled or superseded by a conversation switch
    Cancelled,
}

enum Step {
    Continue,
    Finished(SendOutcome),
}

/// Bookkeeping for the cycle currently being driven
struct Cycle {
    generation: u64,
    /// Transcript index of the optimistic user message
    user_index: usize,
    cancel: CancellationToken,
    shared: Arc<Mutex<Shared>>,
}

impl Drop for Cycle {
    /// A send future dropped mid-cycle must not leave the session loading.
    fn drop(&mut self) {
        let mut shared = self.shared.lock();
        if shared.generation == self.generation && shared.state.loading {
            tracing::debug!("Send-cycle dropped before a terminal event");
            shared.state.settle();
        }
    }
}

/// A chat session bound to one backend.
///
/// At most one send-cycle runs at a time; a send while one is in flight is
/// rejected rather than queued.
pub struct Session {
    config: SessionConfig,
    backend: Arc<dyn ChatBackend>,
    sticky: Arc<dyn StickyErrorStore>,
    notifier: Arc<dyn Notifier>,
    conversations: Mutex<ConversationList>,
    event_tx: broadcast::Sender<SessionEvent>,
    handle: SessionHandle,
}

impl Session {
    /// Create a new session
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        sticky: Arc<dyn StickyErrorStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config: SessionConfig::default(),
            backend,
            sticky,
            notifier,
            conversations: Mutex::new(ConversationList::new()),
            event_tx,
            handle: SessionHandle::new(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle for cancelling and observing from outside
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.handle.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.handle.is_loading()
    }

    pub fn active_conversation_id(&self) -> Option<String> {
        self.handle.shared.lock().state.active_conversation_id.clone()
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.handle.shared.lock().state.transcript.clone()
    }

    /// Known conversations, most recent first
    pub fn conversations(&self) -> Vec<ConversationSummary> {
        self.conversations.lock().entries().to_vec()
    }

    /// Stop consuming the in-flight stream
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Run one send-cycle for `text`.
    ///
    /// Dropping the returned future mid-cycle returns the session to idle
    /// without committing anything further; prefer [`Session::cancel`].
    pub async fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Rejected;
        }
        let Some((cycle, request)) = self.begin_cycle(text) else {
            return SendOutcome::Rejected;
        };
        let _ = self.event_tx.send(SessionEvent::CycleStarted);

        let opened = tokio::select! {
            biased;
            _ = cycle.cancel.cancelled() => None,
            result = self.backend.open_stream(&request) => Some(result),
        };
        let mut stream = match opened {
            None => return self.cancel_cycle(&cycle),
            Some(Err(e)) => return self.fail_transport(&cycle, e),
            Some(Ok(stream)) => stream,
        };
        if self
            .with_cycle(&cycle, |state| state.phase = Phase::Streaming)
            .is_none()
        {
            return SendOutcome::Cancelled;
        }

        loop {
            let next = tokio::select! {
                biased;
                _ = cycle.cancel.cancelled() => return self.cancel_cycle(&cycle),
                event = stream.next() => event,
            };
            let step = match next {
                Some(event) => self.apply(&cycle, event),
                None => {
                    tracing::warn!("Response stream ended without a terminal event");
                    self.fail_stream(&cycle, TRUNCATED_STREAM)
                }
            };
            if let Step::Finished(outcome) = step {
                return outcome;
            }
        }
    }

    /// Replace the transcript with a conversation's persisted history,
    /// followed by its sticky error if one is recorded.
    pub async fn load_conversation(&self, id: &str) -> Result<()> {
        self.abandon();

        let detail = match self.backend.get_conversation(id).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::error!("Failed to load conversation {}: {}", id, e);
                self.notifier.notify(
                    &format!("Failed to load conversation: {}", e.user_message()),
                    Severity::Error,
                    self.config.notification_ms,
                );
                return Err(e.into());
            }
        };

        let mut transcript = detail.messages;
        if let Some(content) = self.sticky.get(&detail.id) {
            transcript.push(Message::error(content));
        }

        {
            let mut shared = self.handle.shared.lock();
            self.reset_locked(&mut shared);
            shared.state.active_conversation_id = Some(detail.id.clone());
            shared.state.transcript = transcript;
        }
        tracing::debug!("Loaded conversation {}", detail.id);
        let _ = self
            .event_tx
            .send(SessionEvent::ConversationLoaded { id: detail.id });
        Ok(())
    }

    /// Start a fresh conversation
    pub fn new_conversation(&self) {
        let mut shared = self.handle.shared.lock();
        self.reset_locked(&mut shared);
        shared.state.active_conversation_id = None;
        shared.state.transcript.clear();
    }

    /// Replace the conversation list with the server's
    pub async fn refresh_conversations(&self) -> Result<Vec<ConversationSummary>> {
        match self.backend.list_conversations().await {
            Ok(list) => {
                let mut conversations = self.conversations.lock();
                conversations.replace(list);
                Ok(conversations.entries().to_vec())
            }
            Err(e) => {
                tracing::error!("Failed to list conversations: {}", e);
                self.notifier.notify(
                    &format!("Failed to load conversations: {}", e.user_message()),
                    Severity::Error,
                    self.config.notification_ms,
                );
                Err(e.into())
            }
        }
    }

    /// Delete a conversation along with its list entry and sticky error
    pub async fn delete_conversation(&self, id: &str) -> Result<()> {
        if let Err(e) = self.backend.delete_conversation(id).await {
            tracing::error!("Failed to delete conversation {}: {}", id, e);
            self.notifier.notify(
                &format!("Failed to delete conversation: {}", e.user_message()),
                Severity::Error,
                self.config.notification_ms,
            );
            return Err(e.into());
        }

        self.conversations.lock().remove(id);
        self.sticky.remove(id);
        {
            let mut shared = self.handle.shared.lock();
            if shared.state.active_conversation_id.as_deref() == Some(id) {
                self.reset_locked(&mut shared);
                shared.state.active_conversation_id = None;
                shared.state.transcript.clear();
            }
        }
        let _ = self.event_tx.send(SessionEvent::ConversationDeleted { id: id.to_string() });
        Ok(())
    }

    /// Leave any in-flight cycle behind without touching the transcript
    fn abandon(&self) {
        let mut shared = self.handle.shared.lock();
        self.reset_locked(&mut shared);
    }

    fn reset_locked(&self, shared: &mut Shared) {
        if shared.state.loading {
            tracing::debug!("Abandoning in-flight send-cycle");
        }
        shared.generation += 1;
        shared.state.settle();
        self.handle.cancel();
    }

    fn begin_cycle(&self, text: &str) -> Option<(Cycle, ChatRequest)> {
        let mut shared = self.handle.shared.lock();
        if shared.state.loading {
            tracing::debug!("Send rejected: a send-cycle is already in flight");
            return None;
        }

        shared.generation += 1;
        let generation = shared.generation;
        let state = &mut shared.state;
        state.loading = true;
        state.phase = Phase::Sending;
        state.streaming_buffer.clear();
        state.transcript.push(Message::user(text));

        let cycle = Cycle {
            generation,
            user_index: state.transcript.len() - 1,
            cancel: self.handle.reset_cancel(),
            shared: Arc::clone(&self.handle.shared),
        };
        let request = ChatRequest::new(text, state.active_conversation_id.clone());
        Some((cycle, request))
    }

    /// Mutate state on behalf of `cycle`, unless it has been superseded
    fn with_cycle<R>(&self, cycle: &Cycle, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        let mut shared = self.handle.shared.lock();
        if shared.generation != cycle.generation {
            return None;
        }
        Some(f(&mut shared.state))
    }

    fn apply(&self, cycle: &Cycle, event: ProtocolEvent) -> Step {
        match event {
            ProtocolEvent::Conversation {
                conversation_id,
                is_new,
            } => {
                let bound = self.with_cycle(cycle, |state| {
                    state.active_conversation_id = Some(conversation_id.clone());
                });
                if bound.is_none() {
                    return abandoned();
                }
                tracing::debug!("Bound to conversation {} (new: {})", conversation_id, is_new);
                let _ = self.event_tx.send(SessionEvent::ConversationBound {
                    id: conversation_id,
                    is_new,
                });
                Step::Continue
            }
            ProtocolEvent::Delta { content } => {
                if self
                    .with_cycle(cycle, |state| state.streaming_buffer.push_str(&content))
                    .is_none()
                {
                    return abandoned();
                }
                let _ = self.event_tx.send(SessionEvent::Delta { content });
                Step::Continue
            }
            ProtocolEvent::Title { title } => {
                let Some(active) =
                    self.with_cycle(cycle, |state| state.active_conversation_id.clone())
                else {
                    return abandoned();
                };
                match active {
                    Some(id) => {
                        self.conversations.lock().upsert_title(&id, &title);
                        let _ = self.event_tx.send(SessionEvent::TitleUpdated { id, title });
                    }
                    None => tracing::warn!("Dropping title event: no conversation bound"),
                }
                Step::Continue
            }
            ProtocolEvent::Done => self.complete(cycle),
            ProtocolEvent::Error { message } => self.fail_stream(cycle, &message),
        }
    }

    fn complete(&self, cycle: &Cycle) -> Step {
        let result = self.with_cycle(cycle, |state| {
            let message = (!state.streaming_buffer.is_empty())
                .then(|| Message::model(std::mem::take(&mut state.streaming_buffer)));
            if let Some(message) = &message {
                state.transcript.push(message.clone());
            }
            state.settle();
            (message, state.active_conversation_id.clone())
        });
        let Some((message, conversation_id)) = result else {
            return abandoned();
        };

        if let Some(id) = conversation_id {
            self.sticky.remove(&id);
        }
        let _ = self.event_tx.send(SessionEvent::CycleCompleted { message });
        Step::Finished(SendOutcome::Completed)
    }

    fn fail_stream(&self, cycle: &Cycle, message: &str) -> Step {
        let content = classify_stream_error(message);
        let result = self.with_cycle(cycle, |state| {
            state.transcript.push(Message::error(content.clone()));
            state.settle();
            state.active_conversation_id.clone()
        });
        let Some(conversation_id) = result else {
            return abandoned();
        };

        tracing::warn!("Send-cycle failed: {}", message);
        match conversation_id {
            Some(id) => self.sticky.put(&id, &content),
            None => tracing::debug!("No conversation bound, error not recorded as sticky"),
        }
        let _ = self.event_tx.send(SessionEvent::CycleFailed {
            content: content.clone(),
        });
        Step::Finished(SendOutcome::Failed(content))
    }

    fn fail_transport(&self, cycle: &Cycle, error: parley_protocol::Error) -> SendOutcome {
        tracing::error!("Chat request failed: {}", error);
        let message = error.user_message();
        let rolled_back = self.with_cycle(cycle, |state| {
            rollback_user_message(state, cycle.user_index);
            state.settle();
        });
        if rolled_back.is_none() {
            return SendOutcome::Cancelled;
        }

        self.notifier
            .notify(&message, Severity::Error, self.config.notification_ms);
        let _ = self.event_tx.send(SessionEvent::TransportFailed {
            message: message.clone(),
        });
        SendOutcome::TransportFailed(message)
    }

    /// Stop the cycle at the caller's request. The optimistic user message
    /// stays, whether or not the stream had opened.
    fn cancel_cycle(&self, cycle: &Cycle) -> SendOutcome {
        let stopped = self.with_cycle(cycle, |state| state.settle());
        if stopped.is_some() {
            tracing::debug!("Send-cycle cancelled");
            let _ = self.event_tx.send(SessionEvent::CycleCancelled);
        }
        SendOutcome::Cancelled
    }
}

fn abandoned() -> Step {
    tracing::debug!("Send-cycle superseded, dropping remaining events");
    Step::Finished(SendOutcome::Cancelled)
}

fn rollback_user_message(state: &mut SessionState, index: usize) {
    if state
        .transcript
        .get(index)
        .is_some_and(|m| m.role == Role::User)
    {
        state.transcript.remove(index);
    }
}
