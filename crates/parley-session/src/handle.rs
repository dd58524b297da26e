//! A cloneable handle for poking the session from external code.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::state::{SessionState, Shared};

/// A cloneable handle for poking the session from external code.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) shared: Arc<Mutex<Shared>>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// Stop consuming the in-flight response stream, if any.
    pub fn cancel(&self) {
        self.cancel.lock().cancel();
    }

    /// Install a fresh token for a new cycle and return it.
    pub(crate) fn reset_cancel(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        token
    }

    /// Whether a send-cycle is in flight.
    pub fn is_loading(&self) -> bool {
        self.shared.lock().state.loading
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.shared.lock().state.clone()
    }
}
