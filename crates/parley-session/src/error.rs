//! Error types for parley-session

use thiserror::Error;

/// Result type alias using parley-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during session operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the protocol/backend layer
    #[error(transparent)]
    Protocol(#[from] parley_protocol::Error),
}

impl Error {
    /// Check if the server reported the conversation as missing
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Protocol(e) => e.is_not_found(),
        }
    }
}
