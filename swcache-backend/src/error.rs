//! Error types for store operations.

use thiserror::Error;

/// Error type for store operations.
///
/// Splits failures the same way remote and local stores experience them, so
/// callers can log them with the right severity.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Internal store error, state or computation error.
    ///
    /// Any error not related to network interaction.
    #[error(transparent)]
    InternalError(Box<dyn std::error::Error + Send + Sync>),

    /// Network interaction error.
    ///
    /// Errors occurring during communication with a remote store.
    #[error(transparent)]
    ConnectionError(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a plain message as an [`StoreError::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into().into())
    }
}
