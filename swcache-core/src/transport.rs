use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{Request, Response};

/// Failure to complete an HTTP exchange.
///
/// Receiving a response with an error status is *not* a transport failure;
/// such responses come back as `Ok(Response)` and are passed through to the
/// caller. Only these errors trigger cache fallback.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote could not be reached.
    #[error("network unreachable: {0}")]
    Connect(Box<dyn std::error::Error + Send + Sync>),

    /// The exchange did not finish in time.
    #[error("request timed out")]
    Timeout,

    /// Any other failure before a response was received.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Convenience constructor for an unreachable-network error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Connect(message.into().into())
    }
}

/// The network seam of the cache manager.
///
/// Implementations perform the actual HTTP exchange. The manager never
/// cancels an in-flight fetch; the implementation's own timeout bounds
/// worst-case latency.
///
/// # Examples
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use swcache_core::{Request, Response, Transport, TransportError};
///
/// struct Offline;
///
/// #[async_trait]
/// impl Transport for Offline {
///     async fn fetch(&self, _request: &Request) -> Result<Response, TransportError> {
///         Err(TransportError::unreachable("airplane mode"))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the exchange for `request`.
    async fn fetch(&self, request: &Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn fetch(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).fetch(request).await
    }
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn fetch(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).fetch(request).await
    }
}
