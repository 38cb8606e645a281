//! Response snapshots.
//!
//! A [`Response`] is fully buffered: status, headers and body. That is all a
//! partition needs to replay it later, and it makes responses cheap to clone
//! (the body is reference counted).
//!
//! A [`StoredResponse`] is the form kept in a partition: the snapshot plus the
//! moment it was written.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderValue, StatusCode, header};

/// Body of the response synthesized when live media cannot be reached.
pub const UNAVAILABLE_BODY: &str = "Offline - No streaming available";

/// A buffered response snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Creates an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Creates a `200 OK` response with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    /// The fixed `503 Service Unavailable` response returned in place of an
    /// unreachable live stream.
    pub fn unavailable() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_body(UNAVAILABLE_BODY)
    }

    /// Replaces the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a header, replacing any previous value with the same name.
    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// `true` for 2xx statuses. Only these are ever written to a partition.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// `true` for 5xx statuses.
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Splits the response into its parts.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}

impl From<http::Response<Bytes>> for Response {
    fn from(response: http::Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }
}

/// A response as kept in a partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    response: Response,
    stored_at: DateTime<Utc>,
}

impl StoredResponse {
    /// Wraps a response written at `stored_at`.
    pub fn new(response: Response, stored_at: DateTime<Utc>) -> Self {
        Self {
            response,
            stored_at,
        }
    }

    /// The stored snapshot.
    #[inline]
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// When the snapshot was written.
    #[inline]
    pub fn stored_at(&self) -> DateTime<Utc> {
        self.stored_at
    }

    /// Consumes the entry and returns the snapshot.
    pub fn into_response(self) -> Response {
        self.response
    }

    /// Approximate heap footprint of the entry, used by size-bounded stores.
    pub fn memory_size(&self) -> usize {
        let headers: usize = self
            .response
            .headers
            .iter()
            .map(|(name, value)| name.as_str().len() + value.len())
            .sum();
        std::mem::size_of::<Self>() + headers + self.response.body.len()
    }
}
