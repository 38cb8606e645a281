use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use http::StatusCode;
use swcache_core::{Request, Response, Transport, TransportError};

#[derive(Debug, Clone)]
enum Route {
    Respond(Response),
    Unreachable,
}

#[derive(Debug, Default)]
struct Inner {
    routes: DashMap<String, Route>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

/// Scripted [`Transport`].
///
/// Routes are matched on the request URL as written. Unknown URLs answer
/// `404`. While offline, every fetch fails with [`TransportError::Connect`].
/// Clones share routes and the call log.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Inner>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `200` and `body`.
    pub fn respond(self, url: &str, body: impl Into<Bytes>) -> Self {
        self.set_response(url, Response::ok(body));
        self
    }

    /// Answer `url` with `response`.
    pub fn respond_with(self, url: &str, response: Response) -> Self {
        self.set_response(url, response);
        self
    }

    /// Answer `url` with an empty response of the given status.
    pub fn respond_status(self, url: &str, status: StatusCode) -> Self {
        self.set_response(url, Response::new(status));
        self
    }

    /// Fail every fetch of `url` at the transport level.
    pub fn unreachable(self, url: &str) -> Self {
        self.inner.routes.insert(url.to_owned(), Route::Unreachable);
        self
    }

    /// Replace the answer for `url`.
    pub fn set_response(&self, url: &str, response: Response) {
        self.inner
            .routes
            .insert(url.to_owned(), Route::Respond(response));
    }

    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.inner
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.as_str() == url)
            .count()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, TransportError> {
        let url = request.uri().to_string();
        self.inner.calls.lock().unwrap().push(url.clone());

        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(TransportError::unreachable(format!("offline: {url}")));
        }
        match self.inner.routes.get(&url).map(|route| route.clone()) {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Unreachable) => Err(TransportError::unreachable(format!("unreachable: {url}"))),
            None => Ok(Response::new(StatusCode::NOT_FOUND)),
        }
    }
}
