use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::Uri;
use reqwest::{Client, Url};
use swcache_core::{Request, Response, Transport, TransportError};
use tracing::trace;

/// [`Transport`] backed by a [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
    base: Option<Url>,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Wraps an existing client. Relative URLs are rejected until a base is
    /// set through the builder.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base: None,
            timeout: None,
        }
    }

    /// Creates a builder.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    fn resolve(&self, uri: &Uri) -> Result<Url, TransportError> {
        if uri.scheme().is_some() {
            return Url::parse(&uri.to_string()).map_err(|error| TransportError::Other(error.into()));
        }
        let Some(base) = &self.base else {
            return Err(TransportError::Other(
                format!("relative url `{uri}` without a base url").into(),
            ));
        };
        let relative = uri.path_and_query().map_or("/", |pq| pq.as_str());
        base.join(relative)
            .map_err(|error| TransportError::Other(error.into()))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, TransportError> {
        let url = self.resolve(request.uri())?;
        trace!(%url, method = %request.method(), "Sending request");

        let mut builder = self
            .client
            .request(request.method().clone(), url)
            .headers(request.headers().clone());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body: Bytes = response.bytes().await.map_err(transport_error)?;

        let mut snapshot = http::Response::new(body);
        *snapshot.status_mut() = status;
        *snapshot.headers_mut() = headers;
        Ok(snapshot.into())
    }
}

fn transport_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(Box::new(error))
    } else {
        TransportError::Other(Box::new(error))
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug, Default)]
pub struct ReqwestTransportBuilder {
    client: Option<Client>,
    base: Option<Url>,
    timeout: Option<Duration>,
}

impl ReqwestTransportBuilder {
    /// Use `client` instead of a default one.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Base URL for origin-relative requests.
    pub fn base_url(mut self, base: Url) -> Self {
        self.base = Some(base);
        self
    }

    /// Per-request timeout, covering connect, headers and body.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the transport.
    pub fn build(self) -> ReqwestTransport {
        ReqwestTransport {
            client: self.client.unwrap_or_default(),
            base: self.base,
            timeout: self.timeout,
        }
    }
}
