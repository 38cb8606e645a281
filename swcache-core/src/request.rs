//! Intercepted requests and their cache identity.
//!
//! A [`Request`] is what the host hands to the cache manager: a method, a URL
//! (absolute or origin-relative) and headers. Its [`RequestKey`] is the
//! identity under which a response is stored in a partition.
//!
//! ```
//! use swcache_core::Request;
//!
//! let request = Request::try_get("/css/styles.css").unwrap();
//! assert_eq!(request.key().to_string(), "GET /css/styles.css");
//! assert!(request.is_interceptable());
//! ```

use std::fmt;

use http::{HeaderMap, HeaderValue, Method, Uri, header::HeaderName, uri::InvalidUri};
use smol_str::SmolStr;

/// Identity of a request inside a cache partition: method and URL.
///
/// Only `GET` identities are ever written to a store, but the method is part
/// of the key so that a lookup for any other method can never hit a `GET`
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: Method,
    url: SmolStr,
}

impl RequestKey {
    /// Creates a key from a method and URL string.
    pub fn new(method: Method, url: impl Into<SmolStr>) -> Self {
        Self {
            method,
            url: url.into(),
        }
    }

    /// Shortcut for a `GET` identity.
    pub fn get(url: impl Into<SmolStr>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL as given by the host.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// An outbound request intercepted by the cache manager.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl Request {
    /// Creates a request without headers.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
        }
    }

    /// Creates a `GET` request.
    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Parses `url` and creates a `GET` request for it.
    pub fn try_get(url: &str) -> Result<Self, InvalidUri> {
        Ok(Self::get(url.parse()?))
    }

    /// Adds a header, replacing any previous value with the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// URL path component.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Cache identity of this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method.clone(), self.uri.to_string())
    }

    /// Whether this request may be read from or written to a partition.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    /// Whether the cache manager should intercept this request at all.
    ///
    /// Origin-relative URLs and `http`/`https` URLs are intercepted; any other
    /// scheme (browser extensions, `data:` and so on) goes straight to the
    /// transport.
    pub fn is_interceptable(&self) -> bool {
        match self.uri.scheme_str() {
            None => true,
            Some(scheme) => scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"),
        }
    }

    /// Splits the request into its parts.
    pub fn into_parts(self) -> (Method, Uri, HeaderMap) {
        (self.method, self.uri, self.headers)
    }
}

impl From<http::Request<()>> for Request {
    fn from(request: http::Request<()>) -> Self {
        let (parts, ()) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
        }
    }
}
