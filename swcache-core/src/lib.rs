#![warn(missing_docs)]
//! # swcache-core
//!
//! Core types for the swcache offline cache manager.
//!
//! This crate holds the vocabulary shared by every other swcache crate:
//!
//! - [`Request`] and [`RequestKey`] - an intercepted request and its cache identity
//! - [`Response`] and [`StoredResponse`] - a response snapshot and its stored form
//! - [`Transport`] - the network seam, with [`TransportError`] for failures
//!   that never produced a response
//! - [`Clock`] - injectable time source
//!
//! Store implementations live in `swcache-backend`; the fetch policies and the
//! worker lifecycle live in `swcache`.

pub mod clock;
pub mod request;
pub mod response;
pub mod transport;

pub use clock::{Clock, SystemClock};
pub use request::{Request, RequestKey};
pub use response::{Response, StoredResponse};
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use transport::{Transport, TransportError};

/// Raw body bytes of a response snapshot.
pub type Body = bytes::Bytes;
