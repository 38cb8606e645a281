#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod transport;

pub use reqwest::Url;
pub use transport::{ReqwestTransport, ReqwestTransportBuilder};
