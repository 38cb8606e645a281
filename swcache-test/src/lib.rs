//! Shared fakes for swcache tests.

pub mod clock;
pub mod store;
pub mod tracing;
pub mod transport;

pub use clock::ManualClock;
pub use store::{CountingStore, ListingGate, StoreCounters};
pub use crate::tracing::{CapturedSpan, SpanCollector, create_span_collector, with_span_capture};
pub use transport::FakeTransport;
