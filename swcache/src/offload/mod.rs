//! Background refreshes for cache-first hits.
//!
//! A cache-first hit answers from the partition right away and hands the
//! network refresh to an [`OffloadManager`]. The manager tracks every spawned
//! task by [`OffloadKey`], so a second hit on the same entry while its
//! refresh is still running does not start another one.
//!
//! ```
//! use std::time::Duration;
//! use swcache::offload::{OffloadConfig, OffloadManager};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = OffloadManager::new(
//!     OffloadConfig::builder().timeout(Duration::from_secs(10)).build(),
//! );
//! manager.spawn("warmup", async {});
//! manager.wait_all().await;
//! # }
//! ```

mod manager;
mod policy;

pub use manager::{OffloadHandle, OffloadKey, OffloadManager};
pub use policy::{OffloadConfig, OffloadConfigBuilder, TimeoutPolicy};
