use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// A message posted by the host page.
///
/// Messages are tagged JSON objects; arguments travel in `payload`:
///
/// ```
/// use swcache::ControlMessage;
///
/// let message = ControlMessage::from_json(
///     r#"{"type":"CLEAR_CACHE","payload":{"cacheName":"dynamic"}}"#,
/// ).unwrap();
/// assert_eq!(message, ControlMessage::ClearCache { cache_name: "dynamic".into() });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate the waiting worker now.
    SkipWaiting,
    /// Ask for the version tag of the active worker.
    GetVersion,
    /// Fetch the given URLs into the dynamic partition.
    CacheUrls {
        /// URLs to fetch.
        urls: Vec<String>,
    },
    /// Delete a partition.
    ClearCache {
        /// Name of the partition.
        #[serde(rename = "cacheName")]
        cache_name: String,
    },
    /// A message type this manager does not know. Ignored.
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    const KNOWN_TYPES: [&str; 4] = ["SKIP_WAITING", "GET_VERSION", "CACHE_URLS", "CLEAR_CACHE"];

    /// Parses a JSON message.
    ///
    /// A message whose `type` is not recognized parses as
    /// [`ControlMessage::Unknown`] whatever its payload.
    pub fn from_json(json: &str) -> Result<Self, ControlError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        match value.get("type").and_then(serde_json::Value::as_str) {
            Some(kind) if !Self::KNOWN_TYPES.contains(&kind) => Ok(Self::Unknown),
            _ => Ok(serde_json::from_value(value)?),
        }
    }
}

/// Answer to a control message that expects one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlReply {
    /// Answer to [`ControlMessage::GetVersion`].
    Version {
        /// Version tag of the active worker.
        version: String,
    },
}

impl ControlReply {
    /// Serializes the reply for the host page.
    pub fn to_json(&self) -> Result<String, ControlError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Outcome of a [`ControlMessage::CacheUrls`] request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheUrlsReport {
    /// URLs written to the dynamic partition.
    pub stored: Vec<String>,
    /// URLs that could not be fetched, answered with an error status, or
    /// could not be written.
    pub failed: Vec<String>,
}
