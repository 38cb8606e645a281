use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use swcache_core::Request;

use crate::config::ClassificationConfig;
use crate::error::ConfigError;

/// The class of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestClass {
    /// Stylesheets, scripts, images and fonts.
    StaticAsset,
    /// Calls to the metadata API.
    Api,
    /// Live audio streams and media files.
    StreamingMedia,
    /// Pages and everything else.
    Navigation,
}

impl RequestClass {
    /// Stable name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaticAsset => "static-asset",
            Self::Api => "api",
            Self::StreamingMedia => "streaming-media",
            Self::Navigation => "navigation",
        }
    }
}

impl fmt::Display for RequestClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assigns a [`RequestClass`] to every request.
///
/// Patterns are checked in a fixed order and the first match wins:
/// static-asset (path), api (full URL), streaming-media (path or full URL),
/// then navigation as the default.
///
/// ```
/// use swcache::config::ClassificationConfig;
/// use swcache::{Classifier, Request, RequestClass};
///
/// let classifier = Classifier::new(&ClassificationConfig::default()).unwrap();
/// let class = |url: &str| classifier.classify(&Request::try_get(url).unwrap());
///
/// assert_eq!(class("/css/styles.css"), RequestClass::StaticAsset);
/// assert_eq!(class("/api/now-playing"), RequestClass::Api);
/// assert_eq!(class("/live/stream.mp3"), RequestClass::StreamingMedia);
/// assert_eq!(class("/schedule"), RequestClass::Navigation);
/// ```
#[derive(Debug, Clone)]
pub struct Classifier {
    static_asset_path: Regex,
    api_url: Regex,
    streaming_path: Regex,
    streaming_url: Regex,
}

impl Classifier {
    /// Compiles the patterns of `config`.
    pub fn new(config: &ClassificationConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            static_asset_path: compile("static_asset_path", &config.static_asset_path)?,
            api_url: compile("api_url", &config.api_url)?,
            streaming_path: compile("streaming_path", &config.streaming_path)?,
            streaming_url: compile("streaming_url", &config.streaming_url)?,
        })
    }

    /// Classifies a request.
    pub fn classify(&self, request: &Request) -> RequestClass {
        let path = request.path();
        if self.static_asset_path.is_match(path) {
            return RequestClass::StaticAsset;
        }

        let url = request.uri().to_string();
        if self.api_url.is_match(&url) {
            RequestClass::Api
        } else if self.streaming_path.is_match(path) || self.streaming_url.is_match(&url) {
            RequestClass::StreamingMedia
        } else {
            RequestClass::Navigation
        }
    }
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(url: &str) -> RequestClass {
        Classifier::new(&ClassificationConfig::default())
            .unwrap()
            .classify(&Request::try_get(url).unwrap())
    }

    #[test]
    fn default_patterns_compile() {
        let error = Classifier::new(&ClassificationConfig::default()).err();
        assert!(error.is_none(), "{error:?}");
    }

    #[test]
    fn static_assets_by_extension() {
        for url in [
            "/css/styles.css",
            "/js/player.js",
            "/images/default-cover.jpg",
            "/icons/icon-192x192.png",
            "/fonts/inter.woff2",
            "/favicon.ico",
        ] {
            assert_eq!(classify(url), RequestClass::StaticAsset, "{url}");
        }
    }

    #[test]
    fn static_extension_wins_over_streaming_words() {
        assert_eq!(classify("/stream/cover.png"), RequestClass::StaticAsset);
    }

    #[test]
    fn api_wins_over_streaming_words() {
        assert_eq!(classify("/api/radio/now-playing"), RequestClass::Api);
        assert_eq!(
            classify("https://app.example/api/zenofm/history?limit=10"),
            RequestClass::Api
        );
    }

    #[test]
    fn streaming_by_extension_or_url() {
        assert_eq!(classify("/media/jingle.ogg"), RequestClass::StreamingMedia);
        assert_eq!(classify("https://cdn.example/live/stream"), RequestClass::StreamingMedia);
        assert_eq!(classify("/listen/radio-main"), RequestClass::StreamingMedia);
    }

    #[test]
    fn everything_else_is_navigation() {
        for url in ["/", "/index.html", "/schedule", "/manifest.json", "/offline.html"] {
            assert_eq!(classify(url), RequestClass::Navigation, "{url}");
        }
    }

    #[test]
    fn query_string_does_not_hide_extension() {
        assert_eq!(classify("/js/app.js?v=3"), RequestClass::StaticAsset);
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let config = ClassificationConfig {
            api_url: "(unclosed".to_owned(),
            ..ClassificationConfig::default()
        };
        let error = Classifier::new(&config).unwrap_err();
        assert!(matches!(error, ConfigError::Pattern { field: "api_url", .. }));
    }
}
