//! Document origins, the key overrides are recorded against.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Scheme plus host of a document URL, e.g. `https://example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

#[derive(Debug, Error)]
pub enum OriginError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("url has no host: {0}")]
    NoHost(String),
}

impl Origin {
    /// Extract the origin of a document URL.
    pub fn from_url(url: &str) -> Result<Self, OriginError> {
        let parsed = Url::parse(url).map_err(|e| OriginError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| OriginError::NoHost(url.to_string()))?;
        Ok(Self(format!("{}://{}", parsed.scheme(), host)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Only plain web pages are ever auto-zoomed.
pub fn is_auto_zoomable_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}
