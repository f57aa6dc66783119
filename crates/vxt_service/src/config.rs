//! Connection settings for the data service.

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Where the data service lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL without a trailing slash, e.g. `http://localhost:5000`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The base URL with `segments` appended. Each segment is percent-encoded
    /// on its own, so names containing `/`, `#` or spaces stay one segment.
    pub fn url(&self, segments: &[&str]) -> ServiceResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ServiceError::network(format!("invalid base URL '{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ServiceError::network(format!("base URL '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(default_base_url())
    }
}
