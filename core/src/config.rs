//! Client defaults, optionally loaded from the environment.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{FetchError, Result};
use crate::http::Credentials;

pub const DEFAULT_BASE_URL: &str = "http://localhost";

/// Defaults applied to every request a `Fluently` client creates.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    pub timeout_ms: Option<u64>,
    pub credentials: Credentials,
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: None,
            credentials: Credentials::default(),
            user_agent: None,
        }
    }
}

impl FetchConfig {
    /// Read `FLUENTLY_BASE_URL`, `FLUENTLY_TIMEOUT_MS` and
    /// `FLUENTLY_USER_AGENT`, falling back to the defaults for unset vars.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(base_url) = lookup("FLUENTLY_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(raw) = lookup("FLUENTLY_TIMEOUT_MS") {
            let ms = raw.trim().parse::<u64>().map_err(|_| {
                FetchError::invalid_argument(format!("FLUENTLY_TIMEOUT_MS is not a number: {raw}"))
            })?;
            config.timeout_ms = Some(ms);
        }
        config.user_agent = lookup("FLUENTLY_USER_AGENT");
        Ok(config)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
