//! Authorization header helpers.

use std::str::FromStr;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use http::HeaderValue;

use crate::error::{FetchError, Result};

/// How `set_auth_with` presents credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// `Authorization: Basic base64(user:pass)`.
    Basic,
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// Credentials written into the URL userinfo.
    Auto,
}

impl FromStr for AuthType {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(AuthType::Basic),
            "bearer" => Ok(AuthType::Bearer),
            "auto" => Ok(AuthType::Auto),
            other => Err(FetchError::invalid_argument(format!(
                "unknown auth type: {other}"
            ))),
        }
    }
}

pub fn basic_auth(username: &str, password: Option<&str>) -> Result<HeaderValue> {
    let credentials = format!("{username}:{}", password.unwrap_or_default());
    sensitive(format!("Basic {}", BASE64_STANDARD.encode(credentials)))
}

pub fn bearer_auth(token: &str) -> Result<HeaderValue> {
    sensitive(format!("Bearer {token}"))
}

fn sensitive(value: String) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(&value)
        .map_err(|_| FetchError::invalid_argument("credentials are not a valid header value"))?;
    header.set_sensitive(true);
    Ok(header)
}
