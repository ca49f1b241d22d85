//! Entry point that stamps out `FluentRequest`s for one target.
//!
//! # Design
//! `Fluently` holds the base URL (or in-process app), the shared transport
//! and the defaults from `FetchConfig`. It carries no per-request state:
//! every call to `request()` or a verb method returns a fresh, independent
//! builder.

use std::sync::Arc;

use http::header::USER_AGENT;
use http::{HeaderMap, HeaderValue};
use url::Url;

use crate::config::{FetchConfig, DEFAULT_BASE_URL};
use crate::error::{FetchError, Result};
use crate::request::FluentRequest;
#[cfg(feature = "app")]
use crate::server::App;
use crate::transport::{ReqwestTransport, Transport};

#[derive(Clone)]
pub struct Fluently {
    base_url: Url,
    transport: Arc<dyn Transport>,
    config: FetchConfig,
    default_headers: HeaderMap,
    #[cfg(feature = "app")]
    app: Option<App>,
}

impl Fluently {
    /// Client for `base_url`; an empty string means `http://localhost`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_config(FetchConfig {
            base_url: base_url.to_string(),
            ..FetchConfig::default()
        })
    }

    pub fn from_config(config: FetchConfig) -> Result<Self> {
        let base = match config.base_url.trim() {
            "" => DEFAULT_BASE_URL,
            base => base,
        };
        let base_url = Url::parse(base)?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(format!("{base_url} cannot be a base url")));
        }

        let mut default_headers = HeaderMap::new();
        if let Some(user_agent) = &config.user_agent {
            let value = HeaderValue::from_str(user_agent).map_err(|_| {
                FetchError::invalid_argument(format!("invalid user agent: {user_agent:?}"))
            })?;
            default_headers.insert(USER_AGENT, value);
        }

        Ok(Self {
            base_url,
            transport: Arc::new(ReqwestTransport::default()),
            config,
            default_headers,
            #[cfg(feature = "app")]
            app: None,
        })
    }

    /// Client whose requests are served by `app` on a listener started per
    /// dispatch.
    #[cfg(feature = "app")]
    pub fn from_app(app: impl Into<App>) -> Result<Self> {
        let mut client = Self::new("http://127.0.0.1")?;
        client.app = Some(app.into());
        Ok(client)
    }

    pub fn with_transport(mut self, transport: impl Transport) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// A GET request for the base URL, with the configured defaults applied.
    pub fn request(&self) -> FluentRequest {
        let mut req = FluentRequest::new(self.base_url.clone(), self.transport.clone());
        req.headers = self.default_headers.clone();
        req.credentials = self.config.credentials;
        req.timeout = self.config.timeout();
        #[cfg(feature = "app")]
        let req = match &self.app {
            Some(app) => req.with_app(app.clone()),
            None => req,
        };
        req
    }

    pub fn get(&self, path: &str) -> FluentRequest {
        self.request().get(path)
    }

    pub fn post(&self, path: &str) -> FluentRequest {
        self.request().post(path)
    }

    pub fn put(&self, path: &str) -> FluentRequest {
        self.request().put(path)
    }

    pub fn patch(&self, path: &str) -> FluentRequest {
        self.request().patch(path)
    }

    pub fn delete(&self, path: &str) -> FluentRequest {
        self.request().delete(path)
    }

    pub fn del(&self, path: &str) -> FluentRequest {
        self.delete(path)
    }

    pub fn options(&self, path: &str) -> FluentRequest {
        self.request().options(path)
    }

    pub fn head(&self, path: &str) -> FluentRequest {
        self.request().head(path)
    }
}

impl std::fmt::Debug for Fluently {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fluently")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
