//! Fluent HTTP request builder.
//!
//! # Overview
//! A `FluentRequest` is configured through chained calls (method and path,
//! headers, query, auth, body) and dispatched by awaiting it. Before the
//! request goes out its body passes through a serializer pipe; the response
//! then passes through a pipe of ok-checks and transforms. Requests can
//! target a base URL or an in-process axum application, which is served on
//! a short-lived loopback listener for the duration of one dispatch.
//!
//! ```no_run
//! # async fn demo() -> fluently::Result<()> {
//! let client = fluently::Fluently::new("http://localhost:3000")?;
//! let res = client
//!     .post("/echo")
//!     .set_header("x-trace", "1")?
//!     .send(serde_json::json!({"name": "jobi"}))
//!     .set_timeout(std::time::Duration::from_secs(2))
//!     .await?;
//! assert!(res.is_success());
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Builders are consumed and returned by every method; `Clone` gives an
//!   independent deep copy, so a configured request can serve as a template.
//! - The network sits behind the `Transport` trait. `ReqwestTransport` is
//!   the default; tests plug in closures.
//! - Failures are one `FetchError` enum. Timeouts, rejected responses and
//!   transport errors stay distinguishable, and a rejection carries the
//!   response that failed the check.
//! - The `app` feature (on by default) pulls in axum for `App` targets.

pub mod auth;
pub mod body;
pub mod client;
pub mod config;
mod dispatch;
pub mod error;
pub mod form;
pub mod http;
pub mod media;
pub mod pipe;
pub mod query;
pub mod request;
#[cfg(feature = "app")]
pub mod server;
pub mod transport;

pub use auth::AuthType;
pub use body::RawBody;
pub use client::Fluently;
pub use config::FetchConfig;
pub use error::{FetchError, Result, TransportError};
pub use form::{AttachOptions, FormData, FormValue};
pub use crate::http::{Credentials, HttpMethod, HttpRequest, HttpResponse};
pub use query::{QueryInput, QueryParams};
pub use request::{FluentRequest, RequestInit};
#[cfg(feature = "app")]
pub use server::{server_address, App, LocalServer};
pub use transport::{ReqwestTransport, Transport};

/// A GET request for `url` with the default transport.
pub fn request(url: &str) -> Result<FluentRequest> {
    Ok(Fluently::new(url)?.request())
}

pub fn get(url: &str) -> Result<FluentRequest> {
    with_method(url, HttpMethod::Get)
}

pub fn post(url: &str) -> Result<FluentRequest> {
    with_method(url, HttpMethod::Post)
}

pub fn put(url: &str) -> Result<FluentRequest> {
    with_method(url, HttpMethod::Put)
}

pub fn patch(url: &str) -> Result<FluentRequest> {
    with_method(url, HttpMethod::Patch)
}

pub fn delete(url: &str) -> Result<FluentRequest> {
    with_method(url, HttpMethod::Delete)
}

pub fn del(url: &str) -> Result<FluentRequest> {
    delete(url)
}

pub fn options(url: &str) -> Result<FluentRequest> {
    with_method(url, HttpMethod::Options)
}

pub fn head(url: &str) -> Result<FluentRequest> {
    with_method(url, HttpMethod::Head)
}

/// A GET request for `/` of an in-process application.
#[cfg(feature = "app")]
pub fn app(app: impl Into<App>) -> Result<FluentRequest> {
    Ok(Fluently::from_app(app)?.request())
}

fn with_method(url: &str, method: HttpMethod) -> Result<FluentRequest> {
    Ok(request(url)?.set_method(method))
}
