//! Dispatch pipeline: plugins, body serialization, the transport call and
//! the response pipe.
//!
//! # Design
//! The order is fixed: plugins see the fully configured request with its raw
//! body, then the body pipe runs and the result is serialized. When a timeout
//! is set the transport future is raced against a timer with
//! `tokio::time::timeout`; whichever side loses is dropped, which cancels it.
//! A backing listener is started only after the body is ready and is closed
//! after the response pipe has run, on success and failure alike.

use std::time::Duration;

use http::header::CONTENT_TYPE;
use http::HeaderValue;

use crate::error::{FetchError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::pipe::Pipe;
use crate::request::FluentRequest;
#[cfg(feature = "app")]
use crate::server::LocalServer;
use crate::transport::Transport;

pub(crate) async fn dispatch(mut request: FluentRequest) -> Result<HttpResponse> {
    let plugins = std::mem::take(&mut request.plugins);
    if !plugins.is_empty() {
        tracing::trace!(count = plugins.len(), "applying plugins");
        request = plugins.apply(request);
    }

    let mut headers = std::mem::take(&mut request.headers);
    let body = match request.body.take() {
        Some(raw) => {
            let raw = request.body_pipe.run(raw).await?;
            let wire = raw.into_wire()?;
            if let Some(content_type) = wire.content_type {
                if wire.forced || !headers.contains_key(CONTENT_TYPE) {
                    let value = HeaderValue::from_str(&content_type)
                        .map_err(|e| FetchError::Serialization(e.to_string()))?;
                    headers.insert(CONTENT_TYPE, value);
                }
            }
            tracing::trace!(bytes = wire.bytes.len(), "request body serialized");
            Some(wire.bytes)
        }
        None => None,
    };

    let mut url = request.url;

    #[cfg(feature = "app")]
    let server = match request.app.take() {
        Some(app) => {
            let server = LocalServer::start(&app).await?;
            if let Err(err) = server.retarget(&mut url) {
                server.close().await?;
                return Err(err);
            }
            Some(server)
        }
        None => None,
    };

    let wire_request = HttpRequest {
        method: request.method,
        url,
        headers,
        body,
        credentials: request.credentials,
    };
    tracing::debug!(method = %wire_request.method, url = %wire_request.url, "dispatching request");

    let outcome = exchange(
        wire_request,
        request.transport.as_ref(),
        request.timeout,
        &request.response_pipe,
    )
    .await;

    #[cfg(feature = "app")]
    let outcome = match server {
        Some(server) => {
            let closed = server.close().await;
            outcome.and_then(|response| closed.map(|()| response))
        }
        None => outcome,
    };

    outcome
}

/// Run the transport, bounded by `timeout`, then the response pipe.
async fn exchange(
    request: HttpRequest,
    transport: &dyn Transport,
    timeout: Option<Duration>,
    response_pipe: &Pipe<HttpResponse>,
) -> Result<HttpResponse> {
    let pending = transport.fetch(request);
    let response = match timeout {
        Some(duration) => match tokio::time::timeout(duration, pending).await {
            Ok(settled) => settled.map_err(FetchError::Transport)?,
            Err(_elapsed) => {
                tracing::debug!(timeout_ms = duration.as_millis() as u64, "request timed out");
                return Err(FetchError::Timeout { duration });
            }
        },
        None => pending.await.map_err(FetchError::Transport)?,
    };
    tracing::debug!(status = response.status, "response received");
    response_pipe.run(response).await
}
