//! The network collaborator.
//!
//! # Design
//! The builder never performs I/O itself: dispatch lowers the configured
//! request into an `HttpRequest` and hands it to a `Transport`. Tests inject
//! closures, production code uses `ReqwestTransport`. Transport errors are
//! returned as-is and the dispatch pipeline does not retry or re-wrap them.

use std::future::Future;

use futures::future::{BoxFuture, FutureExt};
use http::HeaderMap;

use url::Url;

use crate::error::TransportError;
use crate::http::{Credentials, HttpRequest, HttpResponse};

pub trait Transport: Send + Sync + 'static {
    fn fetch(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>>;
}

impl<F, Fut> Transport for F
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, TransportError>> + Send + 'static,
{
    fn fetch(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>> {
        self(request).boxed()
    }
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn fetch(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, TransportError>> {
        let client = self.client.clone();
        async move {
            let url = wire_url(request.url, request.credentials);
            let mut builder = client
                .request(request.method.into(), url)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let res = builder.send().await?;
            let status = res.status().as_u16();
            let url = res.url().to_string();
            let headers: HeaderMap = res.headers().clone();
            // Note: the whole body is buffered, streaming is not supported
            let body = res.bytes().await?;

            Ok(HttpResponse::new(status, url, headers, body))
        }
        .boxed()
    }
}

/// Drop URL userinfo when credentials are omitted; reqwest would otherwise
/// send it as Basic auth.
fn wire_url(mut url: Url, credentials: Credentials) -> Url {
    if credentials == Credentials::Omit && url.has_authority() {
        let _ = url.set_username("");
        let _ = url.set_password(None);
    }
    url
}
