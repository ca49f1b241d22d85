//! Fluent request builder.
//!
//! # Design
//! Every builder method takes `self` by value and hands back the updated
//! builder, so configuration flows through one owner at a time. `Clone` is a
//! deep copy: a clone gets its own header map, body and pipe lists, and later
//! changes to either side stay on that side. Nothing touches the network
//! until the builder is dispatched (`dispatch()`, `end()` or `.await`).

use std::cmp::Ordering;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use url::Url;

use crate::auth::{basic_auth, bearer_auth, AuthType};
use crate::body::RawBody;
use crate::error::{FetchError, Result};
use crate::form::{AttachOptions, FormData};
use crate::http::{Credentials, HttpMethod, HttpResponse};
use crate::media;
use crate::pipe::{Pipe, PluginChain};
use crate::query::{QueryInput, QueryParams};
#[cfg(feature = "app")]
use crate::server::App;
use crate::transport::Transport;

/// Overrides applied by `FluentRequest::clone_with`. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default)]
pub struct RequestInit {
    pub method: Option<HttpMethod>,
    pub url: Option<Url>,
    pub headers: Option<HeaderMap>,
    pub body: Option<RawBody>,
    pub credentials: Option<Credentials>,
    pub timeout: Option<Duration>,
}

/// One request under construction.
#[derive(Clone)]
pub struct FluentRequest {
    pub(crate) method: HttpMethod,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    /// `Content-Type` came from the caller rather than from the body.
    pub(crate) content_type_explicit: bool,
    pub(crate) body: Option<RawBody>,
    pub(crate) credentials: Credentials,
    pub(crate) timeout: Option<Duration>,
    pub(crate) body_pipe: Pipe<RawBody>,
    pub(crate) response_pipe: Pipe<HttpResponse>,
    pub(crate) plugins: PluginChain<FluentRequest>,
    pub(crate) transport: Arc<dyn Transport>,
    #[cfg(feature = "app")]
    pub(crate) app: Option<App>,
}

impl FluentRequest {
    pub fn new(url: Url, transport: Arc<dyn Transport>) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers: HeaderMap::new(),
            content_type_explicit: false,
            body: None,
            credentials: Credentials::default(),
            timeout: None,
            body_pipe: Pipe::new(),
            response_pipe: Pipe::new(),
            plugins: PluginChain::new(),
            transport,
            #[cfg(feature = "app")]
            app: None,
        }
    }

    /// Target an in-process application. A listener is started for each
    /// dispatch and closed once the response has been captured; the URL's
    /// host and port are rewritten to the listener's address.
    #[cfg(feature = "app")]
    pub fn with_app(mut self, app: impl Into<App>) -> Self {
        self.app = Some(app.into());
        self
    }

    // -----------------------------------------------------------------------
    // Method and path
    // -----------------------------------------------------------------------

    /// Set the method and replace the URL path, leaving scheme, host, query
    /// and credentials as they are.
    pub fn set_method_and_path(mut self, method: HttpMethod, path: &str) -> Self {
        self.method = method;
        self.url.set_path(path);
        self
    }

    pub fn set_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn get(self, path: &str) -> Self {
        self.set_method_and_path(HttpMethod::Get, path)
    }

    pub fn post(self, path: &str) -> Self {
        self.set_method_and_path(HttpMethod::Post, path)
    }

    pub fn put(self, path: &str) -> Self {
        self.set_method_and_path(HttpMethod::Put, path)
    }

    pub fn patch(self, path: &str) -> Self {
        self.set_method_and_path(HttpMethod::Patch, path)
    }

    pub fn delete(self, path: &str) -> Self {
        self.set_method_and_path(HttpMethod::Delete, path)
    }

    pub fn options(self, path: &str) -> Self {
        self.set_method_and_path(HttpMethod::Options, path)
    }

    pub fn head(self, path: &str) -> Self {
        self.set_method_and_path(HttpMethod::Head, path)
    }

    // -----------------------------------------------------------------------
    // Headers
    // -----------------------------------------------------------------------

    /// Set a header from already-validated parts, replacing previous values.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        if name == CONTENT_TYPE {
            self.content_type_explicit = true;
        }
        self.headers.insert(name, value);
        self
    }

    /// Set a header, replacing previous values. Names are case-insensitive.
    pub fn set_header(self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = parse_header(name, value)?;
        Ok(self.header(name, value))
    }

    /// Set every header in `headers`. Nothing is applied if any entry is invalid.
    pub fn set_headers<I, K, V>(mut self, headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let parsed = headers
            .into_iter()
            .map(|(k, v)| parse_header(k.as_ref(), v.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        for (name, value) in parsed {
            self = self.header(name, value);
        }
        Ok(self)
    }

    /// Set `Content-Type`; shorthands like `json` or `form` are expanded.
    pub fn set_type(self, content_type: &str) -> Result<Self> {
        let value = header_value(media::resolve(content_type))?;
        Ok(self.header(CONTENT_TYPE, value))
    }

    /// Set `Accept`; shorthands like `json` or `form` are expanded.
    pub fn accept(self, accept: &str) -> Result<Self> {
        let value = header_value(media::resolve(accept))?;
        Ok(self.header(ACCEPT, value))
    }

    // -----------------------------------------------------------------------
    // Query
    // -----------------------------------------------------------------------

    /// Merge `input` into the current query, overwriting same-named params.
    pub fn set_query(mut self, input: impl Into<QueryInput>) -> Self {
        let mut params = QueryParams::from_url(&self.url);
        params.merge(input.into().into_params());
        params.apply_to(&mut self.url);
        self
    }

    pub fn query(self, input: impl Into<QueryInput>) -> Self {
        self.set_query(input)
    }

    /// Sort the query by name, then value.
    pub fn sort_query(mut self) -> Self {
        let mut params = QueryParams::from_url(&self.url);
        params.sort();
        params.apply_to(&mut self.url);
        self
    }

    /// Sort the query with a comparator over `(name, value)` pairs.
    pub fn sort_query_by<F>(mut self, compare: F) -> Self
    where
        F: FnMut(&(String, String), &(String, String)) -> Ordering,
    {
        let mut params = QueryParams::from_url(&self.url);
        params.sort_by(compare);
        params.apply_to(&mut self.url);
        self
    }

    // -----------------------------------------------------------------------
    // Auth and credentials
    // -----------------------------------------------------------------------

    /// Basic auth when a password is given, a bearer token otherwise.
    pub fn set_auth(self, user_or_token: &str, password: Option<&str>) -> Result<Self> {
        match password {
            Some(_) => self.set_auth_with(user_or_token, password, AuthType::Basic),
            None => self.set_auth_with(user_or_token, None, AuthType::Bearer),
        }
    }

    pub fn set_auth_with(
        mut self,
        user_or_token: &str,
        password: Option<&str>,
        auth_type: AuthType,
    ) -> Result<Self> {
        match auth_type {
            AuthType::Basic => {
                let value = basic_auth(user_or_token, password)?;
                Ok(self.header(AUTHORIZATION, value))
            }
            AuthType::Bearer => {
                let value = bearer_auth(user_or_token)?;
                Ok(self.header(AUTHORIZATION, value))
            }
            AuthType::Auto => {
                self.url
                    .set_username(user_or_token)
                    .map_err(|_| FetchError::InvalidUrl(format!("{} cannot carry credentials", self.url)))?;
                self.url
                    .set_password(password)
                    .map_err(|_| FetchError::InvalidUrl(format!("{} cannot carry credentials", self.url)))?;
                Ok(self)
            }
        }
    }

    pub fn with_credentials(mut self) -> Self {
        self.credentials = Credentials::Include;
        self
    }

    // -----------------------------------------------------------------------
    // Body
    // -----------------------------------------------------------------------

    /// Merge `data` into the raw body. Unless the caller set `Content-Type`,
    /// it follows the shape of the merged body.
    pub fn add_data(mut self, data: impl Into<RawBody>) -> Self {
        self.body = Some(RawBody::merge(self.body.take(), data.into()));
        self.infer_content_type();
        self
    }

    pub fn send(self, data: impl Into<RawBody>) -> Self {
        self.add_data(data)
    }

    /// `add_data` with any serializable value.
    pub fn add_json<T: Serialize + ?Sized>(self, data: &T) -> Result<Self> {
        let value =
            serde_json::to_value(data).map_err(|e| FetchError::Serialization(e.to_string()))?;
        Ok(self.add_data(value))
    }

    pub fn set_field(self, name: &str, value: impl ToString) -> Self {
        self.with_form(|form| form.append(name, value.to_string()))
    }

    /// Append one `name` entry per value.
    pub fn set_field_values<I>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        self.with_form(|form| {
            for value in values {
                form.append(name, value.to_string());
            }
        })
    }

    pub fn set_fields<I, K, V>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.with_form(|form| {
            for (name, value) in fields {
                form.append(name, value.to_string());
            }
        })
    }

    /// Append a binary attachment to the multipart body.
    pub fn attach(self, name: &str, data: impl Into<bytes::Bytes>, options: AttachOptions) -> Self {
        self.with_form(|form| form.append_file(name, data, options))
    }

    fn with_form(mut self, update: impl FnOnce(&mut FormData)) -> Self {
        let mut form = self
            .body
            .take()
            .map(RawBody::into_form)
            .unwrap_or_default();
        update(&mut form);
        self.body = Some(RawBody::Form(form));
        self.infer_content_type();
        self
    }

    fn infer_content_type(&mut self) {
        if self.content_type_explicit {
            return;
        }
        match self.body.as_ref().and_then(RawBody::inferred_content_type) {
            Some(inferred) => {
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(inferred));
            }
            None => {
                self.headers.remove(CONTENT_TYPE);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pipes
    // -----------------------------------------------------------------------

    /// Append a body transform. Serializers run in registration order, each
    /// receiving the previous one's output.
    pub fn add_body_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(RawBody) -> RawBody + Send + Sync + 'static,
    {
        self.body_pipe.push_sync(serializer);
        self
    }

    pub fn add_async_body_serializer<F, Fut>(mut self, serializer: F) -> Self
    where
        F: Fn(RawBody) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RawBody>> + Send + 'static,
    {
        self.body_pipe.push(serializer);
        self
    }

    pub fn serialize<F>(self, serializer: F) -> Self
    where
        F: Fn(RawBody) -> RawBody + Send + Sync + 'static,
    {
        self.add_body_serializer(serializer)
    }

    /// Reject responses for which `check` returns false with
    /// `FetchError::ResponseRejected`.
    pub fn add_ok_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&HttpResponse) -> bool + Send + Sync + 'static,
    {
        self.response_pipe.push(move |res: HttpResponse| {
            let passed = check(&res);
            async move { verdict(res, passed) }
        });
        self
    }

    /// Like `add_ok_check`, with a check that receives its own copy of the
    /// response and answers asynchronously.
    pub fn add_async_ok_check<F, Fut>(mut self, check: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.response_pipe.push(move |res: HttpResponse| {
            let pending = check(res.clone());
            async move {
                let passed = pending.await;
                verdict(res, passed)
            }
        });
        self
    }

    pub fn ok<F>(self, check: F) -> Self
    where
        F: Fn(&HttpResponse) -> bool + Send + Sync + 'static,
    {
        self.add_ok_check(check)
    }

    /// Append an arbitrary response transform.
    pub fn pipe_response<F, Fut>(mut self, transform: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse>> + Send + 'static,
    {
        self.response_pipe.push(transform);
        self
    }

    /// Register a plugin. Plugins run once, in order, when the request is
    /// dispatched, before the body is serialized.
    pub fn use_plugin<F>(mut self, plugin: F) -> Self
    where
        F: Fn(FluentRequest) -> FluentRequest + Send + Sync + 'static,
    {
        self.plugins.push(plugin);
        self
    }

    // -----------------------------------------------------------------------
    // Misc
    // -----------------------------------------------------------------------

    /// Fail with `FetchError::Timeout` when the transport has not answered
    /// within `timeout`.
    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn set_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Clone, then apply every override that is set.
    pub fn clone_with(&self, overrides: RequestInit) -> Self {
        let mut req = self.clone();
        if let Some(method) = overrides.method {
            req.method = method;
        }
        if let Some(url) = overrides.url {
            req.url = url;
        }
        if let Some(headers) = overrides.headers {
            req.content_type_explicit = headers.contains_key(CONTENT_TYPE);
            req.headers = headers;
        }
        if let Some(body) = overrides.body {
            req.body = Some(body);
        }
        if let Some(credentials) = overrides.credentials {
            req.credentials = credentials;
        }
        if let Some(timeout) = overrides.timeout {
            req.timeout = Some(timeout);
        }
        req
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw body, before any serializer has run.
    pub fn body(&self) -> Option<&RawBody> {
        self.body.as_ref()
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    pub async fn dispatch(self) -> Result<HttpResponse> {
        crate::dispatch::dispatch(self).await
    }

    /// Dispatch and hand the outcome to `callback`.
    pub async fn end<F, R>(self, callback: F) -> R
    where
        F: FnOnce(Result<HttpResponse>) -> R,
    {
        callback(self.dispatch().await)
    }
}

impl IntoFuture for FluentRequest {
    type Output = Result<HttpResponse>;
    type IntoFuture = BoxFuture<'static, Result<HttpResponse>>;

    fn into_future(self) -> Self::IntoFuture {
        self.dispatch().boxed()
    }
}

impl fmt::Debug for FluentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FluentRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .field("body_pipe", &self.body_pipe)
            .field("response_pipe", &self.response_pipe)
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

fn verdict(res: HttpResponse, passed: bool) -> Result<HttpResponse> {
    if passed {
        Ok(res)
    } else {
        Err(FetchError::ResponseRejected {
            response: Box::new(res),
        })
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| FetchError::invalid_argument(format!("invalid header name: {name:?}")))?;
    Ok((name, header_value(value)?))
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| FetchError::invalid_argument(format!("invalid header value: {value:?}")))
}
