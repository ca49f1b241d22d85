//! Echo server the request builder is tested against.
//!
//! Every route reflects what it received so tests can assert on the wire
//! format: `/echo` returns method, URL, headers, query and decoded body;
//! `/echo-form` returns the fields and files of a multipart body. The rest
//! produce fixed behaviors (delays, statuses, auth challenges).

use std::time::Duration;

use axum::{
    extract::{Multipart, OriginalUri, Path},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get, post},
    Json, Router,
};
use base64::prelude::*;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/echo-form", post(echo_form))
        .route("/delay/{ms}", any(delay))
        .route("/status/{code}", any(status))
        .route("/error", any(error))
        .route("/auth/{user}/{pass}", get(auth))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Json<Value> {
    tracing::debug!(%method, %uri, bytes = body.len(), "echo");
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    Json(json!({
        "method": method.as_str(),
        "url": uri.to_string(),
        "headers": headers_to_json(&headers),
        "query": pairs_to_object(url::form_urlencoded::parse(
            uri.query().unwrap_or_default().as_bytes()
        )),
        "body": decode_body(&content_type, &body),
    }))
}

async fn echo_form(
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, axum::extract::multipart::MultipartError> {
    let mut fields = Map::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                files.push(json!({
                    "field": name,
                    "name": file_name,
                    "type": content_type,
                    "size": data.len(),
                }));
            }
            None => {
                let text = field.text().await?;
                insert_pair(&mut fields, name, text);
            }
        }
    }
    tracing::debug!(fields = fields.len(), files = files.len(), "echo-form");

    Ok(Json(json!({
        "headers": headers_to_json(&headers),
        "body": fields,
        "files": files,
    })))
}

async fn delay(Path(ms): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "ok"
}

async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, status.canonical_reason().unwrap_or_default().to_string()),
        Err(_) => (StatusCode::BAD_REQUEST, format!("invalid status code: {code}")),
    }
}

async fn error() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "something went wrong" })),
    )
}

async fn auth(Path((user, pass)): Path<(String, String)>, headers: HeaderMap) -> impl IntoResponse {
    let Some((given_user, given_pass)) = basic_credentials(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"mock\"")],
            Json(json!({ "authenticated": false })),
        )
            .into_response();
    };
    if given_user != user || given_pass != pass {
        return (StatusCode::FORBIDDEN, Json(json!({ "authenticated": false }))).into_response();
    }
    Json(json!({ "authenticated": true, "user": user })).into_response()
}

/// Decode `Authorization: Basic ...` into user and password.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn decode_body(content_type: &str, body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "application/json" => serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned())),
        "application/x-www-form-urlencoded" => {
            Value::Object(pairs_to_object(url::form_urlencoded::parse(body)))
        }
        _ => Value::String(String::from_utf8_lossy(body).into_owned()),
    }
}

fn headers_to_json(headers: &HeaderMap) -> Value {
    let mut out = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(", ");
        out.insert(name.as_str().to_string(), Value::String(joined));
    }
    Value::Object(out)
}

/// Collect pairs into an object; a repeated name becomes an array.
fn pairs_to_object<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Map<String, Value>
where
    K: Into<String>,
    V: Into<String>,
{
    let mut out = Map::new();
    for (k, v) in pairs {
        insert_pair(&mut out, k.into(), v.into());
    }
    out
}

fn insert_pair(out: &mut Map<String, Value>, name: String, value: String) {
    match out.get_mut(&name) {
        Some(Value::Array(values)) => values.push(Value::String(value)),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, Value::String(value)]);
        }
        None => {
            out.insert(name, Value::String(value));
        }
    }
}
