//! Raw (pre-serialization) request bodies and their merge rules.

use bytes::Bytes;
use serde_json::Value;

use crate::error::{FetchError, Result};
use crate::form::FormData;
use crate::media::{FORM_URLENCODED, JSON};

/// A request body as the builder accumulates it. Only turned into bytes
/// after the body pipe has run.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBody {
    /// Urlencoded form data or any other preformatted text.
    Text(String),
    Json(Value),
    Form(FormData),
}

/// A serialized body and the content type it implies.
#[derive(Debug, Clone)]
pub(crate) struct WireBody {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    /// Multipart bodies must replace any existing content type, since the
    /// boundary is only known here.
    pub forced: bool,
}

impl RawBody {
    /// Combine `incoming` into `existing`.
    ///
    /// text + text joins with `&`, form + form merges field-wise, array +
    /// array concatenates, object + object shallow-merges. Any other pairing
    /// replaces the body with `incoming`.
    pub fn merge(existing: Option<RawBody>, incoming: RawBody) -> RawBody {
        match (existing, incoming) {
            (Some(RawBody::Text(a)), RawBody::Text(b)) => RawBody::Text(format!("{a}&{b}")),
            (Some(RawBody::Form(mut a)), RawBody::Form(b)) => {
                a.assign(b);
                RawBody::Form(a)
            }
            (Some(RawBody::Json(Value::Array(mut a))), RawBody::Json(Value::Array(b))) => {
                a.extend(b);
                RawBody::Json(Value::Array(a))
            }
            (Some(RawBody::Json(Value::Object(mut a))), RawBody::Json(Value::Object(b))) => {
                a.extend(b);
                RawBody::Json(Value::Object(a))
            }
            (_, incoming) => incoming,
        }
    }

    /// Content type implied by this body; forms carry their own.
    pub fn inferred_content_type(&self) -> Option<&'static str> {
        match self {
            RawBody::Text(_) => Some(FORM_URLENCODED),
            RawBody::Json(_) => Some(JSON),
            RawBody::Form(_) => None,
        }
    }

    /// Force a multipart representation.
    ///
    /// Text is read as urlencoded pairs and a JSON object becomes one field
    /// per key. Other JSON values have no field structure and are dropped.
    pub fn into_form(self) -> FormData {
        match self {
            RawBody::Form(form) => form,
            RawBody::Text(text) => {
                let mut form = FormData::new();
                for (k, v) in url::form_urlencoded::parse(text.as_bytes()) {
                    form.append(k, v);
                }
                form
            }
            RawBody::Json(Value::Object(map)) => {
                let mut form = FormData::new();
                for (k, v) in map {
                    match v {
                        Value::String(s) => form.append(k, s),
                        other => form.append(k, other.to_string()),
                    }
                }
                form
            }
            RawBody::Json(other) => {
                tracing::debug!(body = %other, "discarding non-object json body for multipart form");
                FormData::new()
            }
        }
    }

    pub(crate) fn into_wire(self) -> Result<WireBody> {
        match self {
            RawBody::Text(text) => Ok(WireBody {
                bytes: Bytes::from(text),
                content_type: Some(FORM_URLENCODED.to_string()),
                forced: false,
            }),
            RawBody::Json(value) => {
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| FetchError::Serialization(e.to_string()))?;
                Ok(WireBody {
                    bytes: Bytes::from(bytes),
                    content_type: Some(JSON.to_string()),
                    forced: false,
                })
            }
            RawBody::Form(form) => {
                let boundary = FormData::new_boundary();
                Ok(WireBody {
                    bytes: form.encode(&boundary),
                    content_type: Some(FormData::content_type(&boundary)),
                    forced: true,
                })
            }
        }
    }
}

impl From<&str> for RawBody {
    fn from(s: &str) -> Self {
        RawBody::Text(s.to_string())
    }
}

impl From<String> for RawBody {
    fn from(s: String) -> Self {
        RawBody::Text(s)
    }
}

impl From<Value> for RawBody {
    fn from(value: Value) -> Self {
        RawBody::Json(value)
    }
}

impl From<FormData> for RawBody {
    fn from(form: FormData) -> Self {
        RawBody::Form(form)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::form::FormValue;

    #[test]
    fn text_concatenates_with_ampersand() {
        let body = RawBody::merge(Some("form=true".into()), "cats=1".into());
        assert_eq!(body, RawBody::Text("form=true&cats=1".to_string()));
    }

    #[test]
    fn objects_shallow_merge() {
        let body = RawBody::merge(Some(json!({"a": 1, "b": 1}).into()), json!({"b": 2}).into());
        assert_eq!(body, RawBody::Json(json!({"a": 1, "b": 2})));
    }

    #[test]
    fn arrays_concatenate() {
        let body = RawBody::merge(
            Some(json!(["blue", "yellow", "green"]).into()),
            json!(["red", "purple"]).into(),
        );
        assert_eq!(
            body,
            RawBody::Json(json!(["blue", "yellow", "green", "red", "purple"]))
        );
    }

    #[test]
    fn mismatched_kinds_replace() {
        let body = RawBody::merge(Some(json!({"a": 1}).into()), "a=1".into());
        assert_eq!(body, RawBody::Text("a=1".to_string()));
        let body = RawBody::merge(Some(json!([1]).into()), json!({"a": 1}).into());
        assert_eq!(body, RawBody::Json(json!({"a": 1})));
        let body = RawBody::merge(None, json!(1).into());
        assert_eq!(body, RawBody::Json(json!(1)));
    }

    #[test]
    fn forms_merge_field_wise() {
        let mut a = FormData::new();
        a.append("name", "jobi");
        let mut b = FormData::new();
        b.append("name", "bob");
        b.append("hog", "wild");
        let RawBody::Form(form) = RawBody::merge(Some(a.into()), b.into()) else {
            panic!("expected form body");
        };
        assert_eq!(form.get("name"), Some(&FormValue::Text("bob".to_string())));
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn inferred_content_types() {
        assert_eq!(
            RawBody::from("a=1").inferred_content_type(),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(
            RawBody::from(json!([])).inferred_content_type(),
            Some("application/json")
        );
        assert_eq!(RawBody::from(FormData::new()).inferred_content_type(), None);
    }

    #[test]
    fn into_form_converts_text_and_objects() {
        let form = RawBody::from("a=1&b=two").into_form();
        assert_eq!(form.get("b"), Some(&FormValue::Text("two".to_string())));

        let form = RawBody::from(json!({"s": "x", "n": 2, "t": true})).into_form();
        assert_eq!(form.get("s"), Some(&FormValue::Text("x".to_string())));
        assert_eq!(form.get("n"), Some(&FormValue::Text("2".to_string())));
        assert_eq!(form.get("t"), Some(&FormValue::Text("true".to_string())));

        assert!(RawBody::from(json!([1, 2])).into_form().is_empty());
    }

    #[test]
    fn form_wire_body_forces_boundary_content_type() {
        let mut form = FormData::new();
        form.append("a", "1");
        let wire = RawBody::from(form).into_wire().unwrap();
        assert!(wire.forced);
        let content_type = wire.content_type.unwrap();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        assert!(std::str::from_utf8(&wire.bytes)
            .unwrap()
            .starts_with(&format!("--{boundary}\r\n")));
    }

    #[test]
    fn json_wire_body_is_compact() {
        let wire = RawBody::from(json!({"name": "jobi"})).into_wire().unwrap();
        assert_eq!(&wire.bytes[..], br#"{"name":"jobi"}"#);
        assert!(!wire.forced);
    }
}
