//! Multipart form bodies.
//!
//! # Design
//! `FormData` keeps entries in insertion order and is only turned into bytes
//! at dispatch, so merging two forms stays a field-wise operation. The
//! boundary is chosen at encoding time and returned alongside the body.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

/// A single form field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(FilePart),
}

/// Binary attachment with optional filename and content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub data: Bytes,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

/// Options for `FluentRequest::attach`.
#[derive(Debug, Clone, Default)]
pub struct AttachOptions {
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl AttachOptions {
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .push((name.into(), FormValue::Text(value.into())));
    }

    pub fn append_file(&mut self, name: impl Into<String>, data: impl Into<Bytes>, options: AttachOptions) {
        let part = FilePart {
            data: data.into(),
            filename: options.filename,
            content_type: options.content_type,
        };
        self.entries.push((name.into(), FormValue::File(part)));
    }

    /// Replace every entry named `name` with `value`, keeping the position of
    /// the first one. Appends when the name is absent.
    pub fn set(&mut self, name: impl Into<String>, value: FormValue) {
        let name = name.into();
        match self.entries.iter().position(|(k, _)| *k == name) {
            Some(first) => {
                self.entries[first].1 = value;
                let mut index = 0;
                self.entries.retain(|(k, _)| {
                    let keep = index <= first || *k != name;
                    index += 1;
                    keep
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    /// Field-wise merge of `other` into `self`; the last write wins.
    pub fn assign(&mut self, other: FormData) {
        for (name, value) in other.entries {
            self.set(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormValue> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn new_boundary() -> String {
        format!("fluently-{}", Uuid::new_v4().simple())
    }

    pub fn content_type(boundary: &str) -> String {
        format!("multipart/form-data; boundary={boundary}")
    }

    /// Encode as a `multipart/form-data` body delimited by `boundary`.
    pub fn encode(&self, boundary: &str) -> Bytes {
        let mut buf = BytesMut::new();
        for (name, value) in &self.entries {
            buf.put_slice(format!("--{boundary}\r\n").as_bytes());
            match value {
                FormValue::Text(text) => {
                    buf.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                            escape_quoted(name)
                        )
                        .as_bytes(),
                    );
                    buf.put_slice(text.as_bytes());
                }
                FormValue::File(part) => {
                    let filename = part.filename.as_deref().unwrap_or(name);
                    let content_type = part
                        .content_type
                        .as_deref()
                        .unwrap_or("application/octet-stream");
                    buf.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                             Content-Type: {content_type}\r\n\r\n",
                            escape_quoted(name),
                            escape_quoted(filename)
                        )
                        .as_bytes(),
                    );
                    buf.put_slice(&part.data);
                }
            }
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(format!("--{boundary}--\r\n").as_bytes());
        buf.freeze()
    }
}

fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
