//! Media type constants and the shorthand names accepted by `set_type` and
//! `accept`.

pub const JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM: &str = "multipart/form-data";
pub const HTML: &str = "text/html";
pub const XML: &str = "text/xml";

/// Expand a shorthand such as `json` or `form`; full media types pass
/// through unchanged.
pub fn resolve(type_or_shorthand: &str) -> &str {
    match type_or_shorthand {
        "html" => HTML,
        "json" => JSON,
        "xml" => XML,
        "urlencoded" | "form" => FORM_URLENCODED,
        "form-data" | "multipart" => MULTIPART_FORM,
        other => other,
    }
}
