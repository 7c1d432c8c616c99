//! Request encoding and response interpretation for the report endpoint.

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use relay_core::ErrorInfo;

/// Longest response body kept in a `Status` error.
pub(crate) const MAX_ERROR_BODY: usize = 2048;

/// Token identifying one download, taken from the request data when the
/// caller supplied one.
///
/// The token ends up in fallback file names, so only `[A-Za-z0-9_-]` tokens
/// are kept; anything else is replaced by a fresh uuid.
pub fn request_token(data: &Map<String, Value>) -> String {
    match data.get("token").and_then(Value::as_str) {
        Some(token) if is_safe_token(token) => token.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}

fn is_safe_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Encode action data as form fields.
///
/// Strings are sent as-is, everything else as JSON (so a missing record id
/// goes out as `null`). The token field is always last.
pub fn form_fields(data: &Map<String, Value>, token: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = data
        .iter()
        .filter(|(key, _)| key.as_str() != "token")
        .map(|(key, value)| {
            let encoded = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), encoded)
        })
        .collect();
    fields.push(("token".to_string(), token.to_string()));
    fields
}

/// File name from a `Content-Disposition` header.
///
/// `filename*` wins over `filename`. Path components are stripped.
pub fn file_name_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in split_params(header).into_iter().skip(1) {
        let Some((name, value)) = param.split_once('=') else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "filename*" => extended = decode_extended(value.trim()),
            "filename" => plain = Some(unquote(value.trim())),
            _ => {}
        }
    }

    extended.or(plain).and_then(|name| sanitize_file_name(&name))
}

/// Name used when the response does not carry one.
pub fn fallback_file_name(token: &str, data: &Map<String, Value>) -> String {
    let extension = data
        .get("output_format")
        .and_then(Value::as_str)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    format!("report-{}.{}", token, extension)
}

/// Recognize the service's error envelope, possibly HTML-escaped.
///
/// ```text
/// {&quot;code&quot;: 400, &quot;message&quot;: &quot;Bad Request&quot;, ...}
/// ```
pub fn parse_error_envelope(body: &str) -> Option<ErrorInfo> {
    let trimmed = body.trim();
    if !trimmed.starts_with('{') {
        return None;
    }

    let value: Value = serde_json::from_str(&html_unescape(trimmed)).ok()?;
    let is_envelope = value
        .as_object()
        .is_some_and(|obj| obj.contains_key("code") && obj.contains_key("message"));
    if !is_envelope {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Trim an error body to something fit for a log line.
pub(crate) fn truncate_body(body: String) -> String {
    if body.chars().count() <= MAX_ERROR_BODY {
        body
    } else {
        body.chars().take(MAX_ERROR_BODY).collect()
    }
}

fn split_params(header: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in header.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                current.push(c);
                in_quotes = !in_quotes;
            }
            ';' if !in_quotes => params.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    params.push(current);
    params
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

// charset'language'percent-encoded
fn decode_extended(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;

    let decoded = percent_decode_str(encoded);
    if charset.eq_ignore_ascii_case("utf-8") {
        decoded.decode_utf8().ok().map(|s| s.into_owned())
    } else {
        Some(decoded.decode_utf8_lossy().into_owned())
    }
}

fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name
        .rsplit(&['/', '\\'][..])
        .next()
        .unwrap_or(name)
        .trim()
        .trim_matches(char::is_control);
    match base {
        "" | "." | ".." => None,
        base => Some(base.to_string()),
    }
}

fn html_unescape(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
