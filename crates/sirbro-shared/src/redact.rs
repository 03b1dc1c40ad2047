//! Redaction of credentials before they reach a log sink.

use serde_json::{Map, Value};

/// Keys whose values are redacted by [`create_safe_log_data`].
pub const SENSITIVE_FIELDS: [&str; 5] = ["token", "accessToken", "refreshToken", "apiKey", "secret"];

/// Tokens up to this many characters are masked completely.
const FULL_MASK_MAX_LEN: usize = 10;
const KEEP_PREFIX: usize = 6;
const KEEP_SUFFIX: usize = 4;
const FULL_MASK: &str = "***";

/// Redact a token for logging.
///
/// - `None` or empty: `None`
/// - up to 10 characters: `"***"`
/// - longer: first 6 and last 4 characters kept, one `*` per hidden character,
///   so the output has the same length as the input.
pub fn redact_token(token: Option<&str>) -> Option<String> {
    let token = token.filter(|t| !t.is_empty())?;

    let len = token.chars().count();
    if len <= FULL_MASK_MAX_LEN {
        return Some(FULL_MASK.to_string());
    }

    let mut out = String::with_capacity(token.len());
    for (i, c) in token.chars().enumerate() {
        if i < KEEP_PREFIX || i >= len - KEEP_SUFFIX {
            out.push(c);
        } else {
            out.push('*');
        }
    }
    Some(out)
}

/// Shallow copy of `data` with every truthy [`SENSITIVE_FIELDS`] entry redacted.
///
/// Values that are not strings cannot be partially revealed and are replaced
/// by `null`. Falsy values (`null`, `false`, `0`, `""`) are left as they are.
pub fn create_safe_log_data(data: &Map<String, Value>) -> Map<String, Value> {
    let mut safe = data.clone();

    for field in SENSITIVE_FIELDS {
        let Some(value) = safe.get_mut(field) else {
            continue;
        };
        if !is_truthy(value) {
            continue;
        }
        *value = match redact_token(value.as_str()) {
            Some(redacted) => Value::String(redacted),
            None => Value::Null,
        };
    }

    safe
}

/// Basic shape check: at least 10 characters of `[A-Za-z0-9._-]`.
pub fn is_valid_token_format(token: Option<&str>) -> bool {
    let Some(token) = token else {
        return false;
    };
    token.len() >= 10
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
