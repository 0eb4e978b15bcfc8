//! Redaction of secrets before they reach the audit trail.

use serde_json::Value;

use crate::store::Fields;

pub const REDACTED: &str = "[REDACTED]";

/// Normalized key fragments that mark a field as secret.
const SENSITIVE_KEY_FRAGMENTS: [&str; 10] = [
    "password",
    "passwd",
    "secret",
    "token",
    "apikey",
    "privatekey",
    "cardnumber",
    "creditcard",
    "cvv",
    "cvc",
];

#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

/// Replace the values of secret-looking keys, at any depth, with [`REDACTED`].
#[must_use]
pub fn sanitize(mut data: Fields) -> Fields {
    sanitize_fields(&mut data);
    data
}

fn sanitize_fields(data: &mut Fields) {
    for (key, value) in data.iter_mut() {
        if is_sensitive_key(key) {
            *value = Value::String(REDACTED.to_string());
        } else {
            sanitize_value(value);
        }
    }
}

fn sanitize_value(value: &mut Value) {
    match value {
        Value::Object(fields) => sanitize_fields(fields),
        Value::Array(items) => items.iter_mut().for_each(sanitize_value),
        _ => {}
    }
}
