//! Response envelope `{ success, data?, message? }`.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ApiError, Endpoint, classify};

/// Splits a raw response into its payload or a classified failure.
///
/// A non-2xx status or `success: false` is a failure. Bodies that are not
/// JSON are tolerated on failures (proxies return HTML error pages).
pub(crate) fn unwrap_envelope(status: u16, body: &str, endpoint: Endpoint) -> Result<Value, ApiError> {
    let ok_status = (200..300).contains(&status);
    let parsed = if body.trim().is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str::<Value>(body)
    };

    let value = match parsed {
        Ok(value) => value,
        Err(err) if ok_status => return Err(ApiError::Decode(err.to_string())),
        Err(_) => Value::Null,
    };

    let success = value
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(ok_status);

    if !ok_status || !success {
        // `success: false` with a 2xx status is treated like a bad request.
        let status = if ok_status { 400 } else { status };
        return Err(classify(status, failure_message(&value, status), endpoint));
    }

    Ok(value.get("data").cloned().unwrap_or(Value::Null))
}

fn failure_message(value: &Value, status: u16) -> String {
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|code| code.canonical_reason())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}

/// Deserializes an envelope payload.
pub(crate) fn decode<T: DeserializeOwned>(data: Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(data).map_err(|err| ApiError::Decode(format!("{what}: {err}")))
}

/// Deserializes a payload that is either `T` or `{ "<key>": T }`.
pub(crate) fn decode_nested<T: DeserializeOwned>(
    mut data: Value,
    key: &str,
    what: &str,
) -> Result<T, ApiError> {
    if let Some(inner) = data.get_mut(key) {
        return decode(inner.take(), what);
    }
    decode(data, what)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_success_returns_data() {
        let body = r#"{"success": true, "data": {"valid": true}}"#;
        let data = unwrap_envelope(200, body, Endpoint::Public).unwrap();
        assert_eq!(data, json!({"valid": true}));
    }

    #[test]
    fn test_success_false_on_2xx_is_failure() {
        let body = r#"{"success": false, "message": "Email đã tồn tại"}"#;
        let err = unwrap_envelope(200, body, Endpoint::Public).unwrap_err();
        assert_eq!(err, ApiError::Validation("Email đã tồn tại".into()));
    }

    #[test]
    fn test_non_json_failure_uses_reason_phrase() {
        let err = unwrap_envelope(502, "<html>bad gateway</html>", Endpoint::Authenticated)
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 502,
                message: "Bad Gateway".into()
            }
        );
    }

    #[test]
    fn test_non_json_success_is_decode_error() {
        let err = unwrap_envelope(200, "<html>", Endpoint::Public).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_decode_nested_accepts_both_shapes() {
        let wrapped: Vec<u8> = decode_nested(json!({"user": [1, 2]}), "user", "user").unwrap();
        let bare: Vec<u8> = decode_nested(json!([1, 2]), "user", "user").unwrap();
        assert_eq!(wrapped, bare);
    }
}
