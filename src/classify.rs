//! Turns transport outcomes into [`ApiResult`]s or typed errors.

use crate::error::ApiErrorInfo;
use crate::format::FormatErrorInfo;
use crate::response::{ApiResult, RawResponse};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::time::Duration;

/// Classifies the outcome of one dispatched request.
///
/// The first matching rule wins:
///
/// 1. a transport failure becomes [`Error::Internal`]
/// 2. a body that is not a JSON object becomes [`Error::InvalidResponseFormat`]
/// 3. a non-empty `errors` field becomes [`Error::Api`], messaged by its first item
/// 4. anything else is returned unchanged as an [`ApiResult`]
///
/// The HTTP status is not consulted.
pub fn classify(
    outcome: std::result::Result<RawResponse, reqwest::Error>,
    latency: Duration,
) -> Result<ApiResult> {
    let raw = match outcome {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(error = %e, "Transport failure");
            return Err(Error::Internal(e));
        }
    };

    let data = match raw.parsed {
        Some(Value::Object(ref data)) => data.clone(),
        ref parsed => {
            let info = FormatErrorInfo::from_text(&raw.text, parsed.as_ref());
            tracing::error!(
                status = raw.status.as_u16(),
                server_message = ?info.server_message,
                description = ?info.description,
                "Unexpected response format"
            );
            return Err(Error::InvalidResponseFormat(Box::new(info)));
        }
    };

    if let Some(errors) = reported_errors(&data) {
        let message = errors[0].message.clone();
        tracing::warn!(
            status = raw.status.as_u16(),
            error_count = errors.len(),
            message = %message,
            "API reported errors"
        );
        return Err(Error::Api {
            message,
            errors,
            response: Box::new(raw),
        });
    }

    Ok(ApiResult::new(data, raw.text, raw.status, raw.headers, latency))
}

/// Reads the `errors` envelope.
///
/// Returns `None` when the field is absent, `null`, `false` or empty. An
/// array yields one item per element; any other value is a single item.
fn reported_errors(data: &Map<String, Value>) -> Option<Vec<ApiErrorInfo>> {
    let errors = data.get("errors")?;
    let items = match errors {
        Value::Null | Value::Bool(false) => return None,
        Value::Array(items) if items.is_empty() => return None,
        Value::String(s) if s.is_empty() => return None,
        Value::Object(map) if map.is_empty() => return None,
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        single => vec![single],
    };

    Some(
        items
            .into_iter()
            .map(|item| ApiErrorInfo {
                message: error_text(item),
            })
            .collect(),
    )
}

fn error_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        other => match other.get("error") {
            Some(Value::String(s)) => s.clone(),
            _ => other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, StatusCode};
    use serde_json::json;

    fn raw(status: StatusCode, text: &str) -> RawResponse {
        RawResponse::new(status, HeaderMap::new(), text.to_string())
    }

    #[test]
    fn test_object_without_errors_is_success() {
        let body = json!({ "results": { "total_hits": 3 }, "errors": null });
        let result = classify(Ok(raw(StatusCode::OK, &body.to_string())), Duration::ZERO).unwrap();

        assert_eq!(Value::Object(result.data.clone()), body);
        assert_eq!(result.raw_body, body.to_string());
    }

    #[test]
    fn test_empty_errors_is_success() {
        let result = classify(Ok(raw(StatusCode::OK, r#"{"errors":[]}"#)), Duration::ZERO);
        assert!(result.is_ok());
    }

    #[test]
    fn test_first_error_wins() {
        let body = json!({
            "errors": [
                { "error": "publisher.required" },
                { "error": "what.invalid" }
            ]
        });
        let result = classify(Ok(raw(StatusCode::OK, &body.to_string())), Duration::ZERO);

        match result {
            Err(Error::Api {
                message,
                errors,
                response,
            }) => {
                assert_eq!(message, "publisher.required");
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[1].message, "what.invalid");
                assert_eq!(response.text, body.to_string());
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_item_without_error_field() {
        let result = classify(
            Ok(raw(StatusCode::BAD_REQUEST, r#"{"errors":[{"code":7}]}"#)),
            Duration::ZERO,
        );
        let err = result.unwrap_err();
        assert_eq!(err.message(), Some(r#"{"code":7}"#));
    }

    #[test]
    fn test_non_array_errors_field() {
        for body in [r#"{"errors":"boom"}"#, r#"{"errors":{"error":"boom"}}"#] {
            match classify(Ok(raw(StatusCode::OK, body)), Duration::ZERO) {
                Err(Error::Api { message, errors, .. }) => {
                    assert_eq!(message, "boom");
                    assert_eq!(errors.len(), 1);
                }
                other => panic!("Expected Api error for {}, got {:?}", body, other),
            }
        }

        let err = classify(Ok(raw(StatusCode::OK, r#"{"errors":404}"#)), Duration::ZERO).unwrap_err();
        assert_eq!(err.message(), Some("404"));
    }

    #[test]
    fn test_blank_errors_field_is_success() {
        for body in [
            r#"{"errors":null}"#,
            r#"{"errors":false}"#,
            r#"{"errors":""}"#,
            r#"{"errors":{}}"#,
        ] {
            let result = classify(Ok(raw(StatusCode::OK, body)), Duration::ZERO);
            assert!(result.is_ok(), "body {} should succeed, got {:?}", body, result);
        }
    }

    #[test]
    fn test_string_error_items() {
        let err = classify(Ok(raw(StatusCode::OK, r#"{"errors":["first","second"]}"#)), Duration::ZERO)
            .unwrap_err();
        assert_eq!(err.message(), Some("first"));
        assert_eq!(err.api_errors().unwrap()[1].message, "second");
    }

    #[test]
    fn test_non_object_bodies() {
        for body in ["[1,2]", "\"text\"", "42", "null", "not json at all"] {
            let result = classify(Ok(raw(StatusCode::OK, body)), Duration::ZERO);
            assert!(
                matches!(result, Err(Error::InvalidResponseFormat(_))),
                "body {:?} should be a format error",
                body
            );
        }
    }

    #[test]
    fn test_tomcat_page() {
        let html = "<html><head><title>Apache Tomcat/9.0 - Error report</title></head>\
                    <body><p><b>message</b><u>Not Found</u></p></body></html>";
        let err = classify(Ok(raw(StatusCode::NOT_FOUND, html)), Duration::ZERO).unwrap_err();

        let info = err.format_info().unwrap();
        assert_eq!(info.server_message.as_deref(), Some("Not Found"));
        assert_eq!(err.raw_response(), Some("<p><b>message</b><u>Not Found</u></p>"));
    }

    #[test]
    fn test_status_is_ignored_for_clean_objects() {
        let result = classify(Ok(raw(StatusCode::INTERNAL_SERVER_ERROR, "{}")), Duration::ZERO);
        assert_eq!(result.unwrap().status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
