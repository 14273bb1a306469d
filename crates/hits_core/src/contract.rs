use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Placeholder rendered when the counter cannot be read back after a
/// successful increment.
pub const MISSING_COUNT_PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Extract the unmodified URL path from an API Gateway v2 HTTP event.
///
/// The path is the partition key of the hit record, so an event without one
/// cannot name a record and is rejected before any store call.
pub fn raw_path(event: &Value) -> Result<String, ValidationError> {
    event
        .get("rawPath")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ValidationError::new("request event must include a rawPath string"))
}

pub fn hit_count_body(hits: &str) -> String {
    format!("You have connected with the Lambda ({hits} hits so far)")
}

pub fn html_response(status_code: u16, body: String) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "text/html"}),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_raw_path_from_http_event() {
        let event = json!({
            "version": "2.0",
            "rawPath": "/foo",
            "rawQueryString": "",
        });

        let path = raw_path(&event).expect("path should resolve");
        assert_eq!(path, "/foo");
    }

    #[test]
    fn rejects_event_without_raw_path() {
        let error = raw_path(&json!({"version": "2.0"})).expect_err("event should fail");
        assert_eq!(
            error.message(),
            "request event must include a rawPath string"
        );
    }

    #[test]
    fn rejects_non_string_raw_path() {
        let error = raw_path(&json!({"rawPath": 42})).expect_err("event should fail");
        assert!(error.message().contains("rawPath"));
    }

    #[test]
    fn formats_hit_count_body() {
        assert_eq!(
            hit_count_body("7"),
            "You have connected with the Lambda (7 hits so far)"
        );
        assert_eq!(
            hit_count_body(MISSING_COUNT_PLACEHOLDER),
            "You have connected with the Lambda (- hits so far)"
        );
    }

    #[test]
    fn html_response_sets_content_type_header() {
        let response = html_response(200, "body".to_string());
        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers, json!({"Content-Type": "text/html"}));
        assert_eq!(response.body, "body");
    }
}
