use std::time::Instant;

use serde_json::{json, Value};

use hits_core::contract::{
    hit_count_body, html_response, raw_path, ApiGatewayResponse, MISSING_COUNT_PLACEHOLDER,
};

use crate::adapters::hit_store::HitStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitCountError {
    pub message: String,
}

/// Count one hit against the event's raw path and report the running total.
///
/// The increment is the business operation: if it fails, the whole invocation
/// fails and the error propagates unmodified. The read-back is best-effort
/// only; a read error or a missing record degrades to the `"-"` placeholder
/// while the response stays a 200. That asymmetry is contractual.
pub fn handle_hit_request(
    event: &Value,
    store: &impl HitStore,
) -> Result<ApiGatewayResponse, HitCountError> {
    let started_at = Instant::now();

    let path = raw_path(event).map_err(|error| HitCountError {
        message: error.message().to_string(),
    })?;

    log_handler_info("request_received", json!({ "path": path.clone() }));

    store.increment_hits(&path).map_err(|error| {
        log_handler_error(
            "increment_failed",
            json!({
                "path": path.clone(),
                "error": error.clone(),
            }),
        );
        HitCountError {
            message: format!("failed to increment hit counter: {error}"),
        }
    })?;

    let hits = match store.read_hits(&path) {
        Ok(Some(count)) => count.to_string(),
        Ok(None) => MISSING_COUNT_PLACEHOLDER.to_string(),
        Err(error) => {
            log_handler_error(
                "read_back_failed",
                json!({
                    "path": path.clone(),
                    "error": error,
                }),
            );
            MISSING_COUNT_PLACEHOLDER.to_string()
        }
    };

    log_handler_info(
        "request_completed",
        json!({
            "path": path,
            "hits": hits.clone(),
            "duration_ms": started_at.elapsed().as_millis(),
        }),
    );

    Ok(html_response(200, hit_count_body(&hits)))
}

fn log_handler_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "hit_count_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_handler_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "hit_count_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
