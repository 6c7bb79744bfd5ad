//! Loose readers for the service's JSON envelopes.

use crate::error::CallError;
use serde_json::Value;

/// Whether a reply body acknowledges the request. Bodies without a boolean
/// `success` field count as acknowledged.
pub fn acknowledged(body: &Value) -> bool {
    body.get("success").and_then(Value::as_bool).unwrap_or(true)
}

pub fn succeeded(result: &Result<Value, CallError>) -> bool {
    matches!(result, Ok(body) if acknowledged(body))
}

pub fn loose_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn loose_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn messages(body: &Value) -> Vec<String> {
    let mut out = Vec::new();
    for pointer in ["/message", "/msg", "/data/message", "/data/msg"] {
        if let Some(text) = body.pointer(pointer).and_then(Value::as_str) {
            out.push(text.to_string());
        }
    }
    if let Some(text) = body.get("data").and_then(Value::as_str) {
        out.push(text.to_string());
    }
    out
}

pub fn failure_reason(result: &Result<Value, CallError>) -> String {
    match result {
        Ok(body) => messages(body)
            .into_iter()
            .next()
            .or_else(|| body.get("data").filter(|d| !d.is_null()).map(Value::to_string))
            .unwrap_or_else(|| "unknown".to_string()),
        Err(err) => err
            .body()
            .and_then(|body| messages(body).into_iter().next())
            .unwrap_or_else(|| err.to_string()),
    }
}

pub fn find_marker<'a>(body: &Value, markers: &'a [String]) -> Option<(String, &'a str)> {
    messages(body).into_iter().find_map(|msg| {
        markers
            .iter()
            .find(|m| !m.is_empty() && msg.contains(m.as_str()))
            .map(|m| (msg.clone(), m.as_str()))
    })
}
