//! Decoding of the portal's ASMX answers
//!
//! ASMX services wrap their result as `{"d": "<json text>"}`; the SOAP
//! variant carries the same text inside `<{method}Result>`. The embedded
//! text is a JSON array of objects or the quoted sentinel `"Wrong Input"`.

use kiadb_common::RawSourceRecord;
use serde::Deserialize;
use serde_json::Value;

use super::types::{Payload, PrimaryAttempt, PrimaryFailure, TransportError};

const WRONG_INPUT: &str = "Wrong Input";

#[derive(Debug, Deserialize)]
struct AsmxEnvelope {
    #[serde(default)]
    d: Option<Value>,
}

/// Decode the embedded JSON text shared by both protocols.
pub fn decode_payload_text(text: &str) -> Result<Payload, TransportError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Payload::Empty);
    }
    if text == WRONG_INPUT {
        return Ok(Payload::WrongInput);
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| TransportError::Parse(e.to_string()))?;
    decode_value(value)
}

fn decode_value(value: Value) -> Result<Payload, TransportError> {
    match value {
        Value::Null => Ok(Payload::Empty),
        Value::String(s) if s.trim() == WRONG_INPUT => Ok(Payload::WrongInput),
        Value::String(s) if s.trim().is_empty() => Ok(Payload::Empty),
        Value::Array(items) => {
            let rows: Vec<RawSourceRecord> = items
                .into_iter()
                .filter_map(RawSourceRecord::from_value)
                .collect();
            if rows.is_empty() {
                Ok(Payload::Empty)
            } else {
                Ok(Payload::Rows(rows))
            }
        }
        Value::Object(map) => Ok(Payload::Rows(vec![RawSourceRecord::new(map)])),
        other => Err(TransportError::Parse(format!(
            "unexpected payload shape: {}",
            truncate(&other.to_string(), 120)
        ))),
    }
}

/// Decode a full ASMX JSON response body.
pub fn decode_asmx_body(body: &str) -> Result<Payload, TransportError> {
    let envelope: AsmxEnvelope =
        serde_json::from_str(body).map_err(|e| TransportError::Parse(e.to_string()))?;

    match envelope.d {
        None | Some(Value::Null) => Ok(Payload::Empty),
        Some(Value::String(text)) => decode_payload_text(&text),
        // Some deployments return the array unwrapped.
        Some(other) => decode_value(other),
    }
}

/// Classify a primary (JSON protocol) response for the fallback decision.
pub fn classify_primary(body: Result<String, TransportError>) -> PrimaryAttempt {
    let body = match body {
        Ok(body) => body,
        Err(e) => return PrimaryAttempt::PrimaryFailed(PrimaryFailure::Network(e)),
    };

    match decode_asmx_body(&body) {
        Ok(payload) => match payload {
            Payload::Rows(rows) => match rows.into_iter().next() {
                Some(row) => PrimaryAttempt::Success(row),
                None => PrimaryAttempt::PrimaryFailed(PrimaryFailure::Empty),
            },
            Payload::WrongInput => PrimaryAttempt::PrimaryFailed(PrimaryFailure::WrongInput),
            Payload::Empty => PrimaryAttempt::PrimaryFailed(PrimaryFailure::Empty),
        },
        Err(e) => PrimaryAttempt::PrimaryFailed(PrimaryFailure::Unparseable(e)),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
