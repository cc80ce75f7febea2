//! JSON input decoding
//!
//! Upstream callers hand the sink raw JSON text. Decoding turns it into the
//! list of top-level values the converter fans out over:
//!
//! | Input | Result |
//! |-------|--------|
//! | empty (or whitespace only) | empty list |
//! | `{...}` | one-element list |
//! | `[...]` | the array's elements |
//! | anything else | [`SinkError::Decode`] |

use crate::error::{SinkError, SinkResult};
use crate::value::StructuredValue;

/// Decode JSON bytes into the list of top-level values
pub fn decode_json(data: &[u8]) -> SinkResult<Vec<StructuredValue>> {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let data = &data[start..];

    match data.first() {
        None => Ok(Vec::new()),
        Some(b'{') => {
            let record: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(data)
                .map_err(|e| SinkError::decode(format!("failed to decode json object: {}", e)))?;
            Ok(vec![StructuredValue::from(serde_json::Value::Object(record))])
        }
        Some(b'[') => {
            let records: Vec<serde_json::Value> = serde_json::from_slice(data)
                .map_err(|e| SinkError::decode(format!("failed to decode json array: {}", e)))?;
            Ok(records.into_iter().map(StructuredValue::from).collect())
        }
        Some(other) => Err(SinkError::decode(format!(
            "expected a json object or array, found '{}'",
            char::from(*other)
        ))),
    }
}

/// Decode a JSON string; see [`decode_json`]
pub fn decode_str(text: &str) -> SinkResult<Vec<StructuredValue>> {
    decode_json(text.as_bytes())
}
