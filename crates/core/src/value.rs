//! Structured value types for docsink
//!
//! This module defines:
//! - StructuredValue: closed tagged union for one decoded unit of input
//! - Document: an Object-shaped value's field map
//!
//! ## Value Model
//!
//! StructuredValue has exactly six variants:
//! - Null, Bool, Number, String, List, Object
//!
//! Numbers are IEEE-754 doubles. JSON integers and floats decode to the same
//! representation, so `1` and `1.0` are equal and match each other in filters.
//! Object keys are kept sorted, which makes documents compare and serialize
//! deterministically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field map of an Object-shaped value.
pub type Document = BTreeMap<String, StructuredValue>;

/// One JSON-like unit of input
///
/// Immutable once constructed. Values move through the pipeline by
/// ownership: the caller hands the root to the writer, which splits it into
/// leaf documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit floating point (IEEE-754)
    Number(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list of values
    List(Vec<StructuredValue>),
    /// Object with string keys
    Object(Document),
}

impl StructuredValue {
    /// Create an empty object
    pub fn object() -> Self {
        StructuredValue::Object(Document::new())
    }

    /// Create an empty list
    pub fn list() -> Self {
        StructuredValue::List(Vec::new())
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            StructuredValue::Null => "Null",
            StructuredValue::Bool(_) => "Bool",
            StructuredValue::Number(_) => "Number",
            StructuredValue::String(_) => "String",
            StructuredValue::List(_) => "List",
            StructuredValue::Object(_) => "Object",
        }
    }

    /// True for Null, Bool, Number and String
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            StructuredValue::Null
                | StructuredValue::Bool(_)
                | StructuredValue::Number(_)
                | StructuredValue::String(_)
        )
    }

    /// Check if this is a list value
    pub fn is_list(&self) -> bool {
        matches!(self, StructuredValue::List(_))
    }

    /// Check if this is an object value
    pub fn is_object(&self) -> bool {
        matches!(self, StructuredValue::Object(_))
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StructuredValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as f64 if this is a Number value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StructuredValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as &[StructuredValue] if this is a List value
    pub fn as_list(&self) -> Option<&[StructuredValue]> {
        match self {
            StructuredValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Get as &Document if this is an Object value
    pub fn as_object(&self) -> Option<&Document> {
        match self {
            StructuredValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Look up a field when this is an Object value
    pub fn get(&self, field: &str) -> Option<&StructuredValue> {
        self.as_object().and_then(|o| o.get(field))
    }

    /// Maximum nesting depth of this value
    ///
    /// Scalars have depth 0; every list or object level adds one. Computed
    /// with an explicit stack so arbitrarily deep values cannot overflow the
    /// call stack.
    pub fn nesting_depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((value, depth)) = stack.pop() {
            match value {
                StructuredValue::Null
                | StructuredValue::Bool(_)
                | StructuredValue::Number(_)
                | StructuredValue::String(_) => max = max.max(depth),
                StructuredValue::List(items) => {
                    max = max.max(depth + 1);
                    stack.extend(items.iter().map(|v| (v, depth + 1)));
                }
                StructuredValue::Object(fields) => {
                    max = max.max(depth + 1);
                    stack.extend(fields.values().map(|v| (v, depth + 1)));
                }
            }
        }
        max
    }

    /// Serialize to a compact JSON string
    pub fn to_json_string(&self) -> String {
        serde_json::Value::from(self.clone()).to_string()
    }
}

impl Default for StructuredValue {
    fn default() -> Self {
        StructuredValue::Null
    }
}

impl fmt::Display for StructuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json_string())
    }
}

// ============================================================================
// serde_json interop
// ============================================================================

impl From<serde_json::Value> for StructuredValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => StructuredValue::Null,
            serde_json::Value::Bool(b) => StructuredValue::Bool(b),
            // Every JSON number has an f64 approximation
            serde_json::Value::Number(n) => StructuredValue::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => StructuredValue::String(s),
            serde_json::Value::Array(items) => {
                StructuredValue::List(items.into_iter().map(StructuredValue::from).collect())
            }
            serde_json::Value::Object(fields) => StructuredValue::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, StructuredValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<StructuredValue> for serde_json::Value {
    fn from(value: StructuredValue) -> Self {
        match value {
            StructuredValue::Null => serde_json::Value::Null,
            StructuredValue::Bool(b) => serde_json::Value::Bool(b),
            StructuredValue::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            StructuredValue::String(s) => serde_json::Value::String(s),
            StructuredValue::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            StructuredValue::Object(fields) => serde_json::Value::Object(
                fields.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for StructuredValue {
    fn from(s: &str) -> Self {
        StructuredValue::String(s.to_string())
    }
}

impl From<String> for StructuredValue {
    fn from(s: String) -> Self {
        StructuredValue::String(s)
    }
}

impl From<bool> for StructuredValue {
    fn from(b: bool) -> Self {
        StructuredValue::Bool(b)
    }
}

impl From<f64> for StructuredValue {
    fn from(n: f64) -> Self {
        StructuredValue::Number(n)
    }
}

impl From<i64> for StructuredValue {
    fn from(n: i64) -> Self {
        StructuredValue::Number(n as f64)
    }
}

impl From<i32> for StructuredValue {
    fn from(n: i32) -> Self {
        StructuredValue::Number(f64::from(n))
    }
}

impl From<Vec<StructuredValue>> for StructuredValue {
    fn from(items: Vec<StructuredValue>) -> Self {
        StructuredValue::List(items)
    }
}

impl From<Document> for StructuredValue {
    fn from(fields: Document) -> Self {
        StructuredValue::Object(fields)
    }
}
