//! Conversion between metadata JSON documents and typed structs.
//!
//! The main entry points are [`from_interchange`], which takes a
//! `&serde_json::Value` and produces a [`FormMetadata`], and
//! [`to_interchange`], its inverse.

use serde::Deserialize;

use crate::types::FormMetadata;

/// Errors during metadata JSON decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterchangeError {
    /// The document is not a JSON object.
    #[error("form metadata must be a JSON object, got {found}")]
    NotAnObject { found: String },
    /// The document is not valid JSON text.
    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },
    /// The document does not match the metadata shape.
    #[error("malformed form metadata: {message}")]
    Malformed {
        form_id: Option<String>,
        message: String,
    },
}

/// Decode a metadata document.
pub fn from_interchange(doc: &serde_json::Value) -> Result<FormMetadata, InterchangeError> {
    if !doc.is_object() {
        return Err(InterchangeError::NotAnObject {
            found: json_kind(doc).to_string(),
        });
    }
    FormMetadata::deserialize(doc).map_err(|e| InterchangeError::Malformed {
        form_id: doc.get("id").and_then(|v| v.as_str()).map(str::to_owned),
        message: e.to_string(),
    })
}

/// Decode a metadata document from JSON text.
pub fn from_str(src: &str) -> Result<FormMetadata, InterchangeError> {
    let doc: serde_json::Value =
        serde_json::from_str(src).map_err(|e| InterchangeError::InvalidJson {
            message: e.to_string(),
        })?;
    from_interchange(&doc)
}

/// Encode metadata back into its JSON document.
pub fn to_interchange(metadata: &FormMetadata) -> serde_json::Value {
    // Every field type serializes infallibly (string keys, no non-finite floats).
    serde_json::to_value(metadata).unwrap_or(serde_json::Value::Null)
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
