//! formwork-interchange: form metadata JSON types and (de)serialization.
//!
//! Provides typed structs for the declarative description of a form
//! (fields, sections, theme, conditional rules, validation rules) and
//! the `from_interchange()` / `to_interchange()` entry points that move
//! between `serde_json::Value` and [`FormMetadata`].
//!
//! The JSON shape is an exchanged artifact: anything decoded here must
//! serialize back to the same document. Unknown keys are rejected rather
//! than silently dropped.

pub mod deserialize;
pub mod types;

pub use deserialize::{from_interchange, from_str, to_interchange, InterchangeError};
pub use types::*;
