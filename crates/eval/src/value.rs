//! Runtime values and the form-data snapshot.
//!
//! Form data arrives as untyped JSON. The engines look at it through
//! [`Value`], which folds the JSON kinds into the handful of shapes the
//! rules care about. All numbers are `rust_decimal::Decimal`; `f64` never
//! takes part in a comparison or a calculation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::error::EvaluationError;

// ──────────────────────────────────────────────
// Runtime values
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Missing key or JSON `null`.
    Empty,
    Bool(bool),
    Number(Decimal),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn from_json(v: &serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Empty,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match json_number_to_decimal(n) {
                Some(d) => Value::Number(d),
                None => Value::Text(n.to_string()),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            // Objects carry no meaning for rules; keep their text so equality still works.
            serde_json::Value::Object(_) => Value::Text(v.to_string()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }

    /// Missing, null, whitespace-only text and the empty list are empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }

    pub fn as_bool(&self) -> Result<bool, EvaluationError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(EvaluationError::mismatch(format!(
                "expected boolean, got {}",
                other.type_name()
            ))),
        }
    }

    /// Numeric view: a number, or text that reads as a plain decimal.
    pub fn to_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(d) => Some(*d),
            Value::Text(s) => parse_decimal(s),
            _ => None,
        }
    }

    /// Point in time, for text holding an ISO-8601 date or date-time.
    pub fn to_timestamp(&self) -> Option<OffsetDateTime> {
        match self {
            Value::Text(s) => parse_date(s)
                .map(|d| d.midnight().assume_utc())
                .or_else(|| parse_datetime(s)),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Empty => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(d) => {
                let text = d.normalize().to_string();
                match text.parse::<serde_json::Number>() {
                    Ok(n) => serde_json::Value::Number(n),
                    Err(_) => serde_json::Value::String(text),
                }
            }
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(d) => write!(f, "{}", d.normalize()),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

fn json_number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Parse user-entered text as a plain decimal (`12`, `-0.5`, `+3.25`).
/// Exponents, thousands separators and surrounding text are rejected.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if digits.is_empty()
        || digits.starts_with('.')
        || digits.ends_with('.')
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '.')
    {
        return None;
    }
    Decimal::from_str(s.strip_prefix('+').unwrap_or(s)).ok()
}

/// `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// RFC 3339, or a local `YYYY-MM-DDTHH:MM[:SS]` taken as UTC.
pub fn parse_datetime(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(dt);
    }
    PrimitiveDateTime::parse(
        s,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    })
    .ok()
    .map(PrimitiveDateTime::assume_utc)
}

// ──────────────────────────────────────────────
// Snapshot
// ──────────────────────────────────────────────

/// The current value of every field of one open form.
///
/// Engines only ever read a snapshot; edits go through
/// [`crate::session::transition`], which returns a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, serde_json::Value>);

impl FormData {
    pub fn new() -> Self {
        FormData(BTreeMap::new())
    }

    /// Build a snapshot from a JSON object.
    pub fn from_json(doc: &serde_json::Value) -> Result<FormData, EvaluationError> {
        match doc {
            serde_json::Value::Object(map) => Ok(FormData(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            other => Err(EvaluationError::mismatch(format!(
                "form data must be a JSON object, got {}",
                Value::from_json(other).type_name()
            ))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    /// The runtime view of a field; missing fields are [`Value::Empty`].
    pub fn value(&self, name: &str) -> Value {
        self.0.get(name).map(Value::from_json).unwrap_or(Value::Empty)
    }

    pub fn set(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.0.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<serde_json::Value> {
        self.0.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, serde_json::Value)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, serde_json::Value)>>(iter: I) -> Self {
        FormData(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
