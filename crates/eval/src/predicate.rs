//! Rule evaluator.
//!
//! A [`Rule`] is a tree of comparisons joined by `all` / `any` / `not`.
//! [`evaluate`] interprets it recursively against a snapshot and returns
//! `Value::Bool`; [`evaluate_condition`] is the fail-closed projection used
//! for conditional field state.
//!
//! Comparisons read raw field values only. A rule can never observe
//! another field's visibility, so state derivation has no cycles.

use tracing::debug;

use formwork_interchange::{Comparison, Operator, Rule};

use crate::error::EvaluationError;
use crate::numeric;
use crate::value::{FormData, Value};

/// Evaluate a rule tree against a snapshot.
///
/// `all` and `any` short-circuit left to right, so an error in a branch
/// that is never reached does not surface.
pub fn evaluate(rule: &Rule, data: &FormData) -> Result<Value, EvaluationError> {
    match rule {
        Rule::All { all } => {
            for r in all {
                if !evaluate(r, data)?.as_bool()? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Rule::Any { any } => {
            for r in any {
                if evaluate(r, data)?.as_bool()? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Rule::Not { not } => {
            let b = evaluate(not, data)?.as_bool()?;
            Ok(Value::Bool(!b))
        }
        Rule::Comparison(c) => eval_comparison(c, data).map(Value::Bool),
    }
}

/// Evaluate a rule as a condition. Errors count as `false`.
pub fn evaluate_condition(rule: &Rule, data: &FormData) -> bool {
    match evaluate(rule, data).and_then(|v| v.as_bool()) {
        Ok(b) => b,
        Err(e) => {
            debug!(error = %e, "rule failed closed");
            false
        }
    }
}

fn eval_comparison(c: &Comparison, data: &FormData) -> Result<bool, EvaluationError> {
    let left = data.value(&c.field);
    match c.operator {
        Operator::IsEmpty => return Ok(left.is_empty()),
        Operator::IsNotEmpty => return Ok(!left.is_empty()),
        _ => {}
    }

    let right = match (&c.other_field, &c.value) {
        (Some(other), _) => data.value(other),
        (None, Some(v)) => Value::from_json(v),
        (None, None) => Value::Empty,
    };

    match c.operator {
        Operator::Eq => values_equal(&left, &right),
        Operator::Ne => values_equal(&left, &right).map(|b| !b),
        Operator::Contains => contains(&left, &right),
        op => compare_ordered(&left, &right, op),
    }
}

/// Equality with numeric coercion when either side is a number.
pub fn values_equal(left: &Value, right: &Value) -> Result<bool, EvaluationError> {
    match (left.is_empty(), right.is_empty()) {
        (true, true) => return Ok(true),
        (true, false) | (false, true) => return Ok(false),
        (false, false) => {}
    }

    if matches!(left, Value::Number(_)) || matches!(right, Value::Number(_)) {
        match (left.to_number(), right.to_number()) {
            (Some(l), Some(r)) => return Ok(l == r),
            _ => {
                if let Some(text) = [left, right].into_iter().find(|v| matches!(v, Value::Text(_)))
                {
                    return Err(EvaluationError::mismatch(format!(
                        "cannot compare number with non-numeric text '{}'",
                        text
                    )));
                }
            }
        }
    }

    match (left, right) {
        (Value::List(l), Value::List(r)) => {
            if l.len() != r.len() {
                return Ok(false);
            }
            for (a, b) in l.iter().zip(r) {
                if !values_equal(a, b)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::List(_), _) | (_, Value::List(_)) => Ok(false),
        _ => Ok(left.to_string() == right.to_string()),
    }
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, EvaluationError> {
    if haystack.is_empty() || needle.is_empty() {
        return Ok(false);
    }
    match haystack {
        Value::List(items) => Ok(items
            .iter()
            .any(|item| values_equal(item, needle).unwrap_or(false))),
        Value::Text(text) => Ok(text.contains(&needle.to_string())),
        other => Err(EvaluationError::mismatch(format!(
            "'contains' needs text or a list, got {}",
            other.type_name()
        ))),
    }
}

/// `<`, `<=`, `>`, `>=`: numeric if both sides coerce, chronological if
/// both are dates, otherwise a type mismatch. An empty side is `false`.
fn compare_ordered(left: &Value, right: &Value, op: Operator) -> Result<bool, EvaluationError> {
    if left.is_empty() || right.is_empty() {
        return Ok(false);
    }
    if let (Some(l), Some(r)) = (left.to_number(), right.to_number()) {
        return numeric::compare(l, r, op);
    }
    if let (Some(l), Some(r)) = (left.to_timestamp(), right.to_timestamp()) {
        return numeric::compare(l, r, op);
    }
    Err(EvaluationError::mismatch(format!(
        "cannot order {} '{}' against {} '{}'",
        left.type_name(),
        left,
        right.type_name(),
        right
    )))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
