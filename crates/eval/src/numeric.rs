//! Decimal arithmetic and comparison.
//!
//! All arithmetic uses `rust_decimal::Decimal` with checked operations and
//! `RoundingStrategy::MidpointNearestEven`. Overflow and division by zero
//! are errors, never panics.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use formwork_core::BinOp;
use formwork_interchange::Operator;

use crate::error::EvaluationError;

/// Largest number of decimal places `round` accepts.
pub const MAX_PLACES: u32 = 28;

/// Apply a binary arithmetic operator.
pub fn apply(op: BinOp, left: Decimal, right: Decimal) -> Result<Decimal, EvaluationError> {
    let result = match op {
        BinOp::Add => left.checked_add(right),
        BinOp::Sub => left.checked_sub(right),
        BinOp::Mul => left.checked_mul(right),
        BinOp::Div => {
            if right.is_zero() {
                return Err(EvaluationError::DivisionByZero);
            }
            left.checked_div(right)
        }
    };
    result.ok_or_else(|| EvaluationError::Overflow {
        message: format!("{} {} {} is out of range", left, op.symbol(), right),
    })
}

/// Round to `places` decimal places, midpoint to even.
pub fn round(value: Decimal, places: u32) -> Decimal {
    value.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Interpret a `round` places argument.
pub fn places_from(value: Decimal) -> Result<u32, EvaluationError> {
    if value.fract() != Decimal::ZERO || (value.is_sign_negative() && !value.is_zero()) {
        return Err(EvaluationError::mismatch(format!(
            "round() places must be a whole number >= 0, got {}",
            value.normalize()
        )));
    }
    let places = value.to_u32().unwrap_or(u32::MAX);
    if places > MAX_PLACES {
        return Err(EvaluationError::mismatch(format!(
            "round() places must be at most {}, got {}",
            MAX_PLACES, places
        )));
    }
    Ok(places)
}

/// Display form: normalized, or rounded and padded to `places`.
pub fn format(value: Decimal, places: Option<u32>) -> String {
    match places {
        Some(p) => {
            let mut rounded = round(value, p.min(MAX_PLACES));
            rounded.rescale(p.min(MAX_PLACES));
            if rounded.is_zero() {
                rounded.set_sign_positive(true);
            }
            rounded.to_string()
        }
        None => value.normalize().to_string(),
    }
}

/// Compare two numbers or timestamps with an equality or ordering operator.
pub fn compare<T: PartialOrd>(l: T, r: T, op: Operator) -> Result<bool, EvaluationError> {
    match op {
        Operator::Eq => Ok(l == r),
        Operator::Ne => Ok(l != r),
        Operator::Lt => Ok(l < r),
        Operator::Lte => Ok(l <= r),
        Operator::Gt => Ok(l > r),
        Operator::Gte => Ok(l >= r),
        other => Err(EvaluationError::mismatch(format!(
            "operator '{}' does not compare ordered values",
            other
        ))),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
