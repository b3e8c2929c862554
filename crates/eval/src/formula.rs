//! Formula evaluation against a form-data snapshot.
//!
//! Formulas are parsed by `formwork-core`; anything the parser rejects
//! surfaces here as [`EvaluationError::UnsupportedSyntax`]. Field
//! references read raw values: empty counts as zero, a list may only
//! appear as an argument of an aggregate function.

use rust_decimal::Decimal;
use std::str::FromStr;

use formwork_core::{parse_formula, Formula, Function};

use crate::error::EvaluationError;
use crate::numeric;
use crate::value::{FormData, Value};

/// Parse and evaluate a formula.
pub fn evaluate_formula(src: &str, data: &FormData) -> Result<Value, EvaluationError> {
    let formula = parse_formula(src)?;
    eval_number(&formula, data).map(Value::Number)
}

/// Evaluate an already parsed formula.
pub fn eval_number(formula: &Formula, data: &FormData) -> Result<Decimal, EvaluationError> {
    match formula {
        Formula::Number(text) => Decimal::from_str(text).map_err(|_| EvaluationError::Overflow {
            message: format!("literal {} is out of range", text),
        }),

        Formula::Field(name) => {
            let value = data.value(name);
            scalar(name, &value)
        }

        Formula::Neg(inner) => Ok(-eval_number(inner, data)?),

        Formula::Binary { op, left, right } => {
            let l = eval_number(left, data)?;
            let r = eval_number(right, data)?;
            numeric::apply(*op, l, r)
        }

        Formula::Call { function, args } => eval_call(*function, args, data),
    }
}

fn eval_call(
    function: Function,
    args: &[Formula],
    data: &FormData,
) -> Result<Decimal, EvaluationError> {
    match function {
        Function::Round => {
            let value = eval_arg(function, args, 0, data)?;
            let places = match args.get(1) {
                Some(p) => numeric::places_from(eval_number(p, data)?)?,
                None => 0,
            };
            Ok(numeric::round(value, places))
        }
        Function::Abs => Ok(eval_arg(function, args, 0, data)?.abs()),
        Function::Sum | Function::Avg | Function::Min | Function::Max => {
            let mut values = Vec::new();
            for arg in args {
                flatten(arg, data, &mut values)?;
            }
            aggregate(function, &values)
        }
    }
}

fn eval_arg(
    function: Function,
    args: &[Formula],
    index: usize,
    data: &FormData,
) -> Result<Decimal, EvaluationError> {
    let arg = args.get(index).ok_or_else(|| EvaluationError::UnsupportedSyntax {
        message: format!("{}() is missing argument {}", function.name(), index + 1),
    })?;
    eval_number(arg, data)
}

/// Collect the numbers an aggregate argument contributes. A field holding
/// a list contributes each non-empty element.
fn flatten(arg: &Formula, data: &FormData, out: &mut Vec<Decimal>) -> Result<(), EvaluationError> {
    if let Formula::Field(name) = arg {
        if let Value::List(items) = data.value(name) {
            for item in items.iter().filter(|v| !v.is_empty()) {
                out.push(scalar(name, item)?);
            }
            return Ok(());
        }
    }
    out.push(eval_number(arg, data)?);
    Ok(())
}

fn aggregate(function: Function, values: &[Decimal]) -> Result<Decimal, EvaluationError> {
    if function == Function::Sum {
        return values.iter().try_fold(Decimal::ZERO, |acc, v| {
            numeric::apply(formwork_core::BinOp::Add, acc, *v)
        });
    }
    let first = *values.first().ok_or_else(|| {
        EvaluationError::mismatch(format!("{}() of no values", function.name()))
    })?;
    match function {
        Function::Min => Ok(values.iter().copied().fold(first, Decimal::min)),
        Function::Max => Ok(values.iter().copied().fold(first, Decimal::max)),
        _ => {
            let total = aggregate(Function::Sum, values)?;
            numeric::apply(
                formwork_core::BinOp::Div,
                total,
                Decimal::from(values.len() as u64),
            )
        }
    }
}

/// Numeric view of a field value used in arithmetic.
fn scalar(name: &str, value: &Value) -> Result<Decimal, EvaluationError> {
    if value.is_empty() {
        return Ok(Decimal::ZERO);
    }
    value.to_number().ok_or_else(|| {
        EvaluationError::mismatch(format!(
            "field '{}' holds {} '{}', not a number",
            name,
            value.type_name(),
            value
        ))
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(doc: serde_json::Value) -> FormData {
        FormData::from_json(&doc).unwrap()
    }

    fn num(s: &str) -> Value {
        Value::Number(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn sums_two_fields() {
        let d = data(json!({ "amount": 100, "tax": 8 }));
        assert_eq!(evaluate_formula("amount + tax", &d).unwrap(), num("108"));
    }

    #[test]
    fn non_numeric_text_is_type_mismatch() {
        let d = data(json!({ "amount": "abc", "tax": 8 }));
        assert!(matches!(
            evaluate_formula("amount + tax", &d),
            Err(EvaluationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn numeric_text_and_empty_values() {
        let d = data(json!({ "amount": "12.5", "tax": "", "extra": null }));
        assert_eq!(
            evaluate_formula("amount + tax + extra + missing", &d).unwrap(),
            num("12.5")
        );
    }

    #[test]
    fn precedence_and_unary_minus() {
        let d = data(json!({ "a": 2, "b": 3 }));
        assert_eq!(evaluate_formula("a + b * 4", &d).unwrap(), num("14"));
        assert_eq!(evaluate_formula("-(a - b) * 2", &d).unwrap(), num("2"));
    }

    #[test]
    fn rejects_code_outside_the_grammar() {
        let d = FormData::new();
        for src in ["alert(1)", "a = 1", "a.b", "\"x\"", "", "process.exit()"] {
            assert!(
                matches!(
                    evaluate_formula(src, &d),
                    Err(EvaluationError::UnsupportedSyntax { .. })
                ),
                "expected UnsupportedSyntax for {:?}",
                src
            );
        }
    }

    #[test]
    fn division_by_zero_reported() {
        let d = data(json!({ "total": 10, "count": 0 }));
        assert_eq!(
            evaluate_formula("total / count", &d),
            Err(EvaluationError::DivisionByZero)
        );
    }

    #[test]
    fn round_and_abs() {
        let d = data(json!({ "x": 2.675, "y": -4 }));
        assert_eq!(evaluate_formula("round(x, 2)", &d).unwrap(), num("2.68"));
        assert_eq!(evaluate_formula("round(2.5)", &d).unwrap(), num("2"));
        assert_eq!(evaluate_formula("abs(y)", &d).unwrap(), num("4"));
        assert!(evaluate_formula("round(x, 0.5)", &d).is_err());
    }

    #[test]
    fn aggregates_flatten_lists() {
        let d = data(json!({ "lines": [10, "20", null, 30.5, 1.5], "fee": 5 }));
        assert_eq!(evaluate_formula("sum(lines, fee)", &d).unwrap(), num("67"));
        assert_eq!(evaluate_formula("min(lines)", &d).unwrap(), num("1.5"));
        assert_eq!(evaluate_formula("max(lines, fee)", &d).unwrap(), num("30.5"));
        assert_eq!(evaluate_formula("avg(lines)", &d).unwrap(), num("15.5"));
    }

    #[test]
    fn aggregate_of_nothing() {
        let d = data(json!({ "lines": [] }));
        assert_eq!(evaluate_formula("sum(lines)", &d).unwrap(), num("0"));
        assert!(matches!(
            evaluate_formula("avg(lines)", &d),
            Err(EvaluationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn list_outside_aggregate_is_mismatch() {
        let d = data(json!({ "lines": [1, 2] }));
        assert!(matches!(
            evaluate_formula("lines * 2", &d),
            Err(EvaluationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn very_long_chain_is_rejected_not_evaluated() {
        let d = data(json!({ "a": 1 }));
        let long = format!("{}1", "a + ".repeat(5000));
        assert!(matches!(
            evaluate_formula(&long, &d),
            Err(EvaluationError::UnsupportedSyntax { .. })
        ));
        let product = format!("{}a", "a * ".repeat(5000));
        assert!(matches!(
            evaluate_formula(&product, &d),
            Err(EvaluationError::UnsupportedSyntax { .. })
        ));
    }
}
