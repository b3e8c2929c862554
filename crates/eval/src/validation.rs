//! Validation engine.
//!
//! For every visible, non-calculated field the checks run in this order,
//! and the first failure is the field's single error:
//!
//! 1. required-ness against emptiness
//! 2. type-specific shape (number, email, date, select option, ...)
//! 3. declared `min` / `max` / `minLength` / `maxLength` / `pattern`
//! 4. custom cross-field rules
//!
//! Hidden fields are exempt from everything, including `required`. An
//! empty optional field skips steps 2 to 4. Failures on one field never
//! stop the others from being checked.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

use formwork_interchange::{FieldConfig, FieldType, FormMetadata, ValidationRule};

use crate::conditional::get_field_state;
use crate::error::ValidationError;
use crate::predicate::{evaluate, values_equal};
use crate::value::{parse_date, parse_datetime, FormData, Value};

// ──────────────────────────────────────────────
// Result types
// ──────────────────────────────────────────────

/// The error attached to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub error: ValidationError,
    pub message: String,
}

/// Outcome of validating one snapshot. `valid` iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: BTreeMap<String, FieldError>,
}

impl ValidationResult {
    fn from_errors(errors: BTreeMap<String, FieldError>) -> Self {
        ValidationResult {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn message(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(|e| e.message.as_str())
    }

    pub fn error(&self, field: &str) -> Option<&ValidationError> {
        self.errors.get(field).map(|e| &e.error)
    }

    /// `{"valid": bool, "errors": {field: message}, "kinds": {field: kind}}`.
    pub fn to_json(&self) -> serde_json::Value {
        let errors: serde_json::Map<String, serde_json::Value> = self
            .errors
            .iter()
            .map(|(k, e)| (k.clone(), serde_json::Value::String(e.message.clone())))
            .collect();
        let kinds: serde_json::Map<String, serde_json::Value> = self
            .errors
            .iter()
            .map(|(k, e)| (k.clone(), serde_json::Value::String(e.error.kind().to_string())))
            .collect();
        serde_json::json!({
            "valid": self.valid,
            "errors": errors,
            "kinds": kinds,
        })
    }
}

// ──────────────────────────────────────────────
// Engine
// ──────────────────────────────────────────────

/// Validate a snapshot against a form. Pure and idempotent.
pub fn validate_form_data(metadata: &FormMetadata, data: &FormData) -> ValidationResult {
    let mut errors = BTreeMap::new();
    for field in &metadata.fields {
        if let Some(err) = validate_field(field, data) {
            errors.insert(field.name.clone(), err);
        }
    }
    ValidationResult::from_errors(errors)
}

/// First failing check for one field, if any.
pub fn validate_field(field: &FieldConfig, data: &FormData) -> Option<FieldError> {
    if field.field_type == FieldType::Calculated {
        return None;
    }
    let state = get_field_state(field, data);
    if !state.visible {
        debug!(field = %field.name, "hidden field skipped by validation");
        return None;
    }

    let value = data.value(&field.name);
    let empty = is_blank(field, &value);
    if state.required && empty {
        let message = field
            .rules()
            .iter()
            .find(|r| matches!(r, ValidationRule::Required { .. }))
            .and_then(|r| r.message())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{} is required", field.label));
        return Some(FieldError {
            error: ValidationError::Required,
            message,
        });
    }
    if empty {
        return None;
    }

    check_type(field, &value)
        .or_else(|| check_declared(field, &value))
        .or_else(|| check_custom(field, data))
}

/// Emptiness for required-ness. An unticked checkbox counts as empty.
fn is_blank(field: &FieldConfig, value: &Value) -> bool {
    if field.field_type == FieldType::Checkbox {
        return match value {
            Value::Bool(b) => !b,
            Value::Text(s) => s.trim().is_empty() || s.trim() == "false",
            other => other.is_empty(),
        };
    }
    value.is_empty()
}

fn type_error(expected: &str, message: String) -> Option<FieldError> {
    Some(FieldError {
        error: ValidationError::TypeInvalid {
            expected: expected.to_string(),
        },
        message,
    })
}

/// `local@domain.tld`, no whitespace.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex")
});

/// Compile a declared `pattern` rule so it must match the whole value.
///
/// The pattern has to be valid on its own before it is anchored; text
/// such as `a)|(b` only parses once wrapped and is rejected.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)?;
    Regex::new(&format!("^(?:{})$", pattern))
}

fn check_type(field: &FieldConfig, value: &Value) -> Option<FieldError> {
    let label = &field.label;
    match field.field_type {
        FieldType::Number => {
            if value.to_number().is_none() {
                return type_error("number", format!("{} must be a number", label));
            }
        }
        FieldType::Email => {
            let ok = matches!(value, Value::Text(s) if EMAIL_REGEX.is_match(s.trim()));
            if !ok {
                return type_error(
                    "email",
                    format!("{} must be a valid email address", label),
                );
            }
        }
        FieldType::Date => {
            let ok = matches!(value, Value::Text(s) if parse_date(s).is_some());
            if !ok {
                return type_error("date", format!("{} must be a date (YYYY-MM-DD)", label));
            }
        }
        FieldType::Datetime => {
            let ok = matches!(value, Value::Text(s) if parse_datetime(s).is_some());
            if !ok {
                return type_error(
                    "datetime",
                    format!("{} must be a date and time", label),
                );
            }
        }
        FieldType::Checkbox => {
            let ok = match value {
                Value::Bool(_) => true,
                Value::Text(s) => matches!(s.trim(), "true" | "false"),
                _ => false,
            };
            if !ok {
                return type_error(
                    "boolean",
                    format!("{} must be checked or unchecked", label),
                );
            }
        }
        FieldType::Select => {
            let options = field.options();
            if !options.is_empty() {
                let listed = options
                    .iter()
                    .any(|o| values_equal(&Value::from_json(&o.value()), value).unwrap_or(false));
                if !listed {
                    return type_error(
                        "one of the listed options",
                        format!("{} must be one of the listed options", label),
                    );
                }
            }
        }
        FieldType::Text | FieldType::Textarea => {
            if matches!(value, Value::List(_)) {
                return type_error("text", format!("{} must be text", label));
            }
        }
        // Calculated fields never reach here. The remaining types are
        // declared but have no engine behavior yet.
        FieldType::Calculated
        | FieldType::Radio
        | FieldType::File
        | FieldType::Multiselect
        | FieldType::LineItem
        | FieldType::Nested => {}
    }
    None
}

fn check_declared(field: &FieldConfig, value: &Value) -> Option<FieldError> {
    let label = &field.label;
    for rule in field.rules() {
        let custom = rule.message().map(str::to_owned);
        let failure = match rule {
            ValidationRule::Min { value: bound, .. } | ValidationRule::Max { value: bound, .. } => {
                let is_min = matches!(rule, ValidationRule::Min { .. });
                let Some(limit) = Value::from_json(&serde_json::Value::Number(bound.clone()))
                    .to_number()
                else {
                    continue;
                };
                let Some(n) = value.to_number() else {
                    return type_error("number", format!("{} must be a number", label));
                };
                let broken = if is_min { n < limit } else { n > limit };
                broken.then(|| {
                    let (constraint, words) = if is_min {
                        ("min", "at least")
                    } else {
                        ("max", "at most")
                    };
                    (
                        ValidationError::RangeViolation {
                            constraint: constraint.to_string(),
                            limit: limit.normalize().to_string(),
                        },
                        format!("{} must be {} {}", label, words, limit.normalize()),
                    )
                })
            }
            ValidationRule::MinLength { value: bound, .. }
            | ValidationRule::MaxLength { value: bound, .. } => {
                let is_min = matches!(rule, ValidationRule::MinLength { .. });
                let len = match value {
                    Value::List(items) => items.len() as u64,
                    other => other.to_string().chars().count() as u64,
                };
                let broken = if is_min { len < *bound } else { len > *bound };
                broken.then(|| {
                    let (constraint, words) = if is_min {
                        ("minLength", "at least")
                    } else {
                        ("maxLength", "at most")
                    };
                    (
                        ValidationError::RangeViolation {
                            constraint: constraint.to_string(),
                            limit: bound.to_string(),
                        },
                        format!("{} must be {} {} characters", label, words, bound),
                    )
                })
            }
            ValidationRule::Pattern { value: pattern, .. } => {
                match compile_pattern(pattern) {
                    Ok(re) => (!re.is_match(&value.to_string())).then(|| {
                        (
                            ValidationError::PatternMismatch {
                                pattern: pattern.clone(),
                            },
                            format!("{} has an invalid format", label),
                        )
                    }),
                    Err(_) => {
                        warn!(field = %field.name, pattern = %pattern, "invalid pattern skipped");
                        None
                    }
                }
            }
            ValidationRule::Required { .. } | ValidationRule::Custom { .. } => None,
        };
        if let Some((error, default_message)) = failure {
            return Some(FieldError {
                error,
                message: custom.unwrap_or(default_message),
            });
        }
    }
    None
}

/// Custom rules see the whole snapshot. A rule that cannot be evaluated
/// fails the field.
fn check_custom(field: &FieldConfig, data: &FormData) -> Option<FieldError> {
    for rule in field.rules() {
        let ValidationRule::Custom { rule: condition, .. } = rule else {
            continue;
        };
        let holds = match evaluate(condition, data).and_then(|v| v.as_bool()) {
            Ok(b) => b,
            Err(e) => {
                debug!(field = %field.name, error = %e, "custom rule could not be evaluated");
                false
            }
        };
        if !holds {
            return Some(FieldError {
                error: ValidationError::CrossFieldRuleFailed,
                message: rule
                    .message()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("{} is invalid", field.label)),
            });
        }
    }
    None
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(fields: serde_json::Value) -> FormMetadata {
        formwork_interchange::from_interchange(&json!({
            "id": "t",
            "name": "T",
            "fields": fields
        }))
        .unwrap()
    }

    fn data(doc: serde_json::Value) -> FormData {
        FormData::from_json(&doc).unwrap()
    }

    fn expense() -> FormMetadata {
        form(json!([
            { "name": "amount", "label": "Amount", "type": "number", "required": true },
            { "name": "discount", "label": "Discount", "type": "number", "required": true,
              "visibleWhen": { "field": "amount", "operator": ">", "value": 1000 } },
            { "name": "total", "label": "Total", "type": "calculated", "formula": "amount - discount" }
        ]))
    }

    #[test]
    fn hidden_required_field_is_exempt() {
        let result = validate_form_data(&expense(), &data(json!({ "amount": 500 })));
        assert!(result.valid, "errors: {:?}", result.errors);
    }

    #[test]
    fn visible_required_field_must_be_filled() {
        let result =
            validate_form_data(&expense(), &data(json!({ "amount": 1500, "discount": "" })));
        assert!(!result.valid);
        assert_eq!(result.error("discount"), Some(&ValidationError::Required));
        assert_eq!(result.message("discount"), Some("Discount is required"));
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn select_without_options_still_required() {
        let m = form(json!([
            { "name": "category", "label": "Category", "type": "select",
              "requiredWhen": { "all": [] } }
        ]));
        let result = validate_form_data(&m, &FormData::new());
        assert_eq!(result.error("category"), Some(&ValidationError::Required));
    }

    #[test]
    fn all_fields_reported_in_one_pass() {
        let m = form(json!([
            { "name": "a", "label": "A", "type": "text", "required": true },
            { "name": "b", "label": "B", "type": "number" },
            { "name": "c", "label": "C", "type": "email" }
        ]));
        let result = validate_form_data(&m, &data(json!({ "b": "x", "c": "nobody" })));
        assert_eq!(result.errors.len(), 3);
        assert_eq!(result.error("a"), Some(&ValidationError::Required));
        assert!(matches!(
            result.error("b"),
            Some(ValidationError::TypeInvalid { expected }) if expected == "number"
        ));
        assert_eq!(result.message("c"), Some("C must be a valid email address"));
    }

    #[test]
    fn empty_optional_field_skips_other_checks() {
        let m = form(json!([
            { "name": "zip", "label": "ZIP", "type": "text",
              "validationRules": [ { "type": "pattern", "value": "[0-9]{5}" } ] }
        ]));
        assert!(validate_form_data(&m, &data(json!({ "zip": "" }))).valid);
        assert!(!validate_form_data(&m, &data(json!({ "zip": "123" }))).valid);
        assert!(validate_form_data(&m, &data(json!({ "zip": "12345" }))).valid);
    }

    #[test]
    fn pattern_must_match_whole_value() {
        let m = form(json!([
            { "name": "code", "label": "Code", "type": "text",
              "validationRules": [ { "type": "pattern", "value": "[A-Z]+", "message": "Capitals only" } ] }
        ]));
        let result = validate_form_data(&m, &data(json!({ "code": "ABc" })));
        assert_eq!(result.message("code"), Some("Capitals only"));
        assert!(matches!(
            result.error("code"),
            Some(ValidationError::PatternMismatch { .. })
        ));
    }

    #[test]
    fn pattern_that_escapes_its_anchors_is_skipped() {
        assert!(compile_pattern("a)|(b").is_err());
        assert!(compile_pattern("[0-9]{5}").unwrap().is_match("12345"));
        assert!(!compile_pattern("[0-9]{5}").unwrap().is_match("123456"));

        let m = form(json!([
            { "name": "code", "label": "Code", "type": "text",
              "validationRules": [ { "type": "pattern", "value": "a)|(b" } ] }
        ]));
        assert!(validate_form_data(&m, &data(json!({ "code": "zzz" }))).valid);
    }

    #[test]
    fn range_rules_in_declared_order() {
        let m = form(json!([
            { "name": "pct", "label": "Percent", "type": "number",
              "validationRules": [ { "type": "min", "value": 0 }, { "type": "max", "value": 100 } ] }
        ]));
        let low = validate_form_data(&m, &data(json!({ "pct": -1 })));
        assert_eq!(
            low.error("pct"),
            Some(&ValidationError::RangeViolation {
                constraint: "min".into(),
                limit: "0".into()
            })
        );
        let high = validate_form_data(&m, &data(json!({ "pct": "100.5" })));
        assert_eq!(high.message("pct"), Some("Percent must be at most 100"));
        assert!(validate_form_data(&m, &data(json!({ "pct": 100 }))).valid);
    }

    #[test]
    fn type_check_precedes_declared_rules() {
        let m = form(json!([
            { "name": "n", "label": "N", "type": "number",
              "validationRules": [ { "type": "min", "value": 5 } ] }
        ]));
        let result = validate_form_data(&m, &data(json!({ "n": "five" })));
        assert!(matches!(
            result.error("n"),
            Some(ValidationError::TypeInvalid { .. })
        ));
    }

    #[test]
    fn length_rules() {
        let m = form(json!([
            { "name": "name", "label": "Name", "type": "text",
              "validationRules": [ { "type": "minLength", "value": 2 }, { "type": "maxLength", "value": 4 } ] }
        ]));
        assert_eq!(
            validate_form_data(&m, &data(json!({ "name": "A" }))).message("name"),
            Some("Name must be at least 2 characters")
        );
        assert!(!validate_form_data(&m, &data(json!({ "name": "Alexa" }))).valid);
        assert!(validate_form_data(&m, &data(json!({ "name": "Ünal" }))).valid);
    }

    #[test]
    fn custom_cross_field_rule() {
        let m = form(json!([
            { "name": "start", "label": "Start", "type": "date" },
            { "name": "end", "label": "End", "type": "date",
              "validationRules": [ { "type": "custom",
                "rule": { "field": "end", "operator": ">=", "otherField": "start" } } ] }
        ]));
        let bad = validate_form_data(&m, &data(json!({ "start": "2024-05-01", "end": "2024-04-01" })));
        assert_eq!(bad.error("end"), Some(&ValidationError::CrossFieldRuleFailed));
        assert_eq!(bad.message("end"), Some("End is invalid"));
        let ok = validate_form_data(&m, &data(json!({ "start": "2024-05-01", "end": "2024-05-01" })));
        assert!(ok.valid);
    }

    #[test]
    fn checkbox_required_means_ticked() {
        let m = form(json!([
            { "name": "terms", "label": "Terms", "type": "checkbox", "required": true }
        ]));
        let result = validate_form_data(&m, &data(json!({ "terms": false })));
        assert_eq!(result.error("terms"), Some(&ValidationError::Required));
        assert!(validate_form_data(&m, &data(json!({ "terms": true }))).valid);
    }

    #[test]
    fn select_value_must_be_an_option() {
        let m = form(json!([
            { "name": "country", "label": "Country", "type": "select",
              "options": [ "DE", { "label": "United States", "value": "US" } ] }
        ]));
        assert!(validate_form_data(&m, &data(json!({ "country": "US" }))).valid);
        assert!(!validate_form_data(&m, &data(json!({ "country": "United States" }))).valid);
    }

    #[test]
    fn unimplemented_types_get_no_type_checks() {
        let m = form(json!([
            { "name": "attachment", "label": "Attachment", "type": "file", "required": true }
        ]));
        assert!(validate_form_data(&m, &data(json!({ "attachment": { "id": 7 } }))).valid);
        assert!(!validate_form_data(&m, &FormData::new()).valid);
    }

    #[test]
    fn calculated_fields_are_not_validated() {
        let m = form(json!([
            { "name": "total", "label": "Total", "type": "calculated", "formula": "a + b",
              "required": true }
        ]));
        assert!(validate_form_data(&m, &FormData::new()).valid);
    }

    #[test]
    fn result_json_shape() {
        let result =
            validate_form_data(&expense(), &data(json!({ "amount": 1500, "discount": null })));
        assert_eq!(
            result.to_json(),
            json!({
                "valid": false,
                "errors": { "discount": "Discount is required" },
                "kinds": { "discount": "required" }
            })
        );
    }
}
