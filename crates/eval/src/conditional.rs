//! Conditional logic engine: per-field runtime state.
//!
//! State is a pure function of one field's config and the raw snapshot.
//! Nothing is cached between calls and no field's state is computed from
//! another field's state.

use serde::Serialize;
use tracing::warn;

use formwork_interchange::{FieldConfig, FormMetadata};

use crate::config::EngineConfig;
use crate::formula::evaluate_formula;
use crate::numeric;
use crate::predicate::evaluate_condition;
use crate::value::{FormData, Value};

/// Derived state of one field for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldState {
    pub visible: bool,
    pub required: bool,
    pub disabled: bool,
}

/// Resolve `visibleWhen`, `requiredWhen` and `disabledWhen` for a field.
///
/// Absent rules default to visible, optional and enabled. A rule that
/// fails to evaluate counts as `false`. Static `required` / `disabled`
/// flags are OR-ed with their rule.
pub fn get_field_state(field: &FieldConfig, data: &FormData) -> FieldState {
    let visible = field
        .visible_when
        .as_ref()
        .map_or(true, |r| evaluate_condition(r, data));
    let required = field.is_statically_required()
        || field
            .required_when
            .as_ref()
            .is_some_and(|r| evaluate_condition(r, data));
    let disabled = field.is_statically_disabled()
        || field
            .disabled_when
            .as_ref()
            .is_some_and(|r| evaluate_condition(r, data));
    FieldState {
        visible,
        required,
        disabled,
    }
}

pub fn should_show_field(field: &FieldConfig, data: &FormData) -> bool {
    get_field_state(field, data).visible
}

/// State of every field, in declaration order.
pub fn field_states(metadata: &FormMetadata, data: &FormData) -> Vec<(String, FieldState)> {
    metadata
        .fields
        .iter()
        .map(|f| (f.name.clone(), get_field_state(f, data)))
        .collect()
}

/// Display string for a calculated field. Evaluation errors are logged
/// and replaced by the configured placeholder.
pub fn calculate_formula_value(formula: &str, data: &FormData, config: &EngineConfig) -> String {
    match evaluate_formula(formula, data) {
        Ok(Value::Number(d)) => numeric::format(d, config.decimal_places),
        Ok(other) => other.to_string(),
        Err(e) => {
            warn!(formula, error = %e, "calculated field formula failed");
            config.placeholder.clone()
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use formwork_interchange::{FieldType, Operator, Rule};
    use serde_json::json;

    fn data(doc: serde_json::Value) -> FormData {
        FormData::from_json(&doc).unwrap()
    }

    fn discount() -> FieldConfig {
        let mut f = FieldConfig::new("discount", "Discount", FieldType::Number);
        f.required = Some(true);
        f.visible_when = Some(Rule::compare("amount", Operator::Gt, json!(1000)));
        f
    }

    #[test]
    fn no_rules_means_visible_optional_enabled() {
        let f = FieldConfig::new("notes", "Notes", FieldType::Textarea);
        assert_eq!(
            get_field_state(&f, &data(json!({ "anything": 1 }))),
            FieldState {
                visible: true,
                required: false,
                disabled: false
            }
        );
    }

    #[test]
    fn visible_when_tracks_other_field() {
        let f = discount();
        assert!(!should_show_field(&f, &data(json!({ "amount": 500 }))));
        assert!(should_show_field(&f, &data(json!({ "amount": 1500 }))));
    }

    #[test]
    fn erroring_rules_fail_closed() {
        let mut f = FieldConfig::new("x", "X", FieldType::Text);
        let bad = Rule::compare("amount", Operator::Gt, json!(10));
        f.visible_when = Some(bad.clone());
        f.required_when = Some(bad.clone());
        f.disabled_when = Some(bad);
        let s = get_field_state(&f, &data(json!({ "amount": "lots" })));
        assert!(!s.visible);
        assert!(!s.required);
        assert!(!s.disabled);
    }

    #[test]
    fn static_flags_or_with_rules() {
        let mut f = FieldConfig::new("x", "X", FieldType::Text);
        f.disabled = Some(true);
        f.required_when = Some(Rule::compare("mode", Operator::Eq, json!("strict")));
        let s = get_field_state(&f, &data(json!({ "mode": "strict" })));
        assert!(s.disabled);
        assert!(s.required);
        let s = get_field_state(&f, &data(json!({ "mode": "lax" })));
        assert!(s.disabled);
        assert!(!s.required);
    }

    #[test]
    fn calculated_value_display() {
        let cfg = EngineConfig::default();
        assert_eq!(
            calculate_formula_value("amount + tax", &data(json!({ "amount": 100, "tax": 8 })), &cfg),
            "108"
        );
        assert_eq!(
            calculate_formula_value("amount + tax", &data(json!({ "amount": "abc", "tax": 8 })), &cfg),
            "—"
        );
    }

    #[test]
    fn calculated_value_respects_config() {
        let cfg = EngineConfig {
            placeholder: "n/a".to_string(),
            decimal_places: Some(2),
        };
        let d = data(json!({ "amount": 100, "tax": 8.125 }));
        assert_eq!(calculate_formula_value("amount + tax", &d, &cfg), "108.12");
        assert_eq!(calculate_formula_value("amount +", &d, &cfg), "n/a");
        let long = format!("{}1", "amount + ".repeat(4000));
        assert_eq!(calculate_formula_value(&long, &d, &cfg), "n/a");
    }

    #[test]
    fn states_in_declaration_order() {
        let mut metadata = FormMetadata {
            id: "f".into(),
            name: "F".into(),
            description: None,
            fields: vec![FieldConfig::new("amount", "Amount", FieldType::Number), discount()],
            sections: None,
            theme: None,
        };
        let states = field_states(&metadata, &data(json!({ "amount": 1500 })));
        assert_eq!(states[0].0, "amount");
        assert!(states[1].1.visible && states[1].1.required);
        metadata.fields.reverse();
        assert_eq!(field_states(&metadata, &FormData::new())[0].0, "discount");
    }
}
