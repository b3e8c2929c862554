//! Property tests for the engine invariants.
//!
//! Runs against the expense claim fixture and random snapshots:
//!   - a field with no visibleWhen is always visible
//!   - a hidden field never carries a validation error
//!   - validation and state derivation are deterministic
//!   - a transition agrees with recomputing from scratch

use std::path::PathBuf;

use formwork_eval::{
    field_states, should_show_field, transition, validate_form_data, FormData,
};
use formwork_interchange::FormMetadata;
use proptest::prelude::*;
use serde_json::{json, Value};

fn expense_claim() -> FormMetadata {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures/forms/expense_claim.json");
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e));
    formwork_interchange::from_str(&text).unwrap()
}

/// Values a user could plausibly type into any input.
fn input_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        Just(json!("")),
        any::<bool>().prop_map(Value::Bool),
        (-5000i64..5000).prop_map(|n| json!(n)),
        (-5000i64..5000, 0u32..3).prop_map(|(n, scale)| json!(decimal_text(n, scale))),
        "[a-z ]{0,12}".prop_map(Value::String),
    ]
}

/// `n` shifted right by `scale` decimal places, as text.
fn decimal_text(n: i64, scale: u32) -> String {
    if scale == 0 {
        return n.to_string();
    }
    let div = 10i64.pow(scale);
    let sign = if n < 0 { "-" } else { "" };
    format!("{}{}.{:0width$}", sign, (n / div).abs(), (n % div).abs(), width = scale as usize)
}

fn snapshot() -> impl Strategy<Value = FormData> {
    let names = ["employee", "amount", "discount", "tax", "total", "notes"];
    prop::collection::vec(prop::option::of(input_value()), names.len()).prop_map(move |vals| {
        names
            .iter()
            .zip(vals)
            .filter_map(|(name, v)| v.map(|v| (*name, v)))
            .collect()
    })
}

proptest! {
    #[test]
    fn unconditional_fields_always_visible(data in snapshot()) {
        let metadata = expense_claim();
        for field in metadata.fields.iter().filter(|f| f.visible_when.is_none()) {
            prop_assert!(should_show_field(field, &data), "{} hidden", field.name);
        }
    }

    #[test]
    fn hidden_fields_never_fail_validation(data in snapshot()) {
        let metadata = expense_claim();
        let result = validate_form_data(&metadata, &data);
        for field in &metadata.fields {
            if !should_show_field(field, &data) {
                prop_assert!(result.error(&field.name).is_none(), "{} has an error", field.name);
            }
        }
        prop_assert_eq!(result.valid, result.errors.is_empty());
    }

    #[test]
    fn evaluation_is_deterministic(data in snapshot()) {
        let metadata = expense_claim();
        prop_assert_eq!(
            validate_form_data(&metadata, &data),
            validate_form_data(&metadata, &data)
        );
        prop_assert_eq!(field_states(&metadata, &data), field_states(&metadata, &data));
    }

    #[test]
    fn transition_matches_recompute(data in snapshot(), value in input_value()) {
        let metadata = expense_claim();
        let t = transition(&metadata, &data, "amount", value.clone()).unwrap();
        let mut expected = data.clone();
        expected.set("amount", value);
        prop_assert_eq!(&t.states, &field_states(&metadata, &expected));
        prop_assert_eq!(t.data, expected);
    }

    #[test]
    fn discount_visibility_tracks_threshold(amount in -5000i64..5000) {
        let metadata = expense_claim();
        let discount = metadata.field("discount").unwrap();
        let data: FormData = [("amount", json!(amount))].into_iter().collect();
        prop_assert_eq!(should_show_field(discount, &data), amount > 1000);
    }
}
