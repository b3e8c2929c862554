//! Field renderer boundary.
//!
//! The engine does not draw anything. It hands the rendering layer one
//! [`RenderedField`] per visible field: which control to use, the field's
//! derived state, its current value and any validation message.

use serde::Serialize;

use formwork_interchange::{FieldConfig, FieldType};

use crate::conditional::{calculate_formula_value, get_field_state, FieldState};
use crate::config::EngineConfig;
use crate::validation::ValidationResult;
use crate::value::FormData;

/// The kind of input control for a field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Control {
    TextInput,
    EmailInput,
    NumberInput,
    DateInput,
    DateTimeInput,
    TextArea,
    Dropdown,
    Toggle,
    /// Read-only computed value.
    Computed,
    /// Declared type with no control yet.
    Unsupported(FieldType),
}

/// Pick the control for a field type.
pub fn control_for(field_type: FieldType) -> Control {
    match field_type {
        FieldType::Text => Control::TextInput,
        FieldType::Email => Control::EmailInput,
        FieldType::Number => Control::NumberInput,
        FieldType::Date => Control::DateInput,
        FieldType::Datetime => Control::DateTimeInput,
        FieldType::Textarea => Control::TextArea,
        FieldType::Select => Control::Dropdown,
        FieldType::Checkbox => Control::Toggle,
        FieldType::Calculated => Control::Computed,
        FieldType::Radio
        | FieldType::File
        | FieldType::Multiselect
        | FieldType::LineItem
        | FieldType::Nested => Control::Unsupported(field_type),
    }
}

/// Everything the rendering layer needs for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedField {
    pub name: String,
    pub label: String,
    pub control: Control,
    pub state: FieldState,
    /// Raw value from the snapshot; `null` when unset.
    pub value: serde_json::Value,
    /// Display string for calculated fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn render_field(
    field: &FieldConfig,
    data: &FormData,
    errors: Option<&ValidationResult>,
    config: &EngineConfig,
) -> RenderedField {
    let display = match (field.field_type, &field.formula) {
        (FieldType::Calculated, Some(formula)) => {
            Some(calculate_formula_value(formula, data, config))
        }
        (FieldType::Calculated, None) => Some(config.placeholder.clone()),
        _ => None,
    };
    RenderedField {
        name: field.name.clone(),
        label: field.label.clone(),
        control: control_for(field.field_type),
        state: get_field_state(field, data),
        value: data.get(&field.name).cloned().unwrap_or(serde_json::Value::Null),
        display,
        error: errors
            .and_then(|r| r.message(&field.name))
            .map(str::to_owned),
    }
}
