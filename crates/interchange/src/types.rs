//! Typed structs representing the form metadata JSON schema.
//!
//! Field names follow the camelCase keys of the exchanged document
//! (`visibleWhen`, `validationRules`, `showHeader`, ...). Optional keys
//! are `Option` and skipped on output when absent, so a decoded document
//! serializes back to the same JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

// ──────────────────────────────────────────────
// Form
// ──────────────────────────────────────────────

/// The declarative description of one form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FormMetadata {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fields in declaration order. Names are unique within a form.
    pub fields: Vec<FieldConfig>,
    /// Optional grouping of fields, in display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<SectionConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl FormMetadata {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Sections, or an empty slice when the form declares none.
    pub fn sections(&self) -> &[SectionConfig] {
        self.sections.as_deref().unwrap_or(&[])
    }
}

/// A titled group of fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SectionConfig {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Names of the fields shown in this section, in order.
    pub fields: Vec<String>,
}

/// Layout and chrome options. Interpreted only by the rendering layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Theme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_header: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_breadcrumbs: Option<bool>,
}

// ──────────────────────────────────────────────
// Field
// ──────────────────────────────────────────────

/// One field of a form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    /// Choices for select, radio and multiselect fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    /// Arithmetic expression for calculated fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_when: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_when: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<Vec<ValidationRule>>,
}

impl FieldConfig {
    /// A minimal field with no rules, options or formula.
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        FieldConfig {
            name: name.into(),
            label: label.into(),
            field_type,
            required: None,
            disabled: None,
            options: None,
            formula: None,
            visible_when: None,
            required_when: None,
            disabled_when: None,
            validation_rules: None,
        }
    }

    /// Static required flag, either from `required: true` or from a
    /// `{"type": "required"}` validation rule.
    pub fn is_statically_required(&self) -> bool {
        self.required.unwrap_or(false)
            || self
                .rules()
                .iter()
                .any(|r| matches!(r, ValidationRule::Required { .. }))
    }

    pub fn is_statically_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }

    pub fn options(&self) -> &[FieldOption] {
        self.options.as_deref().unwrap_or(&[])
    }

    pub fn rules(&self) -> &[ValidationRule] {
        self.validation_rules.as_deref().unwrap_or(&[])
    }
}

/// The closed set of field types.
///
/// Only part of the set has engine behavior; see [`FieldType::is_implemented`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Date,
    Datetime,
    Textarea,
    Select,
    Checkbox,
    Calculated,
    Radio,
    File,
    Multiselect,
    LineItem,
    Nested,
}

impl FieldType {
    pub const ALL: [FieldType; 14] = [
        FieldType::Text,
        FieldType::Email,
        FieldType::Number,
        FieldType::Date,
        FieldType::Datetime,
        FieldType::Textarea,
        FieldType::Select,
        FieldType::Checkbox,
        FieldType::Calculated,
        FieldType::Radio,
        FieldType::File,
        FieldType::Multiselect,
        FieldType::LineItem,
        FieldType::Nested,
    ];

    /// The JSON tag for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Calculated => "calculated",
            FieldType::Radio => "radio",
            FieldType::File => "file",
            FieldType::Multiselect => "multiselect",
            FieldType::LineItem => "line-item",
            FieldType::Nested => "nested",
        }
    }

    /// Whether the engine has type-specific behavior for this variant.
    /// The rest are declared so metadata using them still decodes.
    pub fn is_implemented(&self) -> bool {
        match self {
            FieldType::Text
            | FieldType::Email
            | FieldType::Number
            | FieldType::Date
            | FieldType::Datetime
            | FieldType::Textarea
            | FieldType::Select
            | FieldType::Checkbox
            | FieldType::Calculated => true,
            FieldType::Radio
            | FieldType::File
            | FieldType::Multiselect
            | FieldType::LineItem
            | FieldType::Nested => false,
        }
    }

    /// Types whose value must come from the declared option list.
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            FieldType::Select | FieldType::Radio | FieldType::Multiselect
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A choice for select-like fields: either a bare string or a
/// `{label, value}` pair with no other keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    untagged,
    deny_unknown_fields,
    expecting = "an option string or a {label, value} object"
)]
pub enum FieldOption {
    Plain(String),
    Labeled {
        label: String,
        value: serde_json::Value,
    },
}

impl FieldOption {
    pub fn value(&self) -> serde_json::Value {
        match self {
            FieldOption::Plain(s) => serde_json::Value::String(s.clone()),
            FieldOption::Labeled { value, .. } => value.clone(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FieldOption::Plain(s) => s,
            FieldOption::Labeled { label, .. } => label,
        }
    }
}

// ──────────────────────────────────────────────
// Rules
// ──────────────────────────────────────────────

/// A boolean condition over raw field values.
///
/// Used for `visibleWhen`, `requiredWhen`, `disabledWhen` and custom
/// validation. Rules reference field values only, never another
/// field's derived state.
///
/// Each shape accepts only its own keys, so an object mixing a combinator
/// key with comparison keys matches no variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(
    untagged,
    deny_unknown_fields,
    expecting = "a comparison or an all/any/not combinator"
)]
pub enum Rule {
    All { all: Vec<Rule> },
    Any { any: Vec<Rule> },
    Not { not: Box<Rule> },
    Comparison(Comparison),
}

impl Rule {
    /// Shorthand for a literal comparison.
    pub fn compare(field: impl Into<String>, operator: Operator, value: serde_json::Value) -> Rule {
        Rule::Comparison(Comparison {
            field: field.into(),
            operator,
            value: Some(value),
            other_field: None,
        })
    }

    /// Every field name this rule reads, in first-seen order.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Rule::All { all } => all.iter().for_each(|r| r.collect_fields(out)),
            Rule::Any { any } => any.iter().for_each(|r| r.collect_fields(out)),
            Rule::Not { not } => not.collect_fields(out),
            Rule::Comparison(c) => {
                for name in std::iter::once(c.field.as_str()).chain(c.other_field.as_deref()) {
                    if !out.contains(&name) {
                        out.push(name);
                    }
                }
            }
        }
    }
}

/// `field <operator> value`, or `field <operator> otherField`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Comparison {
    pub field: String,
    pub operator: Operator,
    /// Literal right-hand side. Ignored by `isEmpty` / `isNotEmpty`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Compare against another field's raw value instead of a literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_field: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Operator {
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "isEmpty")]
    IsEmpty,
    #[serde(rename = "isNotEmpty")]
    IsNotEmpty,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Contains => "contains",
            Operator::IsEmpty => "isEmpty",
            Operator::IsNotEmpty => "isNotEmpty",
        }
    }

    /// Operators that take no right-hand side.
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::IsEmpty | Operator::IsNotEmpty)
    }

    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Validation rules
// ──────────────────────────────────────────────

/// A declared validation rule, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", deny_unknown_fields)]
pub enum ValidationRule {
    Required {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Numeric lower bound (inclusive).
    Min {
        value: serde_json::Number,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Numeric upper bound (inclusive).
    Max {
        value: serde_json::Number,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    MinLength {
        value: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    MaxLength {
        value: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Regular expression the whole text value must match.
    Pattern {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Cross-field rule: the field is valid only while `rule` holds.
    Custom {
        rule: Rule,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl ValidationRule {
    /// The author-supplied message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationRule::Required { message }
            | ValidationRule::Min { message, .. }
            | ValidationRule::Max { message, .. }
            | ValidationRule::MinLength { message, .. }
            | ValidationRule::MaxLength { message, .. }
            | ValidationRule::Pattern { message, .. }
            | ValidationRule::Custom { message, .. } => message.as_deref(),
        }
    }

    /// The JSON `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationRule::Required { .. } => "required",
            ValidationRule::Min { .. } => "min",
            ValidationRule::Max { .. } => "max",
            ValidationRule::MinLength { .. } => "minLength",
            ValidationRule::MaxLength { .. } => "maxLength",
            ValidationRule::Pattern { .. } => "pattern",
            ValidationRule::Custom { .. } => "custom",
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
