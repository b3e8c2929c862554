//! Static integrity checks over form metadata.
//!
//! The engines trust metadata to be well formed: names unique, every
//! referenced field declared, formulas parseable. `check_metadata` verifies
//! that up front so authoring mistakes are reported once instead of
//! silently failing closed on every keystroke.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use formwork_core::parse_formula;
use formwork_interchange::{FieldConfig, FieldType, FormMetadata, Rule, ValidationRule};

use crate::error::EvaluationError;
use crate::validation::compile_pattern;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One finding. `field` is the field the finding is attached to, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataIssue {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl MetadataIssue {
    fn error(field: Option<&str>, message: impl Into<String>) -> Self {
        MetadataIssue {
            severity: Severity::Error,
            field: field.map(str::to_owned),
            message: message.into(),
        }
    }

    fn warning(field: Option<&str>, message: impl Into<String>) -> Self {
        MetadataIssue {
            severity: Severity::Warning,
            field: field.map(str::to_owned),
            message: message.into(),
        }
    }
}

impl fmt::Display for MetadataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: field '{}': {}", self.severity, field, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// True if any issue is an error.
pub fn has_errors(issues: &[MetadataIssue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Error)
}

/// Run every check. Issues come out in field declaration order, then
/// section order, then formula cycles.
pub fn check_metadata(metadata: &FormMetadata) -> Vec<MetadataIssue> {
    let mut issues = Vec::new();

    let mut seen = HashSet::new();
    for field in &metadata.fields {
        if !seen.insert(field.name.as_str()) {
            issues.push(MetadataIssue::error(
                Some(field.name.as_str()),
                format!("duplicate field name '{}'", field.name),
            ));
        }
    }

    for field in &metadata.fields {
        check_field(field, &seen, &mut issues);
    }

    check_sections(metadata, &seen, &mut issues);
    check_formula_cycles(metadata, &mut issues);
    issues
}

// ──────────────────────────────────────────────
// Per-field checks
// ──────────────────────────────────────────────

fn check_field(field: &FieldConfig, names: &HashSet<&str>, issues: &mut Vec<MetadataIssue>) {
    let at = Some(field.name.as_str());

    let conditions = [
        ("visibleWhen", &field.visible_when),
        ("requiredWhen", &field.required_when),
        ("disabledWhen", &field.disabled_when),
    ];
    for (key, rule) in conditions {
        if let Some(rule) = rule {
            check_rule_refs(key, rule, names, at, issues);
        }
    }
    if let Some(rule) = &field.visible_when {
        if rule.referenced_fields().contains(&field.name.as_str()) {
            issues.push(MetadataIssue::warning(
                at,
                "visibleWhen reads the field's own value; once hidden it cannot be edited back",
            ));
        }
    }

    match (&field.field_type, &field.formula) {
        (FieldType::Calculated, None) => {
            issues.push(MetadataIssue::error(at, "calculated field has no formula"));
        }
        (FieldType::Calculated, Some(src)) => match parse_formula(src) {
            Ok(formula) => {
                for name in formula.references() {
                    if !names.contains(name) {
                        let e = EvaluationError::MissingReference {
                            name: name.to_string(),
                        };
                        issues.push(MetadataIssue::error(at, format!("formula: {}", e)));
                    }
                }
            }
            Err(e) => issues.push(MetadataIssue::error(at, format!("formula: {}", e))),
        },
        (_, Some(_)) => issues.push(MetadataIssue::warning(
            at,
            format!("formula is ignored for {} fields", field.field_type),
        )),
        (_, None) => {}
    }

    if field.field_type.has_options() && field.options().is_empty() {
        issues.push(MetadataIssue::warning(
            at,
            format!("{} field has no options", field.field_type),
        ));
    }
    if !field.field_type.is_implemented() {
        issues.push(MetadataIssue::warning(
            at,
            format!(
                "field type '{}' is declared but not implemented; it renders as unsupported",
                field.field_type
            ),
        ));
    }

    check_validation_rules(field, names, issues);
}

fn check_rule_refs(
    key: &str,
    rule: &Rule,
    names: &HashSet<&str>,
    at: Option<&str>,
    issues: &mut Vec<MetadataIssue>,
) {
    for name in rule.referenced_fields() {
        if !names.contains(name) {
            let e = EvaluationError::MissingReference {
                name: name.to_string(),
            };
            issues.push(MetadataIssue::error(at, format!("{}: {}", key, e)));
        }
    }
}

fn check_validation_rules(
    field: &FieldConfig,
    names: &HashSet<&str>,
    issues: &mut Vec<MetadataIssue>,
) {
    let at = Some(field.name.as_str());
    let number =
        |n: &serde_json::Number| Value::from_json(&serde_json::Value::Number(n.clone())).to_number();
    let (mut min, mut max, mut min_len, mut max_len) = (None, None, None, None);

    for rule in field.rules() {
        match rule {
            ValidationRule::Min { value, .. } => min = number(value),
            ValidationRule::Max { value, .. } => max = number(value),
            ValidationRule::MinLength { value, .. } => min_len = Some(*value),
            ValidationRule::MaxLength { value, .. } => max_len = Some(*value),
            ValidationRule::Pattern { value, .. } => {
                if compile_pattern(value).is_err() {
                    issues.push(MetadataIssue::error(
                        at,
                        format!("invalid pattern '{}'", value),
                    ));
                }
            }
            ValidationRule::Custom { rule, .. } => {
                check_rule_refs("custom rule", rule, names, at, issues)
            }
            ValidationRule::Required { .. } => {}
        }
    }

    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            issues.push(MetadataIssue::error(
                at,
                format!("min {} is greater than max {}", lo, hi),
            ));
        }
    }
    if let (Some(lo), Some(hi)) = (min_len, max_len) {
        if lo > hi {
            issues.push(MetadataIssue::error(
                at,
                format!("minLength {} is greater than maxLength {}", lo, hi),
            ));
        }
    }
}

// ──────────────────────────────────────────────
// Sections
// ──────────────────────────────────────────────

fn check_sections(metadata: &FormMetadata, names: &HashSet<&str>, issues: &mut Vec<MetadataIssue>) {
    let mut owner: HashMap<&str, &str> = HashMap::new();
    for section in metadata.sections() {
        for name in &section.fields {
            if !names.contains(name.as_str()) {
                issues.push(MetadataIssue::error(
                    None,
                    format!("section '{}' lists unknown field '{}'", section.title, name),
                ));
                continue;
            }
            if let Some(first) = owner.insert(name.as_str(), section.title.as_str()) {
                issues.push(MetadataIssue::error(
                    Some(name.as_str()),
                    format!(
                        "listed in section '{}' and again in section '{}'",
                        first, section.title
                    ),
                ));
            }
        }
    }
}

// ──────────────────────────────────────────────
// Formula cycles
// ──────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Calculated fields whose formulas reference each other in a loop.
fn check_formula_cycles(metadata: &FormMetadata, issues: &mut Vec<MetadataIssue>) {
    let mut graph: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for field in &metadata.fields {
        if field.field_type != FieldType::Calculated {
            continue;
        }
        let deps = field
            .formula
            .as_deref()
            .and_then(|src| parse_formula(src).ok())
            .map(|f| f.references().into_iter().map(str::to_owned).collect())
            .unwrap_or_default();
        graph.insert(field.name.as_str(), deps);
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let order: Vec<&str> = metadata
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .filter(|n| graph.contains_key(n))
        .collect();
    for start in order {
        let mut path = Vec::new();
        visit(start, &graph, &mut marks, &mut path, issues);
    }
}

fn visit<'a>(
    node: &'a str,
    graph: &'a BTreeMap<&'a str, Vec<String>>,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
    issues: &mut Vec<MetadataIssue>,
) {
    match marks.get(node) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => {
            let from = path.iter().position(|n| *n == node).unwrap_or(0);
            let mut cycle: Vec<&str> = path[from..].to_vec();
            cycle.push(node);
            issues.push(MetadataIssue::error(
                Some(node),
                format!("calculated fields form a cycle: {}", cycle.join(" -> ")),
            ));
            return;
        }
        None => {}
    }
    marks.insert(node, Mark::Visiting);
    path.push(node);
    if let Some(deps) = graph.get(node) {
        for dep in deps {
            if let Some((key, _)) = graph.get_key_value(dep.as_str()) {
                visit(*key, graph, marks, path, issues);
            }
        }
    }
    path.pop();
    marks.insert(node, Mark::Done);
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(doc: serde_json::Value) -> FormMetadata {
        formwork_interchange::from_interchange(&doc).unwrap()
    }

    fn messages(issues: &[MetadataIssue]) -> Vec<String> {
        issues.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn clean_form_has_no_issues() {
        let m = form(json!({
            "id": "f", "name": "F",
            "fields": [
                { "name": "amount", "label": "Amount", "type": "number" },
                { "name": "discount", "label": "Discount", "type": "number",
                  "visibleWhen": { "field": "amount", "operator": ">", "value": 1000 } },
                { "name": "total", "label": "Total", "type": "calculated", "formula": "amount - discount" }
            ],
            "sections": [ { "title": "Main", "fields": ["amount", "discount", "total"] } ]
        }));
        assert!(check_metadata(&m).is_empty());
    }

    #[test]
    fn duplicate_and_unknown_names() {
        let m = form(json!({
            "id": "f", "name": "F",
            "fields": [
                { "name": "a", "label": "A", "type": "text",
                  "requiredWhen": { "field": "ghost", "operator": "isNotEmpty" } },
                { "name": "a", "label": "A again", "type": "text" }
            ],
            "sections": [
                { "title": "One", "fields": ["a", "nowhere"] },
                { "title": "Two", "fields": ["a"] }
            ]
        }));
        let issues = check_metadata(&m);
        assert!(has_errors(&issues));
        assert_eq!(
            messages(&issues),
            vec![
                "error: field 'a': duplicate field name 'a'",
                "error: field 'a': requiredWhen: unknown field 'ghost'",
                "error: section 'One' lists unknown field 'nowhere'",
                "error: field 'a': listed in section 'One' and again in section 'Two'",
            ]
        );
    }

    #[test]
    fn formula_problems() {
        let m = form(json!({
            "id": "f", "name": "F",
            "fields": [
                { "name": "a", "label": "A", "type": "number" },
                { "name": "t1", "label": "T1", "type": "calculated" },
                { "name": "t2", "label": "T2", "type": "calculated", "formula": "a +" },
                { "name": "t3", "label": "T3", "type": "calculated", "formula": "a + missing" },
                { "name": "note", "label": "Note", "type": "text", "formula": "a" }
            ]
        }));
        let issues = check_metadata(&m);
        let by_field: Vec<(Option<&str>, Severity)> = issues
            .iter()
            .map(|i| (i.field.as_deref(), i.severity))
            .collect();
        assert_eq!(
            by_field,
            vec![
                (Some("t1"), Severity::Error),
                (Some("t2"), Severity::Error),
                (Some("t3"), Severity::Error),
                (Some("note"), Severity::Warning),
            ]
        );
        assert_eq!(issues[2].message, "formula: unknown field 'missing'");
    }

    #[test]
    fn calculated_cycle_reported_once() {
        let m = form(json!({
            "id": "f", "name": "F",
            "fields": [
                { "name": "x", "label": "X", "type": "calculated", "formula": "y + 1" },
                { "name": "y", "label": "Y", "type": "calculated", "formula": "x * 2" },
                { "name": "z", "label": "Z", "type": "calculated", "formula": "z" }
            ]
        }));
        let issues = check_metadata(&m);
        assert_eq!(
            messages(&issues),
            vec![
                "error: field 'x': calculated fields form a cycle: x -> y -> x",
                "error: field 'z': calculated fields form a cycle: z -> z",
            ]
        );
    }

    #[test]
    fn rule_and_bound_problems() {
        let m = form(json!({
            "id": "f", "name": "F",
            "fields": [
                { "name": "code", "label": "Code", "type": "text",
                  "visibleWhen": { "field": "code", "operator": "isEmpty" },
                  "validationRules": [
                    { "type": "pattern", "value": "([a-z" },
                    { "type": "minLength", "value": 5 },
                    { "type": "maxLength", "value": 2 },
                    { "type": "custom", "rule": { "field": "code", "operator": "=", "otherField": "other" } }
                  ] },
                { "name": "pct", "label": "Pct", "type": "number",
                  "validationRules": [ { "type": "min", "value": 10 }, { "type": "max", "value": 1.5 } ] }
            ]
        }));
        assert_eq!(
            messages(&check_metadata(&m)),
            vec![
                "warning: field 'code': visibleWhen reads the field's own value; once hidden it cannot be edited back",
                "error: field 'code': invalid pattern '([a-z'",
                "error: field 'code': custom rule: unknown field 'other'",
                "error: field 'code': minLength 5 is greater than maxLength 2",
                "error: field 'pct': min 10 is greater than max 1.5",
            ]
        );
    }

    #[test]
    fn pattern_escaping_its_anchors_is_an_error() {
        let m = form(json!({
            "id": "f", "name": "F",
            "fields": [
                { "name": "code", "label": "Code", "type": "text",
                  "validationRules": [ { "type": "pattern", "value": "a)|(b" } ] },
                { "name": "zip", "label": "ZIP", "type": "text",
                  "validationRules": [ { "type": "pattern", "value": "[0-9]{5}" } ] }
            ]
        }));
        assert_eq!(
            messages(&check_metadata(&m)),
            vec!["error: field 'code': invalid pattern 'a)|(b'"]
        );
    }

    #[test]
    fn option_and_type_warnings() {
        let m = form(json!({
            "id": "f", "name": "F",
            "fields": [
                { "name": "pick", "label": "Pick", "type": "select" },
                { "name": "doc", "label": "Doc", "type": "file" }
            ]
        }));
        let issues = check_metadata(&m);
        assert!(!has_errors(&issues));
        assert_eq!(
            messages(&issues),
            vec![
                "warning: field 'pick': select field has no options",
                "warning: field 'doc': field type 'file' is declared but not implemented; it renders as unsupported",
            ]
        );
    }
}
