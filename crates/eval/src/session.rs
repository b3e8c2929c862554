//! Form orchestrator.
//!
//! [`transition`] is the pure step: apply one edit to a snapshot and
//! recompute the state of every field. [`FormSession`] owns one open
//! form's snapshot and drives that step, sectioning, rendering and
//! submission. Edits to a session are serialized by `&mut self`, so no
//! recomputation ever sees a half-applied snapshot.

use tracing::{debug, info};

use formwork_interchange::{FieldConfig, FormMetadata};

use crate::conditional::{field_states, should_show_field, FieldState};
use crate::config::EngineConfig;
use crate::error::EvaluationError;
use crate::registry::{MetadataRegistry, RegistryError};
use crate::render::{render_field, RenderedField};
use crate::submission::{FormSubmitter, SubmissionReceipt, SubmitError};
use crate::validation::{validate_form_data, ValidationResult};
use crate::value::FormData;

// ──────────────────────────────────────────────
// Pure transition
// ──────────────────────────────────────────────

/// Result of one edit: the new snapshot and every field's state under it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub data: FormData,
    pub states: Vec<(String, FieldState)>,
}

/// Apply `field = value` to a copy of `data` and recompute all states.
///
/// Every field is recomputed, not just the edited one, because any rule
/// may read the edited field.
pub fn transition(
    metadata: &FormMetadata,
    data: &FormData,
    field: &str,
    value: serde_json::Value,
) -> Result<Transition, EvaluationError> {
    if metadata.field(field).is_none() {
        return Err(EvaluationError::MissingReference {
            name: field.to_string(),
        });
    }
    let mut next = data.clone();
    next.set(field, value);
    let states = field_states(metadata, &next);
    debug!(form = %metadata.id, field, "form transition");
    Ok(Transition { data: next, states })
}

// ──────────────────────────────────────────────
// Session
// ──────────────────────────────────────────────

/// Visible fields of one section. Fields not listed in any section end
/// up in a trailing group with no title.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionView<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub fields: Vec<&'a FieldConfig>,
}

/// One open form.
#[derive(Debug, Clone)]
pub struct FormSession {
    metadata: FormMetadata,
    data: FormData,
    config: EngineConfig,
    last_validation: Option<ValidationResult>,
}

impl FormSession {
    pub fn new(metadata: FormMetadata, config: EngineConfig) -> Self {
        FormSession {
            metadata,
            data: FormData::new(),
            config,
            last_validation: None,
        }
    }

    /// Start from caller-supplied initial values.
    pub fn with_data(mut self, data: FormData) -> Self {
        self.data = data;
        self.last_validation = None;
        self
    }

    /// Load the form's metadata from a registry and open an empty session.
    pub async fn open(
        registry: &dyn MetadataRegistry,
        form_id: &str,
        config: EngineConfig,
    ) -> Result<FormSession, RegistryError> {
        let metadata = registry.load(form_id).await?;
        Ok(FormSession::new(metadata, config))
    }

    pub fn metadata(&self) -> &FormMetadata {
        &self.metadata
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Result of the last `validate` or `submit` on the current snapshot.
    /// Any edit clears it.
    pub fn last_validation(&self) -> Option<&ValidationResult> {
        self.last_validation.as_ref()
    }

    /// Apply one edit and return every field's new state. Messages from an
    /// earlier validation no longer describe the snapshot and are dropped.
    pub fn on_change(
        &mut self,
        field: &str,
        value: serde_json::Value,
    ) -> Result<Vec<(String, FieldState)>, EvaluationError> {
        let Transition { data, states } = transition(&self.metadata, &self.data, field, value)?;
        self.data = data;
        self.last_validation = None;
        Ok(states)
    }

    pub fn states(&self) -> Vec<(String, FieldState)> {
        field_states(&self.metadata, &self.data)
    }

    /// Visible fields in section order, or declaration order when the
    /// form has no sections.
    pub fn visible_fields(&self) -> Vec<&FieldConfig> {
        self.sections().into_iter().flat_map(|s| s.fields).collect()
    }

    /// Visible fields grouped by section. Sections with no visible field
    /// are left out.
    pub fn sections(&self) -> Vec<SectionView<'_>> {
        let visible = |f: &FieldConfig| should_show_field(f, &self.data);
        let declared = self.metadata.sections();
        if declared.is_empty() {
            let fields: Vec<_> = self.metadata.fields.iter().filter(|f| visible(*f)).collect();
            return if fields.is_empty() {
                Vec::new()
            } else {
                vec![SectionView {
                    title: None,
                    description: None,
                    fields,
                }]
            };
        }

        let mut views = Vec::new();
        for section in declared {
            let fields: Vec<_> = section
                .fields
                .iter()
                .filter_map(|name| self.metadata.field(name))
                .filter(|f| visible(*f))
                .collect();
            if !fields.is_empty() {
                views.push(SectionView {
                    title: Some(section.title.as_str()),
                    description: section.description.as_deref(),
                    fields,
                });
            }
        }
        let unlisted: Vec<_> = self
            .metadata
            .fields
            .iter()
            .filter(|f| !declared.iter().any(|s| s.fields.contains(&f.name)))
            .filter(|f| visible(*f))
            .collect();
        if !unlisted.is_empty() {
            views.push(SectionView {
                title: None,
                description: None,
                fields: unlisted,
            });
        }
        views
    }

    pub fn validate(&mut self) -> &ValidationResult {
        let result = validate_form_data(&self.metadata, &self.data);
        self.last_validation.insert(result)
    }

    /// One descriptor per visible field, carrying the messages of a
    /// validation run since the last edit.
    pub fn render(&self) -> Vec<RenderedField> {
        self.visible_fields()
            .into_iter()
            .map(|f| render_field(f, &self.data, self.last_validation.as_ref(), &self.config))
            .collect()
    }

    /// Validate, then hand the snapshot to `submitter`.
    ///
    /// Invalid data never reaches the submitter. A rejection is returned as
    /// [`SubmitError::Rejected`], separate from field errors, and keeps the
    /// snapshot for a retry. Once accepted the session starts over empty.
    pub async fn submit(
        &mut self,
        submitter: &dyn FormSubmitter,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let result = validate_form_data(&self.metadata, &self.data);
        if !result.valid {
            info!(form = %self.metadata.id, errors = result.errors.len(), "submission blocked by validation");
            self.last_validation = Some(result.clone());
            return Err(SubmitError::Invalid(result));
        }
        self.last_validation = Some(result);
        match submitter.submit(&self.metadata.id, &self.data).await {
            Ok(receipt) => {
                info!(form = %self.metadata.id, reference = %receipt.reference, "form submitted");
                self.data = FormData::new();
                self.last_validation = None;
                Ok(receipt)
            }
            Err(e) => {
                info!(form = %self.metadata.id, error = %e, "submission rejected");
                Err(SubmitError::Rejected(e))
            }
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
