//! Formwork form engine -- accepts form metadata plus a data snapshot,
//! produces field states, computed values and validation results.
//!
//! Everything below [`session`] is a pure function of `(metadata, data)`:
//! conditional visibility and required-ness ([`conditional`]), formula
//! evaluation ([`formula`]), rule predicates ([`predicate`]) and
//! validation ([`validation`]). [`session::FormSession`] ties them to one
//! open form and talks to the outside world through the
//! [`registry::MetadataRegistry`] and [`submission::FormSubmitter`]
//! collaborators.

pub mod check;
pub mod conditional;
pub mod config;
pub mod error;
pub mod formula;
pub mod numeric;
pub mod predicate;
pub mod registry;
pub mod render;
pub mod session;
pub mod submission;
pub mod validation;
pub mod value;

pub use check::{check_metadata, has_errors, MetadataIssue, Severity};
pub use conditional::{
    calculate_formula_value, field_states, get_field_state, should_show_field, FieldState,
};
pub use config::EngineConfig;
pub use error::{EvaluationError, ValidationError};
pub use formula::evaluate_formula;
pub use predicate::{evaluate, evaluate_condition};
pub use registry::{DirectoryRegistry, InMemoryRegistry, MetadataRegistry, RegistryError};
pub use render::{control_for, render_field, Control, RenderedField};
pub use session::{transition, FormSession, SectionView, Transition};
pub use submission::{
    FormSubmitter, MemorySubmitter, SubmissionError, SubmissionReceipt, SubmitError,
};
pub use validation::{validate_field, validate_form_data, FieldError, ValidationResult};
pub use value::{FormData, Value};
