//! Metadata registry trait and implementations.
//!
//! A `MetadataRegistry` supplies the `FormMetadata` for a form id. The
//! session receives a registry handle explicitly; there is no global
//! registry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

use formwork_interchange::{from_str, FormMetadata};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("form '{form_id}' not found")]
    NotFound { form_id: String },
    /// The registry could not produce the document (I/O, bad JSON, ...).
    #[error("registry error: {message}")]
    Backend { message: String },
}

// ──────────────────────────────────────────────
// Trait
// ──────────────────────────────────────────────

/// Asynchronous lookup of form metadata by id.
#[async_trait]
pub trait MetadataRegistry: Send + Sync {
    async fn load(&self, form_id: &str) -> Result<FormMetadata, RegistryError>;
}

// ──────────────────────────────────────────────
// InMemoryRegistry
// ──────────────────────────────────────────────

/// A registry over a fixed set of forms, keyed by their `id`.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    forms: HashMap<String, FormMetadata>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a form, replacing any earlier form with the same id.
    pub fn insert(&mut self, metadata: FormMetadata) {
        self.forms.insert(metadata.id.clone(), metadata);
    }
}

impl FromIterator<FormMetadata> for InMemoryRegistry {
    fn from_iter<I: IntoIterator<Item = FormMetadata>>(iter: I) -> Self {
        let mut registry = InMemoryRegistry::new();
        for m in iter {
            registry.insert(m);
        }
        registry
    }
}

#[async_trait]
impl MetadataRegistry for InMemoryRegistry {
    async fn load(&self, form_id: &str) -> Result<FormMetadata, RegistryError> {
        self.forms
            .get(form_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                form_id: form_id.to_string(),
            })
    }
}

// ──────────────────────────────────────────────
// DirectoryRegistry
// ──────────────────────────────────────────────

/// Reads `<root>/<form-id>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    root: PathBuf,
}

impl DirectoryRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryRegistry { root: root.into() }
    }

    fn path_for(&self, form_id: &str) -> Option<PathBuf> {
        let plain = !form_id.is_empty()
            && form_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        plain.then(|| self.root.join(format!("{}.json", form_id)))
    }
}

#[async_trait]
impl MetadataRegistry for DirectoryRegistry {
    async fn load(&self, form_id: &str) -> Result<FormMetadata, RegistryError> {
        let not_found = || RegistryError::NotFound {
            form_id: form_id.to_string(),
        };
        let path = self.path_for(form_id).ok_or_else(not_found)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                return Err(RegistryError::Backend {
                    message: format!("cannot read {}: {}", path.display(), e),
                })
            }
        };
        let metadata = from_str(&text).map_err(|e| RegistryError::Backend {
            message: format!("{}: {}", path.display(), e),
        })?;
        if metadata.id != form_id {
            return Err(RegistryError::Backend {
                message: format!(
                    "{} declares id '{}', expected '{}'",
                    path.display(),
                    metadata.id,
                    form_id
                ),
            });
        }
        Ok(metadata)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
