//! Submission collaborator.
//!
//! A `FormSubmitter` receives an already validated snapshot. Failures it
//! reports are submission-level and stay distinct from field-level
//! validation errors. Timeouts and retries belong to the implementation.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::validation::ValidationResult;
use crate::value::FormData;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Failure reported by a submitter. Passed through to the caller unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmissionError {
    /// The receiving side refused the data.
    #[error("submission rejected: {message}")]
    Rejected {
        message: String,
        details: Option<serde_json::Value>,
    },
    /// The data never reached the receiving side.
    #[error("submission transport failed: {message}")]
    Transport { message: String },
}

/// Why `FormSession::submit` did not go through.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmitError {
    #[error("form data is invalid ({} field error(s))", .0.errors.len())]
    Invalid(ValidationResult),
    #[error(transparent)]
    Rejected(#[from] SubmissionError),
}

/// Acknowledgement returned by a submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub reference: String,
}

// ──────────────────────────────────────────────
// Trait
// ──────────────────────────────────────────────

#[async_trait]
pub trait FormSubmitter: Send + Sync {
    async fn submit(
        &self,
        form_id: &str,
        data: &FormData,
    ) -> Result<SubmissionReceipt, SubmissionError>;
}

// ──────────────────────────────────────────────
// MemorySubmitter
// ──────────────────────────────────────────────

/// Records every accepted submission. Optionally rejects everything with
/// a scripted error.
#[derive(Debug, Default)]
pub struct MemorySubmitter {
    accepted: Mutex<Vec<(String, FormData)>>,
    reject_with: Option<SubmissionError>,
}

impl MemorySubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(error: SubmissionError) -> Self {
        MemorySubmitter {
            accepted: Mutex::new(Vec::new()),
            reject_with: Some(error),
        }
    }

    /// Accepted submissions as `(form_id, snapshot)`, oldest first.
    pub async fn submissions(&self) -> Vec<(String, FormData)> {
        self.accepted.lock().await.clone()
    }
}

#[async_trait]
impl FormSubmitter for MemorySubmitter {
    async fn submit(
        &self,
        form_id: &str,
        data: &FormData,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        if let Some(err) = &self.reject_with {
            return Err(err.clone());
        }
        let mut accepted = self.accepted.lock().await;
        accepted.push((form_id.to_string(), data.clone()));
        Ok(SubmissionReceipt {
            reference: format!("{}-{}", form_id, accepted.len()),
        })
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_submitter_records() {
        let submitter = MemorySubmitter::new();
        let data = FormData::from_json(&json!({ "a": 1 })).unwrap();
        let receipt = submitter.submit("f", &data).await.unwrap();
        assert_eq!(receipt.reference, "f-1");
        let second = submitter.submit("f", &data).await.unwrap();
        assert_eq!(second.reference, "f-2");
        let all = submitter.submissions().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1, data);
    }

    #[tokio::test]
    async fn scripted_rejection() {
        let err = SubmissionError::Rejected {
            message: "duplicate claim".to_string(),
            details: Some(json!({ "existing": "f-7" })),
        };
        let submitter = MemorySubmitter::rejecting(err.clone());
        let result = submitter.submit("f", &FormData::new()).await;
        assert_eq!(result, Err(err));
        assert!(submitter.submissions().await.is_empty());
    }

    #[test]
    fn error_display() {
        let err = SubmissionError::Transport {
            message: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "submission transport failed: connection refused"
        );
        let wrapped: SubmitError = err.into();
        assert_eq!(
            wrapped.to_string(),
            "submission transport failed: connection refused"
        );
    }
}
