//! Error types for the evidenceflow pipeline.
//!
//! Stage-raised errors are opaque (`anyhow::Error`) and are caught at the
//! per-stage execution boundary; everything the core itself can raise is a
//! [`PipelineError`].

use std::sync::Arc;
use thiserror::Error;

/// The error type for pipeline construction and flow data operations.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// An evidence batch was not a JSON object of key/value pairs.
    #[error("evidence must be set from a JSON object of key/value pairs")]
    InvalidInput,

    /// `process` was called on flow data that had already been processed.
    #[error("flow data has already been processed")]
    AlreadyProcessed,

    /// No stage with the given key is registered on the pipeline.
    #[error("there is no stage with the key '{key}' in this pipeline")]
    StageNotFound {
        /// The requested stage key.
        key: String,
    },

    /// A result was requested before any stage produced data.
    #[error("there is no data for '{key}' against this flow data; no stage has produced a result yet")]
    NoResults {
        /// The requested stage key.
        key: String,
    },

    /// A result was requested for a stage that produced no data.
    #[error("there is no data for '{key}' against this flow data; available keys: {}", available.join(", "))]
    NoSuchResult {
        /// The requested stage key.
        key: String,
        /// The stage keys that did produce data.
        available: Vec<String>,
    },

    /// A response-header property name violated the derivation rules.
    #[error("malformed response header property '{property}': {detail}")]
    MalformedProperty {
        /// The offending property name.
        property: String,
        /// Which rule was violated.
        detail: String,
    },

    /// Two stages with the same data key were added to one pipeline.
    #[error("duplicate stage key '{key}'; stage keys must be unique within a pipeline")]
    DuplicateStageKey {
        /// The colliding key.
        key: String,
    },

    /// A stage raised an error during processing.
    ///
    /// Returned from a `process` pass when error suppression is off,
    /// wrapping the first error recorded during the pass. The full error
    /// map stays available on the flow context.
    #[error("stage '{stage}' failed: {cause}")]
    StageFailed {
        /// Key of the stage that raised the error.
        stage: String,
        /// The stage's own error.
        cause: Arc<anyhow::Error>,
    },
}

impl PipelineError {
    /// Creates a malformed response-header property error.
    #[must_use]
    pub fn malformed(property: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedProperty {
            property: property.into(),
            detail: detail.into(),
        }
    }
}
