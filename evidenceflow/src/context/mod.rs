//! Per-request flow data.

#[cfg(test)]
mod context_tests;

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

use crate::core::StageResult;
use crate::errors::PipelineError;
use crate::evidence::Evidence;
use crate::logging::LogLevel;
use crate::pipeline::Pipeline;
use crate::stages::Stage;

/// Reserved error-map key for errors raised by the core rather than by a
/// stage.
pub const CORE_ERROR_KEY: &str = "core";

/// One request's evidence, per-stage results and per-stage errors.
///
/// Created by [`Pipeline::create_context`]; drives a single sequential
/// pass over the pipeline's stages. A context can be processed exactly
/// once, and contexts from the same pipeline are fully independent.
#[derive(Debug)]
pub struct FlowContext {
    id: Uuid,
    pipeline: Arc<Pipeline>,
    evidence: Evidence,
    processed: bool,
    stopped: bool,
    results: HashMap<String, StageResult>,
    errors: IndexMap<String, Arc<anyhow::Error>>,
}

impl FlowContext {
    pub(crate) fn new(pipeline: Arc<Pipeline>) -> Self {
        let id = Uuid::new_v4();
        pipeline.log(LogLevel::Debug, &format!("created flow context {id}"));
        Self {
            id,
            evidence: Evidence::new(Arc::clone(&pipeline)),
            pipeline,
            processed: false,
            stopped: false,
            results: HashMap::new(),
            errors: IndexMap::new(),
        }
    }

    /// This context's unique id, included in log messages.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The pipeline this context was created from.
    #[must_use]
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// The request's evidence store.
    #[must_use]
    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    /// Mutable access to the request's evidence store.
    pub fn evidence_mut(&mut self) -> &mut Evidence {
        &mut self.evidence
    }

    /// Adds evidence from an untyped JSON batch.
    ///
    /// A batch that is not a JSON object records
    /// [`PipelineError::InvalidInput`] under the reserved `core` key in the
    /// error map instead of raising. Entries of a valid batch go through
    /// the evidence store's filter gate, in the batch's order.
    pub fn add_evidence_json(&mut self, batch: Value) {
        match batch {
            Value::Object(entries) => {
                for (key, value) in entries {
                    self.evidence.set(key, value);
                }
            }
            _ => self.set_error(
                CORE_ERROR_KEY,
                anyhow::Error::new(PipelineError::InvalidInput),
            ),
        }
    }

    /// Runs every stage in pipeline order, exactly once per context.
    ///
    /// Each stage's error is caught at this boundary and recorded against
    /// its key; the pass continues with the next stage unless a stage
    /// called [`stop`](Self::stop). After the pass completes, the
    /// first-recorded error is returned as
    /// [`PipelineError::StageFailed`] unless the pipeline suppresses
    /// process errors; either way all results and errors stay readable on
    /// the context.
    ///
    /// A second call fails with [`PipelineError::AlreadyProcessed`] and
    /// performs no stage work.
    pub fn process(&mut self) -> Result<(), PipelineError> {
        if self.processed {
            return Err(PipelineError::AlreadyProcessed);
        }

        let pipeline = Arc::clone(&self.pipeline);
        for stage in pipeline.stages() {
            if self.stopped {
                break;
            }
            if let Err(error) = stage.process(self) {
                self.set_error(stage.data_key(), error);
            }
        }
        self.processed = true;

        if !self.pipeline.suppress_process_errors() {
            if let Some((stage, cause)) = self.errors.first() {
                return Err(PipelineError::StageFailed {
                    stage: stage.clone(),
                    cause: Arc::clone(cause),
                });
            }
        }
        Ok(())
    }

    /// Whether `process` has completed.
    #[must_use]
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Prevents any later-ordered stage from running in this pass.
    ///
    /// Cooperative and idempotent; checked only between stages, so a stage
    /// already in progress is never unwound.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Whether a stage has stopped the pass.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// A stage's result record, by stage key.
    ///
    /// The error distinguishes a context with no results at all
    /// ([`PipelineError::NoResults`]) from a key that specifically never
    /// produced data ([`PipelineError::NoSuchResult`]).
    pub fn get(&self, stage_key: &str) -> Result<&StageResult, PipelineError> {
        if let Some(result) = self.results.get(stage_key) {
            return Ok(result);
        }
        if self.results.is_empty() {
            Err(PipelineError::NoResults {
                key: stage_key.to_owned(),
            })
        } else {
            let mut available: Vec<String> = self.results.keys().cloned().collect();
            available.sort_unstable();
            Err(PipelineError::NoSuchResult {
                key: stage_key.to_owned(),
                available,
            })
        }
    }

    /// A stage's result record, looked up through the stage itself.
    pub fn get_from_stage(&self, stage: &dyn Stage) -> Result<&StageResult, PipelineError> {
        self.get(stage.data_key())
    }

    /// Present values of every property whose metadata field carries the
    /// given value, keyed by property name.
    ///
    /// Field and value are matched case-insensitively. Pairs whose stage
    /// produced no result, or whose property is absent or valueless, are
    /// silently skipped; partial results are valid.
    #[must_use]
    pub fn get_by_metadata(&self, field: &str, value: &str) -> HashMap<String, Value> {
        let mut output = HashMap::new();
        for (property, stage_key) in self.pipeline.query_metadata(field, value) {
            let Some(result) = self.results.get(&stage_key) else {
                continue;
            };
            if let Some(found) = result.value(&property) {
                output.insert(property, found.clone());
            }
        }
        output
    }

    /// Stores a stage's result record, keyed by its owning stage.
    pub fn set_result(&mut self, result: StageResult) {
        self.results.insert(result.stage_key().to_owned(), result);
    }

    /// Records an error against a stage key.
    ///
    /// The error is always logged at `error` level, even when process
    /// errors are suppressed from the caller.
    pub fn set_error(&mut self, key: impl Into<String>, error: anyhow::Error) {
        let key = key.into();
        let message = format!("error occurred during processing of '{key}': {error}");
        self.errors.insert(key, Arc::new(error));
        self.pipeline.log(LogLevel::Error, &message);
    }

    /// Errors recorded during the pass, keyed by stage, in insertion
    /// order.
    #[must_use]
    pub fn errors(&self) -> &IndexMap<String, Arc<anyhow::Error>> {
        &self.errors
    }

    /// The union of each stage's filtered evidence, merged in pipeline
    /// order; on duplicate keys the later stage's copy wins.
    #[must_use]
    pub fn requested_evidence(&self) -> HashMap<String, Value> {
        let all = self.evidence.get_all();
        let mut requested = HashMap::new();
        for stage in self.pipeline.stages() {
            requested.extend(stage.evidence_key_filter().filter(&all));
        }
        requested
    }
}
