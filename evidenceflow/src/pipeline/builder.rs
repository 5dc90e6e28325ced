//! Fluent construction of pipelines.

use std::sync::Arc;

use crate::errors::PipelineError;
use crate::logging::{LogSink, NoOpLogSink};
use crate::pipeline::Pipeline;
use crate::stages::{SetHeadersStage, Stage};

/// Assembles stages and options into a [`Pipeline`].
///
/// Stage order is the order of [`add`](Self::add) calls; when response
/// headers are enabled (the default) the aggregation stage is appended
/// after every caller-supplied stage, since it reads their results.
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
    logger: Arc<dyn LogSink>,
    suppress_process_errors: bool,
    response_headers: bool,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Creates a builder with default options: a no-op logger, errors
    /// re-raised after a pass, response-header aggregation enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            logger: Arc::new(NoOpLogSink),
            suppress_process_errors: false,
            response_headers: true,
        }
    }

    /// Appends a stage to the execution order.
    #[must_use]
    pub fn add(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Appends an already shared stage to the execution order.
    ///
    /// Useful when the caller keeps a handle to the stage, for example to
    /// re-index it after late property discovery.
    #[must_use]
    pub fn add_shared(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Sets the pipeline's log sink.
    #[must_use]
    pub fn logger(mut self, logger: impl LogSink + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// When true, per-stage errors stay in the context's error map instead
    /// of failing the `process` call.
    #[must_use]
    pub fn suppress_process_errors(mut self, suppress: bool) -> Self {
        self.suppress_process_errors = suppress;
        self
    }

    /// Enables or disables the trailing response-header aggregation stage.
    #[must_use]
    pub fn response_headers(mut self, enabled: bool) -> Self {
        self.response_headers = enabled;
        self
    }

    /// Builds the pipeline, registering and indexing every stage in order.
    ///
    /// Fails with [`PipelineError::DuplicateStageKey`] when two stages
    /// share a data key.
    pub fn build(mut self) -> Result<Arc<Pipeline>, PipelineError> {
        if self.response_headers {
            self.stages.push(Arc::new(SetHeadersStage::new()));
        }
        Pipeline::new(self.stages, self.logger, self.suppress_process_errors)
    }
}
