//! Pipeline construction and the stage registry.

mod builder;
mod index;

pub use builder::PipelineBuilder;
pub use index::{IndexedProperty, MetadataIndex};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::FlowContext;
use crate::errors::PipelineError;
use crate::logging::{LogLevel, LogSink};
use crate::stages::Stage;

/// An ordered, immutable-after-construction list of stages plus the
/// metadata index and log sink. Factory for per-request flow contexts.
///
/// Built through [`PipelineBuilder`]. Once construction and any
/// [`reindex_stage`](Self::reindex_stage) calls have quiesced, creating
/// and processing contexts is safe from concurrent callers; contexts share
/// no mutable state with each other.
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    stages_by_key: HashMap<String, usize>,
    logger: Arc<dyn LogSink>,
    suppress_process_errors: bool,
    index: RwLock<MetadataIndex>,
}

impl Pipeline {
    pub(crate) fn new(
        stages: Vec<Arc<dyn Stage>>,
        logger: Arc<dyn LogSink>,
        suppress_process_errors: bool,
    ) -> Result<Arc<Self>, PipelineError> {
        let mut stages_by_key = HashMap::new();
        for (position, stage) in stages.iter().enumerate() {
            let key = stage.data_key().to_owned();
            if stages_by_key.insert(key, position).is_some() {
                return Err(PipelineError::DuplicateStageKey {
                    key: stage.data_key().to_owned(),
                });
            }
        }

        let pipeline = Arc::new(Self {
            stages,
            stages_by_key,
            logger,
            suppress_process_errors,
            index: RwLock::new(MetadataIndex::new()),
        });

        for stage in &pipeline.stages {
            stage.on_registration(&pipeline);
            pipeline.reindex_stage(stage.as_ref());
        }

        pipeline.log(
            LogLevel::Debug,
            &format!("pipeline created with {} stages", pipeline.stages.len()),
        );
        Ok(pipeline)
    }

    /// The registered stages, in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    /// Looks up a stage by its data key.
    pub fn get_stage(&self, key: &str) -> Result<Arc<dyn Stage>, PipelineError> {
        self.stages_by_key
            .get(key)
            .map(|&position| Arc::clone(&self.stages[position]))
            .ok_or_else(|| PipelineError::StageNotFound {
                key: key.to_owned(),
            })
    }

    /// Creates an independent flow context for one request.
    #[must_use]
    pub fn create_context(self: &Arc<Self>) -> FlowContext {
        FlowContext::new(Arc::clone(self))
    }

    /// Rebuilds the metadata index entries for one stage.
    ///
    /// Purges everything attributed to the stage's key, then re-inserts
    /// from its current properties. Callable after construction for stages
    /// that discover properties late; idempotent for an unchanged property
    /// set. Callers must not race this against in-flight contexts.
    pub fn reindex_stage(&self, stage: &dyn Stage) {
        let properties = stage.properties();
        let mut index = self.index.write();
        index.purge_stage(stage.data_key());
        index.index_stage(stage.data_key(), &properties);
    }

    /// Properties matching a metadata (field, value) pair, as
    /// (property name, owning stage key) pairs.
    #[must_use]
    pub fn query_metadata(&self, field: &str, value: &str) -> Vec<(String, String)> {
        self.index.read().query(field, value)
    }

    /// A snapshot of the metadata index.
    #[must_use]
    pub fn metadata_index(&self) -> MetadataIndex {
        self.index.read().clone()
    }

    /// Whether per-stage errors are withheld from `process` return values.
    #[must_use]
    pub fn suppress_process_errors(&self) -> bool {
        self.suppress_process_errors
    }

    /// Logs through the pipeline's sink; the sink applies its level gate.
    pub fn log(&self, level: LogLevel, message: &str) {
        self.logger.log(level, message);
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "stages",
                &self.stages.iter().map(|s| s.data_key()).collect::<Vec<_>>(),
            )
            .field("suppress_process_errors", &self.suppress_process_errors)
            .finish_non_exhaustive()
    }
}
