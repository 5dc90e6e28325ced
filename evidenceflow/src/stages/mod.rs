//! The stage contract.
//!
//! Stages are the pluggable units of work in a pipeline. External
//! enrichment engines implement [`Stage`]; the pipeline core supplies one
//! built-in implementation, [`SetHeadersStage`].

mod headers;

pub use headers::{
    response_header_name, SetHeadersStage, RESPONSE_HEADER_PROPERTY, SET_HEADERS_KEY,
};

use crate::context::FlowContext;
use crate::core::PropertyMap;
use crate::evidence::EvidenceKeyFilter;
use crate::pipeline::Pipeline;

/// A pluggable unit of work in a pipeline.
///
/// Stages read filtered evidence from the flow context and contribute one
/// result record per pass. A stage is registered into at most one pipeline
/// and is shared, read-only, by every context that pipeline creates.
pub trait Stage: Send + Sync {
    /// The unique, stable key identifying this stage.
    ///
    /// Used as the results-map key and as an evidence namespace
    /// disambiguator.
    fn data_key(&self) -> &str;

    /// Called once when the stage is registered into a pipeline.
    ///
    /// Gives the stage a chance to validate or cross-link against sibling
    /// stages before the first context is created.
    fn on_registration(&self, pipeline: &Pipeline) {
        let _ = pipeline;
    }

    /// The stage's declared output properties and their metadata.
    ///
    /// Metadata is an open field-to-value mapping; `type` is the
    /// conventional minimum. A stage whose property set changes after
    /// registration must be re-indexed through
    /// [`Pipeline::reindex_stage`].
    fn properties(&self) -> PropertyMap {
        PropertyMap::new()
    }

    /// The evidence keys this stage is interested in.
    fn evidence_key_filter(&self) -> EvidenceKeyFilter {
        EvidenceKeyFilter::accept_all()
    }

    /// Whether this stage wants the given evidence key.
    fn filter_evidence_key(&self, key: &str) -> bool {
        self.evidence_key_filter().accepts(key)
    }

    /// Performs the stage's work for one request.
    ///
    /// Implementations read `ctx.evidence()`, write one result record via
    /// [`FlowContext::set_result`], and may call [`FlowContext::stop`] to
    /// prevent later stages from running. An `Err` is caught at the
    /// per-stage boundary and recorded against this stage's key; it does
    /// not abort the pass.
    fn process(&self, ctx: &mut FlowContext) -> anyhow::Result<()>;
}
