//! # Evidenceflow
//!
//! A request-scoped evidence processing pipeline: an ordered chain of
//! pluggable stages that read key/value evidence about an inbound request
//! and contribute typed properties to a shared per-request flow context.
//! Enrichment engines (device detectors and similar) plug into the chain
//! as stages.
//!
//! - **Single-pass execution**: each flow context runs the stage chain
//!   exactly once, with per-stage error isolation.
//! - **Evidence filtering**: stages declare which evidence keys they want;
//!   keys no stage wants never enter the store.
//! - **Metadata queries**: a pipeline-wide reverse index answers "which
//!   properties carry this metadata value" across all stages.
//! - **Response-header aggregation**: `SetHeader` properties from any stage
//!   are merged deterministically into final header values.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use evidenceflow::prelude::*;
//!
//! // Assemble a pipeline from ordered stages
//! let pipeline = PipelineBuilder::new()
//!     .add(device_detector)
//!     .build()?;
//!
//! // One context per request
//! let mut ctx = pipeline.create_context();
//! ctx.evidence_mut().set("header.user-agent", agent.into());
//! ctx.process()?;
//! let device = ctx.get("device")?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod context;
pub mod core;
pub mod errors;
pub mod evidence;
pub mod logging;
pub mod pipeline;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{FlowContext, CORE_ERROR_KEY};
    pub use crate::core::{
        meta_of_type, PropertyMap, PropertyMeta, PropertyValue, StageResult,
    };
    pub use crate::errors::PipelineError;
    pub use crate::evidence::{Evidence, EvidenceKeyFilter};
    pub use crate::logging::{
        LogLevel, LogRecord, LogSink, NoOpLogSink, TracingLogSink,
    };
    pub use crate::pipeline::{MetadataIndex, Pipeline, PipelineBuilder};
    pub use crate::stages::{
        response_header_name, SetHeadersStage, Stage, RESPONSE_HEADER_PROPERTY,
        SET_HEADERS_KEY,
    };
}
