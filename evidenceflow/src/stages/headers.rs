//! Response-header aggregation.
//!
//! Enrichment stages can declare properties like `SetHeaderHardwareAccept-CH`
//! whose values belong in HTTP response headers (for example to request
//! client hints from newer browsers). This stage collects every such
//! property across the pipeline and merges the values into one final string
//! per header.

use std::sync::{Arc, OnceLock};

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::context::FlowContext;
use crate::core::StageResult;
use crate::errors::PipelineError;
use crate::logging::LogLevel;
use crate::pipeline::Pipeline;
use crate::stages::Stage;

/// The data key under which aggregated headers are published.
pub const SET_HEADERS_KEY: &str = "set-headers";

/// The result property holding the header-name to value map.
pub const RESPONSE_HEADER_PROPERTY: &str = "responseheaderdictionary";

const SET_HEADER_PREFIX: &str = "SetHeader";

/// String values treated as "nothing usable" when building contributions.
const NO_VALUE_SENTINELS: [&str; 2] = ["Unknown", "noValue"];

/// Aggregates `SetHeader` properties from every stage into final
/// response-header values.
///
/// Must run after the informational stages; the builder appends it last.
/// The scan over the pipeline's declared properties happens once, on the
/// first `process` call of this stage instance.
#[derive(Debug, Default)]
pub struct SetHeadersStage {
    // stage key -> qualifying property names, in pipeline/declaration order
    discovered: OnceLock<IndexMap<String, Vec<String>>>,
}

impl SetHeadersStage {
    /// Creates a new header aggregation stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn discover(pipeline: &Pipeline) -> IndexMap<String, Vec<String>> {
        let mut discovered = IndexMap::new();
        for stage in pipeline.stages() {
            let names: Vec<String> = stage
                .properties()
                .keys()
                .filter(|name| name.to_lowercase().contains("setheader"))
                .cloned()
                .collect();
            if !names.is_empty() {
                discovered.insert(stage.data_key().to_owned(), names);
            }
        }
        discovered
    }

    /// The value a (stage, property) pair contributes to its header.
    ///
    /// A missing result, missing property, valueless tag or `Unknown`/
    /// `noValue` sentinel contributes the empty string; each such miss is
    /// logged as a diagnostic rather than failing the aggregation.
    fn contribution(ctx: &FlowContext, stage_key: &str, property: &str) -> String {
        let Ok(result) = ctx.get(stage_key) else {
            ctx.pipeline().log(
                LogLevel::Warning,
                &format!("stage '{stage_key}' has no data; skipping '{property}'"),
            );
            return String::new();
        };
        let Some(value) = result.property(property) else {
            ctx.pipeline().log(
                LogLevel::Warning,
                &format!("property '{property}' not found on stage '{stage_key}'"),
            );
            return String::new();
        };
        match value.as_value() {
            Some(Value::String(text)) if NO_VALUE_SENTINELS.contains(&text.as_str()) => {
                String::new()
            }
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => {
                ctx.pipeline().log(
                    LogLevel::Warning,
                    &format!("property '{property}' on stage '{stage_key}' has no value"),
                );
                String::new()
            }
        }
    }
}

impl Stage for SetHeadersStage {
    fn data_key(&self) -> &str {
        SET_HEADERS_KEY
    }

    fn process(&self, ctx: &mut FlowContext) -> anyhow::Result<()> {
        let pipeline = Arc::clone(ctx.pipeline());
        let discovered = self.discovered.get_or_init(|| Self::discover(&pipeline));

        let mut headers: IndexMap<String, String> = IndexMap::new();
        for (stage_key, names) in discovered {
            for name in names {
                let header = response_header_name(name)?;
                let contribution = Self::contribution(ctx, stage_key, name);
                match headers.entry(header) {
                    Entry::Occupied(mut entry) => {
                        // empty+X=X, X+empty=X, X+Y="X,Y"
                        let merged = entry.get_mut();
                        if merged.is_empty() {
                            *merged = contribution;
                        } else if !contribution.is_empty() {
                            merged.push(',');
                            merged.push_str(&contribution);
                        }
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(contribution);
                    }
                }
            }
        }

        let dictionary: Map<String, Value> = headers
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();

        let mut result = StageResult::new(SET_HEADERS_KEY);
        result.set(RESPONSE_HEADER_PROPERTY, Value::Object(dictionary));
        ctx.set_result(result);
        Ok(())
    }
}

/// Derives the response-header name a `SetHeader` property feeds.
///
/// The name must carry the `SetHeader` prefix; the remainder must start
/// with an upper-case component tag. The remainder is split into runs,
/// each starting at an upper-case letter that begins a new word (an
/// upper-case letter followed by another upper-case letter continues the
/// current run). The first run is the component tag and is discarded; the
/// rest concatenate into the header name. `SetHeaderHardwareAccept-CH`
/// names `Accept-CH`.
pub fn response_header_name(property: &str) -> Result<String, PipelineError> {
    let Some(rest) = property.strip_prefix(SET_HEADER_PREFIX) else {
        return Err(PipelineError::malformed(
            property,
            "missing the 'SetHeader' prefix",
        ));
    };

    let chars: Vec<char> = rest.chars().collect();
    if !chars.first().is_some_and(|c| c.is_ascii_uppercase()) {
        return Err(PipelineError::malformed(
            property,
            "the component tag must start with an upper-case letter",
        ));
    }

    let mut runs: Vec<String> = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        let starts_word = c.is_ascii_uppercase()
            && chars.get(i + 1).is_some_and(|next| !next.is_ascii_uppercase());
        if starts_word && !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    runs.push(current);

    if runs.len() <= 1 {
        return Err(PipelineError::malformed(
            property,
            "no header name remains after the component tag",
        ));
    }
    Ok(runs[1..].concat())
}
