//! Fixtures for exercising pipelines in tests.
//!
//! The crate's own test suite uses these; downstream engine crates can
//! reuse them in theirs.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};

use crate::context::FlowContext;
use crate::core::{meta_of_type, PropertyMap, PropertyMeta, PropertyValue, StageResult};
use crate::evidence::EvidenceKeyFilter;
use crate::logging::{LogLevel, LogRecord, LogSink};
use crate::stages::Stage;

/// A sink that collects records in memory for assertions.
///
/// Clones share the same storage, so one clone can go into a pipeline
/// while the test keeps another to inspect.
#[derive(Debug, Clone)]
pub struct MemoryLogSink {
    min_level: LogLevel,
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl Default for MemoryLogSink {
    fn default() -> Self {
        Self::new(LogLevel::Trace)
    }
}

impl MemoryLogSink {
    /// Creates a sink capturing every message at or above the given level.
    #[must_use]
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            min_level,
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A snapshot of the captured records.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// The captured messages, in capture order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|record| record.message.clone())
            .collect()
    }

    /// True if any captured message contains the fragment.
    #[must_use]
    pub fn contains(&self, fragment: &str) -> bool {
        self.records
            .lock()
            .iter()
            .any(|record| record.message.contains(fragment))
    }
}

impl LogSink for MemoryLogSink {
    fn min_level(&self) -> LogLevel {
        self.min_level
    }

    fn write(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

/// A stage publishing one integer property from user-agent evidence.
///
/// Declares `integer` (type `int`), produces the value 5, and only wants
/// the `header.user-agent` evidence key. Its property metadata can be
/// extended after registration to exercise re-indexing.
#[derive(Debug)]
pub struct ExampleStage {
    properties: RwLock<PropertyMap>,
}

impl Default for ExampleStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ExampleStage {
    /// Creates the stage with its initial property set.
    #[must_use]
    pub fn new() -> Self {
        let mut properties = PropertyMap::new();
        properties.insert("integer".to_owned(), meta_of_type("int"));
        Self {
            properties: RwLock::new(properties),
        }
    }

    /// Adds or replaces a metadata field on a declared property.
    ///
    /// The owner must call `Pipeline::reindex_stage` afterwards for the
    /// change to reach metadata queries.
    pub fn set_property_meta(&self, property: &str, field: &str, value: Value) {
        if let Some(meta) = self.properties.write().get_mut(property) {
            meta.insert(field.to_owned(), value);
        }
    }
}

impl Stage for ExampleStage {
    fn data_key(&self) -> &str {
        "example1"
    }

    fn properties(&self) -> PropertyMap {
        self.properties.read().clone()
    }

    fn evidence_key_filter(&self) -> EvidenceKeyFilter {
        EvidenceKeyFilter::from_keys(["header.user-agent"])
    }

    fn process(&self, ctx: &mut FlowContext) -> anyhow::Result<()> {
        let mut result = StageResult::new(self.data_key());
        result.set("integer", json!(5));
        ctx.set_result(result);
        Ok(())
    }
}

/// A stage echoing the user-agent evidence as a string property.
///
/// Declares `message` (type `string`); produces the user-agent value, or a
/// `NoValue` tag when the evidence is absent. Wants every `header.` key.
#[derive(Debug, Default)]
pub struct SecondExampleStage;

impl SecondExampleStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Stage for SecondExampleStage {
    fn data_key(&self) -> &str {
        "example2"
    }

    fn properties(&self) -> PropertyMap {
        let mut properties = PropertyMap::new();
        properties.insert("message".to_owned(), meta_of_type("string"));
        properties
    }

    fn evidence_key_filter(&self) -> EvidenceKeyFilter {
        EvidenceKeyFilter::from_fn(|key| key.starts_with("header."))
    }

    fn process(&self, ctx: &mut FlowContext) -> anyhow::Result<()> {
        let mut result = StageResult::new(self.data_key());
        match ctx.evidence().get("header.user-agent") {
            Some(agent) => result.set("message", agent.clone()),
            None => result.set_tagged(
                "message",
                PropertyValue::NoValue("no user agent evidence".to_owned()),
            ),
        }
        ctx.set_result(result);
        Ok(())
    }
}

/// A stage that always fails.
///
/// Declares `broken` (type `int`) so metadata queries can try, and fail,
/// to resolve it.
#[derive(Debug, Default)]
pub struct FailingStage;

impl FailingStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Stage for FailingStage {
    fn data_key(&self) -> &str {
        "failing"
    }

    fn properties(&self) -> PropertyMap {
        let mut properties = PropertyMap::new();
        properties.insert("broken".to_owned(), meta_of_type("int"));
        properties
    }

    fn process(&self, _ctx: &mut FlowContext) -> anyhow::Result<()> {
        anyhow::bail!("example failure")
    }
}

/// A stage that stops the pass, preventing later stages from running.
#[derive(Debug, Default)]
pub struct StopStage;

impl StopStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Stage for StopStage {
    fn data_key(&self) -> &str {
        "stop"
    }

    fn process(&self, ctx: &mut FlowContext) -> anyhow::Result<()> {
        ctx.stop();
        Ok(())
    }
}

/// A stage publishing a fixed set of tagged property values.
///
/// Configurable key, properties and values; handy for driving the header
/// aggregation stage through specific shapes.
#[derive(Debug)]
pub struct StaticStage {
    data_key: String,
    properties: PropertyMap,
    values: Vec<(String, PropertyValue)>,
}

impl StaticStage {
    /// Creates an empty stage with the given data key.
    #[must_use]
    pub fn new(data_key: impl Into<String>) -> Self {
        Self {
            data_key: data_key.into(),
            properties: PropertyMap::new(),
            values: Vec::new(),
        }
    }

    /// Declares a property and the tagged value the stage will produce
    /// for it.
    #[must_use]
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        meta: PropertyMeta,
        value: PropertyValue,
    ) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), meta);
        self.values.push((name, value));
        self
    }
}

impl Stage for StaticStage {
    fn data_key(&self) -> &str {
        &self.data_key
    }

    fn properties(&self) -> PropertyMap {
        self.properties.clone()
    }

    fn process(&self, ctx: &mut FlowContext) -> anyhow::Result<()> {
        let mut result = StageResult::new(self.data_key());
        for (name, value) in &self.values {
            result.set_tagged(name, value.clone());
        }
        ctx.set_result(result);
        Ok(())
    }
}
