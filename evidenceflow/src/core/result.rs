//! Tagged property values and per-stage result records.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// The value of one produced property, tagged with how the lookup went.
///
/// An explicit tag replaces ambient "is it really there?" checks: callers
/// can distinguish a present value from a stage that ran but had nothing to
/// say, and from a value that failed on access.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum PropertyValue {
    /// A value is present.
    Value(Value),
    /// The stage ran but could not determine a value; carries the reason.
    NoValue(String),
    /// Accessing the value failed; carries the failure message.
    Error(String),
}

impl PropertyValue {
    /// True if a value is present.
    #[must_use]
    pub fn has_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// The present value, or `None` for `NoValue`/`Error` tags.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::NoValue(_) | Self::Error(_) => None,
        }
    }
}

/// The result record one stage contributes to a flow context.
///
/// Property names are stored lowercase and lookups lowercase their
/// argument, so access is case-insensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    stage_key: String,
    values: HashMap<String, PropertyValue>,
}

impl StageResult {
    /// Creates an empty result owned by the given stage.
    #[must_use]
    pub fn new(stage_key: impl Into<String>) -> Self {
        Self {
            stage_key: stage_key.into(),
            values: HashMap::new(),
        }
    }

    /// The key of the stage that produced this record.
    #[must_use]
    pub fn stage_key(&self) -> &str {
        &self.stage_key
    }

    /// Sets a present value under the (lowercased) property name.
    pub fn set(&mut self, name: impl AsRef<str>, value: Value) {
        self.set_tagged(name, PropertyValue::Value(value));
    }

    /// Sets a property with an explicit tag.
    pub fn set_tagged(&mut self, name: impl AsRef<str>, value: PropertyValue) {
        self.values.insert(name.as_ref().to_lowercase(), value);
    }

    /// Chainable variant of [`set`](Self::set).
    #[must_use]
    pub fn with_value(mut self, name: impl AsRef<str>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(&name.to_lowercase())
    }

    /// Looks up a present value by name; `NoValue`/`Error` tags yield `None`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.property(name).and_then(PropertyValue::as_value)
    }

    /// All properties in this record, keyed by lowercase name.
    #[must_use]
    pub fn properties(&self) -> &HashMap<String, PropertyValue> {
        &self.values
    }

    /// The number of properties in this record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the record holds no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
