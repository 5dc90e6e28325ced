//! Per-request evidence storage and key filtering.

mod filter;

pub use filter::EvidenceKeyFilter;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::pipeline::Pipeline;

/// Flat key/value evidence for one request.
///
/// Keys are namespaced strings such as `header.user-agent`,
/// `cookie.session`, `query.id` or `server.client-ip`. Writes are gated by
/// the registered stages' evidence key filters: a key no stage wants is
/// silently dropped. Owned exclusively by one flow context.
#[derive(Debug)]
pub struct Evidence {
    pipeline: Arc<Pipeline>,
    values: HashMap<String, Value>,
}

impl Evidence {
    pub(crate) fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            values: HashMap::new(),
        }
    }

    /// Sets one piece of evidence.
    ///
    /// The key is checked against each registered stage's filter in
    /// pipeline order; the first acceptance stores the value and ends the
    /// search, so later filters are never consulted for an accepted key.
    /// A later `set` on the same key overwrites. Filtering never mutates
    /// stage state.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let accepted = self
            .pipeline
            .stages()
            .iter()
            .any(|stage| stage.filter_evidence_key(&key));
        if accepted {
            self.values.insert(key, value);
        }
    }

    /// Sets multiple pieces of evidence, in the order supplied.
    ///
    /// Each entry goes through [`set`](Self::set) and its filter gate.
    pub fn set_many<I, K>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    /// Gets a piece of evidence, or `None` when the key was never stored.
    ///
    /// The `Option` lets callers distinguish a missing key from a stored
    /// null or falsy value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns a snapshot of all stored evidence, not a live view.
    #[must_use]
    pub fn get_all(&self) -> HashMap<String, Value> {
        self.values.clone()
    }
}
