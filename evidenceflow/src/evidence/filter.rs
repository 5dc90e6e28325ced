//! Evidence key filters.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Decides which evidence keys a stage is interested in.
///
/// A filter is a pure predicate over key strings. The default accepts
/// every key; stages narrow it with an allowlist or a custom predicate.
/// Beyond gating writes into the evidence store, filters drive the
/// requested-evidence query and let callers reason about cacheability.
#[derive(Clone, Default)]
pub struct EvidenceKeyFilter {
    rule: FilterRule,
}

#[derive(Clone, Default)]
enum FilterRule {
    #[default]
    AcceptAll,
    Keys(Arc<HashSet<String>>),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl EvidenceKeyFilter {
    /// A filter that accepts every key.
    #[must_use]
    pub fn accept_all() -> Self {
        Self {
            rule: FilterRule::AcceptAll,
        }
    }

    /// A filter that accepts exactly the given keys.
    #[must_use]
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rule: FilterRule::Keys(Arc::new(keys.into_iter().map(Into::into).collect())),
        }
    }

    /// A filter backed by a custom predicate.
    #[must_use]
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            rule: FilterRule::Predicate(Arc::new(predicate)),
        }
    }

    /// True if the filter accepts the key.
    #[must_use]
    pub fn accepts(&self, key: &str) -> bool {
        match &self.rule {
            FilterRule::AcceptAll => true,
            FilterRule::Keys(keys) => keys.contains(key),
            FilterRule::Predicate(predicate) => predicate(key),
        }
    }

    /// The subset of an evidence map whose keys this filter accepts.
    #[must_use]
    pub fn filter(&self, evidence: &HashMap<String, Value>) -> HashMap<String, Value> {
        evidence
            .iter()
            .filter(|(key, _)| self.accepts(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl fmt::Debug for EvidenceKeyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            FilterRule::AcceptAll => f.write_str("EvidenceKeyFilter(accept-all)"),
            FilterRule::Keys(keys) => f
                .debug_tuple("EvidenceKeyFilter")
                .field(&keys.iter().collect::<Vec<_>>())
                .finish(),
            FilterRule::Predicate(_) => f.write_str("EvidenceKeyFilter(predicate)"),
        }
    }
}
