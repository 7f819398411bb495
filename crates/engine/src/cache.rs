//! Content fingerprints and a memoizing wrapper around the validator.
//!
//! The validator is pure, so a result can be reused for as long as the
//! graph content is unchanged. Canvas positions are left out of the
//! fingerprint: moving a node does not change what is validated.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use nodes::Category;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{trace, warn};

use crate::models::{Edge, Node};
use crate::report::ValidationResult;
use crate::validator::WorkflowValidator;
use crate::EngineError;

/// SHA-256 of the validated content of a graph, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

/// The parts of a node that influence validation.
#[derive(Serialize)]
struct NodeContent<'a> {
    id: &'a str,
    category: Category,
    subtype: &'a str,
    label: Option<&'a str>,
    config: &'a Map<String, Value>,
}

impl Fingerprint {
    pub fn of(nodes: &[Node], edges: &[Edge]) -> Result<Self, EngineError> {
        let content: Vec<NodeContent<'_>> = nodes
            .iter()
            .map(|n| NodeContent {
                id: &n.id,
                category: n.category,
                subtype: &n.subtype,
                label: n.label.as_deref(),
                config: &n.config,
            })
            .collect();
        let bytes = serde_json::to_vec(&(content, edges))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hit / miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Least-recently-used cache of validation results keyed by [`Fingerprint`].
#[derive(Debug)]
pub struct ValidationCache {
    validator: WorkflowValidator,
    capacity: usize,
    entries: HashMap<Fingerprint, ValidationResult>,
    /// Oldest first.
    recency: VecDeque<Fingerprint>,
    hits: u64,
    misses: u64,
}

impl ValidationCache {
    pub fn new(validator: WorkflowValidator, capacity: usize) -> Self {
        Self {
            validator,
            capacity,
            entries: HashMap::with_capacity(capacity),
            recency: VecDeque::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Validate, reusing a stored result when the content is unchanged.
    pub fn validate(&mut self, nodes: &[Node], edges: &[Edge]) -> ValidationResult {
        if self.capacity == 0 {
            self.misses += 1;
            return self.validator.validate(nodes, edges);
        }

        let fingerprint = match Fingerprint::of(nodes, edges) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                warn!("cannot fingerprint workflow, validating uncached: {e}");
                self.misses += 1;
                return self.validator.validate(nodes, edges);
            }
        };

        if let Some(result) = self.entries.get(&fingerprint) {
            let result = result.clone();
            self.hits += 1;
            self.promote(&fingerprint);
            trace!(%fingerprint, "validation cache hit");
            return result;
        }

        self.misses += 1;
        trace!(%fingerprint, "validation cache miss");
        let result = self.validator.validate(nodes, edges);
        self.insert(fingerprint, result.clone());
        result
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }

    fn promote(&mut self, fingerprint: &Fingerprint) {
        if let Some(pos) = self.recency.iter().position(|f| f == fingerprint) {
            if let Some(key) = self.recency.remove(pos) {
                self.recency.push_back(key);
            }
        }
    }

    fn insert(&mut self, fingerprint: Fingerprint, result: ValidationResult) {
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        self.recency.push_back(fingerprint.clone());
        self.entries.insert(fingerprint, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(config: &str) -> (Vec<Node>, Vec<Edge>) {
        (
            vec![
                Node::new("t", Category::Trigger, "email-trigger").with_config("inbox", config),
                Node::new("a", Category::Action, "trello-action").with_config("board", "ops"),
            ],
            vec![Edge::new("t", "a")],
        )
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let (nodes, edges) = graph("support");
        let first = Fingerprint::of(&nodes, &edges).unwrap();
        assert_eq!(first, Fingerprint::of(&nodes, &edges).unwrap());
        assert_eq!(first.as_str().len(), 64);

        let (other, _) = graph("sales");
        assert_ne!(first, Fingerprint::of(&other, &edges).unwrap());
        assert_ne!(first, Fingerprint::of(&nodes, &[]).unwrap());
    }

    #[test]
    fn fingerprint_ignores_position() {
        let (mut nodes, edges) = graph("support");
        let before = Fingerprint::of(&nodes, &edges).unwrap();
        nodes[1] = nodes[1].clone().with_position(300.0, 120.0);
        assert_eq!(before, Fingerprint::of(&nodes, &edges).unwrap());
    }

    #[test]
    fn repeated_validation_hits_cache() {
        let mut cache = ValidationCache::new(WorkflowValidator::default(), 4);
        let (nodes, edges) = graph("support");

        let first = cache.validate(&nodes, &edges);
        let second = cache.validate(&nodes, &edges);
        assert_eq!(first, second);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, entries: 1 });
    }

    #[test]
    fn edit_invalidates_entry() {
        let mut cache = ValidationCache::new(WorkflowValidator::default(), 4);
        let (nodes, edges) = graph("support");
        assert!(cache.validate(&nodes, &edges).warnings.is_empty());

        let result = cache.validate(&nodes, &[]);
        assert!(!result.warnings.is_empty());
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let mut cache = ValidationCache::new(WorkflowValidator::default(), 2);
        let (a, edges) = graph("a");
        let (b, _) = graph("b");
        let (c, _) = graph("c");

        cache.validate(&a, &edges);
        cache.validate(&b, &edges);
        cache.validate(&a, &edges); // a is now most recent
        cache.validate(&c, &edges); // evicts b

        assert_eq!(cache.stats().entries, 2);
        cache.validate(&a, &edges);
        assert_eq!(cache.stats().hits, 2);
        cache.validate(&b, &edges);
        assert_eq!(cache.stats().misses, 4);
    }

    #[test]
    fn zero_capacity_never_caches() {
        let mut cache = ValidationCache::new(WorkflowValidator::default(), 0);
        let (nodes, edges) = graph("support");
        cache.validate(&nodes, &edges);
        cache.validate(&nodes, &edges);
        assert_eq!(cache.stats(), CacheStats { hits: 0, misses: 2, entries: 0 });
    }
}
