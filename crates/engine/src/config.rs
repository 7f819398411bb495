//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! yields the product defaults.

use std::path::Path;

use nodes::ConnectionPolicy;
use serde::{Deserialize, Serialize};

use crate::cache::ValidationCache;
use crate::connection::ConnectionRules;
use crate::validator::WorkflowValidator;
use crate::EngineError;

/// Score deductions, applied once per issue kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub error_penalty: u32,
    pub warning_penalty: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            error_penalty: 25,
            warning_penalty: 10,
        }
    }
}

impl ScoringConfig {
    /// 100 minus the penalties, floored at 0.
    pub fn score(&self, errors: usize, warnings: usize) -> u8 {
        let errors = u32::try_from(errors).unwrap_or(u32::MAX);
        let warnings = u32::try_from(warnings).unwrap_or(u32::MAX);
        let penalty = errors
            .saturating_mul(self.error_penalty)
            .saturating_add(warnings.saturating_mul(self.warning_penalty));
        // Bounded by 100, fits in u8.
        100u32.saturating_sub(penalty) as u8
    }
}

/// Top-level tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub policy: ConnectionPolicy,
    pub scoring: ScoringConfig,
    /// Number of validation results kept by [`ValidationCache`]. 0 disables it.
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: ConnectionPolicy::default(),
            scoring: ScoringConfig::default(),
            cache_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn rules(&self) -> ConnectionRules {
        ConnectionRules::new(self.policy)
    }

    pub fn validator(&self) -> WorkflowValidator {
        WorkflowValidator::new(self.policy, self.scoring)
    }

    pub fn cache(&self) -> ValidationCache {
        ValidationCache::new(self.validator(), self.cache_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodes::Category;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn nested_partial_override() {
        let config = EngineConfig::from_json(
            r#"{ "policy": { "logic": 3 }, "scoring": { "warning_penalty": 5 } }"#,
        )
        .unwrap();
        assert_eq!(config.policy.max_outgoing(Category::Logic), 3);
        assert_eq!(config.policy.max_outgoing(Category::Trigger), 3);
        assert_eq!(config.scoring.error_penalty, 25);
        assert_eq!(config.scoring.warning_penalty, 5);
        assert_eq!(config.cache_capacity, 64);
    }

    #[test]
    fn score_floors_at_zero() {
        let scoring = ScoringConfig::default();
        assert_eq!(scoring.score(0, 0), 100);
        assert_eq!(scoring.score(0, 1), 90);
        assert_eq!(scoring.score(1, 1), 65);
        assert_eq!(scoring.score(3, 4), 0);
        assert_eq!(scoring.score(usize::MAX, usize::MAX), 0);
    }

    #[test]
    fn cache_honours_configured_capacity() {
        use crate::{Edge, Node};

        let config = EngineConfig::from_json(r#"{ "cache_capacity": 1 }"#).unwrap();
        let mut cache = config.cache();
        let trigger = Node::new("t", Category::Trigger, "email-trigger").with_config("inbox", "ops");
        let first = vec![
            trigger.clone(),
            Node::new("a", Category::Action, "trello-action").with_config("board", "b1"),
        ];
        let second = vec![
            trigger,
            Node::new("a", Category::Action, "asana-action").with_config("project", "p1"),
        ];
        let edges = vec![Edge::new("t", "a")];

        cache.validate(&first, &edges);
        cache.validate(&first, &edges);
        cache.validate(&second, &edges);
        // `first` was evicted by `second`.
        cache.validate(&first, &edges);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 3, 1));
    }

    #[test]
    fn zero_capacity_disables_the_cache() {
        use crate::{Edge, Node};

        let config = EngineConfig::from_json(r#"{ "cache_capacity": 0 }"#).unwrap();
        let mut cache = config.cache();
        let nodes = vec![Node::new("t", Category::Trigger, "email-trigger")];
        let edges: Vec<Edge> = Vec::new();

        cache.validate(&nodes, &edges);
        cache.validate(&nodes, &edges);

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (0, 2, 0));
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "cache_capacity": "many" }"#),
            Err(EngineError::Json(_))
        ));
    }
}
