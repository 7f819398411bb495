//! Fan-out policy: how many outgoing connections each category may have.
//!
//! These are product constants, not technical limits, so they live in a
//! deserializable struct rather than in the category table.

use serde::{Deserialize, Serialize};

use crate::Category;

/// Maximum number of outgoing edges per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionPolicy {
    pub trigger: usize,
    pub action: usize,
    /// Matches the two named branches (`true` / `false`) of a logic node.
    pub logic: usize,
    pub ai: usize,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            trigger: 3,
            action: 2,
            logic: 2,
            ai: 2,
        }
    }
}

impl ConnectionPolicy {
    /// Outgoing edge limit for `category`.
    pub fn max_outgoing(&self, category: Category) -> usize {
        match category {
            Category::Trigger => self.trigger,
            Category::Action => self.action,
            Category::Logic => self.logic,
            Category::Ai => self.ai,
        }
    }
}
