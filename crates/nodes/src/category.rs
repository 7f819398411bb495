//! The closed set of node categories and their compatibility table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TaxonomyError;

/// Coarse behavioural class of a node.
///
/// Governs which categories a node may connect to and how many outgoing
/// connections it may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Starts a workflow (new email, schedule, webhook, ...).
    Trigger,
    /// Performs a side effect (create a card, create a task, ...).
    Action,
    /// Branches or filters the flow.
    Logic,
    /// Tags or classifies the payload.
    Ai,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 4] = [
        Category::Trigger,
        Category::Action,
        Category::Logic,
        Category::Ai,
    ];

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Action => "action",
            Self::Logic => "logic",
            Self::Ai => "ai",
        }
    }

    /// Categories this one may connect to.
    ///
    /// `Trigger` never appears as a target: triggers are always graph sources.
    pub const fn allowed_targets(self) -> &'static [Category] {
        match self {
            Self::Trigger | Self::Action => &[Self::Action, Self::Logic, Self::Ai],
            Self::Logic => &[Self::Action, Self::Ai],
            Self::Ai => &[Self::Action, Self::Ai],
        }
    }

    /// Whether an edge `self -> target` is permitted by the table.
    pub fn can_target(self, target: Category) -> bool {
        self.allowed_targets().contains(&target)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trigger" => Ok(Self::Trigger),
            "action" => Ok(Self::Action),
            "logic" => Ok(Self::Logic),
            "ai" => Ok(Self::Ai),
            other => Err(TaxonomyError::UnknownCategory(other.to_owned())),
        }
    }
}
