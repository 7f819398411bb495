//! Connection rules: may a proposed edge be added to the graph?
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. self-connection
//! 2. category compatibility
//! 3. duplicate edge
//! 4. fan-out limit of the source
//! 5. cycle introduction
//!
//! The engine is advisory: it never touches the edge list, the editor
//! materializes the edge when told it is legal.

use nodes::{Category, ConnectionPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::cycle::would_create_cycle;
use crate::models::{Edge, Node};

/// Why a proposed edge was refused. `Display` is the message shown in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionRejection {
    #[error("nodes cannot connect to themselves")]
    SelfConnection,

    #[error("{from} nodes cannot connect to {to} nodes")]
    IncompatibleCategories { from: Category, to: Category },

    #[error("connection already exists")]
    Duplicate,

    #[error("{category} nodes can have at most {limit} outgoing connections")]
    FanOutExceeded { category: Category, limit: usize },

    #[error("would create a circular dependency")]
    WouldCreateCycle,
}

/// Serializable form of a connection check for the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDecision {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<Result<(), ConnectionRejection>> for ConnectionDecision {
    fn from(result: Result<(), ConnectionRejection>) -> Self {
        match result {
            Ok(()) => Self { valid: true, reason: None },
            Err(rejection) => Self {
                valid: false,
                reason: Some(rejection.to_string()),
            },
        }
    }
}

/// Two edges over the same ordered pair conflict unless both leave through
/// distinct named handles (a logic node's `true` and `false` branches may
/// both reach the same node).
pub(crate) fn handles_conflict(existing: Option<&str>, proposed: Option<&str>) -> bool {
    match (existing, proposed) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Stateless rule engine parameterised by a fan-out policy.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRules {
    policy: ConnectionPolicy,
}

impl ConnectionRules {
    pub fn new(policy: ConnectionPolicy) -> Self {
        Self { policy }
    }

    /// Check an edge leaving `source` through its default handle.
    pub fn can_connect(
        &self,
        source: &Node,
        target: &Node,
        edges: &[Edge],
    ) -> Result<(), ConnectionRejection> {
        self.can_connect_via(source, None, target, edges)
    }

    /// Check an edge leaving `source` through the named `handle`.
    #[instrument(level = "debug", skip_all, fields(source = %source.id, target = %target.id, handle = ?handle))]
    pub fn can_connect_via(
        &self,
        source: &Node,
        handle: Option<&str>,
        target: &Node,
        edges: &[Edge],
    ) -> Result<(), ConnectionRejection> {
        let verdict = self.check(source, handle, target, edges);
        if let Err(rejection) = &verdict {
            debug!(%rejection, "connection rejected");
        }
        verdict
    }

    fn check(
        &self,
        source: &Node,
        handle: Option<&str>,
        target: &Node,
        edges: &[Edge],
    ) -> Result<(), ConnectionRejection> {
        if source.id == target.id {
            return Err(ConnectionRejection::SelfConnection);
        }

        if !source.category.can_target(target.category) {
            return Err(ConnectionRejection::IncompatibleCategories {
                from: source.category,
                to: target.category,
            });
        }

        let duplicate = edges.iter().any(|e| {
            e.source == source.id
                && e.target == target.id
                && handles_conflict(e.source_handle.as_deref(), handle)
        });
        if duplicate {
            return Err(ConnectionRejection::Duplicate);
        }

        let limit = self.policy.max_outgoing(source.category);
        let outgoing = edges.iter().filter(|e| e.source == source.id).count();
        if outgoing >= limit {
            return Err(ConnectionRejection::FanOutExceeded {
                category: source.category,
                limit,
            });
        }

        if would_create_cycle(edges, &source.id, &target.id) {
            return Err(ConnectionRejection::WouldCreateCycle);
        }

        Ok(())
    }
}

/// [`ConnectionRules::can_connect`] with the default policy.
pub fn can_connect(source: &Node, target: &Node, edges: &[Edge]) -> ConnectionDecision {
    ConnectionRules::default()
        .can_connect(source, target, edges)
        .into()
}
