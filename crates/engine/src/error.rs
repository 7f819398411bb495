//! Engine-level error types.

use thiserror::Error;

use crate::gate::GateAction;

/// Errors produced by the workflow engine.
///
/// Validation findings are *not* errors; they are reported through
/// [`crate::ValidationResult`]. These variants cover malformed documents,
/// lookups, and blocked save/activate/run-test actions.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Document errors ------

    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// A node id passed by the caller does not exist in the workflow.
    #[error("node '{0}' not found in workflow")]
    NodeNotFound(String),

    /// An edge references a node ID that doesn't exist in the workflow.
    #[error("edge '{edge_id}' references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference {
        edge_id: String,
        node_id: String,
        side: &'static str,
    },

    /// Topological sort detected a cycle.
    #[error("workflow graph contains a cycle")]
    CycleDetected,

    // ------ Gate errors ------

    /// The requested action requires a valid workflow.
    #[error("cannot {action} workflow: {errors} validation error(s)")]
    Blocked { action: GateAction, errors: usize },

    // ------ I/O ------

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
