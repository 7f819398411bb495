//! Gating of the save / activate / run-test flows on validation results.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::dag::execution_order;
use crate::models::Workflow;
use crate::report::ValidationResult;
use crate::validator::WorkflowValidator;
use crate::EngineError;

/// A document-level action the toolbar can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateAction {
    /// Always allowed; the result is returned for display.
    Save,
    /// Requires a valid workflow.
    Activate,
    /// Requires a valid workflow that also has an execution order.
    RunTest,
}

impl fmt::Display for GateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save => write!(f, "save"),
            Self::Activate => write!(f, "activate"),
            Self::RunTest => write!(f, "run-test"),
        }
    }
}

/// Validate `workflow` and decide whether `action` may proceed.
///
/// # Errors
/// - [`EngineError::Blocked`] if the action needs a valid workflow and it isn't.
/// - Any error from [`execution_order`] for [`GateAction::RunTest`].
#[instrument(level = "debug", skip(validator, workflow), fields(workflow_id = %workflow.id))]
pub fn check(
    validator: &WorkflowValidator,
    action: GateAction,
    workflow: &Workflow,
) -> Result<ValidationResult, EngineError> {
    let result = validator.validate(&workflow.nodes, &workflow.edges);

    if action != GateAction::Save && !result.is_valid {
        warn!(%action, errors = result.errors.len(), "action blocked by validation errors");
        return Err(EngineError::Blocked {
            action,
            errors: result.errors.len(),
        });
    }

    if action == GateAction::RunTest {
        let order = execution_order(&workflow.nodes, &workflow.edges)?;
        info!("test run order: {:?}", order);
    }

    Ok(result)
}

impl Workflow {
    /// Validate, record the result on the document, and mark it active.
    pub fn activate(&mut self, validator: &WorkflowValidator) -> Result<ValidationResult, EngineError> {
        let result = check(validator, GateAction::Activate, self)?;
        self.record_validation(&result)?;
        self.active = true;
        self.touch();
        Ok(result)
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.touch();
    }
}
