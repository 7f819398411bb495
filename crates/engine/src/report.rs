//! Validation report types consumed by the diagnostics panel and by the
//! save / activate / run-test gates.

use serde::{Deserialize, Serialize};

use crate::models::Node;

/// How serious an issue is. Only errors affect validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Area of the workflow an issue concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Structure,
    Configuration,
    Connection,
    Logic,
    Execution,
}

/// Pointer to a node the "fix" affordance can jump to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: String,
    pub label: String,
}

impl From<&Node> for NodeRef {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            label: node.display_label().to_owned(),
        }
    }
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Stable across runs for the same finding.
    pub id: String,
    pub severity: Severity,
    pub category: IssueCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Affected nodes, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeRef>,
}

impl Issue {
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        category: IssueCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            category,
            message: message.into(),
            suggestion: None,
            nodes: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_nodes<'a>(mut self, nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        self.nodes.extend(nodes.into_iter().map(NodeRef::from));
        self
    }

    /// The node the panel should focus when the user clicks "fix".
    pub fn node(&self) -> Option<&NodeRef> {
        self.nodes.first()
    }
}

/// Outcome of validating a whole workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub info: Vec<Issue>,
    /// `true` iff `errors` is empty.
    pub is_valid: bool,
    /// Quality score in `0..=100`.
    pub score: u8,
}

impl ValidationResult {
    pub(crate) fn from_issues(issues: Vec<Issue>, score: u8) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut info = Vec::new();
        for issue in issues {
            match issue.severity {
                Severity::Error => errors.push(issue),
                Severity::Warning => warnings.push(issue),
                Severity::Info => info.push(issue),
            }
        }
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            info,
            score,
        }
    }

    /// All issues: errors, then warnings, then info.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.errors
            .iter()
            .chain(&self.warnings)
            .chain(&self.info)
    }

    /// Errors plus warnings, the number the toolbar badge shows.
    pub fn issue_count(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    pub fn find(&self, id: &str) -> Option<&Issue> {
        self.issues().find(|issue| issue.id == id)
    }

    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary {
            is_valid: self.is_valid,
            score: self.score,
            errors: self.errors.len(),
            warnings: self.warnings.len(),
            info: self.info.len(),
        }
    }
}

/// Compact form of a [`ValidationResult`] for storage next to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub is_valid: bool,
    pub score: u8,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}
