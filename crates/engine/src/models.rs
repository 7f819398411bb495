//! Workflow document model.
//!
//! These are the plain-data types the editor and the template catalog
//! produce and the rule engine and validator read. Nothing in this crate
//! mutates them except the document-level helpers on [`Workflow`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use nodes::{infer_category, Category};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::cache::Fingerprint;
use crate::report::{ValidationResult, ValidationSummary};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Canvas position. Carried through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node as the editor sends it, before its category is resolved.
///
/// `type` may hold a category name (`"trigger"`) or, as canvas libraries
/// often do, the component name (`"email-trigger"`). In the latter case and
/// with no explicit `subtype`, the `type` value is used as the subtype.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub config: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Resolve the category of a raw node definition.
pub fn category_of(definition: &NodeDefinition) -> Category {
    infer_category(definition.node_type.as_deref(), subtype_of(definition))
}

fn subtype_of(definition: &NodeDefinition) -> &str {
    if !definition.subtype.is_empty() {
        return &definition.subtype;
    }
    match definition.node_type.as_deref() {
        Some(name) if name.parse::<Category>().is_err() => name,
        _ => "",
    }
}

/// A vertex in the workflow graph with its category already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NodeDefinition")]
pub struct Node {
    /// Unique within a workflow; referenced by edges.
    pub id: String,
    #[serde(rename = "type")]
    pub category: Category,
    /// Concrete behaviour, e.g. `email-trigger` or `trello-action`.
    pub subtype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub position: Position,
    /// Subtype-specific settings. Empty means "not configured yet".
    pub config: Map<String, Value>,
}

impl From<NodeDefinition> for Node {
    fn from(definition: NodeDefinition) -> Self {
        let category = category_of(&definition);
        let subtype = subtype_of(&definition).to_owned();
        Self {
            id: definition.id,
            category,
            subtype,
            label: definition.label,
            position: definition.position,
            config: definition.config,
        }
    }
}

impl Node {
    pub fn new(id: impl Into<String>, category: Category, subtype: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category,
            subtype: subtype.into(),
            label: None,
            position: Position::default(),
            config: Map::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Label shown in the diagnostics panel; falls back to the id.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn is_configured(&self) -> bool {
        !self.config.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Directed edge from one node to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    /// Named output terminal, e.g. `"true"` / `"false"` on a logic node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("e-{source}-{target}"),
            source,
            target,
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        let handle = handle.into();
        self.id = format!("{}-{handle}", self.id);
        self.source_handle = Some(handle);
        self
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Validation outcome stored alongside a saved document for quick display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastValidation {
    pub fingerprint: Fingerprint,
    pub summary: ValidationSummary,
    pub validated_at: DateTime<Utc>,
}

/// A complete workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Catalog template this workflow was seeded from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validation: Option<LastValidation>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            active: false,
            nodes,
            edges,
            template: None,
            created_at: now,
            updated_at: now,
            last_validation: None,
        }
    }

    /// Parse a workflow document.
    ///
    /// # Errors
    /// - [`EngineError::Json`] if the document is malformed.
    /// - [`EngineError::DuplicateNodeId`] if two nodes share an id.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let workflow: Self = serde_json::from_str(json)?;
        workflow.ensure_unique_node_ids()?;
        Ok(workflow)
    }

    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn ensure_unique_node_ids(&self) -> Result<(), EngineError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(EngineError::DuplicateNodeId(node.id.clone()));
            }
        }
        Ok(())
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up a node or fail with [`EngineError::NodeNotFound`].
    pub fn require_node(&self, id: &str) -> Result<&Node, EngineError> {
        self.node(id)
            .ok_or_else(|| EngineError::NodeNotFound(id.to_owned()))
    }

    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    pub fn fingerprint(&self) -> Result<Fingerprint, EngineError> {
        Fingerprint::of(&self.nodes, &self.edges)
    }

    /// Store `result` as the document's last validation.
    pub fn record_validation(&mut self, result: &ValidationResult) -> Result<(), EngineError> {
        self.last_validation = Some(LastValidation {
            fingerprint: self.fingerprint()?,
            summary: result.summary(),
            validated_at: Utc::now(),
        });
        Ok(())
    }

    /// The stored summary, only if the graph has not changed since.
    pub fn cached_validation(&self) -> Option<&ValidationSummary> {
        let stored = self.last_validation.as_ref()?;
        let current = self.fingerprint().ok()?;
        (stored.fingerprint == current).then_some(&stored.summary)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_category_resolved_from_explicit_type() {
        let node: Node = serde_json::from_value(json!({
            "id": "n1",
            "type": "logic",
            "subtype": "if-else",
            "config": { "field": "subject" }
        }))
        .unwrap();
        assert_eq!(node.category, Category::Logic);
        assert_eq!(node.subtype, "if-else");
        assert!(node.is_configured());
    }

    #[test]
    fn component_name_in_type_is_used_as_subtype() {
        let node: Node = serde_json::from_value(json!({
            "id": "n1",
            "type": "email-trigger",
            "position": { "x": 10.0, "y": 20.0 }
        }))
        .unwrap();
        assert_eq!(node.category, Category::Trigger);
        assert_eq!(node.subtype, "email-trigger");
        assert_eq!(node.position, Position { x: 10.0, y: 20.0 });
        assert!(!node.is_configured());
    }

    #[test]
    fn null_config_is_empty_map() {
        let node: Node = serde_json::from_value(json!({
            "id": "n1",
            "subtype": "trello-action",
            "config": null
        }))
        .unwrap();
        assert_eq!(node.category, Category::Action);
        assert!(node.config.is_empty());
    }

    #[test]
    fn node_round_trips_with_category_as_type() {
        let node = Node::new("a", Category::Ai, "ai-tagger").with_label("Tag it");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "ai");
        let back: Node = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn category_in_type_is_not_copied_into_empty_subtype() {
        let node = Node::new("x", Category::Logic, "");
        let back: Node = serde_json::from_value(serde_json::to_value(&node).unwrap()).unwrap();
        assert_eq!(back.category, Category::Logic);
        assert_eq!(back.subtype, "");
        assert_eq!(back, node);
    }

    #[test]
    fn edge_uses_camel_case_handles() {
        let edge: Edge = serde_json::from_value(json!({
            "id": "e1",
            "source": "a",
            "target": "b",
            "sourceHandle": "true"
        }))
        .unwrap();
        assert_eq!(edge.source_handle.as_deref(), Some("true"));
        assert_eq!(edge.target_handle, None);
    }

    #[test]
    fn duplicate_node_ids_are_rejected() {
        let json = r#"{
            "name": "dup",
            "nodes": [
                { "id": "a", "type": "trigger" },
                { "id": "a", "type": "action" }
            ]
        }"#;
        assert!(matches!(
            Workflow::from_json(json),
            Err(EngineError::DuplicateNodeId(id)) if id == "a"
        ));
    }

    #[test]
    fn cached_validation_invalidated_by_edit() {
        let mut workflow = Workflow::new(
            "wf",
            vec![
                Node::new("t", Category::Trigger, "email-trigger").with_config("inbox", "ops"),
                Node::new("a", Category::Action, "trello-action").with_config("board", "b1"),
            ],
            vec![Edge::new("t", "a")],
        );
        let result = crate::validate(&workflow.nodes, &workflow.edges);
        workflow.record_validation(&result).unwrap();
        assert_eq!(workflow.cached_validation().map(|s| s.score), Some(100));

        // Moving a node does not change what is validated.
        workflow.nodes[0].position = Position { x: 50.0, y: 50.0 };
        assert!(workflow.cached_validation().is_some());

        workflow.edges.clear();
        assert!(workflow.cached_validation().is_none());
    }

    #[test]
    fn saved_document_reloads_with_last_validation() {
        let mut workflow = Workflow::new(
            "wf",
            vec![
                Node::new("t", Category::Trigger, "email-trigger").with_config("inbox", "ops"),
                Node::new("a", Category::Action, "trello-action").with_config("board", "b1"),
                Node::new("b", Category::Action, "asana-action").with_config("project", "p"),
            ],
            vec![Edge::new("t", "a"), Edge::new("t", "b")],
        );
        let result = crate::validate(&workflow.nodes, &workflow.edges);
        workflow.record_validation(&result).unwrap();

        let reloaded = Workflow::from_json(&workflow.to_json_pretty().unwrap()).unwrap();
        assert_eq!(reloaded.id, workflow.id);
        assert_eq!(reloaded.nodes, workflow.nodes);
        assert_eq!(reloaded.edges, workflow.edges);
        assert_eq!(reloaded.cached_validation(), workflow.cached_validation());

        let targets: Vec<&str> = reloaded.outgoing("t").map(|e| e.target.as_str()).collect();
        assert_eq!(targets, ["a", "b"]);
        assert_eq!(reloaded.outgoing("a").count(), 0);
    }
}
