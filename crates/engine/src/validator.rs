//! Whole-graph validation.
//!
//! Checks, in report order:
//! 1. structure: empty graph, missing trigger, missing action (errors)
//! 2. structure: nodes with no edge at all (warning)
//! 3. configuration: nodes with an empty config map (warning)
//! 4. connection: materialized edges breaking the connection rules (warnings)
//! 5. logic: logic nodes with an unconnected branch (info)
//! 6. execution: triggers that never reach an action (info)
//!
//! Repeated findings of one kind are folded into a single issue listing the
//! affected nodes, and each kind costs its penalty once. Edges pointing at
//! missing nodes are skipped: the editor may be mid-edit.

use std::collections::{HashMap, HashSet, VecDeque};

use nodes::{Category, ConnectionPolicy};
use tracing::{debug, instrument, trace};

use crate::config::ScoringConfig;
use crate::connection::handles_conflict;
use crate::cycle::find_cycle_in;
use crate::models::{Edge, Node};
use crate::report::{Issue, IssueCategory, Severity, ValidationResult};

/// Pure validator: same input, same result.
#[derive(Debug, Clone, Default)]
pub struct WorkflowValidator {
    policy: ConnectionPolicy,
    scoring: ScoringConfig,
}

/// Lookup tables shared by the individual checks.
struct Graph<'a> {
    nodes: &'a [Node],
    index: HashMap<&'a str, &'a Node>,
    /// Edges whose endpoints both exist, in document order.
    edges: Vec<&'a Edge>,
}

impl<'a> Graph<'a> {
    fn new(nodes: &'a [Node], edges: &'a [Edge]) -> Self {
        let index: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let edges = edges
            .iter()
            .filter(|e| {
                let live = index.contains_key(e.source.as_str())
                    && index.contains_key(e.target.as_str());
                if !live {
                    trace!(edge = %e.id, source = %e.source, target = %e.target, "skipping dangling edge");
                }
                live
            })
            .collect();
        Self { nodes, index, edges }
    }

    fn outgoing<'s>(&'s self, id: &'s str) -> impl Iterator<Item = &'a Edge> + 's {
        self.edges.iter().copied().filter(move |e| e.source == id)
    }

    fn endpoints(&self, edge: &Edge) -> Option<(&'a Node, &'a Node)> {
        Some((
            *self.index.get(edge.source.as_str())?,
            *self.index.get(edge.target.as_str())?,
        ))
    }
}

impl WorkflowValidator {
    pub fn new(policy: ConnectionPolicy, scoring: ScoringConfig) -> Self {
        Self { policy, scoring }
    }

    /// Validate the graph formed by `nodes` and `edges`.
    #[instrument(level = "debug", skip_all, fields(nodes = nodes.len(), edges = edges.len()))]
    pub fn validate(&self, nodes: &[Node], edges: &[Edge]) -> ValidationResult {
        if nodes.is_empty() {
            let issue = Issue::new(
                "structure.empty",
                Severity::Error,
                IssueCategory::Structure,
                "workflow must have at least one node",
            )
            .with_suggestion("Add a trigger node to start building the workflow");
            // Nothing to score.
            return ValidationResult::from_issues(vec![issue], 0);
        }

        let graph = Graph::new(nodes, edges);
        let mut issues = Vec::new();

        check_required_categories(&graph, &mut issues);
        check_connectivity(&graph, &mut issues);
        check_configuration(&graph, &mut issues);
        self.audit_connections(&graph, &mut issues);
        check_logic_branches(&graph, &mut issues);
        check_trigger_reach(&graph, &mut issues);

        let errors = count(&issues, Severity::Error);
        let warnings = count(&issues, Severity::Warning);
        let score = self.scoring.score(errors, warnings);
        debug!(errors, warnings, score, "workflow validated");

        ValidationResult::from_issues(issues, score)
    }

    fn audit_connections(&self, graph: &Graph<'_>, issues: &mut Vec<Issue>) {
        let mut incompatible: Vec<&Node> = Vec::new();
        for edge in &graph.edges {
            if let Some((source, target)) = graph.endpoints(edge) {
                if !source.category.can_target(target.category) {
                    push_unique(&mut incompatible, source);
                }
            }
        }
        if !incompatible.is_empty() {
            issues.push(
                Issue::new(
                    "connection.incompatible",
                    Severity::Warning,
                    IssueCategory::Connection,
                    format!(
                        "{} connected to a node type it cannot feed",
                        subject(&incompatible)
                    ),
                )
                .with_suggestion("Remove the connection or insert a compatible step in between")
                .with_nodes(incompatible),
            );
        }

        let crowded: Vec<&Node> = graph
            .nodes
            .iter()
            .filter(|n| graph.outgoing(&n.id).count() > self.policy.max_outgoing(n.category))
            .collect();
        if !crowded.is_empty() {
            issues.push(
                Issue::new(
                    "connection.fan-out",
                    Severity::Warning,
                    IssueCategory::Connection,
                    format!("{} more outgoing connections than allowed", have(&crowded)),
                )
                .with_suggestion("Split the work across another trigger or action")
                .with_nodes(crowded),
            );
        }

        let mut duplicated: Vec<&Node> = Vec::new();
        for (i, edge) in graph.edges.iter().enumerate() {
            let repeated = graph.edges[..i].iter().any(|earlier| {
                earlier.source == edge.source
                    && earlier.target == edge.target
                    && handles_conflict(earlier.source_handle.as_deref(), edge.source_handle.as_deref())
            });
            if repeated {
                if let Some(&source) = graph.index.get(edge.source.as_str()) {
                    push_unique(&mut duplicated, source);
                }
            }
        }
        if !duplicated.is_empty() {
            issues.push(
                Issue::new(
                    "connection.duplicate",
                    Severity::Warning,
                    IssueCategory::Connection,
                    format!("{} duplicate connections", have(&duplicated)),
                )
                .with_suggestion("Delete the repeated connection")
                .with_nodes(duplicated),
            );
        }

        if let Some(cycle) = find_cycle_in(graph.edges.iter().copied()) {
            let members: Vec<&Node> = cycle
                .iter()
                .filter_map(|id| graph.index.get(id.as_str()).copied())
                .collect();
            let mut path = cycle.clone();
            if let Some(first) = cycle.first() {
                path.push(first.clone());
            }
            issues.push(
                Issue::new(
                    "connection.cycle",
                    Severity::Warning,
                    IssueCategory::Connection,
                    format!("workflow contains a circular dependency: {}", path.join(" -> ")),
                )
                .with_suggestion("Remove one of the connections in the loop")
                .with_nodes(members),
            );
        }
    }
}

/// A logic node exposes a `true` and a `false` handle.
const LOGIC_BRANCHES: usize = 2;

fn check_logic_branches(graph: &Graph<'_>, issues: &mut Vec<Issue>) {
    for node in graph.nodes.iter().filter(|n| n.category == Category::Logic) {
        let mut handles = HashSet::new();
        let mut unnamed = 0;
        for edge in graph.outgoing(&node.id) {
            match edge.source_handle.as_deref() {
                Some(handle) => {
                    handles.insert(handle);
                }
                None => unnamed += 1,
            }
        }
        let connected = (handles.len() + unnamed).min(LOGIC_BRANCHES);
        if connected < LOGIC_BRANCHES {
            issues.push(
                Issue::new(
                    format!("logic.unused-branch.{}", node.id),
                    Severity::Info,
                    IssueCategory::Logic,
                    format!(
                        "Logic node '{}' has {connected} of {LOGIC_BRANCHES} branches connected",
                        node.display_label()
                    ),
                )
                .with_suggestion("Connect the remaining branch or the condition has no effect")
                .with_nodes([node]),
            );
        }
    }
}

fn check_required_categories(graph: &Graph<'_>, issues: &mut Vec<Issue>) {
    let has = |category: Category| graph.nodes.iter().any(|n| n.category == category);

    if !has(Category::Trigger) {
        issues.push(
            Issue::new(
                "structure.missing-trigger",
                Severity::Error,
                IssueCategory::Structure,
                "workflow must have at least one trigger",
            )
            .with_suggestion("Add a trigger such as a new-email trigger to start the workflow"),
        );
    }

    if !has(Category::Action) {
        issues.push(
            Issue::new(
                "structure.missing-action",
                Severity::Error,
                IssueCategory::Structure,
                "workflow must have at least one action",
            )
            .with_suggestion("Add an action such as creating a Trello card or an Asana task"),
        );
    }
}

fn check_connectivity(graph: &Graph<'_>, issues: &mut Vec<Issue>) {
    if graph.nodes.len() < 2 {
        return;
    }

    let linked: HashSet<&str> = graph
        .edges
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .collect();
    let isolated: Vec<&Node> = graph
        .nodes
        .iter()
        .filter(|n| !linked.contains(n.id.as_str()))
        .collect();

    if !isolated.is_empty() {
        issues.push(
            Issue::new(
                "structure.disconnected",
                Severity::Warning,
                IssueCategory::Structure,
                format!("{} not connected to the workflow", subject(&isolated)),
            )
            .with_suggestion("Connect the node or delete it")
            .with_nodes(isolated),
        );
    }
}

fn check_configuration(graph: &Graph<'_>, issues: &mut Vec<Issue>) {
    let unconfigured: Vec<&Node> = graph.nodes.iter().filter(|n| !n.is_configured()).collect();

    if !unconfigured.is_empty() {
        issues.push(
            Issue::new(
                "configuration.unconfigured",
                Severity::Warning,
                IssueCategory::Configuration,
                format!("{} not configured", subject(&unconfigured)),
            )
            .with_suggestion("Double-click the node to fill in its settings")
            .with_nodes(unconfigured),
        );
    }
}

fn check_trigger_reach(graph: &Graph<'_>, issues: &mut Vec<Issue>) {
    for trigger in graph.nodes.iter().filter(|n| n.category == Category::Trigger) {
        if reaches_action(graph, trigger) {
            continue;
        }
        issues.push(
            Issue::new(
                format!("execution.trigger-without-action.{}", trigger.id),
                Severity::Info,
                IssueCategory::Execution,
                format!(
                    "Trigger '{}' does not lead to any action and will fire without effect",
                    trigger.display_label()
                ),
            )
            .with_suggestion("Connect the trigger to an action")
            .with_nodes([trigger]),
        );
    }
}

fn reaches_action(graph: &Graph<'_>, start: &Node) -> bool {
    let mut seen: HashSet<&str> = HashSet::from([start.id.as_str()]);
    let mut queue: VecDeque<&str> = VecDeque::from([start.id.as_str()]);

    while let Some(id) = queue.pop_front() {
        for edge in graph.outgoing(id) {
            let Some(&next) = graph.index.get(edge.target.as_str()) else {
                continue;
            };
            if next.category == Category::Action {
                return true;
            }
            if seen.insert(next.id.as_str()) {
                queue.push_back(next.id.as_str());
            }
        }
    }

    false
}

fn count(issues: &[Issue], severity: Severity) -> usize {
    issues.iter().filter(|i| i.severity == severity).count()
}

fn push_unique<'a>(nodes: &mut Vec<&'a Node>, node: &'a Node) {
    if !nodes.iter().any(|n| n.id == node.id) {
        nodes.push(node);
    }
}

/// "Node 'Send card' is" or "3 nodes are".
fn subject(nodes: &[&Node]) -> String {
    match nodes {
        [only] => format!("Node '{}' is", only.display_label()),
        many => format!("{} nodes are", many.len()),
    }
}

/// "Node 'Send card' has" or "3 nodes have".
fn have(nodes: &[&Node]) -> String {
    match nodes {
        [only] => format!("Node '{}' has", only.display_label()),
        many => format!("{} nodes have", many.len()),
    }
}

/// [`WorkflowValidator::validate`] with default policy and scoring.
pub fn validate(nodes: &[Node], edges: &[Edge]) -> ValidationResult {
    WorkflowValidator::default().validate(nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(id: &str) -> Node {
        Node::new(id, Category::Trigger, "email-trigger").with_config("inbox", "support")
    }

    fn action(id: &str) -> Node {
        Node::new(id, Category::Action, "trello-action").with_config("board", "ops")
    }

    fn logic(id: &str) -> Node {
        Node::new(id, Category::Logic, "condition").with_config("field", "subject")
    }

    #[test]
    fn missing_trigger_and_action_are_separate_errors() {
        let result = validate(&[logic("l")], &[]);
        assert!(!result.is_valid);
        assert!(result.find("structure.missing-trigger").is_some());
        assert!(result.find("structure.missing-action").is_some());
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.score, 50);
    }

    #[test]
    fn single_node_is_never_reported_disconnected() {
        let result = validate(&[trigger("t")], &[]);
        assert!(result.find("structure.disconnected").is_none());
    }

    #[test]
    fn dangling_edges_are_skipped() {
        let nodes = vec![trigger("t"), action("a")];
        let edges = vec![Edge::new("t", "a"), Edge::new("t", "ghost"), Edge::new("ghost", "a")];
        let result = validate(&nodes, &edges);
        assert!(result.is_valid);
        assert_eq!(result.score, 100);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn dangling_edge_does_not_count_as_a_connection() {
        let nodes = vec![trigger("t"), action("a")];
        let edges = vec![Edge::new("t", "ghost")];
        let result = validate(&nodes, &edges);
        let issue = result.find("structure.disconnected").unwrap();
        assert_eq!(issue.message, "2 nodes are not connected to the workflow");
    }

    #[test]
    fn issue_kinds_are_penalised_once() {
        let nodes = vec![
            trigger("t"),
            action("a"),
            Node::new("x", Category::Action, "asana-action"),
            Node::new("y", Category::Action, "asana-action"),
        ];
        let edges = vec![Edge::new("t", "a"), Edge::new("t", "x"), Edge::new("t", "y")];
        let result = validate(&nodes, &edges);
        let issue = result.find("configuration.unconfigured").unwrap();
        assert_eq!(issue.message, "2 nodes are not configured");
        assert_eq!(issue.nodes.len(), 2);
        assert_eq!(result.score, 90);
    }

    #[test]
    fn materialized_incompatible_edge_is_a_warning() {
        let nodes = vec![trigger("t"), action("a"), trigger("t2").with_label("Second inbox")];
        let edges = vec![Edge::new("t", "a"), Edge::new("a", "t2")];
        let result = validate(&nodes, &edges);
        assert!(result.is_valid);
        let issue = result.find("connection.incompatible").unwrap();
        assert_eq!(issue.severity, Severity::Warning);
        assert_eq!(issue.node().map(|n| n.id.as_str()), Some("a"));
    }

    #[test]
    fn materialized_cycle_is_reported_with_path() {
        let nodes = vec![trigger("t"), action("a"), action("b")];
        let edges = vec![Edge::new("t", "a"), Edge::new("a", "b"), Edge::new("b", "a")];
        let result = validate(&nodes, &edges);
        let issue = result.find("connection.cycle").unwrap();
        assert_eq!(issue.message, "workflow contains a circular dependency: a -> b -> a");
        assert_eq!(issue.nodes.len(), 2);
    }

    #[test]
    fn materialized_fan_out_and_duplicates() {
        let nodes = vec![trigger("t"), action("a"), action("b"), action("c")];
        let edges = vec![
            Edge::new("t", "a"),
            Edge::new("a", "b"),
            Edge::new("a", "b"),
            Edge::new("a", "c"),
        ];
        let result = validate(&nodes, &edges);
        assert!(result.find("connection.duplicate").is_some());
        let fan_out = result.find("connection.fan-out").unwrap();
        assert_eq!(fan_out.message, "Node 'a' has more outgoing connections than allowed");
        assert_eq!(result.score, 80);
    }

    #[test]
    fn logic_node_with_one_branch_gets_info() {
        let nodes = vec![trigger("t"), logic("l"), action("a")];
        let edges = vec![Edge::new("t", "l"), Edge::new("l", "a").with_handle("true")];
        let result = validate(&nodes, &edges);
        assert_eq!(result.score, 100);
        let issue = result.find("logic.unused-branch.l").unwrap();
        assert_eq!(issue.severity, Severity::Info);
        assert_eq!(issue.message, "Logic node 'l' has 1 of 2 branches connected");
    }

    #[test]
    fn branch_count_ignores_raised_logic_fan_out() {
        let policy = ConnectionPolicy {
            logic: 3,
            ..ConnectionPolicy::default()
        };
        let validator = WorkflowValidator::new(policy, ScoringConfig::default());
        let nodes = vec![trigger("t"), logic("l"), action("a"), action("b")];

        let both = vec![
            Edge::new("t", "l"),
            Edge::new("l", "a").with_handle("true"),
            Edge::new("l", "b").with_handle("false"),
        ];
        assert!(validator.validate(&nodes, &both).find("logic.unused-branch.l").is_none());

        let same_handle = vec![
            Edge::new("t", "l"),
            Edge::new("l", "a").with_handle("true"),
            Edge::new("l", "b").with_handle("true"),
        ];
        let result = validator.validate(&nodes, &same_handle);
        let issue = result.find("logic.unused-branch.l").unwrap();
        assert_eq!(issue.message, "Logic node 'l' has 1 of 2 branches connected");
    }

    #[test]
    fn trigger_reaching_action_through_logic_is_fine() {
        let nodes = vec![trigger("t"), logic("l"), action("a")];
        let edges = vec![Edge::new("t", "l"), Edge::new("l", "a")];
        let result = validate(&nodes, &edges);
        assert!(result.info.iter().all(|i| i.category != IssueCategory::Execution));
    }

    #[test]
    fn trigger_feeding_only_ai_gets_execution_info() {
        let nodes = vec![
            trigger("t"),
            Node::new("ai", Category::Ai, "ai-tagger").with_config("labels", "urgent"),
            action("a"),
        ];
        let edges = vec![Edge::new("t", "ai")];
        let result = validate(&nodes, &edges);
        assert!(result.find("execution.trigger-without-action.t").is_some());
    }

    #[test]
    fn custom_penalties() {
        let validator = WorkflowValidator::new(
            ConnectionPolicy::default(),
            ScoringConfig {
                error_penalty: 50,
                warning_penalty: 1,
            },
        );
        let result = validator.validate(&[Node::new("a", Category::Action, "trello-action")], &[]);
        // missing trigger + unconfigured
        assert_eq!(result.score, 49);
    }
}
