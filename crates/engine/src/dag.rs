//! Run order for a test run.
//!
//! A test run walks the graph from its triggers, so before it starts every
//! edge must point at a node in the document, node ids must be unique and
//! no step may wait on itself. Validation tolerates half-drawn graphs; this
//! does not.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::{Edge, Node};
use crate::EngineError;

/// Node ids in an order where every node comes after all of its sources.
///
/// Ties are broken by document order, so the result is deterministic.
///
/// # Errors
/// - [`EngineError::DuplicateNodeId`] if two nodes share an ID.
/// - [`EngineError::UnknownNodeReference`] if an edge references a missing node.
/// - [`EngineError::CycleDetected`] if the graph is not acyclic.
pub fn execution_order(nodes: &[Node], edges: &[Edge]) -> Result<Vec<String>, EngineError> {
    let mut position: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if position.insert(node.id.as_str(), i).is_some() {
            return Err(EngineError::DuplicateNodeId(node.id.clone()));
        }
    }

    for edge in edges {
        for (node_id, side) in [(&edge.source, "source"), (&edge.target, "target")] {
            if !position.contains_key(node_id.as_str()) {
                return Err(EngineError::UnknownNodeReference {
                    edge_id: edge.id.clone(),
                    node_id: node_id.clone(),
                    side,
                });
            }
        }
    }

    // Kahn's algorithm over document indices.
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree: Vec<usize> = vec![0; nodes.len()];
    // Parallel edges (logic branches into one node) count once.
    let mut seen: HashSet<(usize, usize)> = HashSet::new();

    for edge in edges {
        let from = position[edge.source.as_str()];
        let to = position[edge.target.as_str()];
        if seen.insert((from, to)) {
            successors[from].push(to);
            in_degree[to] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted: Vec<String> = Vec::with_capacity(nodes.len());

    while let Some(i) = queue.pop_front() {
        sorted.push(nodes[i].id.clone());

        let mut ready: Vec<usize> = Vec::new();
        for &next in &successors[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(next);
            }
        }
        ready.sort_unstable();
        queue.extend(ready);
    }

    // Nodes left unvisited wait on each other.
    if sorted.len() != nodes.len() {
        return Err(EngineError::CycleDetected);
    }

    Ok(sorted)
}
