//! Cycle detection over an edge list.
//!
//! The vertex set is rebuilt from the edges alone: an isolated node cannot
//! take part in a cycle. Traversal is an iterative depth-first search with
//! an "in current path" mark, so deep chains do not grow the call stack.

use std::collections::HashMap;

use crate::models::Edge;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

/// Whether `edges` plus the tentative edge `source -> target` contains a cycle.
pub fn would_create_cycle(edges: &[Edge], source: &str, target: &str) -> bool {
    let pairs = edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .chain(std::iter::once((source, target)));
    detect(pairs).is_some()
}

/// Whether `edges` already contains a cycle.
pub fn has_cycle(edges: &[Edge]) -> bool {
    find_cycle(edges).is_some()
}

/// The node ids along the first cycle found, in traversal order.
pub fn find_cycle(edges: &[Edge]) -> Option<Vec<String>> {
    find_cycle_in(edges.iter())
}

pub(crate) fn find_cycle_in<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> Option<Vec<String>> {
    let pairs = edges
        .into_iter()
        .map(|e| (e.source.as_str(), e.target.as_str()));
    detect(pairs).map(|path| path.into_iter().map(str::to_owned).collect())
}

fn detect<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Option<Vec<&'a str>> {
    // Vertices are visited in first-appearance order so results are stable.
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for (from, to) in pairs {
        for id in [from, to] {
            adjacency.entry(id).or_insert_with(|| {
                order.push(id);
                Vec::new()
            });
        }
        if let Some(neighbours) = adjacency.get_mut(from) {
            neighbours.push(to);
        }
    }

    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(order.len());

    for &root in &order {
        if marks.contains_key(root) {
            continue;
        }

        marks.insert(root, Mark::OnPath);
        let mut path: Vec<(&str, usize)> = vec![(root, 0)];

        while let Some(frame) = path.last_mut() {
            let (node, next) = *frame;
            let child = adjacency.get(node).and_then(|n| n.get(next)).copied();

            let Some(child) = child else {
                marks.insert(node, Mark::Done);
                path.pop();
                continue;
            };
            frame.1 += 1;

            match marks.get(child) {
                Some(Mark::OnPath) => {
                    let start = path.iter().position(|(id, _)| *id == child).unwrap_or(0);
                    return Some(path[start..].iter().map(|(id, _)| *id).collect());
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(child, Mark::OnPath);
                    path.push((child, 0));
                }
            }
        }
    }

    None
}
