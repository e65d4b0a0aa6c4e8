// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Phase Scheduling
//!
//! Orders a [`DependencyGraph`] into loadable phases with Kahn's algorithm.
//! A document lands in the first phase after every document it depends on,
//! so phase 0 holds the documents with no dependencies inside the corpus.
//!
//! Documents that never reach zero unresolved dependencies are left out of
//! the phase list. They are either part of a cycle or depend on one. The
//! elementary cycles among them are enumerated with Johnson's algorithm,
//! rooted at each document in turn, and reported as [`CycleReport`]s.
//! Nothing is broken or guessed.
//!
//! Output is deterministic: documents inside a phase are sorted.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{DependencyEdge, DependencyGraph};

/// A batch of documents whose dependencies are all in earlier phases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub index: usize,
    pub documents: Vec<String>,
    /// Phases after the first may load their documents concurrently
    pub parallelizable: bool,
    pub description: String,
}

/// One elementary dependency cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Cycle members in dependency order, starting at the smallest path
    pub nodes: Vec<String>,
    /// One edge per consecutive pair, closing back to the first node
    pub edges: Vec<DependencyEdge>,
}

impl CycleReport {
    /// `a -> b -> c -> a` rendering
    pub fn describe(&self) -> String {
        let mut parts = self.nodes.clone();
        if let Some(first) = self.nodes.first() {
            parts.push(first.clone());
        }
        parts.join(" -> ")
    }
}

/// Phases plus whatever could not be placed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOrder {
    pub phases: Vec<Phase>,
    pub cycles: Vec<CycleReport>,
    /// Documents left out of every phase, sorted
    pub unplaced: Vec<String>,
}

impl LoadOrder {
    /// Phase index of a document, if it was placed
    pub fn phase_of(&self, document: &str) -> Option<usize> {
        self.phases.iter().find(|p| p.documents.iter().any(|d| d == document)).map(|p| p.index)
    }

    /// True when every document was placed
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Placed documents in load order
    pub fn flattened(&self) -> Vec<&str> {
        self.phases.iter().flat_map(|p| p.documents.iter().map(String::as_str)).collect()
    }
}

/// Split the graph into phases and report cycles among the leftovers
pub fn schedule(graph: &DependencyGraph) -> LoadOrder {
    let documents = graph.documents();
    let mut pending: HashMap<&str, usize> = documents.iter().map(|&d| (d, graph.dependencies_of(d).len())).collect();

    let mut phases = Vec::new();
    let mut ready: Vec<&str> = documents.iter().copied().filter(|d| pending.get(d) == Some(&0)).collect();

    while !ready.is_empty() {
        ready.sort_unstable();
        let mut next = Vec::new();
        for &document in &ready {
            pending.remove(document);
            for dependent in graph.dependents_of(document) {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        next.push(dependent);
                    }
                }
            }
        }
        let index = phases.len();
        phases.push(Phase {
            index,
            documents: ready.iter().map(|d| d.to_string()).collect(),
            parallelizable: index > 0,
            description: format!("Phase {index}"),
        });
        ready = next;
    }

    let mut unplaced: Vec<String> = pending.keys().map(|d| d.to_string()).collect();
    unplaced.sort();

    let cycles = if unplaced.is_empty() {
        Vec::new()
    } else {
        let remaining: HashSet<&str> = pending.keys().copied().collect();
        detect_cycles(graph, Some(&remaining))
    };

    debug!(phases = phases.len(), unplaced = unplaced.len(), cycles = cycles.len(), "scheduled dependency graph");
    LoadOrder { phases, cycles, unplaced }
}

/// Enumerate the cycles of the whole graph
pub fn find_cycles(graph: &DependencyGraph) -> Vec<CycleReport> {
    detect_cycles(graph, None)
}

struct CycleSearch<'g> {
    graph: &'g DependencyGraph,
    restrict: Option<&'g HashSet<&'g str>>,
    root: &'g str,
    blocked: HashSet<&'g str>,
    blocked_by: HashMap<&'g str, HashSet<&'g str>>,
    stack: Vec<&'g str>,
    found: BTreeSet<Vec<String>>,
}

impl<'g> CycleSearch<'g> {
    /// Only nodes ordered at or after the current root take part
    fn allowed(&self, node: &str) -> bool {
        node >= self.root && self.restrict.is_none_or(|r| r.contains(node))
    }

    fn restart(&mut self, root: &'g str) {
        self.root = root;
        self.blocked.clear();
        self.blocked_by.clear();
    }

    /// Johnson's circuit search: returns true when some cycle through `root` was closed below `node`
    fn circuit(&mut self, node: &'g str) -> bool {
        let graph = self.graph;
        let mut closed = false;
        self.stack.push(node);
        self.blocked.insert(node);

        for next in graph.dependencies_of(node) {
            if !self.allowed(next) {
                continue;
            }
            if next == self.root {
                self.found.insert(canonical(&self.stack));
                closed = true;
            } else if !self.blocked.contains(next) && self.circuit(next) {
                closed = true;
            }
        }

        if closed {
            self.unblock(node);
        } else {
            for next in graph.dependencies_of(node) {
                if self.allowed(next) {
                    self.blocked_by.entry(next).or_default().insert(node);
                }
            }
        }
        self.stack.pop();
        closed
    }

    fn unblock(&mut self, node: &'g str) {
        self.blocked.remove(node);
        if let Some(waiting) = self.blocked_by.remove(node) {
            for other in waiting {
                if self.blocked.contains(other) {
                    self.unblock(other);
                }
            }
        }
    }
}

/// Rotate a cycle so it starts at its smallest member
fn canonical(cycle: &[&str]) -> Vec<String> {
    let start = cycle.iter().enumerate().min_by_key(|(_, n)| **n).map(|(i, _)| i).unwrap_or(0);
    cycle[start..].iter().chain(cycle[..start].iter()).map(|n| n.to_string()).collect()
}

fn detect_cycles(graph: &DependencyGraph, restrict: Option<&HashSet<&str>>) -> Vec<CycleReport> {
    let mut search = CycleSearch {
        graph,
        restrict,
        root: "",
        blocked: HashSet::new(),
        blocked_by: HashMap::new(),
        stack: Vec::new(),
        found: BTreeSet::new(),
    };

    // Each elementary cycle is found exactly once, from its smallest member
    for root in graph.documents() {
        search.restart(root);
        if search.allowed(root) {
            search.circuit(root);
        }
    }

    search.found.into_iter().map(|nodes| cycle_report(graph, nodes)).collect()
}

fn cycle_report(graph: &DependencyGraph, nodes: Vec<String>) -> CycleReport {
    let mut closed = nodes.clone();
    if let Some(first) = nodes.first() {
        closed.push(first.clone());
    }
    let edges = closed
        .windows(2)
        .filter_map(|pair| graph.edge(&pair[0], &pair[1]))
        .map(|edge| DependencyEdge { path: closed.clone(), ..edge.clone() })
        .collect();
    CycleReport { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DependencyKind, GraphBuilder, ReferenceStrength};
    use proptest::prelude::*;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut builder = GraphBuilder::new();
        for node in nodes {
            builder.add_node(node);
        }
        for (source, target) in edges {
            builder.add_edge(source, target, DependencyKind::ObjectReference, ReferenceStrength::Strong);
        }
        builder.build()
    }

    #[test]
    fn test_dependency_loads_first() {
        let order = schedule(&graph(&["A.doc", "B.doc"], &[("A.doc", "B.doc")]));
        assert_eq!(order.phases.len(), 2);
        assert_eq!(order.phases[0].documents, vec!["B.doc"]);
        assert_eq!(order.phases[1].documents, vec!["A.doc"]);
        assert!(!order.phases[0].parallelizable);
        assert!(order.phases[1].parallelizable);
        assert!(order.is_complete());
        assert!(order.cycles.is_empty());
    }

    #[test]
    fn test_phase_members_are_sorted() {
        let order = schedule(&graph(&["c", "a", "b", "root"], &[("c", "root"), ("a", "root"), ("b", "root")]));
        assert_eq!(order.phases[0].documents, vec!["root"]);
        assert_eq!(order.phases[1].documents, vec!["a", "b", "c"]);
        assert_eq!(order.phases[1].description, "Phase 1");
    }

    #[test]
    fn test_cycle_members_are_unplaced() {
        let order = schedule(&graph(&["A", "B", "C", "D"], &[("A", "B"), ("B", "C"), ("C", "A")]));
        assert_eq!(order.flattened(), vec!["D"]);
        assert_eq!(order.unplaced, vec!["A", "B", "C"]);
        assert_eq!(order.cycles.len(), 1);
        assert_eq!(order.cycles[0].nodes, vec!["A", "B", "C"]);
        assert_eq!(order.cycles[0].describe(), "A -> B -> C -> A");
    }

    #[test]
    fn test_dependents_of_cycles_are_unplaced_but_not_cycles() {
        let order = schedule(&graph(&["A", "B", "X"], &[("A", "B"), ("B", "A"), ("X", "A")]));
        assert!(order.phases.is_empty());
        assert_eq!(order.unplaced, vec!["A", "B", "X"]);
        assert_eq!(order.cycles.len(), 1);
        assert!(!order.cycles[0].nodes.contains(&"X".to_string()));
    }

    #[test]
    fn test_find_cycles_reports_closing_edges() {
        let cycles = find_cycles(&graph(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]));
        assert_eq!(cycles.len(), 1);
        let edges = &cycles[0].edges;
        assert_eq!(edges.len(), 3);
        assert_eq!((edges[2].source.as_str(), edges[2].target.as_str()), ("C", "A"));
        assert_eq!(edges[0].path, vec!["A", "B", "C", "A"]);
    }

    #[test]
    fn test_find_cycles_on_acyclic_graph() {
        assert!(find_cycles(&graph(&["A", "B"], &[("A", "B")])).is_empty());
    }

    #[test]
    fn test_two_separate_cycles() {
        let cycles = find_cycles(&graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "a"), ("c", "d"), ("d", "c")]));
        let described: Vec<String> = cycles.iter().map(CycleReport::describe).collect();
        assert_eq!(described, vec!["a -> b -> a", "c -> d -> c"]);
    }

    #[test]
    fn test_cycle_through_node_reached_on_another_branch() {
        let order = schedule(&graph(&["a", "b", "c"], &[("a", "b"), ("a", "c"), ("b", "a"), ("c", "b")]));
        let described: Vec<String> = order.cycles.iter().map(CycleReport::describe).collect();
        assert_eq!(described, vec!["a -> b -> a", "a -> c -> b -> a"]);
        assert_eq!(order.unplaced, vec!["a", "b", "c"]);
        assert!(order.cycles.iter().any(|c| c.nodes.contains(&"c".to_string())));
    }

    #[test]
    fn test_overlapping_cycles_are_each_reported() {
        let edges = [("a", "b"), ("b", "c"), ("c", "a"), ("b", "d"), ("d", "a"), ("c", "d")];
        let cycles = find_cycles(&graph(&["a", "b", "c", "d"], &edges));
        let described: Vec<String> = cycles.iter().map(CycleReport::describe).collect();
        assert_eq!(described, vec!["a -> b -> c -> a", "a -> b -> c -> d -> a", "a -> b -> d -> a"]);
        assert!(cycles.iter().all(|c| c.edges.len() == c.nodes.len()));
    }

    fn acyclic_graph() -> impl Strategy<Value = (Vec<String>, Vec<(usize, usize)>)> {
        (1usize..25).prop_flat_map(|n| {
            let names: Vec<String> = (0..n).map(|i| format!("doc_{i:03}")).collect();
            (Just(names), prop::collection::vec((0..n, 0..n), 0..60))
        })
    }

    fn arbitrary_graph() -> impl Strategy<Value = (Vec<String>, Vec<(usize, usize)>)> {
        (1usize..10).prop_flat_map(|n| {
            let names: Vec<String> = (0..n).map(|i| format!("doc_{i:03}")).collect();
            (Just(names), prop::collection::vec((0..n, 0..n), 0..20))
        })
    }

    proptest! {
        #[test]
        fn prop_phases_partition_documents((names, pairs) in acyclic_graph()) {
            let nodes: Vec<&str> = names.iter().map(String::as_str).collect();
            // Edges always point from a higher index to a lower one, so the graph is acyclic
            let edges: Vec<(&str, &str)> = pairs.iter().filter(|(a, b)| a != b).map(|&(a, b)| (nodes[a.max(b)], nodes[a.min(b)])).collect();
            let order = schedule(&graph(&nodes, &edges));

            let mut flattened: Vec<&str> = order.flattened();
            flattened.sort_unstable();
            prop_assert_eq!(flattened, nodes.clone());
            prop_assert!(order.cycles.is_empty());
            prop_assert!(order.unplaced.is_empty());
        }

        #[test]
        fn prop_every_unplaced_document_reaches_a_reported_cycle((names, pairs) in arbitrary_graph()) {
            let nodes: Vec<&str> = names.iter().map(String::as_str).collect();
            let edges: Vec<(&str, &str)> = pairs.iter().map(|&(a, b)| (nodes[a], nodes[b])).collect();
            let g = graph(&nodes, &edges);
            let order = schedule(&g);

            let on_cycle: HashSet<&str> = order.cycles.iter().flat_map(|c| c.nodes.iter().map(String::as_str)).collect();
            for cycle in &order.cycles {
                prop_assert_eq!(cycle.edges.len(), cycle.nodes.len());
            }
            for document in &order.unplaced {
                let mut seen = HashSet::new();
                let mut frontier = vec![document.as_str()];
                let mut reached = false;
                while let Some(current) = frontier.pop() {
                    if on_cycle.contains(current) {
                        reached = true;
                        break;
                    }
                    if seen.insert(current) {
                        frontier.extend(g.dependencies_of(current));
                    }
                }
                prop_assert!(reached, "{} is unplaced but reaches no reported cycle", document);
            }
        }

        #[test]
        fn prop_targets_load_before_sources((names, pairs) in acyclic_graph()) {
            let nodes: Vec<&str> = names.iter().map(String::as_str).collect();
            let edges: Vec<(&str, &str)> = pairs.iter().filter(|(a, b)| a != b).map(|&(a, b)| (nodes[a.max(b)], nodes[a.min(b)])).collect();
            let order = schedule(&graph(&nodes, &edges));

            for (source, target) in &edges {
                let source_phase = order.phase_of(source).unwrap();
                let target_phase = order.phase_of(target).unwrap();
                prop_assert!(target_phase < source_phase);
            }
        }
    }
}
