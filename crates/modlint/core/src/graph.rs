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

//! Document level dependency graph
//!
//! Nodes are document paths. An edge `a -> b` means a document `a` refers
//! to at least one entity declared in `b`, so `b` has to load first.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::classifier::DeclaredType;
use crate::extractor::ExtractedReference;
use crate::index::IdentifierIndex;

/// What kind of relationship an edge encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    ObjectReference,
    TypeInheritance,
    Resource,
    SchemaImport,
    Logical,
}

impl DependencyKind {
    /// Kind implied by the entity type a reference points at
    pub fn for_target(target: DeclaredType) -> Self {
        match target {
            DeclaredType::PhysicsMaterials => DependencyKind::Resource,
            DeclaredType::ActionSets => DependencyKind::Logical,
            DeclaredType::Skeletons => DependencyKind::TypeInheritance,
            _ => DependencyKind::ObjectReference,
        }
    }
}

/// How strongly the source depends on the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReferenceStrength {
    Weak,
    Strong,
    Critical,
}

impl ReferenceStrength {
    pub fn from_required(required: bool) -> Self {
        if required { ReferenceStrength::Strong } else { ReferenceStrength::Weak }
    }
}

/// Directed dependency between two documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub kind: DependencyKind,
    pub strength: ReferenceStrength,
    /// Full node path when the edge is part of a reported cycle
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

/// Rough size class of one document's dependency footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnalysisComplexity {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

impl AnalysisComplexity {
    pub fn from_counts(dependencies: usize, references: usize) -> Self {
        if dependencies > 50 || references > 100 {
            AnalysisComplexity::VeryComplex
        } else if dependencies > 20 || references > 50 {
            AnalysisComplexity::Complex
        } else if dependencies > 10 || references > 20 {
            AnalysisComplexity::Moderate
        } else {
            AnalysisComplexity::Simple
        }
    }
}

/// Utility for building dependency graphs
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: DiGraph<String, DependencyEdge>,
    indices: HashMap<String, NodeIndex>,
    edges: HashMap<(NodeIndex, NodeIndex), EdgeIndex>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if not exists, returns its index
    pub fn add_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.indices.insert(id.to_string(), idx);
        idx
    }

    /// Add an edge, merging it into an existing edge between the same pair
    ///
    /// The merged edge keeps the first kind seen and the strongest strength.
    /// Self edges are dropped.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: DependencyKind, strength: ReferenceStrength) {
        if source == target {
            return;
        }
        let u = self.add_node(source);
        let v = self.add_node(target);
        if let Some(&existing) = self.edges.get(&(u, v)) {
            if let Some(edge) = self.graph.edge_weight_mut(existing) {
                edge.strength = edge.strength.max(strength);
            }
            return;
        }
        let edge = DependencyEdge { source: source.to_string(), target: target.to_string(), kind, strength, path: Vec::new() };
        let idx = self.graph.add_edge(u, v, edge);
        self.edges.insert((u, v), idx);
    }

    pub fn build(self) -> DependencyGraph {
        DependencyGraph { graph: self.graph, indices: self.indices }
    }
}

/// Immutable dependency graph over document paths
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, DependencyEdge>,
    indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph for a corpus
    ///
    /// Every path becomes a node. Each reference whose target is declared in
    /// another corpus document adds (or strengthens) an edge to that document.
    pub fn from_references<'a>(
        documents: impl IntoIterator<Item = &'a str>,
        references: &[ExtractedReference],
        index: &IdentifierIndex,
    ) -> Self {
        let mut builder = GraphBuilder::new();
        for path in documents {
            builder.add_node(path);
        }
        for reference in references {
            let kind = DependencyKind::for_target(reference.target_type);
            let strength = ReferenceStrength::from_required(reference.required);
            for owner in index.owners(reference.target_type, &reference.target_id) {
                if builder.indices.contains_key(owner) {
                    builder.add_edge(&reference.source_document, owner, kind, strength);
                }
            }
        }
        builder.build()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, document: &str) -> bool {
        self.indices.contains_key(document)
    }

    /// Every document, sorted
    pub fn documents(&self) -> Vec<&str> {
        let mut docs: Vec<&str> = self.graph.node_weights().map(String::as_str).collect();
        docs.sort_unstable();
        docs
    }

    /// Every edge, sorted by (source, target)
    pub fn edges(&self) -> Vec<&DependencyEdge> {
        let mut edges: Vec<&DependencyEdge> = self.graph.edge_weights().collect();
        edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        edges
    }

    /// Edge between two documents, if any
    pub fn edge(&self, source: &str, target: &str) -> Option<&DependencyEdge> {
        let u = *self.indices.get(source)?;
        let v = *self.indices.get(target)?;
        self.graph.find_edge(u, v).and_then(|e| self.graph.edge_weight(e))
    }

    /// Documents `document` depends on, sorted
    pub fn dependencies_of(&self, document: &str) -> Vec<&str> {
        self.neighbours(document, Direction::Outgoing)
    }

    /// Documents that depend on `document`, sorted
    pub fn dependents_of(&self, document: &str) -> Vec<&str> {
        self.neighbours(document, Direction::Incoming)
    }

    /// Outgoing edges of `document`
    pub fn outgoing_edges(&self, document: &str) -> Vec<&DependencyEdge> {
        let Some(&idx) = self.indices.get(document) else {
            return Vec::new();
        };
        let mut edges: Vec<&DependencyEdge> = self.graph.edges_directed(idx, Direction::Outgoing).map(|e| e.weight()).collect();
        edges.sort_by(|a, b| a.target.cmp(&b.target));
        edges
    }

    fn neighbours(&self, document: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.indices.get(document) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self.graph.neighbors_directed(idx, direction).map(|n| self.graph[n].as_str()).collect();
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Element};
    use crate::extractor::{Cardinality, Directness, extract_references};

    fn reference(source: &str, target_type: DeclaredType, id: &str, required: bool) -> ExtractedReference {
        ExtractedReference {
            source_document: source.to_string(),
            location: "/x".to_string(),
            target_type,
            target_id: id.to_string(),
            required,
            cardinality: Cardinality::One,
            directness: Directness::Direct,
        }
    }

    fn index() -> IdentifierIndex {
        let docs = vec![
            Document::new("items.json", Element::new("Items").with_child(Element::new("Item").with_attr("id", "sword"))),
            Document::new("skeletons.json", Element::new("skeletons").with_child(Element::new("skeleton").with_attr("id", "human"))),
        ];
        IdentifierIndex::build(&docs)
    }

    #[test]
    fn test_parallel_references_collapse_to_one_edge() {
        let refs = vec![
            reference("characters.json", DeclaredType::Items, "sword", false),
            reference("characters.json", DeclaredType::Items, "sword", true),
            reference("characters.json", DeclaredType::Items, "sword", false),
        ];
        let graph = DependencyGraph::from_references(["characters.json", "items.json"], &refs, &index());
        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edge("characters.json", "items.json").unwrap();
        assert_eq!(edge.strength, ReferenceStrength::Strong);
        assert_eq!(edge.kind, DependencyKind::ObjectReference);
    }

    #[test]
    fn test_weak_edge_and_kind_mapping() {
        let refs = vec![reference("monsters.json", DeclaredType::Skeletons, "human", false)];
        let graph = DependencyGraph::from_references(["monsters.json", "skeletons.json"], &refs, &index());
        let edge = graph.edge("monsters.json", "skeletons.json").unwrap();
        assert_eq!(edge.strength, ReferenceStrength::Weak);
        assert_eq!(edge.kind, DependencyKind::TypeInheritance);
        assert_eq!(graph.dependencies_of("monsters.json"), vec!["skeletons.json"]);
        assert_eq!(graph.dependents_of("skeletons.json"), vec!["monsters.json"]);
    }

    #[test]
    fn test_self_edges_and_outside_targets_are_dropped() {
        let refs = vec![
            reference("items.json", DeclaredType::Items, "sword", true),
            reference("characters.json", DeclaredType::Skeletons, "human", true),
        ];
        // skeletons.json is not part of this corpus
        let graph = DependencyGraph::from_references(["items.json", "characters.json"], &refs, &index());
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.documents(), vec!["characters.json", "items.json"]);
    }

    #[test]
    fn test_graph_from_extracted_references() {
        let docs = vec![
            Document::new("items.json", Element::new("Items").with_child(Element::new("Item").with_attr("id", "sword"))),
            Document::new(
                "characters.json",
                Element::new("NPCCharacters").with_child(
                    Element::new("NPCCharacter")
                        .with_attr("id", "guard")
                        .with_child(Element::new("equipment").with_attr("id", "Item.sword")),
                ),
            ),
        ];
        let index = IdentifierIndex::build(&docs);
        let refs: Vec<ExtractedReference> = docs.iter().flat_map(extract_references).collect();
        let graph = DependencyGraph::from_references(docs.iter().map(|d| d.path.as_str()), &refs, &index);
        assert_eq!(graph.outgoing_edges("characters.json").len(), 1);
        assert!(graph.outgoing_edges("items.json").is_empty());
    }

    #[test]
    fn test_complexity_thresholds() {
        assert_eq!(AnalysisComplexity::from_counts(0, 0), AnalysisComplexity::Simple);
        assert_eq!(AnalysisComplexity::from_counts(11, 0), AnalysisComplexity::Moderate);
        assert_eq!(AnalysisComplexity::from_counts(0, 51), AnalysisComplexity::Complex);
        assert_eq!(AnalysisComplexity::from_counts(51, 0), AnalysisComplexity::VeryComplex);
        assert_eq!(AnalysisComplexity::from_counts(10, 20), AnalysisComplexity::Simple);
    }
}
