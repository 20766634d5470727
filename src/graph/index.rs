//! Reference graph index built from one snapshot of retrieved triples.
//!
//! Uses `petgraph` for the directed multigraph (the adjacency) and plain maps
//! for the edge index and entity details. Nodes are keyed by normalized entity
//! text, so two differently-worded mentions of one entity share a node.

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::normalize::EntityNormalizer;

use super::Triple;

/// Type and first-seen raw text of a reference entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDetail {
    pub entity_type: String,
    pub raw: String,
}

/// Indexes derived from the reference subgraph of one record.
///
/// Built once, read-only afterwards. The edge index is directional and not
/// symmetrized; callers probe both orderings of a pair.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    /// Directed multigraph: nodes are normalized entities, edges carry relations.
    graph: DiGraph<String, String>,
    /// Normalized entity → node.
    node_index: HashMap<String, NodeIndex>,
    /// (normalized source, normalized target) → relation; last write wins.
    edge_index: HashMap<(String, String), String>,
    /// Normalized entity → type and raw text; first occurrence wins.
    details: HashMap<String, EntityDetail>,
    /// Union of all normalized endpoints, ordered for deterministic iteration.
    entities: BTreeSet<String>,
    /// The normalized triples, in input order.
    triples: Vec<Triple>,
}

impl ReferenceGraph {
    /// Normalize every endpoint and populate all indexes.
    pub fn build(raw_triples: &[Triple], normalizer: &EntityNormalizer) -> Self {
        let mut index = Self::default();

        for raw in raw_triples {
            let source = normalizer.normalize_entity(&raw.source);
            let target = normalizer.normalize_entity(&raw.target);

            index
                .details
                .entry(source.text.clone())
                .or_insert_with(|| EntityDetail {
                    entity_type: source.entity_type,
                    raw: raw.source.clone(),
                });
            index
                .details
                .entry(target.text.clone())
                .or_insert_with(|| EntityDetail {
                    entity_type: target.entity_type,
                    raw: raw.target.clone(),
                });

            let s_idx = index.ensure_node(&source.text);
            let t_idx = index.ensure_node(&target.text);
            index.graph.add_edge(s_idx, t_idx, raw.relation.clone());

            index.edge_index.insert(
                (source.text.clone(), target.text.clone()),
                raw.relation.clone(),
            );
            index.entities.insert(source.text.clone());
            index.entities.insert(target.text.clone());
            index
                .triples
                .push(Triple::new(source.text, raw.relation.clone(), target.text));
        }

        tracing::debug!(
            triples = index.triples.len(),
            entities = index.entities.len(),
            edges = index.edge_index.len(),
            "built reference graph"
        );
        index
    }

    fn ensure_node(&mut self, entity: &str) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(entity) {
            return idx;
        }
        let idx = self.graph.add_node(entity.to_string());
        self.node_index.insert(entity.to_string(), idx);
        idx
    }

    /// Relation of the direct edge `source → target`, if any.
    pub fn edge(&self, source: &str, target: &str) -> Option<&str> {
        self.edge_index
            .get(&(source.to_string(), target.to_string()))
            .map(String::as_str)
    }

    /// The full edge index.
    pub fn edge_index(&self) -> &HashMap<(String, String), String> {
        &self.edge_index
    }

    /// Outgoing `(neighbor, relation)` pairs of an entity, in insertion order.
    pub fn neighbors(&self, entity: &str) -> Vec<(&str, &str)> {
        let Some(&idx) = self.node_index.get(entity) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .collect();
        // petgraph walks newest-first
        edges.sort_by_key(|e| e.id().index());
        edges
            .into_iter()
            .map(|e| (self.graph[e.target()].as_str(), e.weight().as_str()))
            .collect()
    }

    /// Whether the entity has at least one outgoing edge.
    pub fn has_outgoing(&self, entity: &str) -> bool {
        self.node_index.get(entity).is_some_and(|&idx| {
            self.graph
                .edges_directed(idx, Direction::Outgoing)
                .next()
                .is_some()
        })
    }

    /// All normalized reference entities.
    pub fn entities(&self) -> &BTreeSet<String> {
        &self.entities
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains(entity)
    }

    pub fn detail(&self, entity: &str) -> Option<&EntityDetail> {
        self.details.get(entity)
    }

    /// Normalized triples in input order.
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }
}
