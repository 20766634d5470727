//! Reference knowledge graph: triples, the derived indexes, and path search.
//!
//! - [`Triple`]: a `(source, relation, target)` statement as free text
//! - [`index::ReferenceGraph`]: edge index, adjacency, entity set and entity
//!   details derived from one snapshot of reference triples
//! - [`traverse`]: bounded multi-hop path enumeration

pub mod index;
pub mod traverse;

use serde::{Deserialize, Serialize};

/// A `(source, relation, target)` statement.
///
/// Serializes as a three-element array, the shape upstream extractors emit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "[String; 3]", from = "[String; 3]")]
pub struct Triple {
    /// Subject entity text.
    pub source: String,
    /// Relation text; may assert or negate.
    pub relation: String,
    /// Object entity text.
    pub target: String,
}

impl Triple {
    pub fn new(
        source: impl Into<String>,
        relation: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relation: relation.into(),
            target: target.into(),
        }
    }
}

impl From<Triple> for [String; 3] {
    fn from(t: Triple) -> Self {
        [t.source, t.relation, t.target]
    }
}

impl From<[String; 3]> for Triple {
    fn from([source, relation, target]: [String; 3]) -> Self {
        Self {
            source,
            relation,
            target,
        }
    }
}

impl std::fmt::Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.source, self.relation, self.target)
    }
}

/// An ordered chain of edges, each edge's target being the next edge's source.
pub type Path = Vec<Triple>;
