//! Hallucination evidence: why a reasoning-trail triple could not be grounded.
//!
//! Records are produced during scoring and handed to the caller; the engine
//! keeps none of them between records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::graph::Triple;

/// Why a record was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HallucinationKind {
    /// Asserted claim with no edge or path above the similarity threshold.
    Unsupported,
    /// Negated claim contradicted by a closely matching edge or path.
    Contradicted,
    /// Negated claim with sub-threshold evidence; scored by that similarity.
    PartiallyContradicted,
    /// Negated claim where neither entity exists in the reference graph.
    Unverifiable,
}

impl std::fmt::Display for HallucinationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HallucinationKind::Unsupported => write!(f, "unsupported"),
            HallucinationKind::Contradicted => write!(f, "contradicted"),
            HallucinationKind::PartiallyContradicted => write!(f, "partially contradicted"),
            HallucinationKind::Unverifiable => write!(f, "unverifiable"),
        }
    }
}

/// Evidence logged for one reasoning-trail triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallucinationRecord {
    /// The triple as it appeared in the reasoning chain.
    pub reasoning_triple: Triple,
    /// Reference entities the source resolved to.
    pub retrieved_sources: BTreeSet<String>,
    /// Reference entities the target resolved to.
    pub retrieved_targets: BTreeSet<String>,
    /// Best similarity observed, even when below threshold.
    pub highest_similarity: f32,
    pub kind: HallucinationKind,
    /// Human-readable explanation.
    pub reason: String,
    /// Similarity between the evidence and the claim's positive form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_to_positive: Option<f32>,
    /// The edge or path the decision rests on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Triple>,
}

impl HallucinationRecord {
    pub fn new(
        reasoning_triple: Triple,
        retrieved_sources: BTreeSet<String>,
        retrieved_targets: BTreeSet<String>,
        kind: HallucinationKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            reasoning_triple,
            retrieved_sources,
            retrieved_targets,
            highest_similarity: 0.0,
            kind,
            reason: reason.into(),
            similarity_to_positive: None,
            evidence: Vec::new(),
        }
    }

    pub fn with_highest_similarity(mut self, similarity: f32) -> Self {
        self.highest_similarity = similarity.clamp(0.0, 1.0);
        self
    }

    pub fn with_similarity_to_positive(mut self, similarity: f32) -> Self {
        self.similarity_to_positive = Some(similarity.clamp(0.0, 1.0));
        self
    }

    pub fn with_evidence(mut self, evidence: Vec<Triple>) -> Self {
        self.evidence = evidence;
        self
    }
}
