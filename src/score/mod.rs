//! Triple scoring: similarity-based evidence for one reasoning-trail triple.
//!
//! - [`positive`]: asserted claims, scored by the best supporting edge or path
//! - [`negative`]: negated claims, scored by whether the graph contradicts them
//!
//! Both scorers walk every (source candidate, target candidate) pair and probe
//! it in both orientations, since free-text wording may swap the graph's roles.

pub mod negative;
pub mod positive;

use crate::config::{FaithConfig, NegativeEvidencePolicy};
use crate::embed::{EmbedResult, EmbeddingProvider, cosine_similarity};
use crate::graph::Triple;
use crate::graph::index::ReferenceGraph;
use crate::graph::traverse::{PathConfig, find_paths_with};
use crate::hallucination::HallucinationRecord;
use crate::matcher::MatchResult;
use crate::negation::Polarity;

/// Score for one reasoning-trail triple.
#[derive(Debug, Clone, PartialEq)]
pub struct TripleScore {
    /// In [0, 1].
    pub score: f32,
    pub polarity: Polarity,
    pub hallucination: Option<HallucinationRecord>,
}

/// Where a piece of evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceKind {
    /// The edge index entry for the pair.
    Edge,
    /// A path from the path finder, one-hop paths included.
    Path,
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceKind::Edge => write!(f, "edge"),
            EvidenceKind::Path => write!(f, "path"),
        }
    }
}

/// One edge or path found between a candidate pair, with its similarity to
/// the claim.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub kind: EvidenceKind,
    pub similarity: f32,
    pub triples: Vec<Triple>,
}

/// Scoring thresholds and constants.
#[derive(Debug, Clone)]
pub struct TripleScorer {
    pub triple_sim_threshold: f32,
    pub path: PathConfig,
    pub neg_both_present_score: f32,
    pub neg_one_entity_score: f32,
    pub neg_both_absent_score: f32,
    pub negative_evidence_policy: NegativeEvidencePolicy,
}

impl TripleScorer {
    pub fn from_config(config: &FaithConfig) -> Self {
        Self {
            triple_sim_threshold: config.triple_sim_threshold,
            path: PathConfig {
                max_len: config.max_path_len,
                ..Default::default()
            },
            neg_both_present_score: config.neg_both_present_score,
            neg_one_entity_score: config.neg_one_entity_score,
            neg_both_absent_score: config.neg_both_absent_score,
            negative_evidence_policy: config.negative_evidence_policy,
        }
    }

    /// All evidence linking one candidate pair: direct edges in both
    /// orientations first, then bounded paths in both orientations.
    fn pair_evidence(
        &self,
        claim: &[f32],
        source: &str,
        target: &str,
        graph: &ReferenceGraph,
        provider: &EmbeddingProvider,
    ) -> EmbedResult<Vec<Evidence>> {
        let mut orientations = vec![(source, target)];
        if source != target {
            orientations.push((target, source));
        }

        let mut found = Vec::new();
        for &(a, b) in &orientations {
            if let Some(relation) = graph.edge(a, b) {
                let edge = Triple::new(a, relation, b);
                let similarity = cosine_similarity(claim, &provider.embed_triple(&edge)?);
                found.push(Evidence {
                    kind: EvidenceKind::Edge,
                    similarity,
                    triples: vec![edge],
                });
            }
        }
        for &(a, b) in &orientations {
            for path in find_paths_with(graph, a, b, &self.path) {
                let similarity = path_similarity(claim, &path, provider)?;
                found.push(Evidence {
                    kind: EvidenceKind::Path,
                    similarity,
                    triples: path,
                });
            }
        }
        Ok(found)
    }
}

impl Default for TripleScorer {
    fn default() -> Self {
        Self::from_config(&FaithConfig::default())
    }
}

/// Mean cosine similarity between the claim and every hop of a path.
pub fn path_similarity(
    claim: &[f32],
    path: &[Triple],
    provider: &EmbeddingProvider,
) -> EmbedResult<f32> {
    if path.is_empty() {
        return Ok(0.0);
    }
    let mut total = 0.0f32;
    for hop in path {
        total += cosine_similarity(claim, &provider.embed_triple(hop)?);
    }
    Ok((total / path.len() as f32).clamp(0.0, 1.0))
}

/// Candidate (source, target) pairs in source-major order.
pub(crate) fn candidate_pairs<'m>(
    sources: &'m MatchResult,
    targets: &'m MatchResult,
) -> Vec<(&'m str, &'m str)> {
    let targets = targets.entities();
    sources
        .entities()
        .into_iter()
        .flat_map(|s| targets.iter().map(move |t| (s, *t)))
        .collect()
}
