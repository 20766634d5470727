//! Asserted claims: supported when some edge or path reads like the claim.

use crate::embed::{EmbedResult, EmbeddingProvider};
use crate::graph::Triple;
use crate::graph::index::ReferenceGraph;
use crate::hallucination::{HallucinationKind, HallucinationRecord};
use crate::matcher::MatchResult;
use crate::negation::Polarity;

use super::{Evidence, TripleScore, TripleScorer, candidate_pairs};

impl TripleScorer {
    /// Score an asserted claim against the reference graph.
    ///
    /// The score is the highest similarity among direct edges and path means
    /// that reach `triple_sim_threshold`. With none, the score is 0 and an
    /// `Unsupported` record carries the best sub-threshold similarity seen.
    pub fn score_positive(
        &self,
        claim: &Triple,
        sources: &MatchResult,
        targets: &MatchResult,
        graph: &ReferenceGraph,
        provider: &EmbeddingProvider,
    ) -> EmbedResult<TripleScore> {
        let pairs = candidate_pairs(sources, targets);

        let mut best: Option<Evidence> = None;
        let mut highest_observed = 0.0f32;

        if !pairs.is_empty() {
            let claim_vec = provider.embed_triple(claim)?;
            for (source, target) in pairs {
                for evidence in self.pair_evidence(&claim_vec, source, target, graph, provider)? {
                    highest_observed = highest_observed.max(evidence.similarity);
                    if evidence.similarity < self.triple_sim_threshold {
                        continue;
                    }
                    tracing::debug!(
                        claim = %claim,
                        similarity = evidence.similarity,
                        hops = evidence.triples.len(),
                        "supporting evidence"
                    );
                    if best
                        .as_ref()
                        .is_none_or(|b| evidence.similarity > b.similarity)
                    {
                        best = Some(evidence);
                    }
                }
            }
        }

        if let Some(best) = best {
            return Ok(TripleScore {
                score: best.similarity,
                polarity: Polarity::Positive,
                hallucination: None,
            });
        }

        let reason = if sources.is_empty() || targets.is_empty() {
            "entity not found in reference graph".to_string()
        } else {
            format!(
                "no edge or path within {} hops reaches similarity {:.2}",
                self.path.max_len, self.triple_sim_threshold
            )
        };
        let record = HallucinationRecord::new(
            claim.clone(),
            sources.to_set(),
            targets.to_set(),
            HallucinationKind::Unsupported,
            reason,
        )
        .with_highest_similarity(highest_observed);

        Ok(TripleScore {
            score: 0.0,
            polarity: Polarity::Positive,
            hallucination: Some(record),
        })
    }
}
