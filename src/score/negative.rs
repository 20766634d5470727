//! Negated claims: faithful unless the graph links the entities the way the
//! claim denies.
//!
//! Evidence is compared against the claim's positive form ("X DOES NOT BIND
//! Y" is checked against "X BINDS Y"-like edges). What happens next:
//!
//! | evidence                        | score                    | record                  |
//! |---------------------------------|--------------------------|-------------------------|
//! | similarity ≥ threshold          | 0                        | `Contradicted`          |
//! | similarity < threshold          | the similarity           | `PartiallyContradicted` |
//! | none, both entities resolved    | `neg_both_present_score` | none                    |
//! | none, one entity resolved       | `neg_one_entity_score`   | none                    |
//! | none, neither resolved          | `neg_both_absent_score`  | `Unverifiable`          |

use crate::config::NegativeEvidencePolicy;
use crate::embed::{EmbedResult, EmbeddingProvider};
use crate::graph::Triple;
use crate::graph::index::ReferenceGraph;
use crate::hallucination::{HallucinationKind, HallucinationRecord};
use crate::matcher::MatchResult;
use crate::negation::Polarity;

use super::{Evidence, TripleScore, TripleScorer, candidate_pairs};

impl TripleScorer {
    /// Score a negated claim. `positive_relation` is the claim's relation
    /// with the negation removed.
    pub fn score_negative(
        &self,
        claim: &Triple,
        positive_relation: &str,
        sources: &MatchResult,
        targets: &MatchResult,
        graph: &ReferenceGraph,
        provider: &EmbeddingProvider,
    ) -> EmbedResult<TripleScore> {
        let positive = Triple::new(
            claim.source.clone(),
            positive_relation,
            claim.target.clone(),
        );
        let evidence = self.find_contradiction(&positive, sources, targets, graph, provider)?;

        let record = |kind, reason: String| {
            HallucinationRecord::new(
                claim.clone(),
                sources.to_set(),
                targets.to_set(),
                kind,
                reason,
            )
        };

        let (score, hallucination) = match evidence {
            Some(e) if e.similarity >= self.triple_sim_threshold => {
                tracing::debug!(claim = %claim, similarity = e.similarity, "negated claim contradicted");
                let reason = format!(
                    "reference {} links the entities as the claim denies (similarity {:.2})",
                    e.kind,
                    e.similarity
                );
                let r = record(HallucinationKind::Contradicted, reason)
                    .with_highest_similarity(e.similarity)
                    .with_similarity_to_positive(e.similarity)
                    .with_evidence(e.triples);
                (0.0, Some(r))
            }
            Some(e) => {
                let reason = format!(
                    "weak linking evidence against the negation (similarity {:.2})",
                    e.similarity
                );
                let score = e.similarity;
                let r = record(HallucinationKind::PartiallyContradicted, reason)
                    .with_highest_similarity(e.similarity)
                    .with_similarity_to_positive(e.similarity)
                    .with_evidence(e.triples);
                (score, Some(r))
            }
            None => match (sources.is_match(), targets.is_match()) {
                (true, true) => (self.neg_both_present_score, None),
                (true, false) | (false, true) => (self.neg_one_entity_score, None),
                (false, false) => {
                    let reason = format!(
                        "neither entity found in reference graph; scored {:.2}",
                        self.neg_both_absent_score
                    );
                    let r = record(HallucinationKind::Unverifiable, reason);
                    (self.neg_both_absent_score, Some(r))
                }
            },
        };

        Ok(TripleScore {
            score,
            polarity: Polarity::Negative,
            hallucination,
        })
    }

    /// Search candidate pairs for edges and paths that read like `positive`.
    ///
    /// Under [`NegativeEvidencePolicy::First`] the first item found is
    /// returned; under `Strongest` every pair is examined and the most
    /// similar item kept. Ties keep the earlier item.
    fn find_contradiction(
        &self,
        positive: &Triple,
        sources: &MatchResult,
        targets: &MatchResult,
        graph: &ReferenceGraph,
        provider: &EmbeddingProvider,
    ) -> EmbedResult<Option<Evidence>> {
        let pairs = candidate_pairs(sources, targets);
        if pairs.is_empty() {
            return Ok(None);
        }
        let positive_vec = provider.embed_triple(positive)?;

        let mut strongest: Option<Evidence> = None;
        for (source, target) in pairs {
            for evidence in self.pair_evidence(&positive_vec, source, target, graph, provider)? {
                if self.negative_evidence_policy == NegativeEvidencePolicy::First {
                    return Ok(Some(evidence));
                }
                if strongest
                    .as_ref()
                    .is_none_or(|s| evidence.similarity > s.similarity)
                {
                    strongest = Some(evidence);
                }
            }
        }
        Ok(strongest)
    }
}
