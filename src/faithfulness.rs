//! Faithfulness aggregation over a whole reasoning chain.
//!
//! The chain is scored in order. A reasoning chain is only as good as its
//! weakest step, so the first triple scoring below `min_link_score` ends the
//! walk and the record scores exactly 0. Otherwise the record score is the
//! mean of the triple scores. An empty chain scores 0.

use serde::Serialize;

use crate::config::FaithConfig;
use crate::embed::{EmbedResult, EmbeddingProvider};
use crate::graph::Triple;
use crate::graph::index::ReferenceGraph;
use crate::hallucination::HallucinationRecord;
use crate::matcher::{EntityMatcher, MatchResult, MatchTier};
use crate::negation::{KeywordNegation, NegationClassifier, Polarity};
use crate::score::{TripleScore, TripleScorer};

/// How scoring ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing to score.
    Empty,
    /// Stopped at `index`, whose score fell below the minimum link score.
    EarlyZero { index: usize, score: f32 },
    /// Every triple scored; the record score is their mean.
    Aggregate,
}

/// Score of one chain triple along with how its entities resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTriple {
    pub index: usize,
    pub triple: Triple,
    pub polarity: Polarity,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tier: Option<MatchTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_tier: Option<MatchTier>,
}

/// Result of evaluating one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaithfulnessReport {
    /// In [0, 1].
    pub score: f32,
    pub outcome: Outcome,
    /// Scored triples in chain order; stops at the early-zero triple.
    pub triples: Vec<ScoredTriple>,
    /// Hallucination records in the order they were produced.
    pub hallucinations: Vec<HallucinationRecord>,
}

/// Scores reasoning chains against reference subgraphs.
///
/// Holds no per-record state; one evaluator can score any number of records,
/// concurrently if the provider is shared.
pub struct FaithfulnessEvaluator {
    matcher: EntityMatcher,
    scorer: TripleScorer,
    negation: Box<dyn NegationClassifier>,
    min_link_score: f32,
}

impl FaithfulnessEvaluator {
    pub fn new(config: &FaithConfig) -> Self {
        Self {
            matcher: EntityMatcher::from_config(config),
            scorer: TripleScorer::from_config(config),
            negation: Box::new(KeywordNegation),
            min_link_score: config.min_link_score,
        }
    }

    /// Replace the keyword negation detector.
    pub fn with_negation(mut self, negation: impl NegationClassifier + 'static) -> Self {
        self.negation = Box::new(negation);
        self
    }

    pub fn scorer(&self) -> &TripleScorer {
        &self.scorer
    }

    pub fn matcher(&self) -> &EntityMatcher {
        &self.matcher
    }

    /// Build the reference graph for one record and score its chain.
    pub fn evaluate(
        &self,
        question_id: &str,
        chain: &[Triple],
        reference: &[Triple],
        provider: &EmbeddingProvider,
    ) -> EmbedResult<FaithfulnessReport> {
        tracing::debug!(
            question_id,
            chain = chain.len(),
            reference = reference.len(),
            "scoring record"
        );
        let graph = ReferenceGraph::build(reference, provider.normalizer());
        self.evaluate_graph(question_id, chain, &graph, provider)
    }

    /// Score a chain against an already built reference graph.
    pub fn evaluate_graph(
        &self,
        question_id: &str,
        chain: &[Triple],
        graph: &ReferenceGraph,
        provider: &EmbeddingProvider,
    ) -> EmbedResult<FaithfulnessReport> {
        let mut report = FaithfulnessReport {
            score: 0.0,
            outcome: Outcome::Empty,
            triples: Vec::with_capacity(chain.len()),
            hallucinations: Vec::new(),
        };
        if chain.is_empty() {
            tracing::debug!(question_id, "empty reasoning chain");
            return Ok(report);
        }

        for (index, triple) in chain.iter().enumerate() {
            let sources = self.matcher.resolve(&triple.source, graph, provider)?;
            let targets = self.matcher.resolve(&triple.target, graph, provider)?;
            log_match(question_id, &triple.source, &sources);
            log_match(question_id, &triple.target, &targets);

            let scored = self.score_triple(question_id, triple, &sources, &targets, graph, provider)?;
            report.triples.push(ScoredTriple {
                index,
                triple: triple.clone(),
                polarity: scored.polarity,
                score: scored.score,
                source_tier: sources.tier(),
                target_tier: targets.tier(),
            });
            if let Some(record) = scored.hallucination {
                report.hallucinations.push(record);
            }

            if scored.score < self.min_link_score {
                tracing::info!(
                    question_id,
                    index,
                    score = scored.score,
                    min_link_score = self.min_link_score,
                    "weak link, record scores 0"
                );
                report.outcome = Outcome::EarlyZero {
                    index,
                    score: scored.score,
                };
                return Ok(report);
            }
        }

        let total: f32 = report.triples.iter().map(|t| t.score).sum();
        report.score = (total / report.triples.len() as f32).clamp(0.0, 1.0);
        report.outcome = Outcome::Aggregate;
        tracing::debug!(question_id, score = report.score, "record scored");
        Ok(report)
    }

    fn score_triple(
        &self,
        question_id: &str,
        triple: &Triple,
        sources: &MatchResult,
        targets: &MatchResult,
        graph: &ReferenceGraph,
        provider: &EmbeddingProvider,
    ) -> EmbedResult<TripleScore> {
        match self.negation.classify(&triple.relation) {
            Polarity::Positive => {
                let scored = self
                    .scorer
                    .score_positive(triple, sources, targets, graph, provider)?;
                if scored.hallucination.is_none() {
                    tracing::info!(question_id, triple = %triple, score = scored.score, "claim supported");
                }
                Ok(scored)
            }
            Polarity::Negative => {
                let positive = self.negation.positive_form(&triple.relation);
                let scored = self
                    .scorer
                    .score_negative(triple, &positive, sources, targets, graph, provider)?;
                let decision = match &scored.hallucination {
                    Some(record) => record.kind.to_string(),
                    None if sources.is_match() && targets.is_match() => "corroborated".to_string(),
                    None => "one entity resolved".to_string(),
                };
                tracing::info!(
                    question_id,
                    triple = %triple,
                    score = scored.score,
                    decision = %decision,
                    "negated claim"
                );
                Ok(scored)
            }
        }
    }
}

impl Default for FaithfulnessEvaluator {
    fn default() -> Self {
        Self::new(&FaithConfig::default())
    }
}

impl std::fmt::Debug for FaithfulnessEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaithfulnessEvaluator")
            .field("matcher", &self.matcher)
            .field("scorer", &self.scorer)
            .field("min_link_score", &self.min_link_score)
            .finish_non_exhaustive()
    }
}

fn log_match(question_id: &str, entity: &str, result: &MatchResult) {
    match result.tier() {
        Some(tier) => tracing::debug!(
            question_id,
            entity,
            %tier,
            matches = ?result.entities(),
            "entity resolved"
        ),
        None => tracing::debug!(question_id, entity, "entity unresolved"),
    }
}
