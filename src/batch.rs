//! Batch runner: scores many records, isolating failures per record.
//!
//! A record that cannot be decoded, carries a malformed triple, or hits an
//! embedder failure is logged and passed through unscored; the rest of the
//! batch carries on. Parallel mode uses rayon and keeps input order.

use std::collections::BTreeMap;

use miette::Diagnostic;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::embed::EmbeddingProvider;
use crate::error::{FaithError, FaithResult};
use crate::faithfulness::{FaithfulnessEvaluator, FaithfulnessReport};
use crate::hallucination::HallucinationRecord;
use crate::record::{Record, question_label, with_score};

const HISTOGRAM_BUCKETS: usize = 10;

/// Per-record result.
#[derive(Debug)]
pub enum RecordOutcome {
    Scored {
        question_id: String,
        output: Value,
        report: FaithfulnessReport,
    },
    /// The input is kept as-is so it can be written back out.
    Failed {
        question_id: String,
        input: Value,
        error: FaithError,
    },
}

impl RecordOutcome {
    pub fn question_id(&self) -> &str {
        match self {
            RecordOutcome::Scored { question_id, .. } | RecordOutcome::Failed { question_id, .. } => {
                question_id
            }
        }
    }

    pub fn score(&self) -> Option<f32> {
        match self {
            RecordOutcome::Scored { report, .. } => Some(report.score),
            RecordOutcome::Failed { .. } => None,
        }
    }
}

/// Distribution of scores over the successfully scored records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub scored: usize,
    pub failed: usize,
    pub mean: Option<f32>,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub median: Option<f32>,
    /// Counts over ten equal-width buckets of [0, 1]; a score of exactly 1
    /// lands in the last bucket.
    pub histogram: [usize; HISTOGRAM_BUCKETS],
}

impl ScoreSummary {
    pub fn from_scores(scores: &[f32], failed: usize) -> Self {
        let mut histogram = [0usize; HISTOGRAM_BUCKETS];
        for &score in scores {
            let bucket = ((score * HISTOGRAM_BUCKETS as f32) as usize).min(HISTOGRAM_BUCKETS - 1);
            histogram[bucket] += 1;
        }

        let mut sorted = scores.to_vec();
        sorted.sort_by(f32::total_cmp);
        let median = match sorted.len() {
            0 => None,
            n if n % 2 == 1 => Some(sorted[n / 2]),
            n => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
        };

        Self {
            scored: scores.len(),
            failed,
            mean: (!scores.is_empty()).then(|| scores.iter().sum::<f32>() / scores.len() as f32),
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            median,
            histogram,
        }
    }
}

impl std::fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "scored: {}  failed: {}", self.scored, self.failed)?;
        if let (Some(mean), Some(median), Some(min), Some(max)) =
            (self.mean, self.median, self.min, self.max)
        {
            writeln!(
                f,
                "mean: {mean:.3}  median: {median:.3}  min: {min:.3}  max: {max:.3}"
            )?;
        }
        for (i, count) in self.histogram.iter().enumerate() {
            let lo = i as f32 / HISTOGRAM_BUCKETS as f32;
            let hi = (i + 1) as f32 / HISTOGRAM_BUCKETS as f32;
            writeln!(f, "  [{lo:.1}, {hi:.1}{}  {count}", if i + 1 == HISTOGRAM_BUCKETS { "]" } else { ")" })?;
        }
        Ok(())
    }
}

/// Everything a batch produces.
#[derive(Debug)]
pub struct BatchResult {
    pub outcomes: Vec<RecordOutcome>,
    pub summary: ScoreSummary,
}

impl BatchResult {
    /// Output records in input order: scored ones carry the score, failed
    /// ones are passed through.
    pub fn outputs(&self) -> Vec<&Value> {
        self.outcomes
            .iter()
            .map(|o| match o {
                RecordOutcome::Scored { output, .. } => output,
                RecordOutcome::Failed { input, .. } => input,
            })
            .collect()
    }

    /// `question_id → hallucination records`, for records that produced any.
    /// Records sharing a question id, including `1` and `"1"`, have their
    /// hallucinations merged in input order.
    pub fn hallucinations(&self) -> BTreeMap<&str, Vec<&HallucinationRecord>> {
        let mut side: BTreeMap<&str, Vec<&HallucinationRecord>> = BTreeMap::new();
        for outcome in &self.outcomes {
            let RecordOutcome::Scored {
                question_id,
                report,
                ..
            } = outcome
            else {
                continue;
            };
            if !report.hallucinations.is_empty() {
                side.entry(question_id.as_str())
                    .or_default()
                    .extend(&report.hallucinations);
            }
        }
        side
    }
}

/// Scores records with a shared evaluator and embedding provider.
pub struct BatchRunner<'a> {
    evaluator: &'a FaithfulnessEvaluator,
    provider: &'a EmbeddingProvider,
    parallel: bool,
}

impl<'a> BatchRunner<'a> {
    pub fn new(evaluator: &'a FaithfulnessEvaluator, provider: &'a EmbeddingProvider) -> Self {
        Self {
            evaluator,
            provider,
            parallel: false,
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Score one raw record.
    pub fn score_value(&self, input: Value) -> RecordOutcome {
        let question_id = input
            .get("question_id")
            .map(question_label)
            .unwrap_or_else(|| "<missing>".to_string());

        match self.try_score(&input, &question_id) {
            Ok((output, report)) => RecordOutcome::Scored {
                question_id,
                output,
                report,
            },
            Err(error) => {
                tracing::warn!(
                    question_id = %question_id,
                    code = %error.code().map(|c| c.to_string()).unwrap_or_default(),
                    error = %error,
                    "record failed, skipping"
                );
                RecordOutcome::Failed {
                    question_id,
                    input,
                    error,
                }
            }
        }
    }

    fn try_score(&self, input: &Value, question_id: &str) -> FaithResult<(Value, FaithfulnessReport)> {
        let record = Record::from_value(input.clone())?;
        let chain = record.chain()?;
        let reference = record.reference()?;
        let report = self
            .evaluator
            .evaluate(question_id, &chain, &reference, self.provider)?;
        let output = with_score(input.clone(), report.score);
        Ok((output, report))
    }

    /// Score every record, in input order.
    pub fn run(&self, records: Vec<Value>) -> BatchResult {
        tracing::info!(
            records = records.len(),
            parallel = self.parallel,
            embedder = self.provider.embedder_name(),
            "scoring batch"
        );

        let outcomes: Vec<RecordOutcome> = if self.parallel {
            records
                .into_par_iter()
                .map(|value| self.score_value(value))
                .collect()
        } else {
            records
                .into_iter()
                .map(|value| self.score_value(value))
                .collect()
        };

        let scores: Vec<f32> = outcomes.iter().filter_map(RecordOutcome::score).collect();
        let summary = ScoreSummary::from_scores(&scores, outcomes.len() - scores.len());

        let cache = self.provider.stats();
        tracing::info!(
            scored = summary.scored,
            failed = summary.failed,
            mean = summary.mean.unwrap_or_default(),
            median = summary.median.unwrap_or_default(),
            cache_hits = cache.hits,
            cache_misses = cache.misses,
            "batch complete"
        );

        BatchResult { outcomes, summary }
    }
}
