//! End-to-end tests for the faithfulness engine.
//!
//! Records go through the same path the CLI takes: raw triples in, reference
//! graph built, entities resolved, triples scored, record aggregated.

use std::collections::HashMap;
use std::sync::Mutex;

use proptest::prelude::*;
use serde_json::json;

use faith_kg::batch::BatchRunner;
use faith_kg::config::FaithConfig;
use faith_kg::embed::hashing::HashingEmbedder;
use faith_kg::embed::{EmbedResult, Embedder, EmbeddingProvider};
use faith_kg::error::EmbedError;
use faith_kg::faithfulness::{FaithfulnessEvaluator, FaithfulnessReport, Outcome};
use faith_kg::graph::Triple;
use faith_kg::graph::index::ReferenceGraph;
use faith_kg::graph::traverse::find_paths;
use faith_kg::hallucination::HallucinationKind;
use faith_kg::matcher::{EntityMatcher, MatchResult, MatchTier};
use faith_kg::normalize::EntityNormalizer;
use faith_kg::score::TripleScorer;

const VOCAB_DIM: usize = 256;

/// Bag of canonical words, one axis per distinct word in order of first
/// sight. Auxiliaries are dropped and a trailing "s" is stripped, so
/// "does associate" and "associates" embed identically. Distinct words never
/// share an axis.
struct Vocab {
    words: Mutex<HashMap<String, usize>>,
}

impl Vocab {
    fn new() -> Self {
        Self {
            words: Mutex::new(HashMap::new()),
        }
    }

    fn canonical(word: &str) -> Option<String> {
        let word = word.to_lowercase();
        if matches!(word.as_str(), "does" | "do" | "is" | "are") {
            return None;
        }
        match word.strip_suffix('s') {
            Some(stem) if stem.len() >= 3 => Some(stem.to_string()),
            _ => Some(word),
        }
    }
}

impl Embedder for Vocab {
    fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let mut words = self.words.lock().unwrap();
        let mut v = vec![0.0; VOCAB_DIM];
        for word in text.split_whitespace().filter_map(Vocab::canonical) {
            let next = words.len();
            let axis = *words.entry(word).or_insert(next);
            v[axis % VOCAB_DIM] += 1.0;
        }
        Ok(v)
    }

    fn name(&self) -> &str {
        "vocab"
    }
}

/// Same vector for every text: every embedding comparison clears any
/// threshold.
struct Constant;

impl Embedder for Constant {
    fn embed(&self, _text: &str) -> EmbedResult<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn name(&self) -> &str {
        "constant"
    }
}

struct Offline;

impl Embedder for Offline {
    fn embed(&self, _text: &str) -> EmbedResult<Vec<f32>> {
        Err(EmbedError::Unavailable {
            url: "http://localhost:1".into(),
        })
    }

    fn name(&self) -> &str {
        "offline"
    }
}

fn triples(list: &[(&str, &str, &str)]) -> Vec<Triple> {
    list.iter().map(|(s, r, t)| Triple::new(*s, *r, *t)).collect()
}

fn vocab_provider() -> EmbeddingProvider {
    EmbeddingProvider::new(Vocab::new(), EntityNormalizer::default())
}

fn evaluate(chain: &[(&str, &str, &str)], reference: &[(&str, &str, &str)]) -> FaithfulnessReport {
    FaithfulnessEvaluator::default()
        .evaluate("test", &triples(chain), &triples(reference), &vocab_provider())
        .unwrap()
}

// ---------------------------------------------------------------------------
// Normalization and matching
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn normalization_is_idempotent(raw in "[A-Za-z0-9 ,.()'-]{0,40}") {
        let n = EntityNormalizer::default();
        let once = n.normalize(&raw);
        prop_assert_eq!(n.normalize(&once), once);
    }
}

#[test]
fn exact_match_short_circuits_fuzzy_tiers() {
    let graph = ReferenceGraph::build(
        &triples(&[("Breast Cancer", "R", "X"), ("Cancer Breast", "R", "Y")]),
        &EntityNormalizer::default(),
    );
    // an offline embedder proves the embedding tier never ran
    let provider = EmbeddingProvider::new(Offline, EntityNormalizer::default());
    let matcher = EntityMatcher::new(Vec::new(), 0.5, 0.5);

    let result = matcher.resolve("BREAST CANCER", &graph, &provider).unwrap();
    assert_eq!(
        result,
        MatchResult::Unique {
            entity: "breast cancer".into(),
            tier: MatchTier::Exact
        }
    );
}

#[test]
fn strict_types_never_match_fuzzily() {
    let graph = ReferenceGraph::build(
        &triples(&[("Gene BRCA1", "ASSOCIATES", "Breast Neoplasm")]),
        &EntityNormalizer::default(),
    );
    let provider = EmbeddingProvider::new(Constant, EntityNormalizer::default());
    let matcher = EntityMatcher::new(vec!["gene".to_string()], 0.3, 0.5);

    // Jaccard 0.5 and cosine 1.0 both clear their thresholds; only the
    // non-strict entity comes back.
    let result = matcher.resolve("BRCA1 locus", &graph, &provider).unwrap();
    assert_eq!(result.entities(), vec!["breast neoplasm"]);
    assert_eq!(result.tier(), Some(MatchTier::Embedding));

    let exact = matcher.resolve("brca1", &graph, &provider).unwrap();
    assert_eq!(exact.tier(), Some(MatchTier::Exact));
}

// ---------------------------------------------------------------------------
// Scoring scenarios
// ---------------------------------------------------------------------------

#[test]
fn direct_edge_scores_its_similarity() {
    let provider = EmbeddingProvider::new(HashingEmbedder::default(), EntityNormalizer::default());
    let reference = triples(&[("BRCA1", "ASSOCIATES", "Breast Cancer")]);
    let chain = triples(&[("BRCA1", "ASSOCIATES", "Breast Cancer")]);

    let report = FaithfulnessEvaluator::default()
        .evaluate("q-brca1", &chain, &reference, &provider)
        .unwrap();
    assert_eq!(report.outcome, Outcome::Aggregate);
    assert!(report.score >= 0.8);
    assert_eq!(report.score, report.triples[0].score);
    assert!((report.score - 1.0).abs() < 1e-4);
}

#[test]
fn unlinked_entities_corroborate_negation() {
    let report = evaluate(
        &[("GeneX", "DOES NOT ASSOCIATE", "DiseaseY")],
        &[("GeneX", "BINDS", "ProteinZ"), ("DiseaseY", "AFFECTS", "TissueW")],
    );
    assert_eq!(report.score, 1.0);
    assert!(report.hallucinations.is_empty());
}

#[test]
fn linked_entities_contradict_negation() {
    let report = evaluate(
        &[("GeneX", "DOES NOT ASSOCIATE", "DiseaseY")],
        &[("GeneX", "ASSOCIATES", "DiseaseY")],
    );
    assert_eq!(report.score, 0.0);
    assert_eq!(report.hallucinations.len(), 1);
    let record = &report.hallucinations[0];
    assert_eq!(record.kind, HallucinationKind::Contradicted);
    assert_eq!(record.evidence, triples(&[("genex", "ASSOCIATES", "diseasey")]));
}

#[test]
fn unknown_entities_score_zero_with_empty_candidates() {
    let report = evaluate(
        &[("Unicorn", "CAUSES", "Rainbow")],
        &[("BRCA1", "ASSOCIATES", "Breast Cancer")],
    );
    assert_eq!(report.score, 0.0);
    assert_eq!(report.hallucinations.len(), 1);
    let record = &report.hallucinations[0];
    assert_eq!(record.kind, HallucinationKind::Unsupported);
    assert!(record.retrieved_sources.is_empty());
    assert!(record.retrieved_targets.is_empty());
}

#[test]
fn empty_chain_scores_zero() {
    let report = evaluate(&[], &[("BRCA1", "ASSOCIATES", "Breast Cancer")]);
    assert_eq!(report.score, 0.0);
    assert_eq!(report.outcome, Outcome::Empty);
}

#[test]
fn one_weak_link_zeroes_the_record() {
    let reference = [
        ("BRCA1", "ASSOCIATES", "Breast Cancer"),
        ("Breast Cancer", "TREATED BY", "Tamoxifen"),
    ];
    let good = evaluate(
        &[
            ("BRCA1", "ASSOCIATES", "Breast Cancer"),
            ("Breast Cancer", "TREATED BY", "Tamoxifen"),
        ],
        &reference,
    );
    assert!((good.score - 1.0).abs() < 1e-5);

    let broken = evaluate(
        &[
            ("BRCA1", "ASSOCIATES", "Breast Cancer"),
            ("Tamoxifen", "CURES", "Influenza"),
            ("Breast Cancer", "TREATED BY", "Tamoxifen"),
        ],
        &reference,
    );
    assert_eq!(broken.score, 0.0);
    assert!(matches!(broken.outcome, Outcome::EarlyZero { index: 1, .. }));
    assert_eq!(broken.triples.len(), 2);
}

#[test]
fn weak_multi_hop_path_reports_its_similarity() {
    // each hop shares two of the claim's three words and has four of its
    // own: cosine 2 / sqrt(12) per hop
    let report = evaluate(
        &[("BRCA1", "ASSOCIATES", "Tamoxifen")],
        &[
            ("BRCA1", "ASSOCIATES", "Breast Cancer"),
            ("Breast Cancer", "ASSOCIATES", "Tamoxifen"),
        ],
    );
    assert_eq!(report.score, 0.0);
    let record = &report.hallucinations[0];
    assert_eq!(record.kind, HallucinationKind::Unsupported);
    assert!((record.highest_similarity - 2.0 / 12f32.sqrt()).abs() < 1e-5);
    assert!(record.retrieved_sources.contains("brca1"));
    assert!(record.retrieved_targets.contains("tamoxifen"));
}

#[test]
fn multi_hop_path_supports_claim() {
    // each hop repeats one claim word and adds nothing new: cosine
    // 4 / sqrt(18) per hop
    let report = evaluate(
        &[("Aspirin", "INHIBITS", "Inflammation")],
        &[
            ("Aspirin", "INHIBITS", "Aspirin Inflammation"),
            ("Aspirin Inflammation", "INHIBITS", "Inflammation"),
        ],
    );
    assert_eq!(report.triples[0].target_tier, Some(MatchTier::Exact));
    assert_eq!(report.outcome, Outcome::Aggregate);
    assert!((report.score - 4.0 / 18f32.sqrt()).abs() < 1e-5);
}

#[test]
fn embedder_failure_surfaces_as_error() {
    let provider = EmbeddingProvider::new(Offline, EntityNormalizer::default());
    let result = FaithfulnessEvaluator::default().evaluate(
        "q",
        &triples(&[("A", "R", "B")]),
        &triples(&[("A", "R", "B")]),
        &provider,
    );
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Path search and threshold monotonicity
// ---------------------------------------------------------------------------

fn small_graph() -> impl Strategy<Value = Vec<(u8, u8, u8)>> {
    prop::collection::vec((0u8..6, 0u8..4, 0u8..6), 1..14)
}

const RELATIONS: [&str; 4] = ["causes", "treats", "binds", "causes binds"];

fn build(edges: &[(u8, u8, u8)]) -> Vec<Triple> {
    edges
        .iter()
        .map(|(s, r, t)| {
            Triple::new(
                format!("node{s}"),
                RELATIONS[*r as usize],
                format!("node{t}"),
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn path_search_terminates_on_cyclic_graphs(edges in small_graph(), a in 0u8..6, b in 0u8..6) {
        let graph = ReferenceGraph::build(&build(&edges), &EntityNormalizer::default());
        let start = format!("node{a}");
        let end = format!("node{b}");
        for path in find_paths(&graph, &start, &end, 3) {
            prop_assert!(!path.is_empty() && path.len() <= 3);
            prop_assert_eq!(&path[0].source, &start);
            prop_assert_eq!(&path[path.len() - 1].target, &end);
        }
    }

    #[test]
    fn raising_threshold_never_raises_score(
        edges in small_graph(),
        a in 0u8..6,
        b in 0u8..6,
        rel in 0usize..4,
        low in 0.0f32..1.0,
        delta in 0.0f32..0.5,
    ) {
        let reference = build(&edges);
        let provider = vocab_provider();
        let graph = ReferenceGraph::build(&reference, provider.normalizer());
        let matcher = EntityMatcher::default();
        let claim = Triple::new(format!("node{a}"), RELATIONS[rel], format!("node{b}"));
        let sources = matcher.resolve(&claim.source, &graph, &provider).unwrap();
        let targets = matcher.resolve(&claim.target, &graph, &provider).unwrap();

        let score_at = |threshold: f32| {
            let scorer = TripleScorer {
                triple_sim_threshold: threshold,
                ..TripleScorer::default()
            };
            scorer
                .score_positive(&claim, &sources, &targets, &graph, &provider)
                .unwrap()
                .score
        };
        let high = (low + delta).min(1.0);
        prop_assert!(score_at(high) <= score_at(low));
    }
}

// ---------------------------------------------------------------------------
// Batch runs
// ---------------------------------------------------------------------------

#[test]
fn batch_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.json");
    let output = dir.path().join("output.json");
    let side = dir.path().join("hallucinations.json");

    let records = json!([
        {
            "question_id": 1,
            "question": "What is BRCA1 associated with?",
            "cot_kg": [["BRCA1", "ASSOCIATES", "Breast Cancer"]],
            "kg_rag": [["BRCA1", "ASSOCIATES", "Breast Cancer"]]
        },
        {
            "question_id": 2,
            "cot_kg": [["BRCA1", "", "Breast Cancer"]],
            "kg_rag": []
        },
        {
            "question_id": 3,
            "cot_kg": [["Unicorn", "CAUSES", "Rainbow"]],
            "kg_rag": [["BRCA1", "ASSOCIATES", "Breast Cancer"]]
        }
    ]);
    std::fs::write(&input, records.to_string()).unwrap();

    let config = FaithConfig::default();
    let provider = EmbeddingProvider::new(HashingEmbedder::default(), EntityNormalizer::default());
    let evaluator = FaithfulnessEvaluator::new(&config);

    let loaded = faith_kg::record::read_records(&input).unwrap();
    let result = BatchRunner::new(&evaluator, &provider)
        .parallel(true)
        .run(loaded);
    faith_kg::record::write_json(&output, &result.outputs()).unwrap();
    faith_kg::record::write_json(&side, &result.hallucinations()).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written[0]["faithfulness_score"], json!(1.0));
    assert_eq!(written[0]["question"], "What is BRCA1 associated with?");
    assert!(written[1].get("faithfulness_score").is_none());
    assert_eq!(written[2]["faithfulness_score"], json!(0.0));

    let hallucinations: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&side).unwrap()).unwrap();
    assert!(hallucinations.get("1").is_none());
    assert_eq!(hallucinations["3"][0]["kind"], "unsupported");

    assert_eq!(result.summary.scored, 2);
    assert_eq!(result.summary.failed, 1);
    assert_eq!(result.summary.histogram[0], 1);
    assert_eq!(result.summary.histogram[9], 1);
}
