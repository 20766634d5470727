// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # faith-kg
//!
//! Scores how faithfully a reasoning trail, extracted as knowledge-graph
//! triples, is grounded in a reference subgraph retrieved for the same
//! question.
//!
//! ## Architecture
//!
//! - **Normalization** (`normalize`): canonical entity text and coarse entity types
//! - **Embeddings** (`embed`): pluggable embedders behind a memoizing provider
//! - **Reference graph** (`graph`): petgraph index plus bounded path search
//! - **Entity matching** (`matcher`): exact → token Jaccard → embedding tiers
//! - **Scoring** (`score`): asserted and negated claims against edges and paths
//! - **Aggregation** (`faithfulness`): per-record score with early zeroing
//! - **Batch runs** (`batch`, `record`): JSON records in, scored records out
//!
//! ## Library usage
//!
//! ```no_run
//! use faith_kg::config::FaithConfig;
//! use faith_kg::embed::EmbeddingProvider;
//! use faith_kg::embed::hashing::HashingEmbedder;
//! use faith_kg::faithfulness::FaithfulnessEvaluator;
//! use faith_kg::graph::Triple;
//! use faith_kg::normalize::EntityNormalizer;
//!
//! let provider = EmbeddingProvider::new(HashingEmbedder::default(), EntityNormalizer::default());
//! let evaluator = FaithfulnessEvaluator::new(&FaithConfig::default());
//!
//! let chain = vec![Triple::new("BRCA1", "ASSOCIATES", "Breast Cancer")];
//! let reference = vec![Triple::new("BRCA1", "ASSOCIATES", "Breast Cancer")];
//! let report = evaluator.evaluate("q1", &chain, &reference, &provider).unwrap();
//! println!("faithfulness: {:.3}", report.score);
//! ```

pub mod batch;
pub mod config;
pub mod embed;
pub mod error;
pub mod faithfulness;
pub mod graph;
pub mod hallucination;
pub mod matcher;
pub mod negation;
pub mod normalize;
pub mod record;
pub mod score;
