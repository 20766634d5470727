//! Engine configuration: thresholds, scoring constants, normalizer vocabulary
//! and embedder selection.
//!
//! Persisted as TOML. Every field carries a serde default, so a config file only
//! needs the keys it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// How the negated-claim scorer walks candidate pairs when evidence exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeEvidencePolicy {
    /// Examine every candidate pair and keep the strongest evidence.
    #[default]
    Strongest,
    /// Return on the first pair that yields any edge or path.
    First,
}

impl std::fmt::Display for NegativeEvidencePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegativeEvidencePolicy::Strongest => write!(f, "strongest"),
            NegativeEvidencePolicy::First => write!(f, "first"),
        }
    }
}

/// Ordered prefix rule for coarse entity typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypePrefix {
    /// Lowercase prefix tested against the lowercased raw entity text.
    pub prefix: String,
    /// Type assigned on match.
    pub entity_type: String,
}

impl TypePrefix {
    pub fn new(prefix: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entity_type: entity_type.into(),
        }
    }
}

/// Vocabulary for the entity normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Domain words removed as whole words, case-insensitively.
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
    /// Prefix rules, first match wins.
    #[serde(default = "default_type_prefixes")]
    pub type_prefixes: Vec<TypePrefix>,
    /// Type used when no prefix matches.
    #[serde(default = "default_entity_type")]
    pub default_type: String,
}

fn default_stop_words() -> Vec<String> {
    ["gene", "disease", "mutation", "mutations"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_type_prefixes() -> Vec<TypePrefix> {
    vec![
        TypePrefix::new("gene ", "gene"),
        TypePrefix::new("disease ", "disease"),
        TypePrefix::new("protein ", "protein"),
        TypePrefix::new("compound ", "compound"),
    ]
}
fn default_entity_type() -> String {
    "other".into()
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            stop_words: default_stop_words(),
            type_prefixes: default_type_prefixes(),
            default_type: default_entity_type(),
        }
    }
}

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Ollama `/api/embeddings` over HTTP.
    #[default]
    Ollama,
    /// Offline feature-hashing bag of words.
    Hashing,
}

impl std::str::FromStr for EmbedderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(EmbedderKind::Ollama),
            "hashing" => Ok(EmbedderKind::Hashing),
            other => Err(ConfigError::Invalid {
                message: format!("unknown embedder \"{other}\" (expected ollama or hashing)"),
            }),
        }
    }
}

/// Embedding backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default)]
    pub kind: EmbedderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Vector width of the hashing embedder.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "nomic-embed-text".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_dimension() -> usize {
    384
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::default(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            dimension: default_dimension(),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaithConfig {
    /// Longest path (in edges) searched between two matched entities.
    #[serde(default = "default_max_path_len")]
    pub max_path_len: usize,
    /// Any triple scoring below this collapses the record score to zero.
    #[serde(default = "default_min_link_score")]
    pub min_link_score: f32,
    /// Cosine similarity needed for an edge or path to count as evidence.
    #[serde(default = "default_triple_sim_threshold")]
    pub triple_sim_threshold: f32,
    /// Token Jaccard needed for a tier-2 entity match.
    #[serde(default = "default_entity_jaccard_threshold")]
    pub entity_jaccard_threshold: f32,
    /// Embedding cosine needed for a tier-3 entity match.
    #[serde(default = "default_entity_cosine_threshold")]
    pub entity_cosine_threshold: f32,
    /// Negated claim, both entities resolved and unlinked.
    #[serde(default = "default_neg_both_present_score")]
    pub neg_both_present_score: f32,
    /// Negated claim, exactly one entity resolved.
    #[serde(default = "default_neg_one_entity_score")]
    pub neg_one_entity_score: f32,
    /// Negated claim, neither entity resolved.
    #[serde(default = "default_neg_both_absent_score")]
    pub neg_both_absent_score: f32,
    #[serde(default)]
    pub negative_evidence_policy: NegativeEvidencePolicy,
    /// Reference entity types that only match exactly.
    #[serde(default = "default_strict_types")]
    pub strict_types: Vec<String>,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub embedder: EmbedderConfig,
}

fn default_max_path_len() -> usize {
    3
}
fn default_min_link_score() -> f32 {
    0.30
}
fn default_triple_sim_threshold() -> f32 {
    0.80
}
fn default_entity_jaccard_threshold() -> f32 {
    0.90
}
fn default_entity_cosine_threshold() -> f32 {
    0.80
}
fn default_neg_both_present_score() -> f32 {
    1.0
}
fn default_neg_one_entity_score() -> f32 {
    0.8
}
fn default_neg_both_absent_score() -> f32 {
    0.5
}
fn default_strict_types() -> Vec<String> {
    vec!["gene".into(), "protein".into()]
}

impl Default for FaithConfig {
    fn default() -> Self {
        Self {
            max_path_len: default_max_path_len(),
            min_link_score: default_min_link_score(),
            triple_sim_threshold: default_triple_sim_threshold(),
            entity_jaccard_threshold: default_entity_jaccard_threshold(),
            entity_cosine_threshold: default_entity_cosine_threshold(),
            neg_both_present_score: default_neg_both_present_score(),
            neg_one_entity_score: default_neg_one_entity_score(),
            neg_both_absent_score: default_neg_both_absent_score(),
            negative_evidence_policy: NegativeEvidencePolicy::default(),
            strict_types: default_strict_types(),
            normalizer: NormalizerConfig::default(),
            embedder: EmbedderConfig::default(),
        }
    }
}

impl FaithConfig {
    /// Load and validate a config from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            message: format!("failed to serialize config: {e}"),
        })
    }

    /// Check value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_path_len == 0 {
            return Err(ConfigError::Invalid {
                message: "max_path_len must be at least 1".into(),
            });
        }

        let unit_fields = [
            ("min_link_score", self.min_link_score),
            ("triple_sim_threshold", self.triple_sim_threshold),
            ("entity_jaccard_threshold", self.entity_jaccard_threshold),
            ("entity_cosine_threshold", self.entity_cosine_threshold),
            ("neg_both_present_score", self.neg_both_present_score),
            ("neg_one_entity_score", self.neg_one_entity_score),
            ("neg_both_absent_score", self.neg_both_absent_score),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    message: format!("{name} = {value} is outside [0, 1]"),
                });
            }
        }

        if let Some(rule) = self
            .normalizer
            .type_prefixes
            .iter()
            .find(|r| r.prefix.is_empty())
        {
            return Err(ConfigError::Invalid {
                message: format!("empty prefix for entity type \"{}\"", rule.entity_type),
            });
        }

        if self.embedder.kind == EmbedderKind::Hashing && self.embedder.dimension == 0 {
            return Err(ConfigError::Invalid {
                message: "embedder.dimension must be > 0".into(),
            });
        }

        Ok(())
    }
}
