//! Entity normalization: canonical text and coarse typing for entity strings.
//!
//! Both triple lists are run through the same [`EntityNormalizer`] so that
//! "BRCA1 gene" in a reasoning trail and "Gene BRCA1" in the reference graph
//! meet on the same key (`brca1`).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{NormalizerConfig, TypePrefix};
use crate::error::ConfigError;

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Canonical form of an entity plus its inferred type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntity {
    pub text: String,
    pub entity_type: String,
}

/// Strips domain stop-words and punctuation, lowercases, and types entities.
#[derive(Debug, Clone)]
pub struct EntityNormalizer {
    stop_words: Option<Regex>,
    type_prefixes: Vec<TypePrefix>,
    default_type: String,
}

impl EntityNormalizer {
    /// Build a normalizer from config. Stop-words are matched literally.
    pub fn new(config: &NormalizerConfig) -> Result<Self, ConfigError> {
        let words: Vec<String> = config
            .stop_words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect();

        let stop_words = if words.is_empty() {
            None
        } else {
            let pattern = format!(r"(?i)\b(?:{})\b", words.join("|"));
            Some(Regex::new(&pattern).map_err(|e| ConfigError::Invalid {
                message: format!("stop-word pattern failed to compile: {e}"),
            })?)
        };

        Ok(Self {
            stop_words,
            type_prefixes: config
                .type_prefixes
                .iter()
                .map(|r| TypePrefix::new(r.prefix.to_lowercase(), r.entity_type.clone()))
                .collect(),
            default_type: config.default_type.clone(),
        })
    }

    /// Canonical text: stop-words removed, punctuation to spaces, whitespace
    /// collapsed, trimmed, lowercased. Idempotent.
    pub fn normalize(&self, raw: &str) -> String {
        let without_stops = match &self.stop_words {
            Some(re) => re.replace_all(raw, ""),
            None => raw.into(),
        };
        let spaced = PUNCTUATION.replace_all(&without_stops, " ");
        WHITESPACE.replace_all(&spaced, " ").trim().to_lowercase()
    }

    /// Coarse type from the first matching prefix of the lowercased raw text.
    pub fn entity_type(&self, raw: &str) -> &str {
        let lowered = raw.to_lowercase();
        self.type_prefixes
            .iter()
            .find(|rule| lowered.starts_with(&rule.prefix))
            .map(|rule| rule.entity_type.as_str())
            .unwrap_or(&self.default_type)
    }

    /// Normalized text and type in one call.
    pub fn normalize_entity(&self, raw: &str) -> NormalizedEntity {
        NormalizedEntity {
            text: self.normalize(raw),
            entity_type: self.entity_type(raw).to_string(),
        }
    }

    /// Unique tokens of the normalized text.
    pub fn tokens(&self, text: &str) -> HashSet<String> {
        self.normalize(text)
            .split_whitespace()
            .map(String::from)
            .collect()
    }

    /// Token-overlap Jaccard between two entity strings. Zero if either side
    /// has no tokens.
    pub fn jaccard(&self, a: &str, b: &str) -> f32 {
        let ta = self.tokens(a);
        let tb = self.tokens(b);
        if ta.is_empty() || tb.is_empty() {
            return 0.0;
        }
        let intersection = ta.intersection(&tb).count();
        let union = ta.union(&tb).count();
        intersection as f32 / union as f32
    }
}

impl Default for EntityNormalizer {
    fn default() -> Self {
        // The default vocabulary is plain words, so compilation cannot fail.
        Self::new(&NormalizerConfig::default()).unwrap_or_else(|_| Self {
            stop_words: None,
            type_prefixes: Vec::new(),
            default_type: "other".into(),
        })
    }
}
