//! Relation polarity: does a relation assert or deny a link?
//!
//! The scorer only talks to the [`NegationClassifier`] trait, so a stronger
//! detector can replace the keyword default without touching scoring.
//! [`KeywordNegation`] recognizes the whole words "not" and "no"; phrasings
//! such as "never" or "fails to" are read as assertions.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static NEGATION_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:not|no)\b").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Polarity of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Positive => write!(f, "positive"),
            Polarity::Negative => write!(f, "negative"),
        }
    }
}

/// Pluggable relation polarity detector.
pub trait NegationClassifier: Send + Sync {
    fn classify(&self, relation: &str) -> Polarity;

    /// The relation with its negation removed ("DOES NOT ASSOCIATE" →
    /// "DOES ASSOCIATE"). Positive relations come back unchanged.
    fn positive_form(&self, relation: &str) -> String;
}

/// Keyword detector for "not"/"no".
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordNegation;

impl NegationClassifier for KeywordNegation {
    fn classify(&self, relation: &str) -> Polarity {
        if NEGATION_WORDS.is_match(relation) {
            Polarity::Negative
        } else {
            Polarity::Positive
        }
    }

    fn positive_form(&self, relation: &str) -> String {
        let stripped = NEGATION_WORDS.replace_all(relation, "");
        WHITESPACE.replace_all(&stripped, " ").trim().to_string()
    }
}
