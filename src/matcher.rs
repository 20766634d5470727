//! Entity resolution: maps a reasoning-trail entity onto reference entities.
//!
//! Three tiers, first non-empty tier wins:
//!
//! 1. **Exact**: normalized text equality
//! 2. **Jaccard**: token overlap at or above the threshold
//! 3. **Embedding**: cosine similarity at or above the threshold
//!
//! Reference entities whose type is strict (short, ambiguous symbols such as
//! gene names) only take part in tier 1. Ambiguity is kept: a tier may return
//! several entities and every one of them is scored downstream.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::config::FaithConfig;
use crate::embed::{EmbedResult, EmbeddingProvider, cosine_similarity};
use crate::graph::index::ReferenceGraph;

/// Which tier resolved a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Exact,
    Jaccard,
    Embedding,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchTier::Exact => write!(f, "exact"),
            MatchTier::Jaccard => write!(f, "jaccard"),
            MatchTier::Embedding => write!(f, "embedding"),
        }
    }
}

/// Outcome of resolving one entity string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    NoMatch,
    Unique { entity: String, tier: MatchTier },
    Ambiguous { entities: BTreeSet<String>, tier: MatchTier },
}

impl MatchResult {
    fn from_set(mut entities: BTreeSet<String>, tier: MatchTier) -> Self {
        match entities.len() {
            0 => MatchResult::NoMatch,
            1 => match entities.pop_first() {
                Some(entity) => MatchResult::Unique { entity, tier },
                None => MatchResult::NoMatch,
            },
            _ => MatchResult::Ambiguous { entities, tier },
        }
    }

    /// Matched entities in sorted order.
    pub fn entities(&self) -> Vec<&str> {
        match self {
            MatchResult::NoMatch => Vec::new(),
            MatchResult::Unique { entity, .. } => vec![entity.as_str()],
            MatchResult::Ambiguous { entities, .. } => {
                entities.iter().map(String::as_str).collect()
            }
        }
    }

    pub fn to_set(&self) -> BTreeSet<String> {
        self.entities().into_iter().map(String::from).collect()
    }

    pub fn tier(&self) -> Option<MatchTier> {
        match self {
            MatchResult::NoMatch => None,
            MatchResult::Unique { tier, .. } | MatchResult::Ambiguous { tier, .. } => Some(*tier),
        }
    }

    pub fn is_match(&self) -> bool {
        !matches!(self, MatchResult::NoMatch)
    }

    pub fn len(&self) -> usize {
        match self {
            MatchResult::NoMatch => 0,
            MatchResult::Unique { .. } => 1,
            MatchResult::Ambiguous { entities, .. } => entities.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tiered fuzzy resolver.
#[derive(Debug, Clone)]
pub struct EntityMatcher {
    strict_types: HashSet<String>,
    jaccard_threshold: f32,
    cosine_threshold: f32,
}

impl EntityMatcher {
    pub fn new(
        strict_types: impl IntoIterator<Item = String>,
        jaccard_threshold: f32,
        cosine_threshold: f32,
    ) -> Self {
        Self {
            strict_types: strict_types.into_iter().collect(),
            jaccard_threshold,
            cosine_threshold,
        }
    }

    pub fn from_config(config: &FaithConfig) -> Self {
        Self::new(
            config.strict_types.iter().cloned(),
            config.entity_jaccard_threshold,
            config.entity_cosine_threshold,
        )
    }

    fn is_strict(&self, graph: &ReferenceGraph, entity: &str) -> bool {
        graph
            .detail(entity)
            .is_some_and(|d| self.strict_types.contains(&d.entity_type))
    }

    /// Resolve `entity` against the reference entities of `graph`.
    ///
    /// Only the embedding tier can fail, and only if the embedder does.
    pub fn resolve(
        &self,
        entity: &str,
        graph: &ReferenceGraph,
        provider: &EmbeddingProvider,
    ) -> EmbedResult<MatchResult> {
        let query = provider.normalizer().normalize(entity);

        if graph.contains(&query) {
            return Ok(MatchResult::Unique {
                entity: query,
                tier: MatchTier::Exact,
            });
        }
        if query.is_empty() {
            return Ok(MatchResult::NoMatch);
        }

        let candidates: Vec<&String> = graph
            .entities()
            .iter()
            .filter(|e| !self.is_strict(graph, e))
            .collect();
        if candidates.is_empty() {
            return Ok(MatchResult::NoMatch);
        }

        let normalizer = provider.normalizer();
        let jaccard: BTreeSet<String> = candidates
            .iter()
            .filter(|e| normalizer.jaccard(&query, e) >= self.jaccard_threshold)
            .map(|e| (*e).clone())
            .collect();
        if !jaccard.is_empty() {
            return Ok(MatchResult::from_set(jaccard, MatchTier::Jaccard));
        }

        let query_vec = provider.embed_entity(&query)?;
        let mut embedded = BTreeSet::new();
        for candidate in candidates {
            let candidate_vec = provider.embed_entity(candidate)?;
            if cosine_similarity(&query_vec, &candidate_vec) >= self.cosine_threshold {
                embedded.insert(candidate.clone());
            }
        }
        Ok(MatchResult::from_set(embedded, MatchTier::Embedding))
    }
}

impl Default for EntityMatcher {
    fn default() -> Self {
        Self::from_config(&FaithConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{EmbedResult, Embedder};
    use crate::graph::Triple;
    use crate::normalize::EntityNormalizer;

    /// Maps a few known strings onto fixed directions; anything else lands on
    /// a one-hot axis picked by its length.
    struct Table;

    impl Embedder for Table {
        fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
            let mut v = vec![0.0; 8];
            match text {
                "heart attack" | "myocardial infarction" => v[0] = 1.0,
                "protein rad51" | "rad51 recombinase" => v[1] = 1.0,
                other => v[3 + other.len() % 5] = 1.0,
            }
            Ok(v)
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    /// Fails every request.
    struct Down;

    impl Embedder for Down {
        fn embed(&self, _text: &str) -> EmbedResult<Vec<f32>> {
            Err(crate::error::EmbedError::Unavailable {
                url: "test".into(),
            })
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    fn graph(triples: &[(&str, &str, &str)]) -> ReferenceGraph {
        let triples: Vec<Triple> = triples
            .iter()
            .map(|(s, r, t)| Triple::new(*s, *r, *t))
            .collect();
        ReferenceGraph::build(&triples, &EntityNormalizer::default())
    }

    fn provider() -> EmbeddingProvider {
        EmbeddingProvider::new(Table, EntityNormalizer::default())
    }

    #[test]
    fn exact_match_short_circuits() {
        let g = graph(&[("Gene BRCA1", "ASSOCIATES", "Breast Cancer")]);
        // the failing embedder proves no fuzzy tier ran
        let down = EmbeddingProvider::new(Down, EntityNormalizer::default());
        let m = EntityMatcher::default().resolve("BRCA1", &g, &down).unwrap();
        assert_eq!(
            m,
            MatchResult::Unique {
                entity: "brca1".into(),
                tier: MatchTier::Exact
            }
        );
    }

    #[test]
    fn jaccard_tier_matches_reordered_tokens() {
        let g = graph(&[("Cancer of Breast", "R", "X"), ("Lung Cancer", "R", "X")]);
        let matcher = EntityMatcher::new(Vec::new(), 0.6, 0.8);
        let m = matcher.resolve("breast cancer of", &g, &provider()).unwrap();
        assert_eq!(m.tier(), Some(MatchTier::Jaccard));
        assert_eq!(m.entities(), vec!["cancer of breast"]);
    }

    #[test]
    fn jaccard_tier_can_be_ambiguous() {
        let g = graph(&[("type 2 diabetes", "R", "a"), ("diabetes type 2", "R", "b")]);
        let matcher = EntityMatcher::new(Vec::new(), 0.9, 0.8);
        let m = matcher.resolve("2 type diabetes", &g, &provider()).unwrap();
        assert!(matches!(m, MatchResult::Ambiguous { tier: MatchTier::Jaccard, .. }));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn embedding_tier_as_last_resort() {
        let g = graph(&[("Myocardial Infarction", "R", "Aspirin")]);
        let m = EntityMatcher::default()
            .resolve("Heart Attack", &g, &provider())
            .unwrap();
        assert_eq!(
            m,
            MatchResult::Unique {
                entity: "myocardial infarction".into(),
                tier: MatchTier::Embedding
            }
        );
    }

    #[test]
    fn strict_types_only_match_exactly() {
        // "Protein RAD51" is strict; the embedding would otherwise match.
        let g = graph(&[("Protein RAD51", "R", "Compound X")]);
        let m = EntityMatcher::default()
            .resolve("RAD51 recombinase", &g, &provider())
            .unwrap();
        assert_eq!(m, MatchResult::NoMatch);

        let exact = EntityMatcher::default()
            .resolve("protein rad51", &g, &provider())
            .unwrap();
        assert_eq!(exact.tier(), Some(MatchTier::Exact));
    }

    #[test]
    fn strict_types_skip_jaccard_too() {
        let g = graph(&[("Gene TP53 variant", "R", "Heart Attack")]);
        assert_eq!(g.detail("tp53 variant").unwrap().entity_type, "gene");
        let matcher = EntityMatcher::new(vec!["gene".to_string()], 0.5, 0.99);
        let m = matcher.resolve("TP53 variant form", &g, &provider()).unwrap();
        assert_eq!(m, MatchResult::NoMatch);
    }

    #[test]
    fn unknown_entity_is_no_match() {
        let g = graph(&[("A", "R", "B")]);
        let m = EntityMatcher::default()
            .resolve("Something Else", &g, &provider())
            .unwrap();
        assert!(!m.is_match());
        assert!(m.entities().is_empty());
        assert_eq!(m.tier(), None);
    }

    #[test]
    fn empty_normalized_query_is_no_match() {
        let g = graph(&[("A", "R", "B")]);
        let m = EntityMatcher::default().resolve("Gene", &g, &provider()).unwrap();
        assert_eq!(m, MatchResult::NoMatch);
    }

    #[test]
    fn embedder_failure_propagates() {
        let g = graph(&[("A", "R", "B")]);
        let down = EmbeddingProvider::new(Down, EntityNormalizer::default());
        assert!(EntityMatcher::default().resolve("zzz", &g, &down).is_err());
    }
}
