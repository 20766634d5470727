//! Embedding provider: text → fixed-length vector, memoized by content.
//!
//! The [`EmbeddingProvider`] owns two content-addressed caches:
//! - entity cache keyed by normalized entity text
//! - triple cache keyed by `"<source> <relation> <target>"` after normalization
//!
//! Keys are derived from content, so entries never go stale within a process.
//! Both caches are `DashMap`s, which makes a single provider safe to share
//! across records scored in parallel.

pub mod hashing;
pub mod ollama;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::config::{EmbedderKind, FaithConfig};
use crate::error::{EmbedError, FaithResult};
use crate::graph::Triple;
use crate::normalize::EntityNormalizer;

use self::hashing::HashingEmbedder;
use self::ollama::{OllamaConfig, OllamaEmbedder};

pub type EmbedResult<T> = std::result::Result<T, EmbedError>;

/// Shared, immutable embedding vector.
pub type Embedding = Arc<[f32]>;

/// A text-embedding capability.
///
/// Must be deterministic for identical text within a run.
pub trait Embedder: Send + Sync {
    /// Embed one text.
    fn embed(&self, text: &str) -> EmbedResult<Vec<f32>>;

    /// Short backend name for logs.
    fn name(&self) -> &str;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        (**self).embed(text)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Cosine similarity clamped into [0, 1].
///
/// Mismatched lengths and zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Cache occupancy and hit counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entity_entries: usize,
    pub triple_entries: usize,
    pub hits: usize,
    pub misses: usize,
}

/// Memoizing wrapper around an [`Embedder`].
pub struct EmbeddingProvider {
    embedder: Box<dyn Embedder>,
    normalizer: EntityNormalizer,
    entity_cache: DashMap<String, Embedding>,
    triple_cache: DashMap<String, Embedding>,
    /// Width fixed by the first vector seen.
    dimension: OnceLock<usize>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl EmbeddingProvider {
    pub fn new(embedder: impl Embedder + 'static, normalizer: EntityNormalizer) -> Self {
        Self {
            embedder: Box::new(embedder),
            normalizer,
            entity_cache: DashMap::new(),
            triple_cache: DashMap::new(),
            dimension: OnceLock::new(),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Build the configured embedder and normalizer.
    ///
    /// An Ollama backend is probed first, so a missing server or model fails
    /// here instead of on the first record.
    pub fn from_config(config: &FaithConfig) -> FaithResult<Self> {
        let normalizer = EntityNormalizer::new(&config.normalizer)?;
        let provider = match config.embedder.kind {
            EmbedderKind::Ollama => {
                let embedder = OllamaEmbedder::new(OllamaConfig::from(&config.embedder));
                embedder.probe()?;
                tracing::info!(model = embedder.model(), "using ollama embedder");
                Self::new(embedder, normalizer)
            }
            EmbedderKind::Hashing => {
                tracing::info!(dimension = config.embedder.dimension, "using hashing embedder");
                Self::new(HashingEmbedder::new(config.embedder.dimension), normalizer)
            }
        };
        Ok(provider)
    }

    /// Canonical text of a triple: normalized endpoints around the trimmed,
    /// lowercased relation.
    pub fn triple_text(&self, triple: &Triple) -> String {
        format!(
            "{} {} {}",
            self.normalizer.normalize(&triple.source),
            triple.relation.trim().to_lowercase(),
            self.normalizer.normalize(&triple.target)
        )
    }

    /// Embedding of the normalized entity text.
    pub fn embed_entity(&self, entity: &str) -> EmbedResult<Embedding> {
        let key = self.normalizer.normalize(entity);
        self.cached(&self.entity_cache, key)
    }

    /// Embedding of the triple's canonical text.
    pub fn embed_triple(&self, triple: &Triple) -> EmbedResult<Embedding> {
        let key = self.triple_text(triple);
        self.cached(&self.triple_cache, key)
    }

    fn cached(&self, cache: &DashMap<String, Embedding>, key: String) -> EmbedResult<Embedding> {
        if let Some(entry) = cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(entry.value()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let vector = self.embedder.embed(&key)?;
        if vector.is_empty() {
            return Err(EmbedError::EmptyEmbedding { text: key });
        }
        let expected = *self.dimension.get_or_init(|| vector.len());
        if vector.len() != expected {
            return Err(EmbedError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let embedding: Embedding = vector.into();
        cache.insert(key, Arc::clone(&embedding));
        Ok(embedding)
    }

    /// The normalizer used for cache keys.
    pub fn normalizer(&self) -> &EntityNormalizer {
        &self.normalizer
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// Vector width, once known.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entity_entries: self.entity_cache.len(),
            triple_entries: self.triple_cache.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("embedder", &self.embedder.name())
            .field("dimension", &self.dimension.get())
            .field("entities", &self.entity_cache.len())
            .field("triples", &self.triple_cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every text it is asked to embed.
    struct Recording {
        calls: Mutex<Vec<String>>,
        width: usize,
    }

    impl Recording {
        fn new(width: usize) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                width,
            }
        }
    }

    impl Embedder for Recording {
        fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(text.to_string());
            let width = if text.contains("wide") { self.width + 1 } else { self.width };
            Ok(vec![text.len() as f32; width])
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    struct Empty;

    impl Embedder for Empty {
        fn embed(&self, _text: &str) -> EmbedResult<Vec<f32>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    #[test]
    fn cosine_of_identical_and_orthogonal() {
        let a = [1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_clamped_to_unit_interval() {
        let a = [1.0, 0.0];
        let b = [-1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[test]
    fn triple_text_normalizes_endpoints() {
        let provider = EmbeddingProvider::new(Recording::new(4), EntityNormalizer::default());
        let t = Triple::new("Gene BRCA1", "  ASSOCIATES ", "Breast Cancer");
        assert_eq!(provider.triple_text(&t), "brca1 associates breast cancer");
    }

    #[test]
    fn entity_cache_is_keyed_on_normalized_text() {
        let provider = EmbeddingProvider::new(Recording::new(4), EntityNormalizer::default());
        provider.embed_entity("Gene BRCA1").unwrap();
        provider.embed_entity("brca1").unwrap();
        provider.embed_entity("BRCA1 gene").unwrap();

        let stats = provider.stats();
        assert_eq!(stats.entity_entries, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn triple_cache_shares_equivalent_wordings() {
        let provider = EmbeddingProvider::new(Recording::new(4), EntityNormalizer::default());
        let a = provider
            .embed_triple(&Triple::new("BRCA1", "ASSOCIATES", "Breast Cancer"))
            .unwrap();
        let b = provider
            .embed_triple(&Triple::new("Gene BRCA1", "associates", "breast cancer"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(provider.stats().triple_entries, 1);
        assert_eq!(provider.dimension(), Some(4));
    }

    #[test]
    fn entity_and_triple_caches_are_separate() {
        let provider = EmbeddingProvider::new(Recording::new(4), EntityNormalizer::default());
        provider.embed_entity("a b c").unwrap();
        provider.embed_triple(&Triple::new("a", "b", "c")).unwrap();
        let stats = provider.stats();
        assert_eq!(stats.entity_entries, 1);
        assert_eq!(stats.triple_entries, 1);
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let provider = EmbeddingProvider::new(Recording::new(4), EntityNormalizer::default());
        provider.embed_entity("narrow").unwrap();
        let err = provider.embed_entity("wide").unwrap_err();
        assert!(matches!(
            err,
            EmbedError::DimensionMismatch {
                expected: 4,
                actual: 5
            }
        ));
    }

    #[test]
    fn hashing_provider_from_config() {
        let mut config = FaithConfig::default();
        config.embedder.kind = EmbedderKind::Hashing;
        config.embedder.dimension = 32;
        let provider = EmbeddingProvider::from_config(&config).unwrap();
        assert_eq!(provider.embedder_name(), "hashing");
        assert_eq!(provider.embed_entity("brca1").unwrap().len(), 32);
    }

    #[test]
    fn empty_vector_is_an_error() {
        let provider = EmbeddingProvider::new(Empty, EntityNormalizer::default());
        let err = provider.embed_entity("anything").unwrap_err();
        assert!(matches!(err, EmbedError::EmptyEmbedding { .. }));
    }
}
