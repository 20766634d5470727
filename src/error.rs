//! Rich diagnostic error types for the faithfulness engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! so a failing record reports a code and a hint instead of a bare message.
//! Recoverable scoring outcomes (no match, no path, no edge) are never errors.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the faithfulness engine.
#[derive(Debug, Error, Diagnostic)]
pub enum FaithError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Triple(#[from] TripleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Record(#[from] RecordError),
}

// ---------------------------------------------------------------------------
// Triple errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TripleError {
    #[error("malformed triple at {list}[{index}]: {reason}")]
    #[diagnostic(
        code(faith::triple::malformed),
        help(
            "Every entry of `cot_kg` and `kg_rag` must be a list of exactly three \
             non-empty strings: [source, relation, target]. Fix the upstream \
             extractor or retriever output for this record."
        )
    )]
    Malformed {
        list: &'static str,
        index: usize,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Embedding errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EmbedError {
    #[error("embedding service is not available at {url}")]
    #[diagnostic(
        code(faith::embed::unavailable),
        help("Start Ollama with `ollama serve`, or run with `--embedder hashing` for offline scoring.")
    )]
    Unavailable { url: String },

    #[error("embedding request failed: {message}")]
    #[diagnostic(
        code(faith::embed::request_failed),
        help("Check that the embedding service is running and the model is pulled.")
    )]
    RequestFailed { message: String },

    #[error("failed to parse embedding response: {message}")]
    #[diagnostic(
        code(faith::embed::parse_error),
        help("The service returned an unexpected response format. Is the model an embedding model?")
    )]
    ParseError { message: String },

    #[error("embedder returned an empty vector for \"{text}\"")]
    #[diagnostic(
        code(faith::embed::empty),
        help("Embedding models must return a fixed-length, non-empty vector for every input.")
    )]
    EmptyEmbedding { text: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(faith::embed::dim_mismatch),
        help(
            "All embeddings within one run must share a dimension. \
             Do not switch models between records of the same batch."
        )
    )]
    DimensionMismatch { expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(faith::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(faith::config::parse),
        help("Check the TOML syntax. `faith-kg config-default` prints a valid starting point.")
    )]
    Parse { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(faith::config::invalid),
        help("Thresholds and scores must lie in [0, 1] and `max_path_len` must be at least 1.")
    )]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Record errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RecordError {
    #[error("failed to decode record: {message}")]
    #[diagnostic(
        code(faith::record::decode),
        help("A record needs `question_id`, `cot_kg` and `kg_rag` fields; triples are string lists.")
    )]
    Decode { message: String },

    #[error("I/O error on {path}: {source}")]
    #[diagnostic(
        code(faith::record::io),
        help("Check that the path exists and that you have read/write permissions.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode output: {message}")]
    #[diagnostic(code(faith::record::encode))]
    Encode { message: String },
}

/// Convenience alias for functions returning faithfulness results.
pub type FaithResult<T> = std::result::Result<T, FaithError>;
