//! Per-record JSON input and output.
//!
//! ```json
//! {
//!   "question_id": 17,
//!   "cot_kg": [["source", "relation", "target"], ...],
//!   "kg_rag": [["source", "relation", "target"], ...]
//! }
//! ```
//!
//! Triple lists are decoded leniently as raw JSON and validated entry by
//! entry, so a bad entry is reported with its list and position.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RecordError, TripleError};
use crate::graph::Triple;

/// Output field added to every scored record.
pub const SCORE_FIELD: &str = "faithfulness_score";

/// One evaluation record. Fields beyond the three known ones are kept and
/// written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub question_id: Value,
    pub cot_kg: Vec<Value>,
    pub kg_rag: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        serde_json::from_value(value).map_err(|e| RecordError::Decode {
            message: e.to_string(),
        })
    }

    /// `question_id` as plain text, for logs and the hallucination side
    /// channel. String ids are unquoted.
    pub fn question_label(&self) -> String {
        question_label(&self.question_id)
    }

    /// The reasoning chain, in order.
    pub fn chain(&self) -> Result<Vec<Triple>, TripleError> {
        parse_triples("cot_kg", &self.cot_kg)
    }

    /// The reference subgraph.
    pub fn reference(&self) -> Result<Vec<Triple>, TripleError> {
        parse_triples("kg_rag", &self.kg_rag)
    }
}

/// The raw input record with the rounded score appended as its last field.
/// Every input field keeps its position and value.
pub fn with_score(mut record: Value, score: f32) -> Value {
    if let Value::Object(fields) = &mut record {
        fields.insert(SCORE_FIELD.to_string(), Value::from(round_score(score)));
    }
    record
}

/// Plain-text form of any JSON id.
pub fn question_label(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Round to three decimals for output.
pub fn round_score(score: f32) -> f64 {
    (f64::from(score) * 1000.0).round() / 1000.0
}

/// Validate a raw triple list: every entry must be exactly three non-empty
/// strings.
pub fn parse_triples(list: &'static str, items: &[Value]) -> Result<Vec<Triple>, TripleError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let malformed = |reason: String| TripleError::Malformed {
                list,
                index,
                reason,
            };

            let Value::Array(parts) = item else {
                return Err(malformed(format!("expected a list, got {item}")));
            };
            if parts.len() != 3 {
                return Err(malformed(format!(
                    "expected 3 elements, got {}",
                    parts.len()
                )));
            }

            let field = |pos: usize| match parts[pos].as_str() {
                Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
                Some(_) => Err(malformed(format!("element {pos} is empty"))),
                None => Err(malformed(format!(
                    "element {pos} is not a string: {}",
                    parts[pos]
                ))),
            };
            Ok(Triple::new(field(0)?, field(1)?, field(2)?))
        })
        .collect()
}

/// Read a JSON array of records as raw values.
pub fn read_records(path: &Path) -> Result<Vec<Value>, RecordError> {
    let text = std::fs::read_to_string(path).map_err(|source| RecordError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|e| RecordError::Decode {
        message: format!("{}: {e}", path.display()),
    })?;
    match value {
        Value::Array(records) => Ok(records),
        // a lone record is accepted as a batch of one
        Value::Object(_) => Ok(vec![value]),
        other => Err(RecordError::Decode {
            message: format!("{}: expected an array of records, got {other}", path.display()),
        }),
    }
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), RecordError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| RecordError::Encode {
        message: e.to_string(),
    })?;
    std::fs::write(path, text).map_err(|source| RecordError::Io {
        path: path.display().to_string(),
        source,
    })
}
