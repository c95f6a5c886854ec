//! Domain value objects: case documents, retrieval hits, predictions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A legal case document, immutable once ingested.
///
/// `tribunal` + `docket_id` form the natural external key. The derived
/// outcome label and embedding are computed at processing time and are
/// not part of this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub tribunal: String,
    pub date: NaiveDate,
    /// Case category ("materia"), free text.
    pub matter: String,
    pub parties: String,
    /// Docket number ("expediente").
    pub docket_id: String,
    pub full_text: String,
    pub source_url: String,
}

/// Lightweight projection of a [`Document`] attached to query results.
///
/// `position` is the document's stable position in the in-memory
/// collection, which by convention equals its row in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    pub position: usize,
    pub tribunal: String,
    pub date: NaiveDate,
    pub matter: String,
    pub parties: String,
    pub docket_id: String,
    pub source_url: String,
}

impl DocumentRef {
    pub fn new(position: usize, doc: &Document) -> Self {
        Self {
            position,
            tribunal: doc.tribunal.clone(),
            date: doc.date,
            matter: doc.matter.clone(),
            parties: doc.parties.clone(),
            docket_id: doc.docket_id.clone(),
            source_url: doc.source_url.clone(),
        }
    }
}

/// One retrieval hit: a document reference, its cosine similarity to the
/// query (in [-1, 1] for unit-normalized vectors), and the heuristic
/// outcome label extracted from its text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarCase {
    pub document: DocumentRef,
    pub score: f32,
    pub outcome: String,
}

/// A classifier prediction. Transient; callers persist what they need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Arg-max outcome label.
    pub outcome: String,
    /// Probability of the predicted label, in [0, 1].
    pub confidence: f32,
    /// Full per-class distribution, one entry per known label.
    pub probabilities: Vec<(String, f32)>,
    /// Top contributing feature dimensions `(dimension, importance)`,
    /// ranked by the model's native importance scores.
    pub top_features: Vec<(usize, f32)>,
}
