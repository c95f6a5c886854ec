//! Flat inner-product similarity index.
//!
//! Rows are unit-normalized on insertion, so the inner product is cosine
//! similarity and every score is bounded in [-1, 1] and comparable
//! across queries. Position `i` in the index corresponds by convention
//! to position `i` in the caller's document collection; the caller keeps
//! the two in lockstep.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use veredicto_core::persist::{read_json, write_json_atomic};
use veredicto_core::{PipelineError, Result};

/// Snapshot layout version accepted by [`VectorIndex::load`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// In-memory inner-product index over unit-normalized embeddings.
///
/// Append-only during incremental updates; a full rebuild replaces the
/// contents atomically via [`VectorIndex::build`].
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Create an empty index with a fixed dimensionality.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
        }
    }

    /// Build an index from raw embedding rows, normalizing each to unit
    /// L2 norm. Rows of the wrong width are a [`PipelineError::DimensionMismatch`].
    pub fn build(dim: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
        let mut index = Self::new(dim);
        index.add(vectors)?;
        Ok(index)
    }

    /// Append rows to the index without rebuilding. Each row is
    /// unit-normalized before insertion.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
        for mut v in vectors {
            if v.len() != self.dim {
                return Err(PipelineError::DimensionMismatch {
                    expected: self.dim,
                    actual: v.len(),
                });
            }
            crate::encoder::normalize_in_place(&mut v);
            self.vectors.push(v);
        }
        Ok(())
    }

    /// Top-k search by descending inner-product score.
    ///
    /// Returns at most `k` `(position, score)` pairs; exact ties are
    /// broken by ascending position so results are deterministic.
    /// Searching an empty index is [`PipelineError::NotReady`] — callers
    /// must be able to tell "no results" from "nothing indexed yet".
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if self.vectors.is_empty() {
            return Err(PipelineError::NotReady);
        }
        if query.len() != self.dim {
            return Err(PipelineError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let mut q = query.to_vec();
        crate::encoder::normalize_in_place(&mut q);

        let mut hits: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, row)| {
                let score: f32 = row.iter().zip(&q).map(|(a, b)| a * b).sum();
                // Guard against floating drift past the cosine bound.
                (pos, score.clamp(-1.0, 1.0))
            })
            .collect();

        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(k);
        Ok(hits)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Persist a durable snapshot via write-to-temp-then-rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            dim: self.dim,
            vectors: self.vectors.clone(),
        };
        write_json_atomic(path, &snapshot)?;
        info!(path = %path.display(), rows = self.vectors.len(), "saved index snapshot");
        Ok(())
    }

    /// Load a snapshot, validating its structure against the expected
    /// embedding dimension. A mismatched dimension is a fatal
    /// configuration error, not a recoverable state.
    pub fn load(path: &Path, expected_dim: usize) -> Result<Self> {
        let snapshot: Snapshot = read_json(path)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PipelineError::CorruptArtifact(format!(
                "unsupported index snapshot version {} in {}",
                snapshot.version,
                path.display()
            )));
        }
        if snapshot.dim != expected_dim {
            return Err(PipelineError::DimensionMismatch {
                expected: expected_dim,
                actual: snapshot.dim,
            });
        }
        if let Some(bad) = snapshot.vectors.iter().find(|v| v.len() != snapshot.dim) {
            return Err(PipelineError::CorruptArtifact(format!(
                "snapshot row of width {} in {}-dimensional index",
                bad.len(),
                snapshot.dim
            )));
        }

        info!(path = %path.display(), rows = snapshot.vectors.len(), "loaded index snapshot");
        Ok(Self {
            dim: snapshot.dim,
            vectors: snapshot.vectors,
        })
    }
}
