//! Pipeline configuration: artifact locations and numeric hyperparameters.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Random-forest hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 2,
        }
    }
}

/// Configuration for one pipeline instance.
///
/// All numeric choices that must stay consistent across training,
/// inference, and index updates live here: the embedding dimension is
/// fixed for the lifetime of a deployed index, and the TF-IDF vocabulary
/// bound and feature dimension are fixed per trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the durable artifacts (index snapshot, model).
    pub data_dir: PathBuf,
    /// Embedding dimensionality (384 for all-MiniLM-L6-v2 and for the
    /// default hashing encoder).
    pub embedding_dim: usize,
    /// Maximum TF-IDF vocabulary size (unigrams + bigrams).
    pub vocab_size: usize,
    /// Classifier feature dimension after linear reduction.
    pub feature_dim: usize,
    /// Minimum corpus size accepted by `train()`.
    pub min_training_docs: usize,
    /// Seed for every stochastic step (bootstrap, split, projection).
    pub seed: u64,
    pub forest: ForestParams,
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            embedding_dim: 384,
            vocab_size: 1000,
            feature_dim: 100,
            min_training_docs: 10,
            seed: 42,
            forest: ForestParams::default(),
        }
    }

    /// Path of the vector-index snapshot.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("case_index.json")
    }

    /// Path of the classifier model artifact.
    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join("outcome_model.json")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
