//! Outcome classifier: training, prediction, evaluation, and the
//! versioned model artifact.
//!
//! The trained state (label encoding, fitted feature extractor, forest)
//! is one immutable bundle swapped in atomically: a failed or
//! exceptional training run leaves the previously trained model fully
//! usable, and readers always observe either the old or the new state.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use veredicto_core::persist::{read_json, write_json_atomic};
use veredicto_core::{
    Document, PipelineConfig, PipelineError, Prediction, Result, extract_outcome,
};

use crate::features::FeatureExtractor;
use crate::forest::RandomForest;

/// Artifact layout version accepted on load.
pub const ARTIFACT_VERSION: u32 = 1;

/// Number of feature dimensions reported in a prediction's
/// importance summary.
const TOP_FEATURES: usize = 10;

/// Outcome of one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub documents: usize,
    pub classes: Vec<String>,
    pub test_size: usize,
    /// Accuracy on the held-out split (on the training split when the
    /// corpus has no class with two members to hold out).
    pub accuracy: f32,
}

/// Model-quality metrics over an arbitrary document set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub accuracy: f32,
    pub mean_confidence: f32,
    pub class_distribution: Vec<(String, usize)>,
}

/// One fitted model: everything `predict` needs, nothing shared with
/// the embedding path.
#[derive(Debug, Serialize, Deserialize)]
struct TrainedState {
    /// Stable label encoding: class index = position.
    labels: Vec<String>,
    extractor: FeatureExtractor,
    forest: RandomForest,
    accuracy: f32,
}

/// Durable layout of the model artifact.
#[derive(Serialize, Deserialize)]
struct ModelArtifact {
    version: u32,
    feature_dim: usize,
    state: TrainedState,
}

/// Supervised outcome classifier with persisted model state.
///
/// Lifecycle: created untrained; `train` produces a new fitted state
/// atomically; `load` restores the persisted artifact at process start.
pub struct OutcomeClassifier {
    vocab_size: usize,
    feature_dim: usize,
    min_training_docs: usize,
    seed: u64,
    forest_params: veredicto_core::ForestParams,
    artifact_path: PathBuf,
    state: RwLock<Option<Arc<TrainedState>>>,
}

impl OutcomeClassifier {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            vocab_size: config.vocab_size,
            feature_dim: config.feature_dim,
            min_training_docs: config.min_training_docs,
            seed: config.seed,
            forest_params: config.forest.clone(),
            artifact_path: config.model_path(),
            state: RwLock::new(None),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.state.read().expect("classifier lock poisoned").is_some()
    }

    /// Accuracy recorded at the last successful training run.
    pub fn accuracy(&self) -> Option<f32> {
        self.snapshot().map(|s| s.accuracy)
    }

    /// Train a new model from scratch on `documents`.
    ///
    /// Labels are bootstrapped from the outcome heuristic, features are
    /// fitted on this corpus, and the ensemble is evaluated on a seeded
    /// stratified held-out split. Only after everything succeeds is the
    /// artifact persisted and the in-memory state replaced.
    pub fn train(&self, documents: &[Document], test_fraction: f32) -> Result<TrainingReport> {
        if documents.len() < self.min_training_docs {
            return Err(PipelineError::InsufficientData {
                have: documents.len(),
                need: self.min_training_docs,
            });
        }

        let outcomes: Vec<&str> = documents
            .iter()
            .map(|d| extract_outcome(&d.full_text))
            .collect();

        // Stable label encoding: sorted unique labels, fitted once per run.
        let mut labels: Vec<String> = outcomes.iter().map(|s| s.to_string()).collect();
        labels.sort();
        labels.dedup();
        let y: Vec<usize> = outcomes
            .iter()
            .map(|o| labels.iter().position(|l| l == o).unwrap())
            .collect();

        let mut extractor =
            FeatureExtractor::new(self.vocab_size, self.feature_dim, self.seed);
        let x = extractor.fit_transform(documents)?;

        let (train_idx, test_idx) =
            stratified_split(&y, labels.len(), test_fraction, self.seed);
        let x_train: Vec<Vec<f32>> = train_idx.iter().map(|&i| x[i].clone()).collect();
        let y_train: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();

        let forest = RandomForest::fit(
            &x_train,
            &y_train,
            labels.len(),
            &self.forest_params,
            self.seed,
        );

        // Held-out accuracy; fall back to the training split when
        // stratification could not hold anything out.
        let eval_idx: &[usize] = if test_idx.is_empty() { &train_idx } else { &test_idx };
        if test_idx.is_empty() {
            warn!("no held-out split possible; reporting training-set accuracy");
        }
        let correct = eval_idx
            .iter()
            .filter(|&&i| forest.predict(&x[i]) == y[i])
            .count();
        let accuracy = correct as f32 / eval_idx.len() as f32;

        let state = TrainedState {
            labels: labels.clone(),
            extractor,
            forest,
            accuracy,
        };

        // Persist first, swap second: a crash between the two leaves a
        // usable artifact on disk and the old model in memory.
        let artifact = ModelArtifact {
            version: ARTIFACT_VERSION,
            feature_dim: self.feature_dim,
            state,
        };
        write_json_atomic(&self.artifact_path, &artifact)?;

        info!(
            documents = documents.len(),
            classes = labels.len(),
            accuracy,
            path = %self.artifact_path.display(),
            "trained outcome classifier"
        );

        *self.state.write().expect("classifier lock poisoned") = Some(Arc::new(artifact.state));

        Ok(TrainingReport {
            documents: documents.len(),
            classes: labels,
            test_size: test_idx.len(),
            accuracy,
        })
    }

    /// Predict the outcome of a case description.
    pub fn predict(&self, description: &str, case_type: Option<&str>) -> Result<Prediction> {
        let state = self.snapshot().ok_or(PipelineError::NotTrained)?;

        let features = state.extractor.transform_case(description, case_type)?;
        let probs = state.forest.predict_proba(&features);

        let mut best = 0;
        for (i, &p) in probs.iter().enumerate() {
            if p > probs[best] {
                best = i;
            }
        }

        let mut ranked: Vec<(usize, f32)> = state
            .forest
            .importances()
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, v)| v > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(TOP_FEATURES);

        Ok(Prediction {
            outcome: state.labels[best].clone(),
            confidence: probs[best],
            probabilities: state
                .labels
                .iter()
                .cloned()
                .zip(probs.iter().copied())
                .collect(),
            top_features: ranked,
        })
    }

    /// Recompute labels and features for `documents` and report accuracy
    /// and mean confidence against the current model.
    pub fn evaluate(&self, documents: &[Document]) -> Result<EvaluationReport> {
        let state = self.snapshot().ok_or(PipelineError::NotTrained)?;

        let x = state.extractor.transform(documents)?;
        let outcomes: Vec<&str> = documents
            .iter()
            .map(|d| extract_outcome(&d.full_text))
            .collect();

        let mut correct = 0usize;
        let mut confidence_sum = 0.0f32;
        let mut distribution: Vec<(String, usize)> = Vec::new();

        for (row, outcome) in x.iter().zip(&outcomes) {
            let probs = state.forest.predict_proba(row);
            let pred = state.forest.predict(row);
            confidence_sum += probs[pred];

            if state.labels.get(pred).map(String::as_str) == Some(*outcome) {
                correct += 1;
            }

            match distribution.iter_mut().find(|(l, _)| l.as_str() == *outcome) {
                Some((_, n)) => *n += 1,
                None => distribution.push((outcome.to_string(), 1)),
            }
        }

        let samples = documents.len();
        Ok(EvaluationReport {
            samples,
            accuracy: if samples > 0 { correct as f32 / samples as f32 } else { 0.0 },
            mean_confidence: if samples > 0 { confidence_sum / samples as f32 } else { 0.0 },
            class_distribution: distribution,
        })
    }

    /// Restore the persisted artifact if present. Returns `true` when a
    /// model was loaded.
    ///
    /// Fails fast on schema drift: an unknown layout version or a shape
    /// that disagrees with itself is [`PipelineError::CorruptArtifact`],
    /// and a feature width that disagrees with the current configuration
    /// is [`PipelineError::DimensionMismatch`].
    pub fn load(&self) -> Result<bool> {
        if !self.artifact_path.exists() {
            return Ok(false);
        }

        let artifact: ModelArtifact = read_json(&self.artifact_path)?;
        if artifact.version != ARTIFACT_VERSION {
            return Err(PipelineError::CorruptArtifact(format!(
                "unsupported model artifact version {} in {}",
                artifact.version,
                self.artifact_path.display()
            )));
        }
        if artifact.feature_dim != self.feature_dim {
            return Err(PipelineError::DimensionMismatch {
                expected: self.feature_dim,
                actual: artifact.feature_dim,
            });
        }

        let mut state = artifact.state;
        if state.labels.is_empty()
            || !state.extractor.is_fitted()
            || state.forest.n_classes() != state.labels.len()
            || state.forest.n_features() != artifact.feature_dim
            || state.extractor.feature_dim() != artifact.feature_dim
        {
            return Err(PipelineError::CorruptArtifact(format!(
                "inconsistent model bundle in {}",
                self.artifact_path.display()
            )));
        }
        state.extractor.rehydrate();

        info!(
            classes = state.labels.len(),
            accuracy = state.accuracy,
            path = %self.artifact_path.display(),
            "loaded outcome classifier"
        );
        *self.state.write().expect("classifier lock poisoned") = Some(Arc::new(state));
        Ok(true)
    }

    fn snapshot(&self) -> Option<Arc<TrainedState>> {
        self.state.read().expect("classifier lock poisoned").clone()
    }
}

/// Seeded stratified split: shuffles each class separately and holds
/// out `test_fraction` of it, always keeping at least one member in the
/// training side. Single-member classes are never held out.
fn stratified_split(
    y: &[usize],
    n_classes: usize,
    test_fraction: f32,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in 0..n_classes {
        let mut members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(class as u64));
        members.shuffle(&mut rng);

        let n_test = ((members.len() as f32 * test_fraction).round() as usize)
            .min(members.len().saturating_sub(1));
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}
