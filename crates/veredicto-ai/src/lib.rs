//! Classification layer: term-weighted lexical features, a seeded
//! random-forest outcome classifier with durable model state, and the
//! explanation assembler.

mod classifier;
mod explain;
mod features;
mod forest;

pub use classifier::{
    ARTIFACT_VERSION, EvaluationReport, OutcomeClassifier, TrainingReport,
};
pub use explain::explain;
pub use features::FeatureExtractor;
pub use forest::RandomForest;
