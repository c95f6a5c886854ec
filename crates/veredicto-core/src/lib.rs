//! Core types, text normalization, outcome heuristics, and shared configuration.

pub mod config;
pub mod document;
pub mod error;
pub mod normalize;
pub mod outcome;
pub mod persist;
pub mod schema;

pub use config::{ForestParams, PipelineConfig};
pub use document::{Document, DocumentRef, Prediction, SimilarCase};
pub use error::{PipelineError, Result};
pub use normalize::normalize;
pub use outcome::{INDETERMINATE, extract_outcome};
