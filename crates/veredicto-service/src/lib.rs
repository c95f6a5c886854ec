//! Pipeline composition: document ingestion, index and model lifecycle,
//! and the caller-facing query surface.

mod ingest;
mod pipeline;

pub use ingest::{IngestReport, read_documents};
pub use pipeline::{CaseAnalysis, Pipeline, PipelineStats, ReindexReport, SearchFilters};
