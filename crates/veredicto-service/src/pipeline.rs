//! The pipeline facade: one object owning the corpus, the vector index,
//! the encoder, and the outcome classifier.
//!
//! Concurrency contract: reads (`search`, `predict`, `explain_case`,
//! `stats`) take a shared snapshot and never block each other; mutations
//! (`reindex`, `add_documents`, `train`) serialize on one async mutex,
//! run their heavy work on a blocking thread, persist, and then swap the
//! shared snapshot in one step. Readers always observe either the old or
//! the new corpus, never a half-built one.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use veredicto_ai::{EvaluationReport, OutcomeClassifier, TrainingReport, explain};
use veredicto_core::{
    Document, DocumentRef, PipelineConfig, PipelineError, Prediction, Result, SimilarCase,
    extract_outcome, normalize,
};
use veredicto_index::{Encoder, VectorIndex};

/// Cases listed alongside a prediction in `explain_case`.
const EXPLAIN_CASES: usize = 3;

/// Over-fetch factor when a filtered search must discard hits.
const FILTER_FETCH_FACTOR: usize = 4;

/// Documents encoded per encoder-lock acquisition during batch work.
/// Bounds how long one chunk can hold the lock, so interactive queries
/// interleave with a running reindex instead of waiting out the whole
/// corpus.
const ENCODE_BATCH_SIZE: usize = 64;

/// Optional metadata constraints applied after similarity ranking.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Case-insensitive substring match on the issuing tribunal.
    pub tribunal: Option<String>,
    /// Case-insensitive substring match on the subject matter.
    pub matter: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.tribunal.is_none() && self.matter.is_none()
    }

    fn accepts(&self, doc: &Document) -> bool {
        let contains = |field: &str, needle: &Option<String>| match needle {
            Some(n) => field.to_lowercase().contains(&n.to_lowercase()),
            None => true,
        };
        contains(&doc.tribunal, &self.tribunal) && contains(&doc.matter, &self.matter)
    }
}

/// A prediction fused with its supporting precedent.
#[derive(Debug, Clone, Serialize)]
pub struct CaseAnalysis {
    pub prediction: Prediction,
    pub similar_cases: Vec<SimilarCase>,
    pub explanation: String,
}

/// Outcome of a full or incremental index build.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReindexReport {
    /// Rows in the index after the operation.
    pub indexed: usize,
}

/// Snapshot of pipeline health for operators.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub documents: usize,
    pub indexed: usize,
    pub index_ready: bool,
    pub model_trained: bool,
    pub model_accuracy: Option<f32>,
    /// Heuristic outcome distribution over the corpus.
    pub outcomes: Vec<(String, usize)>,
}

/// Corpus and index, replaced as one unit.
struct CorpusState {
    documents: Vec<Document>,
    index: VectorIndex,
}

type SharedEncoder = Arc<Mutex<Box<dyn Encoder>>>;

/// Case-intelligence pipeline over one document corpus.
pub struct Pipeline {
    config: PipelineConfig,
    encoder: SharedEncoder,
    state: RwLock<Arc<CorpusState>>,
    classifier: Arc<OutcomeClassifier>,
    /// Serializes reindex / add / train.
    mutation: AsyncMutex<()>,
}

impl Pipeline {
    /// Assemble a pipeline over `documents`, restoring persisted
    /// artifacts where they exist.
    ///
    /// A model artifact that fails validation is an error; a missing
    /// index snapshot, or one whose row count no longer matches the
    /// corpus, degrades to an empty index awaiting [`Pipeline::reindex`].
    pub fn open(
        config: PipelineConfig,
        encoder: Box<dyn Encoder>,
        documents: Vec<Document>,
    ) -> Result<Self> {
        if encoder.dim() != config.embedding_dim {
            return Err(PipelineError::DimensionMismatch {
                expected: config.embedding_dim,
                actual: encoder.dim(),
            });
        }
        std::fs::create_dir_all(config.data_dir())?;

        let classifier = OutcomeClassifier::from_config(&config);
        classifier.load()?;

        let index_path = config.index_path();
        let index = if index_path.exists() {
            match VectorIndex::load(&index_path, config.embedding_dim) {
                Ok(index) if index.len() == documents.len() => index,
                Ok(index) => {
                    warn!(
                        snapshot_rows = index.len(),
                        documents = documents.len(),
                        "index snapshot out of step with corpus; reindex required"
                    );
                    VectorIndex::new(config.embedding_dim)
                }
                Err(e) => return Err(e),
            }
        } else {
            VectorIndex::new(config.embedding_dim)
        };

        info!(
            documents = documents.len(),
            indexed = index.len(),
            model_trained = classifier.is_trained(),
            "opened pipeline"
        );

        Ok(Self {
            config,
            encoder: Arc::new(Mutex::new(encoder)),
            state: RwLock::new(Arc::new(CorpusState { documents, index })),
            classifier: Arc::new(classifier),
            mutation: AsyncMutex::new(()),
        })
    }

    /// Similarity search over the corpus.
    ///
    /// The query goes through the same normalization and encoder as the
    /// indexed documents. Filtered searches over-fetch and discard, so a
    /// tight filter can return fewer than `limit` hits.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SimilarCase>> {
        let state = self.snapshot();
        let vector = self.encode_query(query)?;

        let k = if filters.is_empty() {
            limit
        } else {
            limit.saturating_mul(FILTER_FETCH_FACTOR)
        };
        let hits = state.index.search(&vector, k)?;

        let mut results = Vec::with_capacity(limit);
        for (position, score) in hits {
            let doc = &state.documents[position];
            if !filters.accepts(doc) {
                continue;
            }
            results.push(SimilarCase {
                document: DocumentRef::new(position, doc),
                score,
                outcome: extract_outcome(&doc.full_text).to_string(),
            });
            if results.len() == limit {
                break;
            }
        }
        Ok(results)
    }

    /// Predict the outcome of a case description.
    pub fn predict(&self, description: &str, case_type: Option<&str>) -> Result<Prediction> {
        self.classifier.predict(description, case_type)
    }

    /// Predict and explain, fusing the prediction with retrieved
    /// precedent. An unindexed corpus yields an explanation without
    /// similar cases rather than an error.
    pub fn explain_case(&self, description: &str, case_type: Option<&str>) -> Result<CaseAnalysis> {
        let prediction = self.predict(description, case_type)?;

        let similar_cases =
            match self.search(description, EXPLAIN_CASES, &SearchFilters::default()) {
                Ok(cases) => cases,
                Err(PipelineError::NotReady) => Vec::new(),
                Err(e) => return Err(e),
            };

        let explanation = explain(&prediction, &similar_cases);
        Ok(CaseAnalysis {
            prediction,
            similar_cases,
            explanation,
        })
    }

    /// Evaluate the current model against the full corpus.
    pub fn evaluate(&self) -> Result<EvaluationReport> {
        let state = self.snapshot();
        self.classifier.evaluate(&state.documents)
    }

    /// Rebuild the vector index over the whole corpus, persist the
    /// snapshot, and swap it in.
    pub async fn reindex(&self) -> Result<ReindexReport> {
        let _guard = self.mutation.lock().await;
        let state = self.snapshot();
        let encoder = Arc::clone(&self.encoder);
        let dim = self.config.embedding_dim;
        let path = self.config.index_path();

        let (documents, index) =
            run_blocking(move || rebuild(&state.documents, Vec::new(), &encoder, dim, &path))
                .await?;

        let report = ReindexReport { indexed: index.len() };
        self.swap_state(CorpusState { documents, index });
        info!(indexed = report.indexed, "rebuilt case index");
        Ok(report)
    }

    /// Append documents to the corpus and index them incrementally.
    ///
    /// Falls back to a full rebuild when the index was out of step with
    /// the corpus to begin with.
    pub async fn add_documents(&self, documents: Vec<Document>) -> Result<ReindexReport> {
        let _guard = self.mutation.lock().await;
        let state = self.snapshot();
        let encoder = Arc::clone(&self.encoder);
        let dim = self.config.embedding_dim;
        let path = self.config.index_path();

        let (documents, index) = run_blocking(move || {
            if state.index.len() != state.documents.len() {
                // The snapshot was stale at open; only a full rebuild can
                // restore the position convention.
                return rebuild(&state.documents, documents, &encoder, dim, &path);
            }

            let vectors = encode_texts(&encoder, &documents)?;
            let mut index = state.index.clone();
            index.add(vectors)?;
            index.save(&path)?;

            let mut all = state.documents.clone();
            all.extend(documents);
            Ok((all, index))
        })
        .await?;

        let report = ReindexReport { indexed: index.len() };
        self.swap_state(CorpusState { documents, index });
        info!(indexed = report.indexed, "appended documents to case index");
        Ok(report)
    }

    /// Train the outcome classifier on the current corpus.
    pub async fn train(&self, test_fraction: f32) -> Result<TrainingReport> {
        let _guard = self.mutation.lock().await;
        let state = self.snapshot();
        let classifier = Arc::clone(&self.classifier);
        run_blocking(move || classifier.train(&state.documents, test_fraction)).await
    }

    /// Operational snapshot: corpus size, index and model readiness,
    /// and the heuristic outcome distribution.
    pub fn stats(&self) -> PipelineStats {
        let state = self.snapshot();

        let mut outcomes: Vec<(String, usize)> = Vec::new();
        for doc in &state.documents {
            let outcome = extract_outcome(&doc.full_text);
            match outcomes.iter_mut().find(|(l, _)| l == outcome) {
                Some((_, n)) => *n += 1,
                None => outcomes.push((outcome.to_string(), 1)),
            }
        }
        outcomes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        PipelineStats {
            documents: state.documents.len(),
            indexed: state.index.len(),
            index_ready: !state.index.is_empty(),
            model_trained: self.classifier.is_trained(),
            model_accuracy: self.classifier.accuracy(),
            outcomes,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn encode_query(&self, query: &str) -> Result<Vec<f32>> {
        let normalized = normalize(query);
        let mut encoder = self.encoder.lock().expect("encoder lock poisoned");
        encoder.encode(&normalized)
    }

    fn snapshot(&self) -> Arc<CorpusState> {
        self.state.read().expect("pipeline lock poisoned").clone()
    }

    fn swap_state(&self, next: CorpusState) {
        *self.state.write().expect("pipeline lock poisoned") = Arc::new(next);
    }
}

/// Encode, build, and persist a fresh index over `existing` + `extra`.
fn rebuild(
    existing: &[Document],
    extra: Vec<Document>,
    encoder: &SharedEncoder,
    dim: usize,
    path: &Path,
) -> Result<(Vec<Document>, VectorIndex)> {
    let mut documents = existing.to_vec();
    documents.extend(extra);

    let vectors = encode_texts(encoder, &documents)?;
    let index = VectorIndex::build(dim, vectors)?;
    index.save(path)?;
    Ok((documents, index))
}

fn encode_texts(encoder: &SharedEncoder, documents: &[Document]) -> Result<Vec<Vec<f32>>> {
    let texts: Vec<String> = documents.iter().map(|d| normalize(&d.full_text)).collect();

    // The lock is taken per chunk and dropped between chunks, so a
    // query's single-text encode slots in between them.
    let mut vectors = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(ENCODE_BATCH_SIZE) {
        let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
        let mut encoder = encoder.lock().expect("encoder lock poisoned");
        vectors.extend(encoder.encode_batch(&refs)?);
    }
    Ok(vectors)
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PipelineError::Other(format!("background task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;
    use veredicto_index::HashingEncoder;

    fn config(dir: &TempDir) -> PipelineConfig {
        let mut cfg = PipelineConfig::new(dir.path());
        cfg.embedding_dim = 64;
        cfg.feature_dim = 24;
        cfg.forest.n_trees = 25;
        cfg
    }

    fn encoder(cfg: &PipelineConfig) -> Box<dyn Encoder> {
        Box::new(HashingEncoder::new(cfg.embedding_dim))
    }

    fn doc(tribunal: &str, matter: &str, text: &str) -> Document {
        Document {
            tribunal: tribunal.into(),
            date: NaiveDate::from_ymd_opt(2023, 4, 12).unwrap(),
            matter: matter.into(),
            parties: String::new(),
            docket_id: format!("EXP-{matter}"),
            full_text: text.into(),
            source_url: String::new(),
        }
    }

    fn corpus() -> Vec<Document> {
        vec![
            doc(
                "Juzgado Civil 5",
                "daños y perjuicios",
                "se rechaza la demanda por daños derivados del accidente de tránsito",
            ),
            doc(
                "Cámara Penal",
                "estafa",
                "el tribunal condena al acusado por el delito de estafa reiterada",
            ),
            doc(
                "Juzgado Laboral 2",
                "despido",
                "se acepta el reclamo del trabajador por despido sin causa",
            ),
        ]
    }

    fn training_corpus() -> Vec<Document> {
        let mut docs = Vec::new();
        for i in 0..6 {
            docs.push(doc(
                "Cámara Penal",
                "estafa",
                &format!("el tribunal condena al acusado por el hecho {i} probado"),
            ));
            docs.push(doc(
                "Cámara Penal",
                "robo",
                &format!("se absuelve al imputado del cargo {i} por falta de pruebas"),
            ));
        }
        docs
    }

    #[tokio::test]
    async fn search_before_reindex_is_not_ready() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();

        let result = pipeline.search("estafa", 3, &SearchFilters::default());
        assert!(matches!(result, Err(PipelineError::NotReady)));
    }

    #[tokio::test]
    async fn identical_full_text_is_the_top_hit() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();
        pipeline.reindex().await.unwrap();

        let query = "el tribunal condena al acusado por el delito de estafa reiterada";
        let hits = pipeline.search(query, 3, &SearchFilters::default()).unwrap();

        assert_eq!(hits[0].document.position, 1);
        assert!((hits[0].score - 1.0).abs() < 1e-5, "score {}", hits[0].score);
        assert_eq!(hits[0].outcome, "condena");
    }

    #[tokio::test]
    async fn query_normalization_matches_document_normalization() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();
        pipeline.reindex().await.unwrap();

        // Punctuation and case differences collapse under normalization.
        let query = "EL TRIBUNAL, CONDENA AL ACUSADO... por el delito de ESTAFA reiterada!!";
        let hits = pipeline.search(query, 1, &SearchFilters::default()).unwrap();
        assert_eq!(hits[0].document.position, 1);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn filters_restrict_results_by_metadata() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();
        pipeline.reindex().await.unwrap();

        let filters = SearchFilters {
            tribunal: Some("laboral".into()),
            matter: None,
        };
        let hits = pipeline.search("reclamo del trabajador", 3, &filters).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.tribunal, "Juzgado Laboral 2");

        let none = SearchFilters {
            tribunal: Some("contencioso".into()),
            matter: None,
        };
        assert!(pipeline.search("reclamo", 3, &none).unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_documents_keeps_index_and_corpus_in_lockstep() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();
        pipeline.reindex().await.unwrap();

        let extra = vec![doc(
            "Cámara Civil",
            "contratos",
            "se declara la nulidad del contrato por vicio del consentimiento",
        )];
        let report = pipeline.add_documents(extra).await.unwrap();
        assert_eq!(report.indexed, 4);

        let stats = pipeline.stats();
        assert_eq!(stats.documents, 4);
        assert_eq!(stats.indexed, 4);

        let hits = pipeline
            .search("nulidad del contrato", 1, &SearchFilters::default())
            .unwrap();
        assert_eq!(hits[0].document.position, 3);
        assert_eq!(hits[0].outcome, "nulidad");
    }

    #[tokio::test]
    async fn add_documents_rebuilds_when_index_was_stale() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);

        // Never reindexed: index empty, corpus nonempty.
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();
        let report = pipeline
            .add_documents(vec![doc("Cámara Civil", "contratos", "se rechaza la apelación")])
            .await
            .unwrap();

        assert_eq!(report.indexed, 4);
        assert_eq!(pipeline.stats().documents, 4);
    }

    /// Records the size of every batch handed to the inner encoder.
    struct RecordingEncoder {
        inner: HashingEncoder,
        calls: Arc<Mutex<Vec<usize>>>,
    }

    impl Encoder for RecordingEncoder {
        fn dim(&self) -> usize {
            self.inner.dim()
        }

        fn encode_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(texts.len());
            self.inner.encode_batch(texts)
        }
    }

    /// Sleeps on every batch, standing in for a heavyweight model.
    struct SlowEncoder {
        inner: HashingEncoder,
        delay: std::time::Duration,
    }

    impl Encoder for SlowEncoder {
        fn dim(&self) -> usize {
            self.inner.dim()
        }

        fn encode_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            std::thread::sleep(self.delay);
            self.inner.encode_batch(texts)
        }
    }

    fn numbered_corpus(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| {
                doc(
                    "Juzgado Penal 1",
                    "estafa",
                    &format!("el tribunal condena al acusado por el hecho {i}"),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn batch_encode_takes_the_lock_per_chunk() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let enc = RecordingEncoder {
            inner: HashingEncoder::new(cfg.embedding_dim),
            calls: Arc::clone(&calls),
        };

        let pipeline = Pipeline::open(cfg.clone(), Box::new(enc), numbered_corpus(150)).unwrap();
        pipeline.reindex().await.unwrap();

        let sizes = calls.lock().unwrap().clone();
        assert!(sizes.len() >= 3, "expected chunked encoding, got {sizes:?}");
        assert!(sizes.iter().all(|&n| n <= ENCODE_BATCH_SIZE));
        assert_eq!(sizes.iter().sum::<usize>(), 150);
        assert_eq!(pipeline.stats().indexed, 150);
    }

    #[tokio::test]
    async fn interactive_search_is_not_serialized_behind_a_batch_encode() {
        use std::time::{Duration, Instant};

        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let enc = SlowEncoder {
            inner: HashingEncoder::new(cfg.embedding_dim),
            delay: Duration::from_millis(150),
        };
        let n = 10 * ENCODE_BATCH_SIZE;
        let pipeline =
            Arc::new(Pipeline::open(cfg.clone(), Box::new(enc), numbered_corpus(n)).unwrap());

        let background = Arc::clone(&pipeline);
        let reindex = tokio::spawn(async move { background.reindex().await });
        tokio::time::sleep(Duration::from_millis(300)).await;

        // Ten slow chunks are still in flight; a query's single-text
        // encode waits out at most the current chunk, never the corpus.
        let started = Instant::now();
        let result = pipeline.search("estafa reiterada", 1, &SearchFilters::default());
        let waited = started.elapsed();

        assert!(matches!(result, Err(PipelineError::NotReady)));
        assert!(
            waited < Duration::from_millis(900),
            "query blocked {waited:?} behind the batch encode"
        );

        reindex.await.unwrap().unwrap();
        assert_eq!(pipeline.stats().indexed, n);
    }

    #[tokio::test]
    async fn reopen_adopts_matching_snapshot() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);

        {
            let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();
            pipeline.reindex().await.unwrap();
        }

        let reopened = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();
        let stats = reopened.stats();
        assert!(stats.index_ready);
        assert_eq!(stats.indexed, 3);

        // No reindex needed after restart: the adopted snapshot still
        // maps positions to the right rows.
        let query = "el tribunal condena al acusado por el delito de estafa reiterada";
        let hits = reopened.search(query, 1, &SearchFilters::default()).unwrap();
        assert_eq!(hits[0].document.position, 1);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn reopen_discards_snapshot_when_corpus_changed() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);

        {
            let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();
            pipeline.reindex().await.unwrap();
        }

        // Two documents now instead of three: the snapshot no longer maps
        // positions to the right rows.
        let smaller: Vec<Document> = corpus().into_iter().take(2).collect();
        let reopened = Pipeline::open(cfg.clone(), encoder(&cfg), smaller).unwrap();
        assert!(!reopened.stats().index_ready);
        assert!(matches!(
            reopened.search("estafa", 1, &SearchFilters::default()),
            Err(PipelineError::NotReady)
        ));
    }

    #[tokio::test]
    async fn train_and_predict_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), training_corpus()).unwrap();

        let report = pipeline.train(0.2).await.unwrap();
        assert_eq!(report.documents, 12);
        assert_eq!(report.classes, vec!["absolución", "condena"]);

        let prediction = pipeline
            .predict("el tribunal condena al acusado por estafa", Some("penal"))
            .unwrap();
        assert!(report.classes.contains(&prediction.outcome));

        let eval = pipeline.evaluate().unwrap();
        assert_eq!(eval.samples, 12);
    }

    #[tokio::test]
    async fn train_gate_propagates_insufficient_data() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();

        let result = pipeline.train(0.2).await;
        assert!(matches!(
            result,
            Err(PipelineError::InsufficientData { have: 3, need: 10 })
        ));
    }

    #[tokio::test]
    async fn explain_without_index_omits_similar_cases() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), training_corpus()).unwrap();
        pipeline.train(0.2).await.unwrap();

        let analysis = pipeline
            .explain_case("se condena al imputado por robo", None)
            .unwrap();
        assert!(analysis.similar_cases.is_empty());
        assert!(!analysis.explanation.contains("Casos similares"));
    }

    #[tokio::test]
    async fn explain_with_index_lists_precedent() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), training_corpus()).unwrap();
        pipeline.reindex().await.unwrap();
        pipeline.train(0.2).await.unwrap();

        let analysis = pipeline
            .explain_case("el tribunal condena al acusado por el hecho 3 probado", None)
            .unwrap();
        assert!(!analysis.similar_cases.is_empty());
        assert!(analysis.similar_cases.len() <= 3);
        assert!(analysis.explanation.contains("Casos similares"));
        assert!(analysis
            .explanation
            .contains(&format!("**{}**", analysis.prediction.outcome)));
    }

    #[tokio::test]
    async fn predict_before_train_is_not_trained() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();
        assert!(matches!(
            pipeline.predict("demanda laboral", None),
            Err(PipelineError::NotTrained)
        ));
    }

    #[tokio::test]
    async fn stats_report_outcome_distribution() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let pipeline = Pipeline::open(cfg.clone(), encoder(&cfg), corpus()).unwrap();

        let stats = pipeline.stats();
        assert_eq!(stats.documents, 3);
        assert!(!stats.model_trained);
        let total: usize = stats.outcomes.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 3);
        assert!(stats.outcomes.iter().any(|(l, _)| l == "condena"));
    }

    #[tokio::test]
    async fn mismatched_encoder_dimension_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp);
        let result = Pipeline::open(cfg, Box::new(HashingEncoder::new(16)), corpus());
        assert!(matches!(
            result,
            Err(PipelineError::DimensionMismatch { expected: 64, actual: 16 })
        ));
    }
}
