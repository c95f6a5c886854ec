//! Term-weighted lexical features for outcome classification.
//!
//! Per document: a fixed subset of fields (tribunal, matter, truncated
//! full text) is concatenated, normalized, TF-IDF weighted over a
//! bounded vocabulary of unigrams and bigrams, then reduced to a fixed
//! dimension by a seeded sparse random projection. The fitted vocabulary
//! and projection are classifier state — they travel inside the model
//! artifact and are never shared with the embedding path.

use std::collections::{HashMap, HashSet};

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use veredicto_core::{Document, PipelineError, Result, normalize};

/// Characters of full text that contribute to the lexical features.
const FULL_TEXT_LIMIT: usize = 1000;

/// Fitted TF-IDF vocabulary plus linear reduction.
///
/// The projection matrix is regenerated from `seed` after
/// deserialization, so the persisted artifact stays small; `rehydrate`
/// must be called before `transform` on a loaded instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureExtractor {
    vocab_size: usize,
    feature_dim: usize,
    seed: u64,
    fitted: bool,
    /// Vocabulary terms in index order.
    vocab: Vec<String>,
    /// Smoothed inverse document frequency per vocabulary index.
    idf: Vec<f32>,
    #[serde(skip)]
    vocab_index: HashMap<String, usize>,
    /// Row-major `vocab.len() × feature_dim` projection.
    #[serde(skip)]
    projection: Vec<f32>,
}

impl FeatureExtractor {
    pub fn new(vocab_size: usize, feature_dim: usize, seed: u64) -> Self {
        Self {
            vocab_size,
            feature_dim,
            seed,
            fitted: false,
            vocab: Vec::new(),
            idf: Vec::new(),
            vocab_index: HashMap::new(),
            projection: Vec::new(),
        }
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Fit the vocabulary and projection on a corpus and return its
    /// feature matrix.
    pub fn fit_transform(&mut self, documents: &[Document]) -> Result<Vec<Vec<f32>>> {
        let token_lists: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| tokenize(&document_text(doc)))
            .collect();

        // Document frequency and total count per term.
        let mut df: HashMap<&str, usize> = HashMap::new();
        let mut total: HashMap<&str, usize> = HashMap::new();
        for tokens in &token_lists {
            let mut seen: HashSet<&str> = HashSet::new();
            for t in tokens {
                *total.entry(t.as_str()).or_insert(0) += 1;
                seen.insert(t.as_str());
            }
            for t in seen {
                *df.entry(t).or_insert(0) += 1;
            }
        }

        // Bounded vocabulary: most frequent terms first, ties broken
        // lexicographically for determinism.
        let mut terms: Vec<(&str, usize)> = total.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        terms.truncate(self.vocab_size);

        let n_docs = documents.len();
        self.vocab = terms.iter().map(|(t, _)| t.to_string()).collect();
        self.idf = self
            .vocab
            .iter()
            .map(|t| {
                let d = df.get(t.as_str()).copied().unwrap_or(0);
                ((1.0 + n_docs as f32) / (1.0 + d as f32)).ln() + 1.0
            })
            .collect();
        self.fitted = true;
        self.rehydrate();

        Ok(token_lists
            .iter()
            .map(|tokens| self.project(&self.weigh(tokens)))
            .collect())
    }

    /// Feature matrix for a document set using the previously fitted
    /// vocabulary and projection.
    pub fn transform(&self, documents: &[Document]) -> Result<Vec<Vec<f32>>> {
        self.require_fitted()?;
        Ok(documents
            .iter()
            .map(|doc| {
                let tokens = tokenize(&document_text(doc));
                self.project(&self.weigh(&tokens))
            })
            .collect())
    }

    /// Feature vector for an ad hoc case description, shaped the way
    /// documents are shaped at training time.
    pub fn transform_case(&self, description: &str, case_type: Option<&str>) -> Result<Vec<f32>> {
        self.require_fitted()?;
        let text = normalize(&format!(
            "{} {}",
            case_type.unwrap_or("general"),
            truncate_chars(description, FULL_TEXT_LIMIT)
        ));
        let tokens = tokenize(&text);
        Ok(self.project(&self.weigh(&tokens)))
    }

    /// Rebuild the derived state (term lookup, projection matrix) after
    /// deserialization.
    pub fn rehydrate(&mut self) {
        self.vocab_index = self
            .vocab
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        self.projection = sparse_projection(self.seed, self.vocab.len(), self.feature_dim);
    }

    fn require_fitted(&self) -> Result<()> {
        if !self.fitted {
            return Err(PipelineError::NotTrained);
        }
        Ok(())
    }

    /// L2-normalized TF-IDF weights over the fitted vocabulary, sparse.
    fn weigh(&self, tokens: &[String]) -> Vec<(usize, f32)> {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for t in tokens {
            if let Some(&i) = self.vocab_index.get(t.as_str()) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f32)> = counts
            .into_iter()
            .map(|(i, tf)| (i, tf * self.idf[i]))
            .collect();
        entries.sort_by_key(|&(i, _)| i);

        let norm: f32 = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut entries {
                *w /= norm;
            }
        }
        entries
    }

    /// Apply the linear reduction to a sparse TF-IDF vector.
    fn project(&self, entries: &[(usize, f32)]) -> Vec<f32> {
        let mut out = vec![0.0f32; self.feature_dim];
        for &(i, w) in entries {
            let row = &self.projection[i * self.feature_dim..(i + 1) * self.feature_dim];
            for (o, &p) in out.iter_mut().zip(row) {
                *o += w * p;
            }
        }
        out
    }
}

/// Seeded sparse random projection (±sqrt(3/d) with density 1/3).
fn sparse_projection(seed: u64, in_dim: usize, out_dim: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let scale = (3.0 / out_dim as f32).sqrt();
    (0..in_dim * out_dim)
        .map(|_| match rng.gen_range(0..6u8) {
            0 => scale,
            1 => -scale,
            _ => 0.0,
        })
        .collect()
}

/// Concatenated training-relevant fields, normalized.
fn document_text(doc: &Document) -> String {
    normalize(&format!(
        "{} {} {}",
        doc.tribunal,
        doc.matter,
        truncate_chars(&doc.full_text, FULL_TEXT_LIMIT)
    ))
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Word unigrams and bigrams over whitespace-split normalized text.
fn tokenize(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut tokens: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    for pair in words.windows(2) {
        tokens.push(format!("{} {}", pair[0], pair[1]));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn doc(matter: &str, text: &str) -> Document {
        Document {
            tribunal: "Juzgado Penal 1".into(),
            date: NaiveDate::from_ymd_opt(2021, 3, 15).unwrap(),
            matter: matter.into(),
            parties: "A c/ B".into(),
            docket_id: "EXP-1".into(),
            full_text: text.into(),
            source_url: String::new(),
        }
    }

    fn corpus() -> Vec<Document> {
        vec![
            doc("penal", "el tribunal condena al acusado por estafa"),
            doc("civil", "se rechaza la demanda por falta de pruebas"),
            doc("penal", "se absuelve al imputado de todos los cargos"),
            doc("laboral", "el tribunal acepta el reclamo del trabajador"),
        ]
    }

    #[test]
    fn fit_transform_yields_fixed_dimension() {
        let mut fx = FeatureExtractor::new(500, 32, 42);
        let matrix = fx.fit_transform(&corpus()).unwrap();
        assert_eq!(matrix.len(), 4);
        assert!(matrix.iter().all(|row| row.len() == 32));
        assert!(fx.is_fitted());
    }

    #[test]
    fn transform_before_fit_is_not_trained() {
        let fx = FeatureExtractor::new(500, 32, 42);
        assert!(matches!(
            fx.transform(&corpus()),
            Err(PipelineError::NotTrained)
        ));
        assert!(matches!(
            fx.transform_case("demanda", None),
            Err(PipelineError::NotTrained)
        ));
    }

    #[test]
    fn transform_matches_fit_transform_rows() {
        let docs = corpus();
        let mut fx = FeatureExtractor::new(500, 32, 42);
        let fitted = fx.fit_transform(&docs).unwrap();
        let again = fx.transform(&docs).unwrap();
        assert_eq!(fitted, again);
    }

    #[test]
    fn deterministic_across_instances_with_same_seed() {
        let docs = corpus();
        let mut a = FeatureExtractor::new(500, 32, 7);
        let mut b = FeatureExtractor::new(500, 32, 7);
        assert_eq!(a.fit_transform(&docs).unwrap(), b.fit_transform(&docs).unwrap());
    }

    #[test]
    fn vocabulary_is_bounded() {
        let mut fx = FeatureExtractor::new(3, 16, 42);
        fx.fit_transform(&corpus()).unwrap();
        assert!(fx.vocab.len() <= 3);
    }

    #[test]
    fn serde_roundtrip_after_rehydrate_matches() {
        let docs = corpus();
        let mut fx = FeatureExtractor::new(500, 32, 42);
        let original = fx.fit_transform(&docs).unwrap();

        let json = serde_json::to_string(&fx).unwrap();
        let mut restored: FeatureExtractor = serde_json::from_str(&json).unwrap();
        restored.rehydrate();

        assert_eq!(restored.transform(&docs).unwrap(), original);
        assert_eq!(
            restored.transform_case("estafa agravada", Some("penal")).unwrap(),
            fx.transform_case("estafa agravada", Some("penal")).unwrap()
        );
    }

    #[test]
    fn empty_text_maps_to_zero_vector() {
        let mut fx = FeatureExtractor::new(500, 16, 42);
        fx.fit_transform(&corpus()).unwrap();
        let v = fx.transform_case("", None).unwrap();
        assert_eq!(v.len(), 16);
        // The implied "general" case type is outside the fitted vocabulary,
        // so nothing projects.
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
