//! Deterministic feature-hashing encoder.
//!
//! The default encoder when no ONNX model is available: hashes word
//! unigrams and bigrams into a fixed number of signed buckets and
//! unit-normalizes the result. Identical normalized text always maps to
//! the identical vector, which is what the retrieval tests rely on.

use std::hash::{DefaultHasher, Hash, Hasher};

use veredicto_core::Result;

use crate::encoder::{Encoder, normalize_in_place};

/// Signed feature-hashing sentence encoder.
pub struct HashingEncoder {
    dim: usize,
}

impl HashingEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn accumulate(&self, vector: &mut [f32], token: &str) {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let h = hasher.finish();

        let bucket = (h % self.dim as u64) as usize;
        // One hash bit decides the sign, which keeps unrelated tokens
        // from only ever adding constructively.
        let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

impl Encoder for HashingEncoder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for text in texts {
            let mut vector = vec![0.0f32; self.dim];
            let words: Vec<&str> = text.split_whitespace().collect();

            for word in &words {
                self.accumulate(&mut vector, word);
            }
            for pair in words.windows(2) {
                self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]));
            }

            // Empty text stays the zero vector.
            normalize_in_place(&mut vector);
            vectors.push(vector);
        }

        Ok(vectors)
    }
}
