//! Embedding encoder trait.

use veredicto_core::Result;

/// Maps already-normalized text to fixed-length dense vectors.
///
/// Stateless inference over a fixed model: `dim()` is constant for the
/// lifetime of the encoder and of any index built from it. Degenerate
/// input (an empty string) must produce the zero vector rather than fail
/// the batch — one bad document must not abort unrelated documents in
/// the same call.
pub trait Encoder: Send {
    /// Embedding dimensionality.
    fn dim(&self) -> usize;

    /// Encode a batch of normalized texts, one vector per input.
    fn encode_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Encode a single normalized text.
    fn encode(&mut self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.encode_batch(&[text])?;
        Ok(vectors.pop().unwrap_or_else(|| vec![0.0; self.dim()]))
    }
}

/// L2-normalize a vector in place. Zero vectors are left untouched.
pub fn normalize_in_place(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
