//! ONNX Runtime sentence encoder for case retrieval.
//!
//! Mean-pooled embeddings from a sentence-transformers model (e.g.
//! all-MiniLM-L6-v2, 384 dimensions). The model directory must contain
//! `model.onnx` and `tokenizer.json`. Input texts are expected to be
//! pre-normalized by `veredicto_core::normalize`.

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use veredicto_core::{PipelineError, Result};

use crate::encoder::{Encoder, normalize_in_place};

/// Sentence encoder backed by ONNX Runtime.
pub struct OnnxEncoder {
    session: Session,
    tokenizer: Tokenizer,
    dim: usize,
}

impl OnnxEncoder {
    /// Load from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(PipelineError::Other(format!(
                "model.onnx not found in {model_dir:?}"
            )));
        }
        if !tokenizer_path.exists() {
            return Err(PipelineError::Other(format!(
                "tokenizer.json not found in {model_dir:?}"
            )));
        }

        let session = Session::builder()
            .and_then(|b| b.commit_from_file(&model_path))
            .map_err(|e| PipelineError::Other(format!("loading onnx session: {e}")))?;

        let dim = infer_dim(session.outputs()[0].dtype()).unwrap_or(384);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| PipelineError::Other(format!("load tokenizer: {e}")))?;

        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: 256,
                ..Default::default()
            }))
            .map_err(|e| PipelineError::Other(format!("set truncation: {e}")))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            ..Default::default()
        }));

        info!(dim, model = %model_path.display(), "loaded embedding model");
        Ok(Self {
            session,
            tokenizer,
            dim,
        })
    }
}

impl Encoder for OnnxEncoder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // Empty strings produce no tokens worth pooling; give them the
        // zero vector instead of letting one degenerate row fail the
        // whole batch.
        let live: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.trim().is_empty())
            .map(|(i, t)| (i, *t))
            .collect();

        let mut out = vec![vec![0.0f32; self.dim]; texts.len()];
        if live.is_empty() {
            return Ok(out);
        }

        let batch_size = live.len();
        let inputs: Vec<&str> = live.iter().map(|(_, t)| *t).collect();

        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| PipelineError::Other(format!("tokenize: {e}")))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        // Flat input tensors: [batch_size, seq_len].
        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let offset = i * seq_len;
            for (j, &id) in encoding.get_ids().iter().enumerate() {
                input_ids[offset + j] = id as i64;
            }
            for (j, &mask) in encoding.get_attention_mask().iter().enumerate() {
                attention_mask[offset + j] = mask as i64;
            }
            for (j, &tid) in encoding.get_type_ids().iter().enumerate() {
                token_type_ids[offset + j] = tid as i64;
            }
        }

        let shape = [batch_size as i64, seq_len as i64];

        let run = || -> std::result::Result<_, ort::Error> {
            let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
            let mask_tensor =
                Tensor::from_array((shape, attention_mask.clone().into_boxed_slice()))?;
            let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;

            self.session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => type_tensor,
            ])
        };
        let outputs = run().map_err(|e| PipelineError::Other(format!("onnx inference: {e}")))?;

        // Token embeddings: [batch_size, seq_len, dim].
        let (output_shape, output_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Other(format!("extract output: {e}")))?;
        let dims: &[i64] = output_shape;
        if dims.len() != 3 || dims[0] as usize != batch_size || dims[2] as usize != self.dim {
            return Err(PipelineError::Other(format!(
                "unexpected output shape {dims:?}, expected [{batch_size}, {seq_len}, {}]",
                self.dim
            )));
        }
        let actual_seq_len = dims[1] as usize;

        // Mean pooling with the attention mask, then unit-normalize.
        for (row, &(orig, _)) in live.iter().enumerate() {
            let pooled = &mut out[orig];
            let mut token_count = 0.0f32;

            for j in 0..actual_seq_len {
                let mask_val = attention_mask[row * seq_len + j] as f32;
                if mask_val > 0.0 {
                    let offset = (row * actual_seq_len + j) * self.dim;
                    for (d, p) in pooled.iter_mut().enumerate() {
                        *p += output_data[offset + d] * mask_val;
                    }
                    token_count += mask_val;
                }
            }

            if token_count > 0.0 {
                for p in pooled.iter_mut() {
                    *p /= token_count;
                }
            }
            normalize_in_place(pooled);
        }

        Ok(out)
    }
}

/// Infer the embedding dimension from the model output type.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}
