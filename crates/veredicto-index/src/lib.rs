//! Text-to-vector encoders and the similarity index for case retrieval.

mod encoder;
mod hashing;
mod index;
#[cfg(feature = "onnx")]
mod onnx;

pub use encoder::{Encoder, normalize_in_place};
pub use hashing::HashingEncoder;
pub use index::{SNAPSHOT_VERSION, VectorIndex};
#[cfg(feature = "onnx")]
pub use onnx::OnnxEncoder;
