//! Explanation assembler: deterministic prose over an already-computed
//! prediction and its retrieved precedent. No randomness, no external
//! calls; the confidence-tier thresholds (0.8 / 0.6) and the three-case
//! cap are part of the contract under test.

use veredicto_core::{Prediction, SimilarCase};

/// Maximum number of similar cases listed in an explanation.
const MAX_CASES: usize = 3;

/// High-confidence threshold (exclusive).
const HIGH_CONFIDENCE: f32 = 0.8;
/// Moderate-confidence threshold (exclusive).
const MODERATE_CONFIDENCE: f32 = 0.6;

/// Assemble a structured, human-readable explanation of a prediction,
/// fusing its confidence with retrieved similar cases (assumed ordered
/// by descending similarity).
pub fn explain(prediction: &Prediction, similar_cases: &[SimilarCase]) -> String {
    let confidence = prediction.confidence;
    let mut parts = vec![format!(
        "Basado en el análisis del caso, se predice un resultado de **{}** con una confianza del {:.1}%.",
        prediction.outcome,
        confidence * 100.0
    )];

    if !similar_cases.is_empty() {
        parts.push("\n**Casos similares encontrados:**".to_string());
        for (i, case) in similar_cases.iter().take(MAX_CASES).enumerate() {
            parts.push(format!(
                "{}. {} - {} ({}) - Resultado: {}",
                i + 1,
                case.document.matter,
                case.document.tribunal,
                case.document.date,
                case.outcome
            ));
        }
    }

    let remark = if confidence > HIGH_CONFIDENCE {
        "\n**Alta confianza:** El modelo está muy seguro de esta predicción basándose en casos muy similares."
    } else if confidence > MODERATE_CONFIDENCE {
        "\n**Confianza moderada:** El modelo encuentra algunos casos similares pero la predicción tiene cierta incertidumbre."
    } else {
        "\n**Baja confianza:** El modelo no encuentra casos muy similares, por lo que la predicción es menos confiable."
    };
    parts.push(remark.to_string());

    parts.join("\n")
}
