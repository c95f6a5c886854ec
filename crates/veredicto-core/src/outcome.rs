//! Heuristic outcome-label extraction.
//!
//! A bootstrap rule engine, not ground truth: it both generates training
//! labels for the classifier and tags similar-case results for display.
//! Keeping it behind this single function means it can later be replaced
//! by verified outcome labels without touching the rest of the pipeline.

/// Sentinel returned when no keyword occurs in the text.
pub const INDETERMINATE: &str = "indeterminado";

/// Outcome labels and their surface-form keywords. Declaration order is
/// the tie-break priority: on equal counts the earlier label wins.
const OUTCOME_TABLE: &[(&str, &[&str])] = &[
    ("condena", &["condena", "condenado", "condenada", "condenar"]),
    ("absolución", &["absuelve", "absuelto", "absuelta", "absolver"]),
    ("rechazo", &["rechaza", "rechazado", "rechazada", "rechazar"]),
    ("aceptación", &["acepta", "aceptado", "aceptada", "aceptar"]),
    ("archivo", &["archiva", "archivado", "archivada", "archivar"]),
    ("nulidad", &["nulo", "nula", "nulidad", "anular"]),
    ("recurso", &["recurso", "recurrido", "recurrida", "recurrir"]),
];

/// Derive a categorical outcome label from unstructured legal text.
///
/// Counts case-insensitive substring occurrences of each label's
/// keywords and returns the label with the highest count; ties go to the
/// label declared first in the table. Returns [`INDETERMINATE`] when no
/// keyword occurs. Never fails.
pub fn extract_outcome(full_text: &str) -> &'static str {
    let text = full_text.to_lowercase();

    let mut best_label = INDETERMINATE;
    let mut best_count = 0usize;

    for (label, keywords) in OUTCOME_TABLE {
        let count: usize = keywords.iter().map(|kw| count_occurrences(&text, kw)).sum();
        // Strict `>` keeps the first-declared label on ties.
        if count > best_count {
            best_count = count;
            best_label = label;
        }
    }

    best_label
}

/// Count non-overlapping substring occurrences.
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.match_indices(needle).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condena_scenario() {
        assert_eq!(extract_outcome("el tribunal condena al acusado"), "condena");
    }

    #[test]
    fn case_insensitive_matching() {
        assert_eq!(extract_outcome("EL TRIBUNAL CONDENA"), "condena");
        assert_eq!(extract_outcome("Se ABSUELVE al imputado"), "absolución");
    }

    #[test]
    fn highest_count_wins() {
        // One "condena" keyword vs. two "rechazo" keywords.
        let text = "se condena en parte pero rechaza y queda rechazado el resto";
        assert_eq!(extract_outcome(text), "rechazo");
    }

    #[test]
    fn tie_goes_to_earlier_declared_label() {
        // One keyword each for "absolución" and "recurso": absolución is
        // declared first.
        assert_eq!(extract_outcome("absuelto en el recurso"), "absolución");
        // One each for "nulidad" and "recurso": nulidad is declared first.
        assert_eq!(extract_outcome("recurso sobre acto nulo"), "nulidad");
    }

    #[test]
    fn no_keywords_is_indeterminate() {
        assert_eq!(extract_outcome("visto el expediente, resérvese"), INDETERMINATE);
        assert_eq!(extract_outcome(""), INDETERMINATE);
    }

    #[test]
    fn counts_substring_occurrences() {
        // "condenado" also contains "condena": both count toward the label,
        // so one inflected form outweighs a single keyword elsewhere.
        assert_eq!(extract_outcome("condenado pero luego absuelto"), "condena");
    }
}
