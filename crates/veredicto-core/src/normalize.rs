//! Canonicalization of raw legal text.
//!
//! One shared implementation used on both the ingest and query paths;
//! any divergence between the two silently degrades retrieval and
//! classification quality, so everything downstream calls this function
//! and nothing re-implements it.

/// Legal abbreviation expansions, applied in declaration order by
/// literal substring replacement. Longer forms precede their prefixes
/// so "arts." is not mangled by "art.".
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("arts.", "artículos"),
    ("art.", "artículo"),
    ("incs.", "incisos"),
    ("inc.", "inciso"),
    ("sra.", "señora"),
    ("sr.", "señor"),
    ("dr.", "doctor"),
];

/// Canonicalize raw legal text.
///
/// Lowercases, expands the fixed abbreviation table, strips punctuation
/// to whitespace, and collapses repeated whitespace. Pure and
/// deterministic; idempotent (`normalize(normalize(x)) == normalize(x)`)
/// because expansion targets contain no abbreviation keys and the second
/// pass finds no punctuation left to strip. Empty input yields empty
/// output.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.to_lowercase();

    for (abbr, full) in ABBREVIATIONS {
        if text.contains(abbr) {
            text = text.replace(abbr, full);
        }
    }

    // Punctuation becomes whitespace, then runs collapse to one space.
    let stripped: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
