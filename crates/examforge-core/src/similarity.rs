//! Text closeness scoring for near-duplicate detection.
//!
//! When both items carry precomputed embedding vectors, cosine similarity
//! over those vectors takes precedence. Otherwise a lexical blend of
//! word-level and bigram Jaccard similarity is used; the bigram component
//! carries more weight because phrase-level overlap is the most common
//! near-duplicate pattern in generated or lightly-edited items.

use std::collections::HashSet;

/// Reject bank candidates at or above this similarity to registered text.
pub const BANK_DEDUP_THRESHOLD: f64 = 0.70;

/// Reject generated candidates at or above this similarity. Slightly looser
/// than the bank threshold: rotated concept/operation intents already force
/// lexical variation, and generated stems share structural templates.
pub const GENERATED_DEDUP_THRESHOLD: f64 = 0.75;

const WORD_WEIGHT: f64 = 0.4;
const BIGRAM_WEIGHT: f64 = 0.6;

/// Normalized token stream: case-folded, punctuation-stripped, tokens of
/// length > 3 only.
fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 3)
        .map(|t| t.to_lowercase())
        .collect()
}

fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

fn bigram_jaccard(a: &[String], b: &[String]) -> f64 {
    let pairs = |ts: &[String]| -> HashSet<(String, String)> {
        ts.windows(2)
            .map(|w| (w[0].clone(), w[1].clone()))
            .collect()
    };
    let pa = pairs(a);
    let pb = pairs(b);
    if pa.is_empty() || pb.is_empty() {
        return 0.0;
    }
    let intersection = pa.intersection(&pb).count();
    let union = pa.len() + pb.len() - intersection;
    intersection as f64 / union as f64
}

/// Lexical similarity in [0, 1]. Symmetric. Degenerate inputs (empty token
/// stream after normalization) yield 0, not an error.
pub fn similarity(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let sa: HashSet<&str> = ta.iter().map(String::as_str).collect();
    let sb: HashSet<&str> = tb.iter().map(String::as_str).collect();
    let word = jaccard(&sa, &sb);
    let bigram = bigram_jaccard(&ta, &tb);

    WORD_WEIGHT * word + BIGRAM_WEIGHT * bigram
}

/// Cosine similarity over embedding vectors, clamped to [0, 1].
///
/// Mismatched lengths and zero-magnitude vectors yield 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        na += f64::from(*x) * f64::from(*x);
        nb += f64::from(*y) * f64::from(*y);
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(0.0, 1.0)
}

/// Full similarity contract: embedding cosine when both vectors are
/// present, lexical blend otherwise.
pub fn item_similarity(
    a: &str,
    b: &str,
    embedding_a: Option<&[f32]>,
    embedding_b: Option<&[f32]>,
) -> f64 {
    match (embedding_a, embedding_b) {
        (Some(ea), Some(eb)) => cosine(ea, eb),
        _ => similarity(a, b),
    }
}

/// Normalized text signature used for near-duplicate bookkeeping.
pub fn fingerprint(text: &str) -> String {
    tokens(text).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_scores_one() {
        let s = similarity(
            "Explain the difference between processes and threads",
            "Explain the difference between processes and threads",
        );
        assert!((s - 1.0).abs() < f64::EPSILON, "expected 1.0, got {s}");
    }

    #[test]
    fn unrelated_text_scores_low() {
        let s = similarity(
            "Explain the difference between processes and threads",
            "Calculate the derivative of a polynomial function",
        );
        assert!(s < 0.2, "expected near 0, got {s}");
    }

    #[test]
    fn paraphrase_scores_between() {
        let s = similarity(
            "Explain the difference between processes and threads in an operating system",
            "Describe the difference between processes and threads inside an operating system",
        );
        assert!(s > 0.4 && s < 1.0, "expected mid-range, got {s}");
    }

    #[test]
    fn symmetric() {
        let a = "What data structure backs a breadth-first search frontier?";
        let b = "Breadth-first search uses which structure for its frontier?";
        assert_eq!(similarity(a, b).to_bits(), similarity(b, a).to_bits());
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("a an it", "of to"), 0.0); // all tokens <= 3 chars
        assert_eq!(similarity("", "meaningful question text"), 0.0);
    }

    #[test]
    fn bounded_in_unit_interval() {
        let pairs = [
            ("one two three four", "four three two one"),
            ("completely different words here", "another unrelated sentence entirely"),
            ("repeated repeated repeated", "repeated repeated repeated"),
        ];
        for (a, b) in pairs {
            let s = similarity(a, b);
            assert!((0.0..=1.0).contains(&s), "{s} out of range for ({a}, {b})");
        }
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert_eq!(cosine(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        // Negative cosine clamps to zero rather than going out of range.
        assert_eq!(cosine(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert_eq!(cosine(&[], &[]), 0.0);
        assert_eq!(cosine(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn embeddings_take_precedence() {
        let a = "totally different text about databases";
        let b = "some other sentence about compilers";
        let e = vec![0.6f32, 0.8];
        let s = item_similarity(a, b, Some(&e), Some(&e));
        assert!((s - 1.0).abs() < 1e-9);
        // One side missing falls back to the lexical blend.
        let s = item_similarity(a, b, Some(&e), None);
        assert!(s < 0.5);
    }

    #[test]
    fn fingerprint_normalizes() {
        assert_eq!(
            fingerprint("What is a B-Tree?  "),
            fingerprint("what IS a b-tree")
        );
    }
}
