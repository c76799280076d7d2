// Pairwise similarity scoring. Every function here is symmetric in its
// arguments.

use crate::analysis::Fragment;
use std::collections::HashSet;

/// Weight of normalized-text similarity for method pairs
pub const METHOD_TEXT_WEIGHT: f64 = 0.7;
/// Weight of signature similarity for method pairs
pub const METHOD_SIG_WEIGHT: f64 = 0.3;

/// Template weights: text / class-set Jaccard / size ratio
pub const TEMPLATE_TEXT_WEIGHT: f64 = 0.5;
pub const TEMPLATE_CLASS_WEIGHT: f64 = 0.3;
pub const TEMPLATE_SIZE_WEIGHT: f64 = 0.2;

/// A method pair below this signature similarity is discarded outright,
/// independent of the weighted sum
pub const SIGNATURE_GATE: f64 = 0.3;

/// Combined score at or above this qualifies as a near-duplicate
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.7;
/// Scores at or above this are treated as exact and left to the bucketing
/// stage, to avoid re-reporting exact duplicates
pub const EXACT_CUTOFF: f64 = 0.99;

/// Edit-distance-based similarity of two normalized strings:
/// `1 - distance / max_length`
pub fn text_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Name similarity plus strict parameter-count/return agreement.
///
/// Returns 0 when parameter counts differ by more than one or declared
/// return types disagree.
pub fn signature_similarity(a: &Fragment, b: &Fragment) -> f64 {
    let param_diff = (a.params.len() as i64 - b.params.len() as i64).abs();
    if param_diff > 1 {
        return 0.0;
    }
    if let (Some(ra), Some(rb)) = (&a.return_type, &b.return_type) {
        if ra != rb {
            return 0.0;
        }
    }

    let name_sim = strsim::normalized_levenshtein(&a.name, &b.name);
    let param_sim = if param_diff == 0 { 1.0 } else { 0.5 };

    0.7 * name_sim + 0.3 * param_sim
}

/// Combined method-pair score. The signature gate is a hard cut, not part
/// of the weighted average.
pub fn method_similarity(a: &Fragment, b: &Fragment, norm_a: &str, norm_b: &str) -> f64 {
    let sig = signature_similarity(a, b);
    if sig < SIGNATURE_GATE {
        return 0.0;
    }
    METHOD_TEXT_WEIGHT * text_similarity(norm_a, norm_b) + METHOD_SIG_WEIGHT * sig
}

/// Jaccard similarity of two class-name sets
pub fn class_jaccard(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let set_a: HashSet<&str> = a.iter().map(|s| s.as_str()).collect();
    let set_b: HashSet<&str> = b.iter().map(|s| s.as_str()).collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Size-ratio similarity: `min / max`
pub fn size_ratio(a: usize, b: usize) -> f64 {
    if a == 0 && b == 0 {
        return 1.0;
    }
    let min = a.min(b) as f64;
    let max = a.max(b) as f64;
    min / max
}

/// Combined template-pair score
pub fn template_similarity(a: &Fragment, b: &Fragment, norm_a: &str, norm_b: &str) -> f64 {
    TEMPLATE_TEXT_WEIGHT * text_similarity(norm_a, norm_b)
        + TEMPLATE_CLASS_WEIGHT * class_jaccard(&a.classes, &b.classes)
        + TEMPLATE_SIZE_WEIGHT * size_ratio(a.byte_len, b.byte_len)
}

/// Style rules compare on normalized property lists alone
pub fn style_similarity(norm_a: &str, norm_b: &str) -> f64 {
    text_similarity(norm_a, norm_b)
}
