// src/process/similarity.rs

use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

/// Closeness of two normalized strings, 0.0 (unrelated) to 1.0 (identical).
pub trait SimilarityStrategy: Send + Sync {
    fn ratio(&self, a: &str, b: &str) -> f64;

    /// Cheap ceiling on `ratio(a, b)`, used to skip the full comparison when
    /// the threshold is out of reach.
    fn upper_bound(&self, _a: &str, _b: &str) -> f64 {
        1.0
    }

    /// Name for logging.
    fn name(&self) -> &'static str;
}

/// Ratcliff/Obershelp "gestalt" ratio: `2 * M / T`, where `M` counts chars in
/// recursively found longest common blocks and `T` is the combined length.
///
/// Each block search is O(n * m) in chars, so long complaint texts are costly;
/// `upper_bound` lets callers skip pairs whose lengths alone rule out a match.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceRatio;

impl SimilarityStrategy for SequenceRatio {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 1.0;
        }
        (2 * matching_chars(&a, &b)) as f64 / total as f64
    }

    /// Every char of the shorter string matching.
    fn upper_bound(&self, a: &str, b: &str) -> f64 {
        length_bound(a, b, |short, total| 2.0 * short / total)
    }

    fn name(&self) -> &'static str {
        "sequence"
    }
}

/// Normalized Levenshtein distance turned into a similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinRatio;

impl SimilarityStrategy for LevenshteinRatio {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        normalized_levenshtein(a, b)
    }

    /// At least the length difference in edits.
    fn upper_bound(&self, a: &str, b: &str) -> f64 {
        length_bound(a, b, |short, total| 1.0 - (total - 2.0 * short) / (total - short))
    }

    fn name(&self) -> &'static str {
        "levenshtein"
    }
}

/// Config-facing selector for a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityKind {
    #[default]
    Sequence,
    Levenshtein,
}

impl SimilarityKind {
    pub fn strategy(self) -> Box<dyn SimilarityStrategy> {
        match self {
            SimilarityKind::Sequence => Box::new(SequenceRatio),
            SimilarityKind::Levenshtein => Box::new(LevenshteinRatio),
        }
    }
}

/// `bound(shorter_len, combined_len)` in chars; 1.0 when both are empty.
fn length_bound(a: &str, b: &str, bound: impl Fn(f64, f64) -> f64) -> f64 {
    let (la, lb) = (a.chars().count(), b.chars().count());
    if la + lb == 0 {
        return 1.0;
    }
    bound(la.min(lb) as f64, (la + lb) as f64)
}

/// Total size of the matching blocks between `a` and `b`.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(&a[alo..ahi], &b[blo..bhi]);
        if k == 0 {
            continue;
        }
        matched += k;
        let (i, j) = (alo + i, blo + j);
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common substring as `(start_in_a, start_in_b, len)`; ties go to the
/// earliest start in `a`, then in `b`.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            let k = cur[j + 1];
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}
