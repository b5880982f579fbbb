use strsim::{jaro_winkler, normalized_levenshtein};

/// Minimum score for a title to be treated as the same paper as an indexed file.
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// Scores how alike two strings are, from 0.0 (nothing shared) to 1.0 (identical).
pub trait Similarity {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Ratcliff/Obershelp "matching blocks" ratio: `2 * matched / total` characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceRatio;

impl Similarity for SequenceRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * matched_chars(&a, &b) as f64 / total as f64
    }
}

/// Total size of the matching blocks found by repeatedly taking the longest
/// common substring and recursing on both sides of it.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]`; the earliest one in
/// `a` (then in `b`) wins among equally long runs.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            curr[col] = if a[i] == b[j] { prev[col - 1] + 1 } else { 0 };
            if curr[col] > best_size {
                best_size = curr[col];
                best_i = i + 1 - best_size;
                best_j = j + 1 - best_size;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    (best_i, best_j, best_size)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizedLevenshtein;

impl Similarity for NormalizedLevenshtein {
    fn score(&self, a: &str, b: &str) -> f64 {
        normalized_levenshtein(a, b)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JaroWinkler;

impl Similarity for JaroWinkler {
    fn score(&self, a: &str, b: &str) -> f64 {
        jaro_winkler(a, b)
    }
}

/// Resolves free-text titles to the best indexed key above a fixed threshold.
pub struct TitleResolver<S: Similarity = SequenceRatio> {
    similarity: S,
    threshold: f64,
}

impl Default for TitleResolver<SequenceRatio> {
    fn default() -> Self {
        Self::new(SequenceRatio)
    }
}

impl<S: Similarity> TitleResolver<S> {
    pub fn new(similarity: S) -> Self {
        Self {
            similarity,
            threshold: SIMILARITY_THRESHOLD,
        }
    }

    /// Picks the highest scoring candidate for `title`. Returns `None` when even
    /// the best one is below the threshold.
    ///
    /// Among equal scores the first candidate in iteration order wins, which for
    /// a [`TitleIndex`](crate::layers::index::TitleIndex) is the smallest key.
    /// Python's `difflib.get_close_matches` would pick the largest key instead.
    pub fn resolve<'a>(
        &self,
        title: &str,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> Option<(&'a str, f64)> {
        let target = title.trim().to_lowercase();
        let mut best: Option<(&'a str, f64)> = None;
        for candidate in candidates {
            let score = self.similarity.score(&target, candidate);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((candidate, score));
            }
        }

        match best {
            Some((key, score)) if score >= self.threshold => {
                tracing::debug!("Matched '{}' to '{}' (score {:.3})", title, key, score);
                Some((key, score))
            }
            Some((key, score)) => {
                tracing::debug!(
                    "Closest to '{}' is '{}' (score {:.3}), below threshold",
                    title,
                    key,
                    score
                );
                None
            }
            None => None,
        }
    }
}
