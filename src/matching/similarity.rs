// src/matching/similarity.rs
//
// Multi-strategy fuzzy name scoring. Each strategy covers a failure mode
// of plain edit distance: partial_ratio handles embedded names
// ("Dr. Smith" vs "Smith, MD"), token_sort_ratio handles word order
// ("Miami Skin Solutions" vs "Skin Solutions Miami"). The best of the
// three is the name score used for confidence aggregation.

use crate::matching::normalize::normalize;

/// Best-of-three similarity between two raw names, scaled 0-100.
///
/// Symmetric in its inputs; a non-empty string scores 100 against itself;
/// 0 means no character or token overlap under any strategy. Empty or
/// absent names score 0 - they carry no matching signal.
pub fn best_name_score(a: &str, b: &str) -> u32 {
    let na = normalize(Some(a));
    let nb = normalize(Some(b));
    if na.is_empty() || nb.is_empty() {
        return 0;
    }
    full_ratio(&na, &nb)
        .max(partial_ratio(&na, &nb))
        .max(token_sort_ratio(&na, &nb))
}

/// Edit-distance similarity over the full strings: 2M/T where M is the
/// longest common subsequence and T the combined length.
pub fn full_ratio(a: &str, b: &str) -> u32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    ratio_chars(&a_chars, &b_chars)
}

/// Highest full-ratio of the shorter string against any equal-length
/// character window of the longer string.
pub fn partial_ratio(a: &str, b: &str) -> u32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (short, long) = if a_chars.len() <= b_chars.len() {
        (&a_chars, &b_chars)
    } else {
        (&b_chars, &a_chars)
    };
    if short.is_empty() {
        return 0;
    }
    let window = short.len();
    let mut best = 0;
    for start in 0..=(long.len() - window) {
        best = best.max(ratio_chars(short, &long[start..start + window]));
        if best == 100 {
            break;
        }
    }
    best
}

/// Tokenize on whitespace, sort tokens, rejoin, then score the full strings.
pub fn token_sort_ratio(a: &str, b: &str) -> u32 {
    full_ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn ratio_chars(a: &[char], b: &[char]) -> u32 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0;
    }
    let lcs = lcs_len(a, b);
    ((2.0 * lcs as f64 / total as f64) * 100.0).round() as u32
}

/// Longest-common-subsequence length, two-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
