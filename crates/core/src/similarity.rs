//! Character-level similarity ratio.
//!
//! The ratio is `2M / T`, where `T` is the combined length of both strings and `M` is the total
//! length of the matching blocks found by repeatedly taking the longest common substring and
//! recursing on the unmatched text either side of it. Ties between equally long substrings go
//! to the one starting earliest in `a`, then earliest in `b`.

use std::collections::HashMap;

/// Returns the similarity ratio of `a` and `b` in `[0.0, 1.0]`.
///
/// Two empty strings are identical and score `1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matched_chars(&a, &b);
    2.0 * matched as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, size)`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // j2len[j] = length of the longest block ending at a[i-1], b[j]
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical_strings_score_one() {
        for s in ["", "a", "headache", "shortness of breath"] {
            assert!(approx(similarity(s, s), 1.0), "{s}");
        }
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert!(approx(similarity("abc", "xyz"), 0.0));
        assert!(approx(similarity("abc", ""), 0.0));
    }

    #[test]
    fn known_ratios() {
        // "abcd" vs "bcde": block "bcd" -> 2*3/8
        assert!(approx(similarity("abcd", "bcde"), 0.75));
        // "fever" vs "fevers": 2*5/11
        assert!(approx(similarity("fever", "fevers"), 10.0 / 11.0));
        // blocks "a" then "b" on the right side of "a"
        assert!(approx(similarity("ab", "ba"), 0.5));
    }

    #[test]
    fn recursion_collects_blocks_on_both_sides() {
        // " cough" leaves "dry"/"wet" on the left, which share nothing.
        assert!(approx(similarity("dry cough", "wet cough"), 12.0 / 18.0));
        // "ache" first, then "h" from the left halves "head"/"h".
        assert!(approx(similarity("headache", "hache"), 2.0 * 5.0 / 13.0));
    }

    #[test]
    fn ratio_is_symmetric_for_simple_inputs() {
        assert!(approx(
            similarity("nausea", "nauseous"),
            similarity("nauseous", "nausea")
        ));
    }
}
