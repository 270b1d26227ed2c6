//! Text normalization and the sequence-similarity ratio used for cue
//! deduplication.
//!
//! The ratio follows the classic SequenceMatcher formulation: find the
//! longest matching block, recurse on both sides, and score
//! `2 * matches / (len(a) + len(b))`. Inputs are case-folded and stripped of
//! whitespace first so flickery OCR re-reads of the same line score high.

use std::collections::HashMap;

/// Canonical form of a (possibly multi-line) cue candidate: lines are split
/// on any line break, inner whitespace is collapsed to single spaces, empty
/// lines are dropped, and the survivors are rejoined with `\n`.
///
/// Idempotent: `normalize(normalize(t)) == normalize(t)`.
pub fn normalize(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Similarity ratio in [0, 1] between two strings, insensitive to case and
/// whitespace. 1.0 iff the folded strings are equal; 0.0 when they share no
/// common subsequence structure.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a = fold(a);
    let b = fold(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_chars(&a, &b);
    2.0 * matches as f64 / total as f64
}

fn fold(text: &str) -> Vec<char> {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Total length of the matching blocks between `a` and `b`.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    // Index positions of every character in `b` for O(1) candidate lookup.
    let mut b_positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
        b_positions.entry(c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0usize, a.len(), 0usize, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (besti, bestj, size) = longest_match(a, &b_positions, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        queue.push((alo, besti, blo, bestj));
        queue.push((besti + size, ahi, bestj + size, bhi));
    }
    matched
}

fn longest_match(
    a: &[char],
    b_positions: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut besti = alo;
    let mut bestj = blo;
    let mut best_size = 0usize;
    // run_lengths[j] is the length of the match ending at a[i], b[j].
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();

    for (i, &c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_runs: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b_positions.get(&c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = if j > 0 {
                    run_lengths.get(&(j - 1)).copied().unwrap_or(0) + 1
                } else {
                    1
                };
                next_runs.insert(j, k);
                if k > best_size {
                    besti = i + 1 - k;
                    bestj = j + 1 - k;
                    best_size = k;
                }
            }
        }
        run_lengths = next_runs;
    }

    (besti, bestj, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  Hello   world  "), "Hello world");
        assert_eq!(normalize("one\n\n  two  three\n"), "one\ntwo three");
    }

    #[test]
    fn normalize_is_idempotent() {
        for text in ["", "  a  b ", "x\n\ny\t z", "already normal"] {
            let once = normalize(text);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(ratio("Hello there", "Hello there"), 1.0);
    }

    #[test]
    fn whitespace_and_case_differences_are_ignored() {
        assert_eq!(ratio("Hello World", "helloworld"), 1.0);
        assert_eq!(ratio("A  B  C", "a b c"), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn ratio_is_symmetric() {
        let pairs = [("Hello", "Hallo"), ("subtitle", "subtle"), ("ab", "ba")];
        for (a, b) in pairs {
            assert_eq!(ratio(a, b), ratio(b, a));
        }
    }

    #[test]
    fn near_duplicates_score_high() {
        // One OCR mis-read character out of eleven.
        let value = ratio("hello world", "hello w0rld");
        assert!(value > 0.8, "got {value}");
    }

    #[test]
    fn empty_against_empty_is_one() {
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("   ", "\t\n"), 1.0);
    }

    #[test]
    fn empty_against_text_is_zero() {
        assert_eq!(ratio("", "abc"), 0.0);
    }
}
