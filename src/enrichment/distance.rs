//! Damerau-Levenshtein edit distance for fuzzy title matching.
//!
//! Insertions, deletions, substitutions and transpositions of two adjacent
//! characters all cost 1. Works on Unicode scalar values, keeps three rolling
//! rows so memory stays linear in the length of the second string.

/// Edit distance between two strings.
pub fn distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let width = b.len() + 1;
    let mut before_previous = vec![0usize; width];
    let mut previous: Vec<usize> = (0..width).collect();
    let mut current = vec![0usize; width];

    for i in 1..=a.len() {
        current[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);

            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(before_previous[j - 2] + 1);
            }

            current[j] = best;
        }

        std::mem::swap(&mut before_previous, &mut previous);
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Distance between two titles, ignoring ASCII punctuation and runs of whitespace.
///
/// "Agents of S.H.I.E.L.D." and "Agents of SHIELD" compare as 0 apart from case.
pub fn title_distance(a: &str, b: &str) -> usize {
    distance(&strip_punctuation(a), &strip_punctuation(b))
}

/// Remove ASCII punctuation and collapse whitespace.
pub fn strip_punctuation(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
