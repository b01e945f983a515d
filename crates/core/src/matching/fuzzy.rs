//! Fuzzy string similarity on a 0-100 scale
//!
//! Scores are derived from normalized Levenshtein similarity. `ratio` compares
//! whole strings; `partial_ratio` slides the shorter string over the longer one
//! and keeps the best aligned window.

/// Whole-string similarity in `0..=100`. Empty input scores 0.
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    to_score(strsim::normalized_levenshtein(a, b))
}

/// Best similarity of the shorter string against every equally long window of
/// the longer string, in `0..=100`. Empty input scores 0.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == b_len {
        return ratio(a, b);
    }

    let (shorter, longer, short_len, long_len) = if a_len < b_len {
        (a, b, a_len, b_len)
    } else {
        (b, a, b_len, a_len)
    };

    let longer: Vec<char> = longer.chars().collect();
    let mut best = 0.0f64;
    for start in 0..=(long_len - short_len) {
        let window: String = longer[start..start + short_len].iter().collect();
        let score = strsim::normalized_levenshtein(shorter, &window);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }
    to_score(best)
}

fn to_score(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}
