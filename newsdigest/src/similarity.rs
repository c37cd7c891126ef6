use std::collections::HashSet;

/// Lowercase, drop punctuation and collapse whitespace.
/// Word characters are alphanumerics (any script) and `_`.
pub fn normalize_text(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaccard similarity of the word sets of two texts, in [0, 1].
/// Two texts without any words score 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    normalized_similarity(&a, &b)
}

/// Same as [`similarity`] for texts already passed through [`normalize_text`]
pub(crate) fn normalized_similarity(a: &str, b: &str) -> f64 {
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();

    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();

    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization() {
        assert_eq!(normalize_text("  Breaking:  Market\tCrashes, TODAY! "), "breaking market crashes today");
        assert_eq!(normalize_text("Путин — заявил"), "путин заявил");
        assert_eq!(normalize_text("snake_case stays"), "snake_case stays");
    }

    #[test]
    fn identical_texts_score_one() {
        assert_eq!(similarity("Market crashes today", "Market crashes today"), 1.0);
        assert_eq!(similarity("Breaking: Market Crashes Today", "Breaking Market Crashes Today"), 1.0);
    }

    #[test]
    fn symmetric() {
        let pairs = [
            ("the quick brown fox", "the lazy brown dog"),
            ("a b c", "c d"),
            ("", "something"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("!!!", "  "), 0.0);
        assert_eq!(similarity("", "word"), 0.0);
    }

    #[test]
    fn partial_overlap() {
        // 4 shared words out of 5 distinct
        assert_eq!(similarity("a b c d e", "a b c d"), 0.8);
        // repeated words count once
        assert_eq!(similarity("x x y", "x y y"), 1.0);
        assert_eq!(similarity("one two", "three four"), 0.0);
    }
}
