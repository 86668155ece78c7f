//! Word-bag text comparison.
//!
//! Used to decide whether a video description mentions one of the show's
//! recurring segments, for auto-tagging.

use std::collections::HashSet;

/// Computes the Otsuka-Ochiai coefficient over the distinct words of `a`
/// and `b`. The result is in [0, 1]; two empty inputs are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let wa: HashSet<String> = words(a).into_iter().collect();
    let wb: HashSet<String> = words(b).into_iter().collect();

    if wa.is_empty() && wb.is_empty() {
        return 1.0;
    }
    if wa.is_empty() || wb.is_empty() {
        return 0.0;
    }

    let common = wa.intersection(&wb).count() as f64;
    common / ((wa.len() * wb.len()) as f64).sqrt()
}

/// Reports whether `s` contains `word` as a whole word, ignoring case.
pub fn contains_word(s: &str, word: &str) -> bool {
    let needle = word.to_lowercase();
    words(s).iter().any(|w| *w == needle)
}

/// Splits `s` into lower-cased words on whitespace, trimming non-word
/// characters from both ends of each word. Punctuation-only tokens are
/// dropped.
pub fn words(s: &str) -> Vec<String> {
    s.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !(c.is_alphanumeric() || c == '_'))
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_vectors() {
        let cases: &[(&str, &str, f64)] = &[
            ("", "", 1.0),
            ("xyz", "", 0.0),
            ("", "xyz", 0.0),
            ("a b c", "d e f", 0.0),
            ("xyz", "xyz", 1.0),
            ("a b c", "c b a", 1.0),
            ("a b c", "b d f", 1.0 / 3.0),
            ("a b", "b c", 0.5),
            (
                "you are everything that is wrong with the world",
                "you are everything wrong",
                2.0 / 3.0,
            ),
        ];
        for (a, b, want) in cases {
            let got = similarity(a, b);
            assert_eq!(got, *want, "similarity({:?}, {:?})", a, b);
        }
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let pairs = [
            ("Tonight on the show: cheese night!", "cheese night"),
            ("a b c d", "b"),
            ("where's lie", "Where's Lie? Truth from fiction"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }

    #[test]
    fn test_similarity_ignores_case_punctuation_and_repeats() {
        assert_eq!(similarity("Cheese, NIGHT!", "cheese night"), 1.0);
        assert_eq!(similarity("cheese cheese cheese night", "night cheese"), 1.0);
        // Punctuation-only tokens count as absent.
        assert_eq!(similarity("-- ...", ""), 1.0);
        assert_eq!(similarity("-- ...", "word"), 0.0);
    }

    #[test]
    fn test_words_trims_boundaries_only() {
        assert_eq!(words("  Hello, (world)! where's "), vec!["hello", "world", "where's"]);
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("TOMORROW on @inlieuoffunshow", "tomorrow"));
        assert!(contains_word("See you tomorrow.", "Tomorrow"));
        assert!(!contains_word("tomorrows are better", "tomorrow"));
    }
}
