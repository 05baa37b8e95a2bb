use crate::config::NormalizerOptions;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","ain","all","am","an","and","any","are","aren","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","couldn",
            "d","did","didn","do","does","doesn","doing","don","down","during",
            "each","few","for","from","further",
            "had","hadn","has","hasn","have","haven","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","isn","it","its","itself",
            "just","ll","m","ma","me","mightn","more","most","mustn","my","myself",
            "needn","no","nor","not","now",
            "o","of","off","on","once","only","or","other","our","ours","ourselves","out","over","own",
            "re","s","same","shan","she","should","shouldn","so","some","such",
            "t","than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","ve","very",
            "was","wasn","we","were","weren","what","when","where","which","while","who","whom","why","will","with","won","wouldn",
            "y","you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Fold to ASCII: NFKD-decompose and drop every non-ASCII code point, so
/// accented letters keep their base form and symbols without one disappear.
fn fold_ascii(text: &str) -> String {
    text.nfkd().filter(char::is_ascii).collect()
}

/// Normalize text into index terms with default options.
pub fn normalize(text: &str) -> Vec<String> {
    normalize_with(text, NormalizerOptions::default())
}

/// Accent-fold, lowercase, strip punctuation, split on whitespace, drop
/// stopwords (and optionally single characters), then stem.
pub fn normalize_with(text: &str, options: NormalizerOptions) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let folded = fold_ascii(text).to_lowercase();
    let cleaned = NON_WORD.replace_all(&folded, " ");
    cleaned
        .split_whitespace()
        .filter(|token| !is_stopword(token))
        .filter(|token| !options.drop_short_tokens || token.len() > 1)
        .map(|token| STEMMER.stem(token).into_owned())
        .collect()
}

/// Same as [`normalize_with`] for optional fields; `None` yields no terms.
pub fn normalize_opt(text: Option<&str>, options: NormalizerOptions) -> Vec<String> {
    text.map(|t| normalize_with(t, options)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_normalize() {
        let t = normalize("Running, runner's run!");
        assert!(t.iter().any(|w| w == "run"));
    }

    #[test]
    fn punctuation_splits_tokens() {
        assert_eq!(normalize("cotton-blend"), vec!["cotton", "blend"]);
    }

    #[test]
    fn short_tokens_are_optional() {
        let kept = normalize("small x shirt");
        assert!(kept.contains(&"x".to_string()));
        let dropped = normalize_with("small x shirt", NormalizerOptions { drop_short_tokens: true });
        assert_eq!(dropped, vec!["small", "shirt"]);
    }

    #[test]
    fn empty_and_missing_input() {
        assert!(normalize("").is_empty());
        assert!(normalize("   ").is_empty());
        assert!(normalize_opt(None, NormalizerOptions::default()).is_empty());
    }
}
