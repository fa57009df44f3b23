//! Code-aware tokenization for the sparse index.
//!
//! Splits on non-alphanumeric characters, then breaks identifiers at
//! underscore/hyphen (already non-alphanumeric), camel-case humps
//! (`XMLParser` -> `XML`, `Parser`; `getUserName` -> `get`, `User`,
//! `Name`), and letter/digit boundaries. Output is lowercase, tokens
//! shorter than two chars and stop words dropped. Deterministic: output
//! order equals input lexical order.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Common English words plus code keywords that carry no signal.
const STOP_WORDS: &[&str] = &[
    // English
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "in",
    "into", "is", "it", "its", "of", "on", "or", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "were", "will", "with", "you", "not", "no", "can", "do",
    // Code
    "var", "let", "const", "function", "return", "if", "else", "import", "export", "class",
    "def", "fn", "pub", "use", "new", "while", "switch", "case", "break", "continue", "try",
    "catch", "throw", "async", "await", "static", "void", "null", "none", "true", "false",
    "self", "super", "public", "private", "protected", "interface", "type", "enum", "struct",
    "impl", "mod", "package", "func", "go", "end",
];

static STOP_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Tokenize text for indexing or querying.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for run in text.split(|c: char| !c.is_alphanumeric()) {
        if run.is_empty() {
            continue;
        }
        for piece in split_identifier(run) {
            let lowered = piece.to_lowercase();
            if lowered.len() < 2 || STOP_SET.contains(lowered.as_str()) {
                continue;
            }
            tokens.push(lowered);
        }
    }
    tokens
}

/// Break one alphanumeric run at camel humps and letter/digit
/// boundaries.
fn split_identifier(run: &str) -> Vec<&str> {
    let chars: Vec<char> = run.chars().collect();
    let mut boundaries = vec![0usize];

    for i in 1..chars.len() {
        let prev = chars[i - 1];
        let cur = chars[i];
        let camel = prev.is_lowercase() && cur.is_uppercase();
        // Acronym end: "XMLParser" breaks between L and P.
        let acronym_end = prev.is_uppercase()
            && cur.is_uppercase()
            && chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
        let letter_digit =
            prev.is_alphabetic() != cur.is_alphabetic();
        if camel || acronym_end || letter_digit {
            boundaries.push(i);
        }
    }
    boundaries.push(chars.len());

    let mut pieces = Vec::new();
    let byte_offsets: Vec<usize> = {
        let mut offsets = Vec::with_capacity(chars.len() + 1);
        let mut acc = 0;
        for c in &chars {
            offsets.push(acc);
            acc += c.len_utf8();
        }
        offsets.push(acc);
        offsets
    };
    for pair in boundaries.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        if from < to {
            pieces.push(&run[byte_offsets[from]..byte_offsets[to]]);
        }
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_camel_case() {
        assert_eq!(tokenize("getUserName"), vec!["get", "user", "name"]);
    }

    #[test]
    fn splits_acronym_prefix() {
        assert_eq!(tokenize("XMLParser"), vec!["xml", "parser"]);
    }

    #[test]
    fn splits_snake_and_kebab() {
        assert_eq!(tokenize("parse_file_index"), vec!["parse", "file", "index"]);
        assert_eq!(tokenize("parse-file-index"), vec!["parse", "file", "index"]);
    }

    #[test]
    fn splits_letter_digit_boundaries() {
        assert_eq!(tokenize("sha256sum"), vec!["sha", "256", "sum"]);
        assert_eq!(tokenize("utf8"), vec!["utf"]);
    }

    #[test]
    fn drops_stop_words_and_short_tokens() {
        assert_eq!(
            tokenize("export const x = authenticate(a)"),
            vec!["authenticate"]
        );
    }

    #[test]
    fn output_is_lowercase_in_lexical_order() {
        let tokens = tokenize("AuthService calls TokenStore");
        assert_eq!(tokens, vec!["auth", "service", "calls", "token", "store"]);
    }

    #[test]
    fn deterministic_under_repetition() {
        let text = "retryConnection backoff_delay retryConnection";
        assert_eq!(tokenize(text), tokenize(text));
    }
}
