//! Line/byte bookkeeping shared by the parser and the chunker.

use super::Language;

/// Count of non-whitespace characters in a string slice.
pub fn non_ws_len(s: &str) -> u32 {
    s.chars().filter(|c| !c.is_whitespace()).count() as u32
}

/// Byte offset of the start of every line, plus one past-the-end entry.
/// `line_starts[i]` is the offset of 0-based line `i`.
pub fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts.push(text.len() + 1);
    starts
}

/// Slice of the text covering 0-based lines `[from, to]` inclusive.
pub fn line_span<'a>(text: &'a str, starts: &[usize], from: usize, to: usize) -> &'a str {
    let begin = starts[from.min(starts.len() - 1)];
    let end = starts[(to + 1).min(starts.len() - 1)].saturating_sub(1).min(text.len());
    &text[begin.min(end)..end]
}

/// Strip comments from a slice, for gap-adjacency measurement only.
/// Line-based: drops everything after the line marker and whole lines
/// inside block comments. Not a tokenizer; string literals containing
/// markers will be miscounted, which is acceptable for a <10-char
/// threshold check.
pub fn strip_comments(s: &str, lang: Language) -> String {
    let line_marker = lang.line_comment();
    let block = lang.block_comment();
    let mut out = String::with_capacity(s.len());
    let mut in_block = false;

    for line in s.lines() {
        let mut rest = line;
        if in_block {
            if let Some((_, close)) = block {
                if let Some(pos) = rest.find(close) {
                    rest = &rest[pos + close.len()..];
                    in_block = false;
                } else {
                    continue;
                }
            }
        }
        let mut kept = String::new();
        loop {
            let line_pos = rest.find(line_marker);
            let block_pos = block.and_then(|(open, _)| rest.find(open));
            match (line_pos, block_pos) {
                (Some(lp), Some(bp)) if lp <= bp => {
                    kept.push_str(&rest[..lp]);
                    rest = "";
                }
                (Some(lp), None) => {
                    kept.push_str(&rest[..lp]);
                    rest = "";
                }
                (_, Some(bp)) => {
                    kept.push_str(&rest[..bp]);
                    if let Some((open, close)) = block {
                        let after = &rest[bp + open.len()..];
                        if let Some(cp) = after.find(close) {
                            rest = &after[cp + close.len()..];
                        } else {
                            in_block = true;
                            rest = "";
                        }
                    } else {
                        rest = "";
                    }
                }
                (None, None) => {
                    kept.push_str(rest);
                    rest = "";
                }
            }
            if rest.is_empty() {
                break;
            }
        }
        out.push_str(&kept);
        out.push('\n');
    }
    out
}

/// Scan upward from a symbol's first line and absorb its leading
/// comment block: contiguous lines that are blank or begin with the
/// language's line or block comment marker.
///
/// Returns the new 0-based start line and the comment text, if any.
/// The scan is bounded to 20 lines; the bound is computed before the
/// loop so a moving start index can never extend it.
pub fn absorb_leading_comments(
    lines: &[&str],
    start_line: usize,
    lang: Language,
) -> (usize, Option<String>) {
    const MAX_SCAN: usize = 20;

    let line_marker = lang.line_comment();
    let block = lang.block_comment();

    let lowest = start_line.saturating_sub(MAX_SCAN);
    let mut first_comment_line: Option<usize> = None;
    let mut cursor = start_line;

    while cursor > lowest {
        cursor -= 1;
        let trimmed = lines[cursor].trim_start();
        let is_comment = trimmed.starts_with(line_marker)
            || block
                .map(|(open, close)| {
                    trimmed.starts_with(open)
                        || trimmed.ends_with(close)
                        || trimmed.starts_with('*')
                })
                .unwrap_or(false);
        if trimmed.is_empty() {
            continue;
        }
        if is_comment {
            first_comment_line = Some(cursor);
        } else {
            break;
        }
    }

    match first_comment_line {
        Some(first) => {
            let doc: String = lines[first..start_line]
                .iter()
                .map(|l| clean_comment_line(l, lang))
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            let doc = if doc.is_empty() { None } else { Some(doc) };
            (first, doc)
        }
        None => (start_line, None),
    }
}

/// Strip comment punctuation from one line of a doc block.
fn clean_comment_line(line: &str, lang: Language) -> String {
    let mut s = line.trim();
    let marker = lang.line_comment();
    // Longest prefixes first so `///` wins over `//`.
    for prefix in ["///", "//!", marker, "/**", "/*", "*/", "*"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest;
            break;
        }
    }
    s.trim_end_matches("*/").trim().to_string()
}
