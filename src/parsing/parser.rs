//! Single-pass file parsing.
//!
//! `SourceParser::parse` produces symbols, imports, exports, call
//! references, chunks, and diagnostics for one file. Grammar-based
//! parsing is attempted first; if the grammar is unavailable or fails,
//! the per-language regex extractor produces results with the same
//! schema (richness of metadata may degrade, chunk invariants may not).
//!
//! `parse` is a pure function of `(path, content)`, so the indexer fans it
//! out across a worker pool without coordination.

use super::chunker;
use super::grammar;
use super::regex_fallback;
use super::text::{absorb_leading_comments, line_starts};
use super::Language;
use crate::config::ChunkingConfig;
use crate::error::ParseError;
use crate::types::{CallReference, Diagnostic, Export, Import, SemanticChunk, Symbol};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw output of a grammar or regex extractor, before doc absorption
/// and chunking.
#[derive(Debug, Default)]
pub struct Extraction {
    pub symbols: Vec<Symbol>,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub calls: Vec<CallReference>,
}

/// Which extractor produced a `ParseResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserBackend {
    Grammar,
    Regex,
}

/// Everything extracted from one file in one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub language: Language,
    pub backend: ParserBackend,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
    pub calls: Vec<CallReference>,
    pub chunks: Vec<SemanticChunk>,
    /// First file-level comment, used as the file description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Stateless parser front-end. Cheap to clone; holds only chunker
/// configuration.
#[derive(Debug, Clone)]
pub struct SourceParser {
    chunking: ChunkingConfig,
}

impl SourceParser {
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self { chunking }
    }

    /// Parse one file. `rel_path` is the repo-relative path with forward
    /// slashes; it seeds chunk ids, so it must be stable across runs.
    pub fn parse(&self, rel_path: &str, content: &str) -> Result<ParseResult, ParseError> {
        let path = Path::new(rel_path);
        let language = Language::from_path(path).ok_or_else(|| ParseError::UnsupportedLanguage {
            path: path.to_path_buf(),
        })?;

        let mut diagnostics = Vec::new();
        let (mut extraction, backend) = match grammar::parse_with_grammar(language, path, content) {
            Ok(extraction) => (extraction, ParserBackend::Grammar),
            Err(err) => {
                tracing::debug!(path = rel_path, error = %err, "grammar parse failed; using regex fallback");
                diagnostics.push(Diagnostic::warning(format!(
                    "grammar parse failed ({err}); regex fallback used"
                )));
                (
                    regex_fallback::extract(language, content),
                    ParserBackend::Regex,
                )
            }
        };

        finish_symbols(&mut extraction.symbols, content, language);
        let description = file_description(content, language);

        let chunks = chunker::chunk_file(
            rel_path,
            content,
            language,
            &extraction.symbols,
            &extraction.imports,
            &extraction.exports,
            &self.chunking,
        );

        Ok(ParseResult {
            language,
            backend,
            symbols: extraction.symbols,
            imports: extraction.imports,
            exports: extraction.exports,
            calls: extraction.calls,
            chunks,
            description,
            diagnostics,
        })
    }
}

/// Sort symbols by source position and widen each span to include its
/// leading doc/comment block.
fn finish_symbols(symbols: &mut [Symbol], content: &str, language: Language) {
    symbols.sort_by_key(|s| (s.start_byte, s.end_byte));

    let lines: Vec<&str> = content.lines().collect();
    let starts = line_starts(content);

    for sym in symbols.iter_mut() {
        if sym.start_line == 0 {
            continue;
        }
        let line0 = (sym.start_line as usize - 1).min(lines.len());
        let (new_line0, doc) = absorb_leading_comments(&lines, line0, language);
        if new_line0 < line0 {
            sym.start_line = new_line0 as u32 + 1;
            sym.start_column = 0;
            sym.start_byte = starts[new_line0];
        }
        if sym.docstring.is_none() {
            sym.docstring = doc;
        }
    }
}

/// Extract the file's leading comment block, if the file opens with one.
fn file_description(content: &str, language: Language) -> Option<String> {
    let marker = language.line_comment();
    let block = language.block_comment();

    let mut collected: Vec<&str> = Vec::new();
    let mut in_block = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if in_block {
            collected.push(trimmed);
            if block.map(|(_, close)| trimmed.contains(close)).unwrap_or(false) {
                in_block = false;
            }
            continue;
        }
        if trimmed.is_empty() {
            if collected.is_empty() {
                continue;
            }
            break;
        }
        if trimmed.starts_with(marker) {
            collected.push(trimmed);
        } else if let Some((open, close)) = block {
            if trimmed.starts_with(open) {
                collected.push(trimmed);
                if !trimmed[open.len()..].contains(close) {
                    in_block = true;
                }
            } else {
                break;
            }
        } else {
            break;
        }
    }

    if collected.is_empty() {
        return None;
    }
    let text = collected
        .iter()
        .map(|l| {
            l.trim_start_matches(['/', '*', '!', '#'])
                .trim()
                .trim_end_matches("*/")
                .trim()
        })
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() { None } else { Some(text) }
}
