//! Grammar-backed parsing.
//!
//! Grammars are a runtime capability: loads are memoized in a
//! process-wide registry and bounded by a hard deadline. A grammar that
//! fails or times out is marked unavailable for the remainder of the
//! process and the caller falls back to the regex extractor.
//!
//! The registry and the cache-directory lock are the only process-wide
//! singletons in the crate; both have explicit init and teardown.

mod go;
mod python;
mod rust_lang;
mod typescript;

use super::parser::Extraction;
use super::Language;
use crate::error::ParseError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Which compiled-in grammar to use for a file. TSX needs its own
/// grammar variant; everything else maps 1:1 from [`Language`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarId {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
    Rust,
    Go,
}

impl GrammarId {
    pub fn for_file(lang: Language, path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match lang {
            Language::TypeScript if ext == "tsx" => GrammarId::Tsx,
            Language::TypeScript => GrammarId::TypeScript,
            Language::JavaScript => GrammarId::JavaScript,
            Language::Python => GrammarId::Python,
            Language::Rust => GrammarId::Rust,
            Language::Go => GrammarId::Go,
        }
    }

    fn label(self) -> &'static str {
        match self {
            GrammarId::TypeScript => "typescript",
            GrammarId::Tsx => "tsx",
            GrammarId::JavaScript => "javascript",
            GrammarId::Python => "python",
            GrammarId::Rust => "rust",
            GrammarId::Go => "go",
        }
    }

    fn load(self) -> tree_sitter::Language {
        match self {
            GrammarId::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            GrammarId::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            GrammarId::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            GrammarId::Python => tree_sitter_python::LANGUAGE.into(),
            GrammarId::Rust => tree_sitter_rust::LANGUAGE.into(),
            GrammarId::Go => tree_sitter_go::LANGUAGE.into(),
        }
    }
}

struct Registry {
    timeout: Duration,
    /// `None` marks a grammar that failed or timed out; it is never
    /// retried within this process.
    loaded: HashMap<GrammarId, Option<tree_sitter::Language>>,
}

static REGISTRY: Mutex<Option<Registry>> = Mutex::new(None);

/// Initialize the grammar registry. Later calls adjust the timeout but
/// keep memoized grammars.
pub fn init(timeout: Duration) {
    let mut guard = REGISTRY.lock();
    match guard.as_mut() {
        Some(reg) => reg.timeout = timeout,
        None => {
            *guard = Some(Registry {
                timeout,
                loaded: HashMap::new(),
            });
        }
    }
}

/// Drop all memoized grammars. Mainly for tests.
pub fn teardown() {
    *REGISTRY.lock() = None;
}

/// Fetch a grammar, loading and memoizing it on first use.
pub fn acquire(id: GrammarId) -> Result<tree_sitter::Language, ParseError> {
    let mut guard = REGISTRY.lock();
    let reg = guard.get_or_insert_with(|| Registry {
        timeout: Duration::from_secs(10),
        loaded: HashMap::new(),
    });

    if let Some(entry) = reg.loaded.get(&id) {
        return match entry {
            Some(lang) => Ok(lang.clone()),
            None => Err(ParseError::GrammarUnavailable {
                language: id.label().to_string(),
                reason: "previously failed to load".to_string(),
            }),
        };
    }

    let loaded = load_with_deadline(id, reg.timeout);
    reg.loaded.insert(id, loaded.clone());
    match loaded {
        Some(lang) => Ok(lang),
        None => Err(ParseError::GrammarUnavailable {
            language: id.label().to_string(),
            reason: format!("load exceeded {} ms", reg.timeout.as_millis()),
        }),
    }
}

/// Run the grammar constructor on a helper thread and give up at the
/// deadline. A timed-out load leaks its thread; that is the price of a
/// hard bound on a call we do not control.
fn load_with_deadline(id: GrammarId, timeout: Duration) -> Option<tree_sitter::Language> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    std::thread::Builder::new()
        .name(format!("grammar-load-{}", id.label()))
        .spawn(move || {
            let _ = tx.send(id.load());
        })
        .ok()?;
    match rx.recv_timeout(timeout) {
        Ok(lang) => Some(lang),
        Err(_) => {
            tracing::warn!(grammar = id.label(), "grammar load timed out; marking unavailable");
            None
        }
    }
}

/// Parse with the grammar for `lang` and extract symbols, imports,
/// exports, and call references.
pub fn parse_with_grammar(
    lang: Language,
    path: &Path,
    content: &str,
) -> Result<Extraction, ParseError> {
    let id = GrammarId::for_file(lang, path);
    let grammar = acquire(id)?;

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| ParseError::GrammarUnavailable {
            language: id.label().to_string(),
            reason: e.to_string(),
        })?;

    let tree = parser.parse(content, None).ok_or_else(|| ParseError::Failed {
        path: path.to_path_buf(),
        reason: "tree-sitter returned no tree".to_string(),
    })?;

    let root = tree.root_node();
    let extraction = match lang {
        Language::TypeScript | Language::JavaScript => typescript::extract(root, content),
        Language::Python => python::extract(root, content),
        Language::Rust => rust_lang::extract(root, content),
        Language::Go => go::extract(root, content),
    };
    Ok(extraction)
}

/// Maximum recursion depth for AST traversal to prevent stack overflow
/// on pathological nesting. Subtrees below the limit are skipped.
pub(crate) const MAX_AST_DEPTH: usize = 500;

pub(crate) fn depth_ok(depth: usize, node: tree_sitter::Node) -> bool {
    if depth > MAX_AST_DEPTH {
        tracing::warn!(
            line = node.start_position().row + 1,
            "maximum AST depth exceeded; skipping subtree"
        );
        return false;
    }
    true
}

/// Text of a node, empty on invalid UTF-8 boundaries.
pub(crate) fn node_text<'a>(node: tree_sitter::Node, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

/// 1-based line/0-based column span of a node.
pub(crate) fn node_span(node: tree_sitter::Node) -> (u32, u32, u32, u32) {
    let start = node.start_position();
    let end = node.end_position();
    (
        start.row as u32 + 1,
        start.column as u32,
        end.row as u32 + 1,
        end.column as u32,
    )
}
