//! Core data model shared by the parser, indexer, knowledge graph, and
//! retriever.
//!
//! Everything here is plain serde-serializable data. The graph and the
//! retrieval structures reference these entities by path/name only, never
//! by pointer, so a `ProjectIndex` snapshot can be persisted and reloaded
//! without fixups.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Kinds of symbols the parsers extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    #[serde(rename = "type")]
    TypeAlias,
    Enum,
    Constant,
    Variable,
    Property,
    Module,
    Namespace,
}

impl SymbolKind {
    /// Stable lowercase name, used in graph node ids and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::TypeAlias => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
            SymbolKind::Property => "property",
            SymbolKind::Module => "module",
            SymbolKind::Namespace => "namespace",
        }
    }

    /// Parse the lowercase form produced by [`SymbolKind::as_str`].
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "function" => Some(SymbolKind::Function),
            "method" => Some(SymbolKind::Method),
            "class" => Some(SymbolKind::Class),
            "interface" => Some(SymbolKind::Interface),
            "type" => Some(SymbolKind::TypeAlias),
            "enum" => Some(SymbolKind::Enum),
            "constant" => Some(SymbolKind::Constant),
            "variable" => Some(SymbolKind::Variable),
            "property" => Some(SymbolKind::Property),
            "module" => Some(SymbolKind::Module),
            "namespace" => Some(SymbolKind::Namespace),
            _ => None,
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-level visibility of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Internal,
    #[default]
    Default,
}

/// A symbol extracted from a source file.
///
/// The byte span includes the symbol's leading doc comment block (the
/// parser absorbs up to 20 contiguous comment/blank lines above the
/// declaration). Names are verbatim from source, case preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub start_byte: usize,
    pub end_byte: usize,
    pub exported: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_async: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_static: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generics: Option<String>,
    /// Name of the enclosing symbol, set for nested symbols so methods
    /// contain their class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
}

impl Symbol {
    /// Create a symbol with zeroed location fields. Location and optional
    /// metadata are attached with the builder methods below.
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            start_line: 0,
            start_column: 0,
            end_line: 0,
            end_column: 0,
            start_byte: 0,
            end_byte: 0,
            exported: false,
            visibility: Visibility::Default,
            is_async: false,
            is_static: false,
            is_abstract: false,
            parameters: Vec::new(),
            return_type: None,
            generics: None,
            parent: None,
            extends: Vec::new(),
            implements: Vec::new(),
            docstring: None,
            decorators: Vec::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_span(
        mut self,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
        start_byte: usize,
        end_byte: usize,
    ) -> Self {
        self.start_line = start_line;
        self.start_column = start_column;
        self.end_line = end_line;
        self.end_column = end_column;
        self.start_byte = start_byte;
        self.end_byte = end_byte;
        self
    }

    pub fn with_exported(mut self, exported: bool) -> Self {
        self.exported = exported;
        if exported {
            self.visibility = Visibility::Public;
        }
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_docstring(mut self, doc: impl Into<String>) -> Self {
        self.docstring = Some(doc.into());
        self
    }
}

/// How an import/export binds names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Named,
    Default,
    Namespace,
    SideEffect,
    Type,
    ReExport,
}

/// A single imported or exported name with its optional alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundName {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl BoundName {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// The name this binding is visible under locally.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// An import statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    /// Module specifier exactly as written (`./auth`, `react`, `std::fs`).
    pub source: String,
    pub kind: ImportKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<BoundName>,
    pub line: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub type_only: bool,
}

/// An export record. `source` is set for re-exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub kind: ImportKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<BoundName>,
    pub line: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub type_only: bool,
}

/// A call site observed in a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallReference {
    pub callee: String,
    /// Name of the enclosing function/method, if the call happens inside
    /// one. Module-level calls have no caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    pub line: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_method_call: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    pub arg_count: u32,
}

/// Kinds of semantic chunks the chunker emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Function,
    Class,
    Module,
    Comment,
    Mixed,
}

/// Metadata carried by every chunk for filtering and ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChunkMetadata {
    pub language: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbol_kinds: Vec<SymbolKind>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_exports: bool,
    /// True when the chunk is one part of a split oversize symbol.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_index: Option<u32>,
    /// Enclosing symbol names, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_chain: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
}

/// The unit of retrieval: a contiguous span of source code.
///
/// Chunk ids are `<path>:<symbol-or-block-label>[:<part-index>]` and are
/// stable across re-index of an unchanged file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticChunk {
    pub id: String,
    pub content: String,
    pub kind: ChunkKind,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub import_sources: Vec<String>,
    pub token_estimate: u32,
    pub non_ws_size: u32,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

/// Severity of a per-file diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A non-fatal condition observed while processing a file or a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }
}

/// Everything the index knows about one file. Replaced atomically when
/// the content hash changes, removed when the file disappears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIndex {
    /// Repo-relative path with forward slashes.
    pub path: String,
    /// SHA-256 of the file content, hex-encoded.
    pub hash: String,
    /// Lowercase language id (`typescript`, `rust`, ...).
    pub language: String,
    /// Seconds since UNIX_EPOCH of the file's mtime at index time.
    pub last_modified: u64,
    /// Size in bytes.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<Symbol>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<Export>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<SemanticChunk>,
    /// First file-level comment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Repo-relative paths of files that import this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imported_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl FileIndex {
    /// An index entry with no parse output, used when a file fails to
    /// parse but must still be tracked.
    pub fn empty(path: impl Into<String>, hash: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
            language: language.into(),
            last_modified: 0,
            size: 0,
            symbols: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            calls: Vec::new(),
            chunks: Vec::new(),
            description: None,
            imported_by: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// A resolved file-to-file dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    /// Names imported along this edge.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
}

/// Per-language aggregate counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LanguageStats {
    pub files: usize,
    pub symbols: usize,
    pub chunks: usize,
}

/// Current snapshot schema. Bump when the serialized shape changes;
/// mismatched snapshots are discarded and rebuilt.
pub const SCHEMA_VERSION: u32 = 3;

/// A complete snapshot of the indexed project.
///
/// Readers hold `Arc<ProjectIndex>`; the indexer never mutates a
/// published snapshot, it builds the next one and swaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectIndex {
    pub schema_version: u32,
    /// Strictly increasing across any index mutation.
    pub generation: u64,
    pub project_name: String,
    pub root: PathBuf,
    /// RFC 3339 timestamp of the last publication.
    pub indexed_at: String,
    pub total_files: usize,
    pub total_symbols: usize,
    pub total_chunks: usize,
    /// Keyed by repo-relative path; BTreeMap gives the lexicographic
    /// iteration order the snapshot contract requires.
    pub files: BTreeMap<String, FileIndex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_points: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub languages: BTreeMap<String, LanguageStats>,
}

impl ProjectIndex {
    pub fn empty(project_name: impl Into<String>, root: PathBuf) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generation: 0,
            project_name: project_name.into(),
            root,
            indexed_at: String::new(),
            total_files: 0,
            total_symbols: 0,
            total_chunks: 0,
            files: BTreeMap::new(),
            dependencies: Vec::new(),
            entry_points: Vec::new(),
            languages: BTreeMap::new(),
        }
    }

    /// All chunks in every file, in lexicographic file order.
    pub fn all_chunks(&self) -> impl Iterator<Item = &SemanticChunk> {
        self.files.values().flat_map(|f| f.chunks.iter())
    }
}

/// Kind of change reported by a watcher or computed by a re-scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One file-change event consumed by the indexer. Debouncing is the
/// watcher's concern; the indexer takes events as they arrive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub kind: ChangeKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Result of `update_files` / `index`: which files moved, and the new
/// generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChangeReport {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
    pub generation: u64,
    pub duration_ms: u64,
}

impl ChangeReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}

/// A lightweight symbol reference returned by `search_symbols`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRef {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub line: u32,
    pub exported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_builder_sets_visibility_on_export() {
        let sym = Symbol::new("AuthService", SymbolKind::Class).with_exported(true);
        assert!(sym.exported);
        assert_eq!(sym.visibility, Visibility::Public);
    }

    #[test]
    fn symbol_kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&SymbolKind::TypeAlias).unwrap();
        assert_eq!(json, "\"type\"");
        let json = serde_json::to_string(&SymbolKind::Class).unwrap();
        assert_eq!(json, "\"class\"");
    }

    #[test]
    fn symbol_kind_name_roundtrip() {
        for kind in [
            SymbolKind::Function,
            SymbolKind::Method,
            SymbolKind::Class,
            SymbolKind::Interface,
            SymbolKind::TypeAlias,
            SymbolKind::Enum,
            SymbolKind::Constant,
            SymbolKind::Variable,
            SymbolKind::Property,
            SymbolKind::Module,
            SymbolKind::Namespace,
        ] {
            assert_eq!(SymbolKind::from_str_loose(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn bound_name_local_name_prefers_alias() {
        let plain = BoundName::plain("AuthService");
        assert_eq!(plain.local_name(), "AuthService");

        let aliased = BoundName {
            name: "AuthService".to_string(),
            alias: Some("Auth".to_string()),
        };
        assert_eq!(aliased.local_name(), "Auth");
    }

    #[test]
    fn project_index_roundtrips_through_json() {
        let mut index = ProjectIndex::empty("demo", PathBuf::from("/tmp/demo"));
        index.generation = 7;
        let mut file = FileIndex::empty("src/auth.ts", "abc", "typescript");
        file.symbols.push(Symbol::new("login", SymbolKind::Function));
        index.files.insert("src/auth.ts".to_string(), file);

        let json = serde_json::to_string(&index).unwrap();
        let back: ProjectIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back, index);
    }

    #[test]
    fn files_iterate_in_lexicographic_order() {
        let mut index = ProjectIndex::empty("demo", PathBuf::from("."));
        for path in ["src/z.ts", "src/a.ts", "lib/m.ts"] {
            index
                .files
                .insert(path.to_string(), FileIndex::empty(path, "", "typescript"));
        }
        let order: Vec<&str> = index.files.keys().map(String::as_str).collect();
        assert_eq!(order, vec!["lib/m.ts", "src/a.ts", "src/z.ts"]);
    }
}
