//! The incremental indexer.
//!
//! Owns the `path -> content hash` map and the published
//! `Arc<ProjectIndex>` snapshot. A scan re-parses only files whose hash
//! changed or are new, evicts removed files, recomputes dependency
//! edges and per-language totals, bumps the generation, persists the
//! snapshot, and swaps the published Arc. Readers holding a previous
//! generation keep seeing it untouched.
//!
//! Per-file parse failures are isolated: the file is recorded with
//! empty symbols and a diagnostic, and the batch continues.

use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::graph::{GraphBuilder, KnowledgeGraph};
use crate::indexing::file_info::{content_hash, mtime_secs};
use crate::indexing::persistence::{BM25_FILE, GRAPH_FILE, SnapshotStore};
use crate::indexing::resolver::resolve_import;
use crate::indexing::walker::{FileWalker, rel_display};
use crate::parsing::{ParseResult, SourceParser};
use crate::retrieve::{RetrieveOptions, RetrievedContext, Retriever};
use crate::search::Bm25Index;
use crate::types::{
    ChangeReport, DependencyEdge, Diagnostic, FileChange, FileIndex, LanguageStats, ProjectIndex,
    SCHEMA_VERSION, SemanticChunk, SymbolKind, SymbolRef,
};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Files re-parsed between cancellation checks.
const PARSE_BATCH: usize = 64;

/// Filters for [`Indexer::search_symbols`].
#[derive(Debug, Clone)]
pub struct SymbolSearchOptions {
    pub kind: Option<SymbolKind>,
    pub exported_only: bool,
    pub language: Option<String>,
    pub limit: usize,
}

impl Default for SymbolSearchOptions {
    fn default() -> Self {
        Self {
            kind: None,
            exported_only: false,
            language: None,
            limit: 50,
        }
    }
}

pub struct Indexer {
    settings: Arc<Settings>,
    parser: SourceParser,
    store: SnapshotStore,
    current: RwLock<Arc<ProjectIndex>>,
    /// Authoritative change-detection map, replaceable via
    /// `set_file_hashes` for watcher-driven flows.
    hashes: Mutex<BTreeMap<String, String>>,
    bm25: Mutex<Option<Bm25Index>>,
    graph: Mutex<Option<KnowledgeGraph>>,
    bm25_dirty: AtomicBool,
    graph_dirty: AtomicBool,
    subscribers: Mutex<Vec<Sender<ChangeReport>>>,
}

impl Indexer {
    pub fn new(settings: Arc<Settings>) -> Self {
        let root = settings.root();
        let project_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());
        let store = SnapshotStore::new(settings.cache_dir());

        Self {
            parser: SourceParser::new(settings.chunking.clone()),
            store,
            current: RwLock::new(Arc::new(ProjectIndex::empty(project_name, root))),
            hashes: Mutex::new(BTreeMap::new()),
            bm25: Mutex::new(None),
            graph: Mutex::new(None),
            bm25_dirty: AtomicBool::new(true),
            graph_dirty: AtomicBool::new(true),
            subscribers: Mutex::new(Vec::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Create the cache directory and load the prior snapshot when one
    /// is present and its schema matches. Corruption is not fatal: the
    /// snapshot is ignored and the next `index()` rebuilds it.
    pub fn initialize(&self) -> IndexResult<()> {
        self.store.initialize()?;
        crate::parsing::grammar::init(std::time::Duration::from_secs(
            self.settings.indexing.grammar_timeout_secs,
        ));

        match self.store.load_index() {
            Ok(index) => {
                *self.hashes.lock() = index
                    .files
                    .iter()
                    .map(|(path, file)| (path.clone(), file.hash.clone()))
                    .collect();
                *self.current.write() = Arc::new(index);
                self.load_derived();
                Ok(())
            }
            Err(IndexError::NotFound { .. }) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "snapshot unusable; full re-index will rebuild it");
                Ok(())
            }
        }
    }

    /// Restore bm25.json / graph.json; missing or stale files just
    /// leave the dirty flags set.
    fn load_derived(&self) {
        if let Ok(value) = self.store.load_json::<serde_json::Value>(BM25_FILE) {
            if let Ok(bm25) = Bm25Index::from_json(value) {
                *self.bm25.lock() = Some(bm25);
                self.bm25_dirty.store(false, Ordering::SeqCst);
            }
        }
        if let Ok(value) = self.store.load_json::<serde_json::Value>(GRAPH_FILE) {
            if let Ok(graph) = KnowledgeGraph::from_json(value) {
                *self.graph.lock() = Some(graph);
                self.graph_dirty.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Current published snapshot. Cheap; callers keep the Arc for a
    /// consistent view.
    pub fn get_index(&self) -> Arc<ProjectIndex> {
        self.current.read().clone()
    }

    /// Full scan: re-parse changed/new files, evict removed ones, and
    /// publish the next generation.
    pub fn index(&self) -> IndexResult<Arc<ProjectIndex>> {
        self.index_cancellable(&AtomicBool::new(false))
    }

    /// Like [`Indexer::index`], checking `cancel` at file-batch
    /// boundaries. Cancellation discards partial progress; the
    /// generation does not advance.
    pub fn index_cancellable(&self, cancel: &AtomicBool) -> IndexResult<Arc<ProjectIndex>> {
        let started = Instant::now();
        let root = self.settings.root();

        let outcome = FileWalker::new(self.settings.clone()).walk(&root);
        for skipped in &outcome.skipped {
            tracing::info!(path = %skipped.path, reason = ?skipped.reason, "skipped");
        }
        if cancel.load(Ordering::SeqCst) {
            return Err(IndexError::Cancelled);
        }

        // Hash every candidate; queue changed and new files for parse.
        let prev = self.get_index();
        let prev_hashes = self.hashes.lock().clone();
        let mut seen: BTreeMap<String, (PathBuf, String, String)> = BTreeMap::new();
        for abs in outcome.files {
            let rel = rel_display(&root, &abs);
            let content = match std::fs::read_to_string(&abs) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(path = %rel, error = %err, "unreadable; skipping");
                    continue;
                }
            };
            let hash = content_hash(&content);
            seen.insert(rel, (abs, hash, content));
        }

        let mut report = ChangeReport::default();
        let mut to_parse: Vec<(String, PathBuf, String, String)> = Vec::new();
        for (rel, (abs, hash, content)) in &seen {
            match prev_hashes.get(rel) {
                Some(prev_hash) if prev_hash == hash && prev.files.contains_key(rel) => {}
                Some(_) => {
                    report.modified.push(rel.clone());
                    to_parse.push((rel.clone(), abs.clone(), hash.clone(), content.clone()));
                }
                None => {
                    report.added.push(rel.clone());
                    to_parse.push((rel.clone(), abs.clone(), hash.clone(), content.clone()));
                }
            }
        }
        for rel in prev_hashes.keys() {
            if !seen.contains_key(rel) {
                report.removed.push(rel.clone());
            }
        }

        let parsed = self.parse_batch(to_parse, cancel)?;

        // Assemble the next file map: replay unchanged, replace parsed,
        // drop removed.
        let mut files: BTreeMap<String, FileIndex> = BTreeMap::new();
        for (rel, (_, hash, _)) in &seen {
            if let Some(existing) = prev.files.get(rel) {
                if &existing.hash == hash {
                    files.insert(rel.clone(), existing.clone());
                }
            }
        }
        for (rel, file) in parsed {
            files.insert(rel, file);
        }

        let next = self.publish(files, &prev, &mut report, started)?;
        Ok(next)
    }

    /// Re-parse a specific set of repo-relative paths and publish.
    pub fn update_files(&self, paths: &[String]) -> IndexResult<ChangeReport> {
        let started = Instant::now();
        let root = self.settings.root();
        let prev = self.get_index();
        let prev_hashes = self.hashes.lock().clone();

        let mut report = ChangeReport::default();
        let mut to_parse: Vec<(String, PathBuf, String, String)> = Vec::new();
        let mut removed: Vec<String> = Vec::new();

        for rel in paths {
            let abs = root.join(rel);
            match std::fs::read_to_string(&abs) {
                Ok(content) => {
                    let hash = content_hash(&content);
                    match prev_hashes.get(rel) {
                        Some(prev_hash) if prev_hash == &hash => {}
                        Some(_) => {
                            report.modified.push(rel.clone());
                            to_parse.push((rel.clone(), abs, hash, content));
                        }
                        None => {
                            report.added.push(rel.clone());
                            to_parse.push((rel.clone(), abs, hash, content));
                        }
                    }
                }
                Err(_) => {
                    if prev_hashes.contains_key(rel) {
                        report.removed.push(rel.clone());
                        removed.push(rel.clone());
                    }
                }
            }
        }

        let parsed = self.parse_batch(to_parse, &AtomicBool::new(false))?;

        let mut files = prev.files.clone();
        for rel in &removed {
            files.remove(rel);
        }
        for (rel, file) in parsed {
            files.insert(rel, file);
        }

        self.publish(files, &prev, &mut report, started)?;
        Ok(report)
    }

    /// Apply watcher events by re-indexing the affected paths. Event
    /// kinds are advisory; the actual state comes from reading the
    /// tree, so a stale event cannot corrupt the index.
    pub fn apply_changes(&self, changes: &[FileChange]) -> IndexResult<ChangeReport> {
        let mut paths: Vec<String> = changes.iter().map(|c| c.path.clone()).collect();
        paths.sort();
        paths.dedup();
        self.update_files(&paths)
    }

    /// Parse a queue of files in parallel, isolating per-file failures.
    fn parse_batch(
        &self,
        to_parse: Vec<(String, PathBuf, String, String)>,
        cancel: &AtomicBool,
    ) -> IndexResult<Vec<(String, FileIndex)>> {
        if to_parse.is_empty() {
            return Ok(Vec::new());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.indexing.parallel_threads.max(1))
            .build()
            .map_err(|e| IndexError::Internal(e.to_string()))?;

        let mut results = Vec::with_capacity(to_parse.len());
        for batch in to_parse.chunks(PARSE_BATCH) {
            if cancel.load(Ordering::SeqCst) {
                return Err(IndexError::Cancelled);
            }
            let mut parsed: Vec<(String, FileIndex)> = pool.install(|| {
                batch
                    .par_iter()
                    .map(|(rel, abs, hash, content)| {
                        (rel.clone(), self.parse_one(rel, abs, hash, content))
                    })
                    .collect()
            });
            results.append(&mut parsed);
        }
        Ok(results)
    }

    fn parse_one(&self, rel: &str, abs: &Path, hash: &str, content: &str) -> FileIndex {
        let language = crate::parsing::Language::from_path(Path::new(rel))
            .map(|l| l.id().to_string())
            .unwrap_or_default();

        let cached: Option<ParseResult> = if self.settings.indexing.parse_cache {
            self.store.load_parse_cache(hash)
        } else {
            None
        };

        let result = match cached {
            Some(result) => result,
            None => match self.parser.parse(rel, content) {
                Ok(result) => {
                    if self.settings.indexing.parse_cache {
                        if let Err(err) = self.store.save_parse_cache(hash, &result) {
                            tracing::debug!(path = rel, error = %err, "parse cache write failed");
                        }
                    }
                    result
                }
                Err(err) => {
                    tracing::warn!(path = rel, error = %err, "parse failed");
                    let mut file = FileIndex::empty(rel, hash, language);
                    file.last_modified = mtime_secs(abs);
                    file.size = content.len() as u64;
                    file.diagnostics.push(Diagnostic::error(err.to_string()));
                    return file;
                }
            },
        };

        FileIndex {
            path: rel.to_string(),
            hash: hash.to_string(),
            language: result.language.id().to_string(),
            last_modified: mtime_secs(abs),
            size: content.len() as u64,
            symbols: result.symbols,
            imports: result.imports,
            exports: result.exports,
            calls: result.calls,
            chunks: result.chunks,
            description: result.description,
            imported_by: Vec::new(),
            diagnostics: result.diagnostics,
        }
    }

    /// Recompute global structure, bump the generation, persist, swap
    /// the published snapshot, and notify subscribers.
    fn publish(
        &self,
        mut files: BTreeMap<String, FileIndex>,
        prev: &ProjectIndex,
        report: &mut ChangeReport,
        started: Instant,
    ) -> IndexResult<Arc<ProjectIndex>> {
        let dependencies = compute_dependencies(&mut files);
        let entry_points = compute_entry_points(&files);
        let languages = compute_language_stats(&files);

        let total_symbols = files.values().map(|f| f.symbols.len()).sum();
        let total_chunks = files.values().map(|f| f.chunks.len()).sum();

        let next = ProjectIndex {
            schema_version: SCHEMA_VERSION,
            generation: prev.generation + 1,
            project_name: prev.project_name.clone(),
            root: prev.root.clone(),
            indexed_at: chrono::Utc::now().to_rfc3339(),
            total_files: files.len(),
            total_symbols,
            total_chunks,
            files,
            dependencies,
            entry_points,
            languages,
        };
        let next = Arc::new(next);

        self.bm25_dirty.store(true, Ordering::SeqCst);
        self.graph_dirty.store(true, Ordering::SeqCst);

        // Persist before swapping; a failed write must not publish.
        self.save_indices_for(&next)?;

        *self.hashes.lock() = next
            .files
            .iter()
            .map(|(path, file)| (path.clone(), file.hash.clone()))
            .collect();
        *self.current.write() = next.clone();

        report.generation = next.generation;
        report.duration_ms = started.elapsed().as_millis() as u64;
        self.notify(report.clone());

        tracing::info!(
            generation = next.generation,
            files = next.total_files,
            symbols = next.total_symbols,
            chunks = next.total_chunks,
            ms = report.duration_ms,
            "index published"
        );
        Ok(next)
    }

    /// Write `index.json`, `bm25.json`, and `graph.json` under the
    /// single-writer lock.
    pub fn save_indices(&self) -> IndexResult<()> {
        let index = self.get_index();
        self.save_indices_for(&index)
    }

    fn save_indices_for(&self, index: &ProjectIndex) -> IndexResult<()> {
        let _lock = self.store.lock()?;
        self.store.save_index(index)?;

        let bm25 = build_bm25(index, &self.settings);
        self.store.save_json(BM25_FILE, &bm25.to_json())?;
        let graph = GraphBuilder::build(index);
        self.store.save_json(GRAPH_FILE, &graph.to_json())?;

        *self.bm25.lock() = Some(bm25);
        self.bm25_dirty.store(false, Ordering::SeqCst);
        *self.graph.lock() = Some(graph);
        self.graph_dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Run a closure against the BM25 index, rebuilding it first when a
    /// mutation marked it dirty.
    pub fn with_bm25<R>(&self, f: impl FnOnce(&Bm25Index) -> R) -> R {
        let mut guard = self.bm25.lock();
        let dirty = self.bm25_dirty.swap(false, Ordering::SeqCst);
        if guard.is_none() || dirty {
            *guard = Some(build_bm25(&self.get_index(), &self.settings));
        }
        f(guard.as_ref().expect("rebuilt above"))
    }

    /// Run a closure against the knowledge graph, rebuilding it first
    /// when a mutation marked it dirty.
    pub fn with_graph<R>(&self, f: impl FnOnce(&KnowledgeGraph) -> R) -> R {
        let mut guard = self.graph.lock();
        let dirty = self.graph_dirty.swap(false, Ordering::SeqCst);
        if guard.is_none() || dirty {
            *guard = Some(GraphBuilder::build(&self.get_index()));
        }
        f(guard.as_ref().expect("rebuilt above"))
    }

    /// Retrieve packed context through the given engine, wiring in this
    /// indexer's corpus and BM25 index.
    pub fn retrieve(
        &self,
        retriever: &Retriever,
        query: &str,
        options: &RetrieveOptions,
    ) -> crate::error::RetrievalResult<RetrievedContext> {
        let chunks = self.get_all_chunks();
        self.with_bm25(|bm25| retriever.retrieve(query, &chunks, Some(bm25), options))
    }

    /// Every chunk in the current generation, lexicographic file order.
    pub fn get_all_chunks(&self) -> Vec<SemanticChunk> {
        self.get_index().all_chunks().cloned().collect()
    }

    /// Case-insensitive substring search over symbol names.
    pub fn search_symbols(&self, query: &str, options: &SymbolSearchOptions) -> Vec<SymbolRef> {
        let needle = query.to_lowercase();
        let index = self.get_index();
        let mut out = Vec::new();

        'files: for file in index.files.values() {
            if let Some(language) = &options.language {
                if &file.language != language {
                    continue;
                }
            }
            for sym in &file.symbols {
                if !sym.name.to_lowercase().contains(&needle) {
                    continue;
                }
                if let Some(kind) = options.kind {
                    if sym.kind != kind {
                        continue;
                    }
                }
                if options.exported_only && !sym.exported {
                    continue;
                }
                out.push(SymbolRef {
                    name: sym.name.clone(),
                    kind: sym.kind,
                    file_path: file.path.clone(),
                    line: sym.start_line,
                    exported: sym.exported,
                    parent: sym.parent.clone(),
                });
                if out.len() >= options.limit {
                    break 'files;
                }
            }
        }
        out
    }

    /// Files this file imports (resolved, repo-relative).
    pub fn get_dependencies(&self, path: &str) -> Vec<String> {
        self.get_index()
            .dependencies
            .iter()
            .filter(|edge| edge.from == path)
            .map(|edge| edge.to.clone())
            .collect()
    }

    /// Files that import this one.
    pub fn get_dependents(&self, path: &str) -> Vec<String> {
        self.get_index()
            .files
            .get(path)
            .map(|file| file.imported_by.clone())
            .unwrap_or_default()
    }

    pub fn get_file_hashes(&self) -> BTreeMap<String, String> {
        self.hashes.lock().clone()
    }

    /// Replace the change-detection map. A watcher transport that
    /// tracks hashes itself uses this to steer the next scan.
    pub fn set_file_hashes(&self, hashes: BTreeMap<String, String>) {
        *self.hashes.lock() = hashes;
    }

    /// Subscribe to change events; each publication sends one report.
    pub fn subscribe(&self) -> Receiver<ChangeReport> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    fn notify(&self, report: ChangeReport) {
        let mut subs = self.subscribers.lock();
        subs.retain(|tx| tx.send(report.clone()).is_ok());
    }
}

/// Resolve every import against the file set and fill `imported_by`.
fn compute_dependencies(files: &mut BTreeMap<String, FileIndex>) -> Vec<DependencyEdge> {
    for file in files.values_mut() {
        file.imported_by.clear();
    }

    let mut edges: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    let paths: Vec<String> = files.keys().cloned().collect();
    let path_set: BTreeMap<String, ()> = paths.iter().map(|p| (p.clone(), ())).collect();

    for from in &paths {
        let imports = files[from].imports.clone();
        for import in imports {
            let Some(to) = resolve_import(from, &import.source, &path_set) else {
                continue;
            };
            if &to == from {
                continue;
            }
            let names = import
                .names
                .iter()
                .map(|n| n.name.clone())
                .collect::<Vec<_>>();
            edges
                .entry((from.clone(), to.clone()))
                .or_default()
                .extend(names);
        }
    }

    let mut result = Vec::new();
    for ((from, to), mut names) in edges {
        names.sort();
        names.dedup();
        if let Some(target) = files.get_mut(&to) {
            if !target.imported_by.contains(&from) {
                target.imported_by.push(from.clone());
            }
        }
        result.push(DependencyEdge {
            from,
            to,
            imports: names,
        });
    }
    result
}

/// Files nobody imports that import something themselves are the
/// tree's entry points.
fn compute_entry_points(files: &BTreeMap<String, FileIndex>) -> Vec<String> {
    files
        .values()
        .filter(|file| file.imported_by.is_empty() && !file.imports.is_empty())
        .map(|file| file.path.clone())
        .collect()
}

fn compute_language_stats(files: &BTreeMap<String, FileIndex>) -> BTreeMap<String, LanguageStats> {
    let mut stats: BTreeMap<String, LanguageStats> = BTreeMap::new();
    for file in files.values() {
        let entry = stats.entry(file.language.clone()).or_default();
        entry.files += 1;
        entry.symbols += file.symbols.len();
        entry.chunks += file.chunks.len();
    }
    stats
}

/// Rebuild the sparse index from a snapshot. Chunk content is prefixed
/// with its path and symbol names so file and identifier words are
/// searchable.
fn build_bm25(index: &ProjectIndex, settings: &Settings) -> Bm25Index {
    let mut bm25 = Bm25Index::new(&settings.bm25);
    for chunk in index.all_chunks() {
        let text = format!("{} {} {}", chunk.file_path, chunk.symbols.join(" "), chunk.content);
        bm25.add_document_with_metadata(
            &chunk.id,
            &text,
            serde_json::json!({ "path": chunk.file_path }),
        );
    }
    bm25
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn indexer_for(root: &Path) -> Indexer {
        let mut settings = Settings::default();
        settings.workspace_root = Some(root.to_path_buf());
        settings.indexing.parallel_threads = 2;
        let indexer = Indexer::new(Arc::new(settings));
        indexer.initialize().unwrap();
        indexer
    }

    #[test]
    fn indexes_a_single_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("auth.ts"),
            "export class AuthService {\n  async login(e: string, p: string) { return null; }\n}\n",
        )
        .unwrap();

        let indexer = indexer_for(temp.path());
        let index = indexer.index().unwrap();

        assert_eq!(index.total_files, 1);
        assert!(index.total_symbols >= 2);
        let file = &index.files["auth.ts"];
        assert!(file.symbols.iter().any(|s| s.name == "AuthService" && s.exported));
        assert!(
            file.symbols
                .iter()
                .any(|s| s.name == "login" && s.parent.as_deref() == Some("AuthService"))
        );
    }

    #[test]
    fn unchanged_files_are_replayed_not_reparsed() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.ts"), "export const a = 1;\n").unwrap();
        fs::write(temp.path().join("b.ts"), "export const b = 2;\n").unwrap();

        let indexer = indexer_for(temp.path());
        let first = indexer.index().unwrap();

        // Touch only b.
        fs::write(temp.path().join("b.ts"), "export const b = 3;\n").unwrap();
        let report = indexer.update_files(&["b.ts".to_string()]).unwrap();
        assert_eq!(report.modified, vec!["b.ts".to_string()]);
        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());

        let second = indexer.get_index();
        assert_eq!(second.files["a.ts"], first.files["a.ts"]);
        assert_ne!(second.files["b.ts"].hash, first.files["b.ts"].hash);
        assert!(second.generation > first.generation);
    }

    #[test]
    fn removed_files_are_evicted() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("gone.ts");
        fs::write(&gone, "export const x = 1;\n").unwrap();

        let indexer = indexer_for(temp.path());
        indexer.index().unwrap();
        assert_eq!(indexer.get_index().total_files, 1);

        fs::remove_file(&gone).unwrap();
        let report = indexer.update_files(&["gone.ts".to_string()]).unwrap();
        assert_eq!(report.removed, vec!["gone.ts".to_string()]);
        assert_eq!(indexer.get_index().total_files, 0);
    }

    #[test]
    fn dependency_edges_and_dependents() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("auth.ts"),
            "export class AuthService {}\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("api.ts"),
            "import { AuthService } from './auth';\nexport const api = new AuthService();\n",
        )
        .unwrap();

        let indexer = indexer_for(temp.path());
        let index = indexer.index().unwrap();

        let edge = index
            .dependencies
            .iter()
            .find(|e| e.from == "api.ts")
            .expect("dependency edge");
        assert_eq!(edge.to, "auth.ts");
        assert_eq!(edge.imports, vec!["AuthService".to_string()]);
        assert_eq!(indexer.get_dependents("auth.ts"), vec!["api.ts".to_string()]);
        assert_eq!(indexer.get_dependencies("api.ts"), vec!["auth.ts".to_string()]);
        // api.ts imports but is imported by nothing: an entry point.
        assert_eq!(index.entry_points, vec!["api.ts".to_string()]);
    }

    #[test]
    fn generation_strictly_increases_and_content_is_idempotent() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("m.ts"), "export function f() { return 1; }\n").unwrap();

        let indexer = indexer_for(temp.path());
        let first = indexer.index().unwrap();
        let second = indexer.index().unwrap();

        assert!(second.generation > first.generation);
        assert_eq!(first.files, second.files);
        let chunks_a: Vec<_> = first.all_chunks().map(|c| c.id.clone()).collect();
        let chunks_b: Vec<_> = second.all_chunks().map(|c| c.id.clone()).collect();
        assert_eq!(chunks_a, chunks_b);
    }

    #[test]
    fn snapshot_survives_restart() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("p.ts"), "export const p = 1;\n").unwrap();

        let settings = {
            let mut s = Settings::default();
            s.workspace_root = Some(temp.path().to_path_buf());
            Arc::new(s)
        };
        let generation = {
            let indexer = Indexer::new(settings.clone());
            indexer.initialize().unwrap();
            indexer.index().unwrap().generation
        };

        let reloaded = Indexer::new(settings);
        reloaded.initialize().unwrap();
        let index = reloaded.get_index();
        assert_eq!(index.generation, generation);
        assert_eq!(index.total_files, 1);
        assert!(index.files.contains_key("p.ts"));
    }

    #[test]
    fn parse_failures_do_not_abort_the_batch() {
        let temp = TempDir::new().unwrap();
        // Valid file plus one that will fail UTF-8 reading.
        fs::write(temp.path().join("good.ts"), "export const ok = 1;\n").unwrap();
        fs::write(temp.path().join("bad.ts"), [0xF0, 0x28, 0x8C, 0x28]).unwrap();

        let indexer = indexer_for(temp.path());
        let index = indexer.index().unwrap();
        // The unreadable file is skipped; the good one indexes.
        assert!(index.files.contains_key("good.ts"));
    }

    #[test]
    fn search_symbols_filters() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("svc.ts"),
            "export class TokenService {}\nfunction helper() {}\n",
        )
        .unwrap();

        let indexer = indexer_for(temp.path());
        indexer.index().unwrap();

        let all = indexer.search_symbols("token", &SymbolSearchOptions::default());
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "TokenService");

        let exported = indexer.search_symbols(
            "helper",
            &SymbolSearchOptions {
                exported_only: true,
                ..Default::default()
            },
        );
        assert!(exported.is_empty());
    }

    #[test]
    fn change_events_reach_subscribers() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("e.ts"), "export const e = 1;\n").unwrap();

        let indexer = indexer_for(temp.path());
        let events = indexer.subscribe();
        indexer.index().unwrap();

        let report = events.try_recv().expect("publication event");
        assert_eq!(report.added, vec!["e.ts".to_string()]);
        assert!(report.generation >= 1);
    }

    #[test]
    fn cancellation_discards_partial_progress() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("c.ts"), "export const c = 1;\n").unwrap();

        let indexer = indexer_for(temp.path());
        let cancel = AtomicBool::new(true);
        let err = indexer.index_cancellable(&cancel).unwrap_err();
        assert!(matches!(err, IndexError::Cancelled));
        assert_eq!(indexer.get_index().generation, 0);
    }
}
