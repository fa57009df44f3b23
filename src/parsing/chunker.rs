//! AST-driven semantic chunking.
//!
//! Partitions a file into retrieval-sized chunks measured in
//! non-whitespace characters. The pipeline:
//!
//! 1. Top-of-file import run becomes one `module` chunk.
//! 2. Each top-level symbol becomes a node; nodes above the size
//!    ceiling are recursively broken at semantic boundaries (member
//!    headers, blank lines), falling back to an even line split.
//! 3. Greedy sibling merge in source order, bounded by the target size
//!    and a <10 non-whitespace-char gap (comments stripped).
//! 4. Uncovered spans that meet the size floor are emitted as `mixed`
//!    chunks; trivial orphans are discarded.
//!
//! Chunk ids are `<path>:<symbol-or-block-label>[:<part-index>]`,
//! stable for unchanged content.

use super::text::{line_span, line_starts, non_ws_len, strip_comments};
use super::Language;
use crate::config::ChunkingConfig;
use crate::types::{
    ChunkKind, ChunkMetadata, Export, Import, SemanticChunk, Symbol, SymbolKind,
};
use std::collections::HashSet;

/// Gap above this many non-whitespace chars (comments stripped) breaks
/// sibling adjacency.
const ADJACENCY_GAP: u32 = 10;

/// One span in the pre-merge node list.
#[derive(Debug, Clone)]
struct Piece {
    /// 1-based inclusive line range.
    start_line: u32,
    end_line: u32,
    size: u32,
    /// Name of the oversize symbol this piece was split from, if any.
    /// Pieces only merge with neighbors of the same origin.
    origin: Option<String>,
    /// The symbol this piece covers in full, if exactly one.
    whole_symbol: Option<usize>,
}

pub fn chunk_file(
    rel_path: &str,
    content: &str,
    language: Language,
    symbols: &[Symbol],
    imports: &[Import],
    exports: &[Export],
    config: &ChunkingConfig,
) -> Vec<SemanticChunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let lines: Vec<&str> = content.lines().collect();
    let starts = line_starts(content);
    let total_lines = lines.len() as u32;

    let top_level = top_level_symbols(symbols);

    let mut chunks = Vec::new();
    let mut covered: Vec<(u32, u32)> = Vec::new();

    // 1. Module chunk from the leading import run.
    let module_end = module_region_end(&lines, imports, &top_level, symbols);
    if let Some(end) = module_end {
        let text = line_span(content, &starts, 0, end as usize - 1);
        let size = non_ws_len(text);
        if size > 0 {
            covered.push((1, end));
            chunks.push(build_chunk(
                rel_path,
                content,
                &starts,
                language,
                symbols,
                imports,
                exports,
                BuiltGroup {
                    start_line: 1,
                    end_line: end,
                    kind: ChunkKind::Module,
                    label: "imports".to_string(),
                    primary: None,
                    partial: false,
                    part_index: None,
                },
            ));
        }
    }

    // 2. Symbol pieces, breaking oversize nodes.
    let mut pieces: Vec<Piece> = Vec::new();
    for &sym_idx in &top_level {
        let sym = &symbols[sym_idx];
        let start = sym.start_line.max(module_end.map(|e| e + 1).unwrap_or(1));
        let end = sym.end_line.min(total_lines);
        if start > end {
            continue;
        }
        let size = span_size(content, &starts, start, end);
        covered.push((start, end));

        if size <= config.max_non_ws_chars {
            pieces.push(Piece {
                start_line: start,
                end_line: end,
                size,
                origin: None,
                whole_symbol: Some(sym_idx),
            });
        } else {
            let members: Vec<u32> = symbols
                .iter()
                .filter(|child| child.parent.as_deref() == Some(sym.name.as_str()))
                .map(|child| child.start_line)
                .filter(|l| *l > start && *l <= end)
                .collect();
            let mut parts = Vec::new();
            break_node(
                content, &starts, &lines, start, end, &members, config, 0, &mut parts,
            );
            for (ps, pe) in parts {
                let psize = span_size(content, &starts, ps, pe);
                if psize == 0 {
                    continue;
                }
                pieces.push(Piece {
                    start_line: ps,
                    end_line: pe,
                    size: psize,
                    origin: Some(sym.name.clone()),
                    whole_symbol: None,
                });
            }
        }
    }

    // 3. Gap pieces for uncovered non-trivial spans.
    for (gs, ge) in uncovered_runs(&covered, total_lines) {
        let size = span_size(content, &starts, gs, ge);
        if size == 0 {
            continue;
        }
        if size > config.max_non_ws_chars {
            let mut parts = Vec::new();
            break_node(content, &starts, &lines, gs, ge, &[], config, 0, &mut parts);
            for (ps, pe) in parts {
                let psize = span_size(content, &starts, ps, pe);
                if psize > 0 {
                    pieces.push(Piece {
                        start_line: ps,
                        end_line: pe,
                        size: psize,
                        origin: None,
                        whole_symbol: None,
                    });
                }
            }
        } else {
            pieces.push(Piece {
                start_line: gs,
                end_line: ge,
                size,
                origin: None,
                whole_symbol: None,
            });
        }
    }

    pieces.sort_by_key(|p| p.start_line);

    // 4. Greedy sibling merge.
    let groups = merge_pieces(content, &starts, language, pieces, config);

    // 5. Emit, assigning part indices per split symbol.
    let mut part_counters: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
    let mut used_ids: HashSet<String> = chunks.iter().map(|c: &SemanticChunk| c.id.clone()).collect();

    for group in groups {
        let size = span_size(content, &starts, group.0, group.1);
        if size < config.min_non_ws_chars {
            // Trivial orphans are discarded, terminal partials included.
            continue;
        }

        let built = classify_group(symbols, &group, &mut part_counters);
        let mut chunk = build_chunk(
            rel_path, content, &starts, language, symbols, imports, exports, built,
        );
        if used_ids.contains(&chunk.id) {
            let mut n = 2;
            while used_ids.contains(&format!("{}:{n}", chunk.id)) {
                n += 1;
            }
            chunk.id = format!("{}:{n}", chunk.id);
        }
        used_ids.insert(chunk.id.clone());
        chunks.push(chunk);
    }

    chunks.sort_by_key(|c| c.start_line);
    chunks
}

/// Indices of symbols without parents, source order, contained spans
/// dropped.
fn top_level_symbols(symbols: &[Symbol]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..symbols.len())
        .filter(|&i| symbols[i].parent.is_none())
        .collect();
    indices.sort_by_key(|&i| (symbols[i].start_byte, std::cmp::Reverse(symbols[i].end_byte)));

    let mut kept: Vec<usize> = Vec::new();
    let mut last_end = 0usize;
    for i in indices {
        if symbols[i].start_byte >= last_end {
            last_end = symbols[i].end_byte;
            kept.push(i);
        }
    }
    kept
}

/// Last line (1-based) of the leading import/comment run, if the file
/// opens with imports.
fn module_region_end(
    lines: &[&str],
    imports: &[Import],
    top_level: &[usize],
    symbols: &[Symbol],
) -> Option<u32> {
    let import_lines: HashSet<u32> = imports.iter().map(|i| i.line).collect();
    if import_lines.is_empty() {
        return None;
    }
    let first_symbol_line = top_level
        .iter()
        .map(|&i| symbols[i].start_line)
        .min()
        .unwrap_or(u32::MAX);

    let mut last_import = 0u32;
    let mut open_brackets = 0i32;
    for (i, line) in lines.iter().enumerate() {
        let lineno = i as u32 + 1;
        if lineno >= first_symbol_line {
            break;
        }
        let trimmed = line.trim();
        let continuing = open_brackets > 0;
        let is_import = import_lines.contains(&lineno);
        if is_import || continuing {
            open_brackets += trimmed.matches(['{', '(']).count() as i32;
            open_brackets -= trimmed.matches(['}', ')']).count() as i32;
            last_import = lineno;
            continue;
        }
        if trimmed.is_empty() || is_comment_line(trimmed) {
            continue;
        }
        break;
    }

    (last_import > 0).then_some(last_import)
}

fn is_comment_line(trimmed: &str) -> bool {
    trimmed.starts_with("//")
        || trimmed.starts_with('#')
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
}

fn span_size(content: &str, starts: &[usize], start_line: u32, end_line: u32) -> u32 {
    non_ws_len(line_span(
        content,
        starts,
        start_line as usize - 1,
        end_line as usize - 1,
    ))
}

/// Recursively partition `[start, end]` until every part fits under the
/// size ceiling. `boundaries` are member-header lines from the symbol
/// hierarchy; blank lines are the second-choice boundary; an even line
/// split is the last resort.
#[allow(clippy::too_many_arguments)]
fn break_node(
    content: &str,
    starts: &[usize],
    lines: &[&str],
    start: u32,
    end: u32,
    boundaries: &[u32],
    config: &ChunkingConfig,
    depth: usize,
    out: &mut Vec<(u32, u32)>,
) {
    let size = span_size(content, starts, start, end);
    if size <= config.max_non_ws_chars || start >= end || depth > 16 {
        out.push((start, end));
        return;
    }

    let mut cuts: Vec<u32> = boundaries
        .iter()
        .copied()
        .filter(|b| *b > start && *b <= end)
        .collect();
    if cuts.is_empty() {
        cuts = (start + 1..=end)
            .filter(|&l| lines[l as usize - 1].trim().is_empty())
            .map(|l| l + 1)
            .filter(|&l| l > start + 1 && l <= end)
            .collect();
    }
    cuts.sort_unstable();
    cuts.dedup();

    if cuts.is_empty() {
        // Even split by line count, each part aimed at the target size.
        let parts = size.div_ceil(config.target_size).max(2);
        let line_count = end - start + 1;
        let per = line_count.div_ceil(parts).max(1);
        let mut cursor = start;
        while cursor <= end {
            let part_end = (cursor + per - 1).min(end);
            out.push((cursor, part_end));
            cursor = part_end + 1;
        }
        return;
    }

    let mut prev = start;
    for cut in cuts.into_iter().chain(std::iter::once(end + 1)) {
        if cut <= prev {
            continue;
        }
        let seg_end = cut - 1;
        if seg_end < prev {
            continue;
        }
        let seg_size = span_size(content, starts, prev, seg_end);
        if seg_size > config.max_non_ws_chars {
            // Boundaries exhausted at this granularity; go finer.
            break_node(content, starts, lines, prev, seg_end, &[], config, depth + 1, out);
        } else {
            out.push((prev, seg_end));
        }
        prev = cut;
    }
}

/// Maximal line runs not covered by any interval.
fn uncovered_runs(covered: &[(u32, u32)], total_lines: u32) -> Vec<(u32, u32)> {
    let mut sorted = covered.to_vec();
    sorted.sort_unstable();
    let mut runs = Vec::new();
    let mut cursor = 1u32;
    for (s, e) in sorted {
        if s > cursor {
            runs.push((cursor, s - 1));
        }
        cursor = cursor.max(e + 1);
    }
    if cursor <= total_lines {
        runs.push((cursor, total_lines));
    }
    runs
}

type Group = (u32, u32, Vec<Piece>);

/// Greedy scan in source order: extend the current group while the
/// merged size stays within the target and the pieces are adjacent.
fn merge_pieces(
    content: &str,
    starts: &[usize],
    language: Language,
    pieces: Vec<Piece>,
    config: &ChunkingConfig,
) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut current: Option<Group> = None;

    for piece in pieces {
        match current.take() {
            None => current = Some((piece.start_line, piece.end_line, vec![piece])),
            Some((gs, ge, members)) => {
                let merged_size = span_size(content, starts, gs, piece.end_line);
                let same_origin = members
                    .last()
                    .map(|m| m.origin == piece.origin)
                    .unwrap_or(true);
                let adjacent = gap_is_trivial(content, starts, language, ge, piece.start_line);
                if merged_size <= config.target_size && same_origin && adjacent {
                    let mut members = members;
                    members.push(piece.clone());
                    current = Some((gs, ge.max(piece.end_line), members));
                } else {
                    groups.push((gs, ge, members));
                    current = Some((piece.start_line, piece.end_line, vec![piece]));
                }
            }
        }
    }
    if let Some(group) = current {
        groups.push(group);
    }
    groups
}

/// True when the lines strictly between two pieces carry fewer than
/// [`ADJACENCY_GAP`] non-whitespace chars once comments are stripped.
fn gap_is_trivial(
    content: &str,
    starts: &[usize],
    language: Language,
    prev_end: u32,
    next_start: u32,
) -> bool {
    if next_start <= prev_end + 1 {
        return true;
    }
    let gap_text = line_span(
        content,
        starts,
        prev_end as usize,
        next_start as usize - 2,
    );
    non_ws_len(&strip_comments(gap_text, language)) < ADJACENCY_GAP
}

struct BuiltGroup {
    start_line: u32,
    end_line: u32,
    kind: ChunkKind,
    label: String,
    primary: Option<String>,
    partial: bool,
    part_index: Option<u32>,
}

fn classify_group(
    symbols: &[Symbol],
    group: &Group,
    part_counters: &mut std::collections::HashMap<String, u32>,
) -> BuiltGroup {
    let (start, end, members) = group;

    // Parts split from one oversize symbol.
    if let Some(origin) = members.iter().find_map(|m| m.origin.clone()) {
        let counter = part_counters.entry(origin.clone()).or_insert(0);
        *counter += 1;
        let kind = symbols
            .iter()
            .find(|s| s.name == origin)
            .map(|s| chunk_kind_for(s.kind))
            .unwrap_or(ChunkKind::Mixed);
        return BuiltGroup {
            start_line: *start,
            end_line: *end,
            kind,
            label: origin.clone(),
            primary: Some(origin),
            partial: true,
            part_index: Some(*counter),
        };
    }

    let whole: Vec<&Symbol> = members
        .iter()
        .filter_map(|m| m.whole_symbol)
        .map(|i| &symbols[i])
        .collect();

    match whole.as_slice() {
        [single] => BuiltGroup {
            start_line: *start,
            end_line: *end,
            kind: chunk_kind_for(single.kind),
            label: single.name.clone(),
            primary: Some(single.name.clone()),
            partial: false,
            part_index: None,
        },
        [] => BuiltGroup {
            start_line: *start,
            end_line: *end,
            kind: ChunkKind::Mixed,
            label: format!("block@{start}"),
            primary: None,
            partial: false,
            part_index: None,
        },
        [first, ..] => BuiltGroup {
            start_line: *start,
            end_line: *end,
            kind: ChunkKind::Mixed,
            label: first.name.clone(),
            primary: Some(first.name.clone()),
            partial: false,
            part_index: None,
        },
    }
}

fn chunk_kind_for(kind: SymbolKind) -> ChunkKind {
    match kind {
        SymbolKind::Function | SymbolKind::Method => ChunkKind::Function,
        SymbolKind::Class | SymbolKind::Interface | SymbolKind::Enum => ChunkKind::Class,
        SymbolKind::Module | SymbolKind::Namespace => ChunkKind::Module,
        _ => ChunkKind::Mixed,
    }
}

#[allow(clippy::too_many_arguments)]
fn build_chunk(
    rel_path: &str,
    content: &str,
    starts: &[usize],
    language: Language,
    symbols: &[Symbol],
    imports: &[Import],
    exports: &[Export],
    built: BuiltGroup,
) -> SemanticChunk {
    let text = line_span(
        content,
        starts,
        built.start_line as usize - 1,
        built.end_line as usize - 1,
    );
    let char_count = text.chars().count() as u32;
    let size = non_ws_len(text);

    let in_range = |line: u32| built.start_line <= line && line <= built.end_line;
    let covered: Vec<&Symbol> = symbols
        .iter()
        .filter(|s| s.start_line <= built.end_line && s.end_line >= built.start_line)
        .collect();

    let mut symbol_kinds: Vec<SymbolKind> = Vec::new();
    for s in &covered {
        if !symbol_kinds.contains(&s.kind) {
            symbol_kinds.push(s.kind);
        }
    }

    let has_exports = covered.iter().any(|s| s.exported)
        || exports.iter().any(|e| in_range(e.line));

    let parent_chain = built
        .primary
        .as_ref()
        .map(|name| parent_chain_of(symbols, name))
        .unwrap_or_default();

    let import_sources = if built.kind == ChunkKind::Module {
        let mut seen = Vec::new();
        for imp in imports {
            if !seen.contains(&imp.source) {
                seen.push(imp.source.clone());
            }
        }
        seen
    } else {
        referenced_imports(imports, text)
    };

    let id = match built.part_index {
        Some(n) => format!("{rel_path}:{}:{n}", built.label),
        None => format!("{rel_path}:{}", built.label),
    };

    SemanticChunk {
        id,
        content: text.to_string(),
        kind: built.kind,
        file_path: rel_path.to_string(),
        start_line: built.start_line,
        end_line: built.end_line,
        primary_symbol: built.primary,
        symbols: covered.iter().map(|s| s.name.clone()).collect(),
        import_sources,
        token_estimate: char_count.div_ceil(4),
        non_ws_size: size,
        metadata: ChunkMetadata {
            language: language.id().to_string(),
            symbol_kinds,
            has_exports,
            partial: built.partial,
            part_index: built.part_index,
            parent_chain,
            block_type: (built.kind == ChunkKind::Module).then(|| "imports".to_string()),
        },
    }
}

/// Enclosing symbol names, outermost first.
fn parent_chain_of(symbols: &[Symbol], name: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut cursor = symbols.iter().find(|s| s.name == name);
    let mut guard = 0;
    while let Some(sym) = cursor {
        guard += 1;
        if guard > 32 {
            break;
        }
        match &sym.parent {
            Some(parent) => {
                chain.push(parent.clone());
                cursor = symbols.iter().find(|s| &s.name == parent);
            }
            None => break,
        }
    }
    chain.reverse();
    chain
}

/// Import sources whose local bindings appear in the chunk text.
fn referenced_imports(imports: &[Import], text: &str) -> Vec<String> {
    let mut sources = Vec::new();
    for imp in imports {
        let referenced = if imp.names.is_empty() {
            let last = imp
                .source
                .rsplit(['/', ':', '.'])
                .next()
                .unwrap_or(&imp.source);
            !last.is_empty() && text.contains(last)
        } else {
            imp.names.iter().any(|n| text.contains(n.local_name()))
        };
        if referenced && !sources.contains(&imp.source) {
            sources.push(imp.source.clone());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImportKind;

    fn config() -> ChunkingConfig {
        ChunkingConfig {
            target_size: 200,
            min_non_ws_chars: 20,
            max_non_ws_chars: 400,
        }
    }

    fn sym(name: &str, kind: SymbolKind, start: u32, end: u32, content: &str) -> Symbol {
        let starts = line_starts(content);
        Symbol::new(name, kind).with_span(
            start,
            0,
            end,
            0,
            starts[start as usize - 1],
            starts[end as usize].saturating_sub(1),
        )
    }

    #[test]
    fn single_symbol_becomes_one_chunk() {
        let content = "function alpha() {\n  return computeTotalForInvoice(1, 2, 3);\n}\n";
        let symbols = vec![sym("alpha", SymbolKind::Function, 1, 3, content)];
        let chunks = chunk_file(
            "src/a.ts",
            content,
            Language::TypeScript,
            &symbols,
            &[],
            &[],
            &config(),
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "src/a.ts:alpha");
        assert_eq!(chunks[0].kind, ChunkKind::Function);
        assert_eq!(chunks[0].primary_symbol.as_deref(), Some("alpha"));
    }

    #[test]
    fn leading_imports_become_module_chunk() {
        let content = "import { a } from './a';\nimport { b } from './b';\n\nfunction go() {\n  return a() + b() + 1234567;\n}\n";
        let symbols = vec![sym("go", SymbolKind::Function, 4, 6, content)];
        let imports = vec![
            Import {
                source: "./a".into(),
                kind: ImportKind::Named,
                names: vec![crate::types::BoundName::plain("a")],
                line: 1,
                type_only: false,
            },
            Import {
                source: "./b".into(),
                kind: ImportKind::Named,
                names: vec![crate::types::BoundName::plain("b")],
                line: 2,
                type_only: false,
            },
        ];
        let chunks = chunk_file(
            "src/m.ts",
            content,
            Language::TypeScript,
            &symbols,
            &imports,
            &[],
            &config(),
        );
        let module = chunks.iter().find(|c| c.kind == ChunkKind::Module).unwrap();
        assert_eq!(module.id, "src/m.ts:imports");
        assert_eq!(module.start_line, 1);
        assert_eq!(module.import_sources, vec!["./a".to_string(), "./b".to_string()]);
    }

    #[test]
    fn oversize_symbol_is_split_with_part_indices() {
        let mut body = String::from("function huge() {\n");
        for i in 0..60 {
            body.push_str(&format!("  const value{i} = compute{i}(alpha, beta);\n"));
        }
        body.push_str("}\n");
        let total = body.lines().count() as u32;
        let symbols = vec![sym("huge", SymbolKind::Function, 1, total, &body)];
        let chunks = chunk_file(
            "src/h.ts",
            &body,
            Language::TypeScript,
            &symbols,
            &[],
            &[],
            &config(),
        );

        assert!(chunks.len() > 1, "oversize symbol must split");
        for chunk in &chunks {
            assert!(chunk.metadata.partial);
            assert!(chunk.id.starts_with("src/h.ts:huge:"));
            assert!(chunk.non_ws_size <= config().max_non_ws_chars);
        }
        let indices: Vec<u32> = chunks.iter().filter_map(|c| c.metadata.part_index).collect();
        let expected: Vec<u32> = (1..=indices.len() as u32).collect();
        assert_eq!(indices, expected);
    }

    #[test]
    fn adjacent_small_symbols_merge_to_mixed() {
        let content = "const a = 1;\nconst b = 2;\nconst c = 3;\nconst d = 4;\n";
        let symbols = vec![
            sym("a", SymbolKind::Constant, 1, 1, content),
            sym("b", SymbolKind::Constant, 2, 2, content),
            sym("c", SymbolKind::Constant, 3, 3, content),
            sym("d", SymbolKind::Constant, 4, 4, content),
        ];
        let chunks = chunk_file(
            "src/k.ts",
            content,
            Language::TypeScript,
            &symbols,
            &[],
            &[],
            &config(),
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Mixed);
        assert_eq!(chunks[0].symbols.len(), 4);
        assert_eq!(chunks[0].id, "src/k.ts:a");
    }

    #[test]
    fn size_window_holds_for_non_module_chunks() {
        let mut content = String::new();
        for i in 0..40 {
            content.push_str(&format!(
                "function f{i}() {{\n  return {i} + helperValue({i});\n}}\n\n"
            ));
        }
        let mut symbols = Vec::new();
        for i in 0..40 {
            let start = (i * 4 + 1) as u32;
            symbols.push(sym(
                &format!("f{i}"),
                SymbolKind::Function,
                start,
                start + 2,
                &content,
            ));
        }
        let cfg = config();
        let chunks = chunk_file(
            "src/w.ts",
            &content,
            Language::TypeScript,
            &symbols,
            &[],
            &[],
            &cfg,
        );
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            if chunk.kind == ChunkKind::Module {
                continue;
            }
            assert!(
                chunk.non_ws_size >= cfg.min_non_ws_chars,
                "chunk {} below floor",
                chunk.id
            );
            assert!(
                chunk.non_ws_size <= cfg.max_non_ws_chars,
                "chunk {} above ceiling",
                chunk.id
            );
        }
    }

    #[test]
    fn dense_lines_are_covered() {
        let cfg = config();
        let content = "const table = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14];\n";
        let chunks = chunk_file(
            "src/t.ts",
            content,
            Language::TypeScript,
            &[],
            &[],
            &[],
            &cfg,
        );
        // A dense uncovered line above the floor must land in a chunk.
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Mixed);
        assert!(chunks[0].id.contains("block@1"));
    }

    #[test]
    fn chunk_ids_are_stable_and_unique() {
        let content = "function one() {\n  return firstHelperValue(1);\n}\n\nfunction two() {\n  return secondHelperValue(2);\n}\n";
        let symbols = vec![
            sym("one", SymbolKind::Function, 1, 3, content),
            sym("two", SymbolKind::Function, 5, 7, content),
        ];
        let cfg = ChunkingConfig {
            target_size: 30,
            min_non_ws_chars: 10,
            max_non_ws_chars: 400,
        };
        let a = chunk_file("src/s.ts", content, Language::TypeScript, &symbols, &[], &[], &cfg);
        let b = chunk_file("src/s.ts", content, Language::TypeScript, &symbols, &[], &[], &cfg);
        let ids_a: Vec<&str> = a.iter().map(|c| c.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
        let unique: HashSet<&&str> = ids_a.iter().collect();
        assert_eq!(unique.len(), ids_a.len());
    }

    #[test]
    fn token_estimate_is_ceiling_of_quarter_chars() {
        let content = "function tiny() { return aVeryLongIdentifier; }\n";
        let symbols = vec![sym("tiny", SymbolKind::Function, 1, 1, content)];
        let chunks = chunk_file(
            "src/e.ts",
            content,
            Language::TypeScript,
            &symbols,
            &[],
            &[],
            &config(),
        );
        assert_eq!(chunks.len(), 1);
        let chars = chunks[0].content.chars().count() as u32;
        assert_eq!(chunks[0].token_estimate, chars.div_ceil(4));
    }
}
