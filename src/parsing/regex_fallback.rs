//! Regex-based extraction, used when a grammar is unavailable or fails.
//!
//! Produces the same `Extraction` shape as the grammar path. Symbol
//! spans are recovered with brace balancing (indentation for Python) so
//! the chunker's size invariants hold; only metadata richness degrades
//! (no parameter types, no decorator capture, shallower nesting).

use super::parser::Extraction;
use super::text::line_starts;
use super::Language;
use crate::types::{BoundName, CallReference, Import, ImportKind, Symbol, SymbolKind};
use regex::Regex;
use std::sync::LazyLock;

pub fn extract(lang: Language, content: &str) -> Extraction {
    let mut out = match lang {
        Language::TypeScript | Language::JavaScript => extract_ts(content),
        Language::Python => extract_python(content),
        Language::Rust => extract_rust(content),
        Language::Go => extract_go(content),
    };
    attribute_callers(&mut out);
    out
}

/// Assign each call to the innermost function/method symbol whose span
/// contains its line. The grammar path does this during the walk; the
/// regex path recovers it from spans.
fn attribute_callers(out: &mut Extraction) {
    for call in out.calls.iter_mut() {
        let mut best: Option<(&Symbol, u32)> = None;
        for sym in out.symbols.iter() {
            if !matches!(sym.kind, SymbolKind::Function | SymbolKind::Method) {
                continue;
            }
            if sym.start_line <= call.line && call.line <= sym.end_line {
                let width = sym.end_line - sym.start_line;
                if best.map(|(_, w)| width < w).unwrap_or(true) {
                    best = Some((sym, width));
                }
            }
        }
        if let Some((sym, _)) = best {
            // A declaration line is not a call site of itself.
            if sym.start_line != call.line || call.callee != sym.name {
                call.caller = Some(sym.name.clone());
            }
        }
    }
    // Drop "calls" that are really the declaration headers we matched.
    out.calls
        .retain(|c| !out.symbols.iter().any(|s| s.name == c.callee && s.start_line == c.line));
}

/// End byte of a `{}`-delimited block opening at or after `from`.
/// Falls back to end of line when no brace opens within two lines.
fn brace_block_end(content: &str, from: usize) -> usize {
    let bytes = content.as_bytes();
    let mut i = from;
    let mut newlines = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => break,
            b'\n' => {
                newlines += 1;
                if newlines > 2 {
                    return line_end(content, from);
                }
            }
            _ => {}
        }
        i += 1;
    }
    if i >= bytes.len() {
        return line_end(content, from);
    }
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    content.len()
}

/// End byte of an indentation-delimited block (Python): the last line
/// more indented than the declaration.
fn indent_block_end(content: &str, decl_start: usize) -> usize {
    let starts = line_starts(content);
    let decl_line = starts.partition_point(|&s| s <= decl_start) - 1;
    let lines: Vec<&str> = content.lines().collect();
    let decl_indent = indent_of(lines[decl_line]);

    let mut last = decl_line;
    for (i, line) in lines.iter().enumerate().skip(decl_line + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= decl_indent {
            break;
        }
        last = i;
    }
    (starts[last] + lines[last].len()).min(content.len())
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn line_end(content: &str, from: usize) -> usize {
    content[from..]
        .find('\n')
        .map(|i| from + i)
        .unwrap_or(content.len())
}

fn line_of(starts: &[usize], byte: usize) -> u32 {
    starts.partition_point(|&s| s <= byte) as u32
}

fn end_line_of(starts: &[usize], byte: usize) -> u32 {
    starts.partition_point(|&s| s < byte).max(1) as u32
}

#[allow(clippy::too_many_arguments)]
fn push_symbol(
    out: &mut Extraction,
    starts: &[usize],
    name: &str,
    kind: SymbolKind,
    start_byte: usize,
    end_byte: usize,
    exported: bool,
) {
    let sym = Symbol::new(name, kind)
        .with_span(
            line_of(starts, start_byte),
            0,
            end_line_of(starts, end_byte),
            0,
            start_byte,
            end_byte,
        )
        .with_exported(exported);
    out.symbols.push(sym);
}

fn find_calls(out: &mut Extraction, content: &str, starts: &[usize]) {
    static CALL: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?:([A-Za-z_][A-Za-z0-9_]*)\s*\.\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap()
    });
    const KEYWORDS: &[&str] = &[
        "if", "for", "while", "switch", "match", "return", "catch", "function", "fn", "def",
        "func", "new", "typeof", "await", "loop", "unless", "elif", "with", "print", "assert",
        "super", "constructor",
    ];

    for cap in CALL.captures_iter(content) {
        let callee = cap.get(2).unwrap();
        if KEYWORDS.contains(&callee.as_str()) {
            continue;
        }
        let receiver = cap.get(1).map(|m| m.as_str().to_string());
        let start = cap.get(0).unwrap().start();
        let line = line_of(starts, start);
        let column = (callee.start() - starts[(line as usize) - 1]) as u32;
        out.calls.push(CallReference {
            callee: callee.as_str().to_string(),
            caller: None,
            line,
            column,
            is_method_call: receiver.is_some(),
            receiver,
            arg_count: 0,
        });
    }
}

fn split_named_list(list: &str) -> Vec<BoundName> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| {
            let mut parts = item.split_whitespace();
            let name = parts.next().unwrap_or("").to_string();
            let alias = match (parts.next(), parts.next()) {
                (Some("as"), Some(a)) => Some(a.to_string()),
                _ => None,
            };
            BoundName { name, alias }
        })
        .collect()
}

// -- TypeScript / JavaScript ---------------------------------------------

fn extract_ts(content: &str) -> Extraction {
    static CLASS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?m)^[ \t]*(export\s+)?(?:default\s+)?(abstract\s+)?class\s+([A-Za-z_$][\w$]*)(?:\s+extends\s+([\w$.]+))?(?:\s+implements\s+([\w$.,\s]+?))?\s*\{",
        )
        .unwrap()
    });
    static INTERFACE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*(export\s+)?interface\s+([A-Za-z_$][\w$]*)(?:\s+extends\s+([\w$.,\s]+?))?\s*\{")
            .unwrap()
    });
    static ENUM: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*(export\s+)?(?:const\s+)?enum\s+([A-Za-z_$][\w$]*)").unwrap()
    });
    static TYPE_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*(export\s+)?type\s+([A-Za-z_$][\w$]*)[^=]*=").unwrap()
    });
    static FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*(export\s+)?(?:default\s+)?(async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(")
            .unwrap()
    });
    static ARROW: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*(export\s+)?(const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>")
            .unwrap()
    });
    static CONST: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^(export\s+)?(const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=\n]+)?=").unwrap()
    });
    static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?m)^[ \t]*import\s+(type\s+)?(.+?)\s+from\s+['"]([^'"]+)['"]"#).unwrap()
    });
    static IMPORT_BARE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"(?m)^[ \t]*import\s+['"]([^'"]+)['"]"#).unwrap());
    static EXPORT_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?m)^[ \t]*export\s*\{([^}]*)\}(?:\s*from\s*['"]([^'"]+)['"])?"#).unwrap()
    });

    let mut out = Extraction::default();
    let starts = line_starts(content);

    for cap in CLASS.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let name = cap.get(3).unwrap().as_str();
        let end = brace_block_end(content, whole.start());
        push_symbol(
            &mut out,
            &starts,
            name,
            SymbolKind::Class,
            whole.start(),
            end,
            cap.get(1).is_some(),
        );
        let sym = out.symbols.last_mut().unwrap();
        sym.is_abstract = cap.get(2).is_some();
        if let Some(ext) = cap.get(4) {
            sym.extends = vec![ext.as_str().to_string()];
        }
        if let Some(imp) = cap.get(5) {
            sym.implements = imp
                .as_str()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    for cap in INTERFACE.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let end = brace_block_end(content, whole.start());
        push_symbol(
            &mut out,
            &starts,
            cap.get(2).unwrap().as_str(),
            SymbolKind::Interface,
            whole.start(),
            end,
            cap.get(1).is_some(),
        );
        if let Some(ext) = cap.get(3) {
            out.symbols.last_mut().unwrap().extends = ext
                .as_str()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    for cap in ENUM.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let end = brace_block_end(content, whole.start());
        push_symbol(
            &mut out,
            &starts,
            cap.get(2).unwrap().as_str(),
            SymbolKind::Enum,
            whole.start(),
            end,
            cap.get(1).is_some(),
        );
    }

    for cap in TYPE_ALIAS.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        push_symbol(
            &mut out,
            &starts,
            cap.get(2).unwrap().as_str(),
            SymbolKind::TypeAlias,
            whole.start(),
            line_end(content, whole.start()),
            cap.get(1).is_some(),
        );
    }

    for cap in FUNCTION.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let end = brace_block_end(content, whole.start());
        push_symbol(
            &mut out,
            &starts,
            cap.get(3).unwrap().as_str(),
            SymbolKind::Function,
            whole.start(),
            end,
            cap.get(1).is_some(),
        );
        out.symbols.last_mut().unwrap().is_async = cap.get(2).is_some();
    }

    for cap in ARROW.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let end = brace_block_end(content, whole.start());
        push_symbol(
            &mut out,
            &starts,
            cap.get(3).unwrap().as_str(),
            SymbolKind::Function,
            whole.start(),
            end,
            cap.get(1).is_some(),
        );
        out.symbols.last_mut().unwrap().is_async = cap.get(4).is_some();
    }

    for cap in CONST.captures_iter(content) {
        let name = cap.get(3).unwrap().as_str();
        if out.symbols.iter().any(|s| s.name == name) {
            continue;
        }
        let whole = cap.get(0).unwrap();
        let kind = if cap.get(2).unwrap().as_str() == "const" {
            SymbolKind::Constant
        } else {
            SymbolKind::Variable
        };
        push_symbol(
            &mut out,
            &starts,
            name,
            kind,
            whole.start(),
            line_end(content, whole.start()),
            cap.get(1).is_some(),
        );
    }

    for cap in IMPORT.captures_iter(content) {
        let type_only = cap.get(1).is_some();
        let clause = cap.get(2).unwrap().as_str().trim();
        let source = cap.get(3).unwrap().as_str().to_string();
        let line = line_of(&starts, cap.get(0).unwrap().start());

        let (kind, names) = if let Some(rest) = clause.strip_prefix("* as ") {
            (ImportKind::Namespace, vec![BoundName::plain(rest.trim())])
        } else if clause.starts_with('{') {
            (
                ImportKind::Named,
                split_named_list(clause.trim_matches(['{', '}'])),
            )
        } else {
            let default_name = clause.split(',').next().unwrap_or(clause).trim();
            let mut names = vec![BoundName::plain(default_name)];
            if let Some(brace) = clause.find('{') {
                names.extend(split_named_list(clause[brace..].trim_matches(['{', '}'])));
            }
            (ImportKind::Default, names)
        };
        out.imports.push(Import {
            source,
            kind: if type_only { ImportKind::Type } else { kind },
            names,
            line,
            type_only,
        });
    }

    for cap in IMPORT_BARE.captures_iter(content) {
        out.imports.push(Import {
            source: cap.get(1).unwrap().as_str().to_string(),
            kind: ImportKind::SideEffect,
            names: Vec::new(),
            line: line_of(&starts, cap.get(0).unwrap().start()),
            type_only: false,
        });
    }

    for cap in EXPORT_CLAUSE.captures_iter(content) {
        out.exports.push(crate::types::Export {
            source: cap.get(2).map(|m| m.as_str().to_string()),
            kind: if cap.get(2).is_some() {
                ImportKind::ReExport
            } else {
                ImportKind::Named
            },
            names: split_named_list(cap.get(1).unwrap().as_str()),
            line: line_of(&starts, cap.get(0).unwrap().start()),
            type_only: false,
        });
    }

    // Exported declarations are also export records.
    let declared: Vec<BoundName> = out
        .symbols
        .iter()
        .filter(|s| s.exported)
        .map(|s| BoundName::plain(s.name.clone()))
        .collect();
    for name in declared {
        let line = out
            .symbols
            .iter()
            .find(|s| s.name == name.name)
            .map(|s| s.start_line)
            .unwrap_or(1);
        out.exports.push(crate::types::Export {
            source: None,
            kind: ImportKind::Named,
            names: vec![name],
            line,
            type_only: false,
        });
    }

    find_calls(&mut out, content, &starts);
    out
}

// -- Python ---------------------------------------------------------------

fn extract_python(content: &str) -> Extraction {
    static CLASS: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^([ \t]*)class\s+([A-Za-z_]\w*)\s*(?:\(([^)]*)\))?\s*:").unwrap()
    });
    static DEF: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^([ \t]*)(async\s+)?def\s+([A-Za-z_]\w*)\s*\(").unwrap()
    });
    static ASSIGN: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^([A-Za-z_]\w*)\s*(?::[^=\n]+)?=[^=]").unwrap());
    static IMPORT_FROM: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^from\s+(\S+)\s+import\s+(.+)$").unwrap());
    static IMPORT: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^import\s+([\w.]+)(?:\s+as\s+(\w+))?").unwrap());

    let mut out = Extraction::default();
    let starts = line_starts(content);

    let mut class_spans: Vec<(usize, usize, String)> = Vec::new();
    for cap in CLASS.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let name = cap.get(2).unwrap().as_str();
        let end = indent_block_end(content, whole.start());
        push_symbol(
            &mut out,
            &starts,
            name,
            SymbolKind::Class,
            whole.start(),
            end,
            !name.starts_with('_'),
        );
        if let Some(bases) = cap.get(3) {
            out.symbols.last_mut().unwrap().extends = bases
                .as_str()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && *s != "object")
                .collect();
        }
        class_spans.push((whole.start(), end, name.to_string()));
    }

    for cap in DEF.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let name = cap.get(3).unwrap().as_str();
        let end = indent_block_end(content, whole.start());
        let enclosing = class_spans
            .iter()
            .find(|(s, e, _)| *s < whole.start() && whole.start() < *e)
            .map(|(_, _, n)| n.clone());
        let kind = if enclosing.is_some() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        push_symbol(
            &mut out,
            &starts,
            name,
            kind,
            whole.start(),
            end,
            enclosing.is_none() && !name.starts_with('_'),
        );
        let sym = out.symbols.last_mut().unwrap();
        sym.is_async = cap.get(2).is_some();
        if let Some(parent) = enclosing {
            sym.parent = Some(parent);
        }
    }

    for cap in ASSIGN.captures_iter(content) {
        let name = cap.get(1).unwrap().as_str();
        let whole = cap.get(0).unwrap();
        let kind = if name.chars().all(|c| !c.is_lowercase()) {
            SymbolKind::Constant
        } else {
            SymbolKind::Variable
        };
        push_symbol(
            &mut out,
            &starts,
            name,
            kind,
            whole.start(),
            line_end(content, whole.start()),
            !name.starts_with('_'),
        );
    }

    for cap in IMPORT_FROM.captures_iter(content) {
        out.imports.push(Import {
            source: cap.get(1).unwrap().as_str().to_string(),
            kind: ImportKind::Named,
            names: split_named_list(cap.get(2).unwrap().as_str().trim_matches(['(', ')'])),
            line: line_of(&starts, cap.get(0).unwrap().start()),
            type_only: false,
        });
    }
    for cap in IMPORT.captures_iter(content) {
        out.imports.push(Import {
            source: cap.get(1).unwrap().as_str().to_string(),
            kind: ImportKind::Namespace,
            names: cap
                .get(2)
                .map(|a| {
                    vec![BoundName {
                        name: cap.get(1).unwrap().as_str().to_string(),
                        alias: Some(a.as_str().to_string()),
                    }]
                })
                .unwrap_or_default(),
            line: line_of(&starts, cap.get(0).unwrap().start()),
            type_only: false,
        });
    }

    find_calls(&mut out, content, &starts);
    out
}

// -- Rust -----------------------------------------------------------------

fn extract_rust(content: &str) -> Extraction {
    static FN: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*(pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+([A-Za-z_]\w*)").unwrap()
    });
    static TYPE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*(pub(?:\([^)]*\))?\s+)?(struct|enum|trait|mod)\s+([A-Za-z_]\w*)")
            .unwrap()
    });
    static CONST: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*(pub(?:\([^)]*\))?\s+)?(const|static)\s+([A-Za-z_]\w*)").unwrap()
    });
    static USE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*use\s+([^;]+);").unwrap());

    let mut out = Extraction::default();
    let starts = line_starts(content);

    for cap in FN.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let exported = cap
            .get(1)
            .map(|v| v.as_str().trim() == "pub")
            .unwrap_or(false);
        let end = brace_block_end(content, whole.start());
        push_symbol(
            &mut out,
            &starts,
            cap.get(2).unwrap().as_str(),
            SymbolKind::Function,
            whole.start(),
            end,
            exported,
        );
        out.symbols.last_mut().unwrap().is_async = whole.as_str().contains("async ");
    }

    for cap in TYPE.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let exported = cap
            .get(1)
            .map(|v| v.as_str().trim() == "pub")
            .unwrap_or(false);
        let kind = match cap.get(2).unwrap().as_str() {
            "struct" => SymbolKind::Class,
            "enum" => SymbolKind::Enum,
            "trait" => SymbolKind::Interface,
            _ => SymbolKind::Module,
        };
        let end = brace_block_end(content, whole.start());
        push_symbol(
            &mut out,
            &starts,
            cap.get(3).unwrap().as_str(),
            kind,
            whole.start(),
            end,
            exported,
        );
    }

    for cap in CONST.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let exported = cap
            .get(1)
            .map(|v| v.as_str().trim() == "pub")
            .unwrap_or(false);
        push_symbol(
            &mut out,
            &starts,
            cap.get(3).unwrap().as_str(),
            SymbolKind::Constant,
            whole.start(),
            line_end(content, whole.start()),
            exported,
        );
    }

    for cap in USE.captures_iter(content) {
        out.imports.push(Import {
            source: cap.get(1).unwrap().as_str().trim().to_string(),
            kind: ImportKind::Named,
            names: Vec::new(),
            line: line_of(&starts, cap.get(0).unwrap().start()),
            type_only: false,
        });
    }

    find_calls(&mut out, content, &starts);
    out
}

// -- Go -------------------------------------------------------------------

fn extract_go(content: &str) -> Extraction {
    static FUNC: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^func\s+(?:\(\s*\w+\s+\*?([A-Za-z_]\w*)\s*\)\s+)?([A-Za-z_]\w*)\s*\(")
            .unwrap()
    });
    static TYPE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^type\s+([A-Za-z_]\w*)\s+(struct|interface)?").unwrap()
    });
    static IMPORT_ONE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"(?m)^import\s+(?:(\w+|\.|_)\s+)?"([^"]+)""#).unwrap());
    static IMPORT_IN_BLOCK: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"(?m)^\s+(?:(\w+|\.|_)\s+)?"([^"]+)"$"#).unwrap());

    let mut out = Extraction::default();
    let starts = line_starts(content);

    for cap in FUNC.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let name = cap.get(2).unwrap().as_str();
        let receiver = cap.get(1).map(|m| m.as_str().to_string());
        let end = brace_block_end(content, whole.start());
        let kind = if receiver.is_some() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        push_symbol(
            &mut out,
            &starts,
            name,
            kind,
            whole.start(),
            end,
            name.chars().next().map(char::is_uppercase).unwrap_or(false),
        );
        if let Some(parent) = receiver {
            out.symbols.last_mut().unwrap().parent = Some(parent);
        }
    }

    for cap in TYPE.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let name = cap.get(1).unwrap().as_str();
        let kind = match cap.get(2).map(|m| m.as_str()) {
            Some("struct") => SymbolKind::Class,
            Some("interface") => SymbolKind::Interface,
            _ => SymbolKind::TypeAlias,
        };
        let end = if cap.get(2).is_some() {
            brace_block_end(content, whole.start())
        } else {
            line_end(content, whole.start())
        };
        push_symbol(
            &mut out,
            &starts,
            name,
            kind,
            whole.start(),
            end,
            name.chars().next().map(char::is_uppercase).unwrap_or(false),
        );
    }

    let in_block = content.find("import (").map(|start| {
        let close = content[start..].find(')').map(|i| start + i).unwrap_or(content.len());
        (start, close)
    });
    for cap in IMPORT_ONE.captures_iter(content) {
        push_go_import(&mut out, &starts, &cap);
    }
    if let Some((start, close)) = in_block {
        for cap in IMPORT_IN_BLOCK.captures_iter(&content[start..close]) {
            let line = line_of(&starts, start + cap.get(0).unwrap().start());
            let source = cap.get(2).unwrap().as_str().to_string();
            out.imports.push(Import {
                source,
                kind: ImportKind::Namespace,
                names: Vec::new(),
                line,
                type_only: false,
            });
        }
    }

    find_calls(&mut out, content, &starts);
    out
}

fn push_go_import(out: &mut Extraction, starts: &[usize], cap: &regex::Captures<'_>) {
    let source = cap.get(2).unwrap().as_str().to_string();
    let kind = match cap.get(1).map(|m| m.as_str()) {
        Some("_") => ImportKind::SideEffect,
        _ => ImportKind::Namespace,
    };
    out.imports.push(Import {
        source,
        kind,
        names: Vec::new(),
        line: line_of(starts, cap.get(0).unwrap().start()),
        type_only: false,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ts_class_and_function() {
        let src = "export class Store {\n  read() { return 1; }\n}\n\nexport async function load() {\n  return new Store();\n}\n";
        let out = extract(Language::TypeScript, src);

        let class = out.symbols.iter().find(|s| s.name == "Store").unwrap();
        assert_eq!(class.kind, SymbolKind::Class);
        assert!(class.exported);
        assert_eq!(class.start_line, 1);
        assert_eq!(class.end_line, 3);

        let func = out.symbols.iter().find(|s| s.name == "load").unwrap();
        assert_eq!(func.kind, SymbolKind::Function);
        assert!(func.is_async);
    }

    #[test]
    fn ts_imports_parsed() {
        let src = "import { AuthService } from './auth';\nimport React from 'react';\nimport * as path from 'path';\nimport './side-effect';\n";
        let out = extract(Language::TypeScript, src);
        assert_eq!(out.imports.len(), 4);
        assert_eq!(out.imports[0].source, "./auth");
        assert_eq!(out.imports[0].names[0].name, "AuthService");
        assert_eq!(out.imports[1].kind, ImportKind::Default);
        assert_eq!(out.imports[2].kind, ImportKind::Namespace);
        assert_eq!(out.imports[3].kind, ImportKind::SideEffect);
    }

    #[test]
    fn python_class_with_methods() {
        let src = "class Mammal(Animal):\n    def speak(self):\n        return noise()\n\ndef feed():\n    pass\n";
        let out = extract(Language::Python, src);

        let class = out.symbols.iter().find(|s| s.name == "Mammal").unwrap();
        assert_eq!(class.extends, vec!["Animal".to_string()]);

        let method = out.symbols.iter().find(|s| s.name == "speak").unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.parent.as_deref(), Some("Mammal"));

        let func = out.symbols.iter().find(|s| s.name == "feed").unwrap();
        assert_eq!(func.kind, SymbolKind::Function);
    }

    #[test]
    fn caller_attribution_from_spans() {
        let src = "function outer() {\n  inner();\n}\n";
        let out = extract(Language::JavaScript, src);
        let call = out.calls.iter().find(|c| c.callee == "inner").unwrap();
        assert_eq!(call.caller.as_deref(), Some("outer"));
    }

    #[test]
    fn go_method_receiver_becomes_parent() {
        let src = "func (s *Server) Start() {\n\tlisten()\n}\n";
        let out = extract(Language::Go, src);
        let method = out.symbols.iter().find(|s| s.name == "Start").unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.parent.as_deref(), Some("Server"));
        assert!(method.exported);
    }
}
