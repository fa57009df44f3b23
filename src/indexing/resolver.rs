//! Relative-import resolution with extension probing.
//!
//! Resolves an import specifier against the importing file's directory
//! and the set of indexed paths. External packages (no `.`/`/` prefix)
//! are ignored; the dependency graph only tracks files inside the tree.

use std::collections::BTreeMap;

/// Extensions probed when a specifier names no file directly.
const PROBE_EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".js", ".jsx", ".mts", ".cts", ".mjs", ".cjs", ".py", ".rs", ".go",
];

/// Index-file probes for directory imports.
const PROBE_INDEXES: &[&str] = &[
    "/index.ts",
    "/index.tsx",
    "/index.js",
    "/index.jsx",
    "/__init__.py",
    "/mod.rs",
];

/// Resolve `source` imported from `from_path` to an indexed file path.
///
/// `files` is the candidate set, keyed by repo-relative path. Returns
/// `None` for external packages and unresolvable specifiers.
pub fn resolve_import<V>(
    from_path: &str,
    source: &str,
    files: &BTreeMap<String, V>,
) -> Option<String> {
    if !source.starts_with('.') && !source.starts_with('/') {
        return None;
    }

    let base_dir = match from_path.rfind('/') {
        Some(pos) => &from_path[..pos],
        None => "",
    };
    let joined = if let Some(stripped) = source.strip_prefix('/') {
        stripped.to_string()
    } else if base_dir.is_empty() {
        source.to_string()
    } else {
        format!("{base_dir}/{source}")
    };
    let normalized = normalize(&joined)?;

    if files.contains_key(&normalized) {
        return Some(normalized);
    }
    for ext in PROBE_EXTENSIONS {
        let candidate = format!("{normalized}{ext}");
        if files.contains_key(&candidate) {
            return Some(candidate);
        }
    }
    for index in PROBE_INDEXES {
        let candidate = format!("{normalized}{index}");
        if files.contains_key(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Collapse `.` and `..` segments. Returns `None` when `..` escapes the
/// repo root.
fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> BTreeMap<String, ()> {
        paths.iter().map(|p| (p.to_string(), ())).collect()
    }

    #[test]
    fn sibling_import_with_extension_probe() {
        let set = files(&["src/auth.ts", "src/api.ts"]);
        assert_eq!(
            resolve_import("src/api.ts", "./auth", &set),
            Some("src/auth.ts".to_string())
        );
    }

    #[test]
    fn parent_directory_import() {
        let set = files(&["src/util.ts", "src/sub/feature.ts"]);
        assert_eq!(
            resolve_import("src/sub/feature.ts", "../util", &set),
            Some("src/util.ts".to_string())
        );
    }

    #[test]
    fn directory_import_probes_index() {
        let set = files(&["src/auth/index.ts", "src/api.ts"]);
        assert_eq!(
            resolve_import("src/api.ts", "./auth", &set),
            Some("src/auth/index.ts".to_string())
        );
    }

    #[test]
    fn external_package_ignored() {
        let set = files(&["src/api.ts"]);
        assert_eq!(resolve_import("src/api.ts", "react", &set), None);
        assert_eq!(resolve_import("src/api.ts", "@scope/pkg", &set), None);
    }

    #[test]
    fn escaping_root_is_unresolvable() {
        let set = files(&["api.ts"]);
        assert_eq!(resolve_import("api.ts", "../../outside", &set), None);
    }

    #[test]
    fn exact_path_wins_over_probes() {
        let set = files(&["src/auth.ts", "src/auth.ts.ts"]);
        assert_eq!(
            resolve_import("src/api.ts", "./auth.ts", &set),
            Some("src/auth.ts".to_string())
        );
    }
}
