//! File system walker for discovering source files to index.
//!
//! The ignore set is the union of a built-in exclusion list, the repo's
//! .gitignore (honored even outside a git checkout), and the
//! project-level `.quarryignore` file. Files over the configured size
//! cap or with a NUL byte in their first 8 KiB are reported as skipped.
//! Symbolic links are not followed unless configured.

use crate::config::{IGNORE_FILE_NAME, Settings};
use crate::parsing::Language;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directories and lockfiles that are never worth indexing.
const BUILTIN_EXCLUDES: &[&str] = &[
    "node_modules",
    ".git",
    "target",
    "dist",
    "build",
    "out",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    "coverage",
    ".next",
    ".quarry",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "go.sum",
    "poetry.lock",
    "uv.lock",
];

/// How many leading bytes are sniffed for NUL to detect binaries.
const BINARY_SNIFF_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    TooLarge { size: u64, limit: u64 },
    Binary,
    Unreadable,
}

/// A candidate file the walker refused, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

/// Result of one enumeration pass.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Absolute paths of files to index, in walk order.
    pub files: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

/// Walks directories to find source files to index.
pub struct FileWalker {
    settings: Arc<Settings>,
}

impl FileWalker {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Enumerate files matching a known language extension under `root`.
    pub fn walk(&self, root: &Path) -> WalkOutcome {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(self.settings.indexing.follow_symlinks)
            .require_git(false)
            .add_custom_ignore_filename(IGNORE_FILE_NAME);

        let mut override_builder = ignore::overrides::OverrideBuilder::new(root);
        for pattern in BUILTIN_EXCLUDES {
            // Leading ! marks an exclusion in override position.
            let _ = override_builder.add(&format!("!{pattern}"));
        }
        for pattern in &self.settings.indexing.ignore_patterns {
            if let Err(e) = override_builder.add(&format!("!{pattern}")) {
                tracing::warn!(pattern = %pattern, error = %e, "invalid ignore pattern");
            }
        }
        if let Ok(overrides) = override_builder.build() {
            builder.overrides(overrides);
        }

        let max_size = self.settings.indexing.max_file_size;
        let mut outcome = WalkOutcome::default();

        for entry in builder.build().filter_map(Result::ok) {
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();

            let Some(lang) = Language::from_path(path) else {
                continue;
            };
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if self.settings.language_for_extension(ext).is_none() {
                tracing::trace!(path = %path.display(), lang = lang.id(), "language disabled");
                continue;
            }

            let rel = rel_display(root, path);
            match entry.metadata() {
                Ok(meta) if meta.len() > max_size => {
                    outcome.skipped.push(SkippedFile {
                        path: rel,
                        reason: SkipReason::TooLarge {
                            size: meta.len(),
                            limit: max_size,
                        },
                    });
                    continue;
                }
                Err(_) => {
                    outcome.skipped.push(SkippedFile {
                        path: rel,
                        reason: SkipReason::Unreadable,
                    });
                    continue;
                }
                _ => {}
            }

            match looks_binary(path) {
                Ok(true) => {
                    outcome.skipped.push(SkippedFile {
                        path: rel,
                        reason: SkipReason::Binary,
                    });
                }
                Ok(false) => outcome.files.push(path.to_path_buf()),
                Err(_) => {
                    outcome.skipped.push(SkippedFile {
                        path: rel,
                        reason: SkipReason::Unreadable,
                    });
                }
            }
        }

        outcome
    }

    /// Count files that would be indexed (useful for dry runs).
    pub fn count_files(&self, root: &Path) -> usize {
        self.walk(root).files.len()
    }
}

/// NUL byte in the first 8 KiB marks a binary.
fn looks_binary(path: &Path) -> std::io::Result<bool> {
    let mut file = std::fs::File::open(path)?;
    let mut buf = [0u8; BINARY_SNIFF_BYTES];
    let n = file.read(&mut buf)?;
    Ok(buf[..n].contains(&0))
}

/// Repo-relative path with forward slashes.
pub fn rel_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn walker() -> FileWalker {
        FileWalker::new(Arc::new(Settings::default()))
    }

    #[test]
    fn finds_only_language_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("main.ts"), "export const a = 1;").unwrap();
        fs::write(root.join("lib.py"), "x = 1").unwrap();
        fs::write(root.join("README.md"), "# hi").unwrap();

        let outcome = walker().walk(root);
        assert_eq!(outcome.files.len(), 2);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn built_in_excludes_apply() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(root.join("app.js"), "const a = 1;").unwrap();

        let outcome = walker().walk(root);
        assert_eq!(outcome.files.len(), 1);
        assert!(outcome.files[0].ends_with("app.js"));
    }

    #[test]
    fn gitignore_respected_without_git() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join(".gitignore"), "generated.ts\n").unwrap();
        fs::write(root.join("generated.ts"), "export const g = 1;").unwrap();
        fs::write(root.join("kept.ts"), "export const k = 1;").unwrap();

        let outcome = walker().walk(root);
        assert_eq!(outcome.files.len(), 1);
        assert!(outcome.files[0].ends_with("kept.ts"));
    }

    #[test]
    fn quarryignore_respected() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join(IGNORE_FILE_NAME), "skipme/**\n").unwrap();
        fs::create_dir_all(root.join("skipme")).unwrap();
        fs::write(root.join("skipme/a.ts"), "export const a = 1;").unwrap();
        fs::write(root.join("b.ts"), "export const b = 1;").unwrap();

        let outcome = walker().walk(root);
        assert_eq!(outcome.files.len(), 1);
        assert!(outcome.files[0].ends_with("b.ts"));
    }

    #[test]
    fn oversized_file_reported_as_skipped() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let mut settings = Settings::default();
        settings.indexing.max_file_size = 16;
        fs::write(root.join("big.ts"), "const x = 'aaaaaaaaaaaaaaaaaaaaaa';").unwrap();

        let outcome = FileWalker::new(Arc::new(settings)).walk(root);
        assert!(outcome.files.is_empty());
        assert_eq!(outcome.skipped.len(), 1);
        assert!(matches!(
            outcome.skipped[0].reason,
            SkipReason::TooLarge { .. }
        ));
    }

    #[test]
    fn nul_byte_marks_binary() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("data.ts"), b"const x = \x00\x01;").unwrap();

        let outcome = walker().walk(root);
        assert!(outcome.files.is_empty());
        assert_eq!(outcome.skipped[0].reason, SkipReason::Binary);
    }
}
