//! Configuration for the code intelligence core.
//!
//! Layered configuration:
//! - Default values
//! - TOML file under the cache directory (`.quarry/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables are prefixed with `QUARRY_` and use double
//! underscores to separate nested levels:
//! - `QUARRY_INDEXING__PARALLEL_THREADS=8` sets `indexing.parallel_threads`
//! - `QUARRY_CHUNKING__TARGET_SIZE=1200` sets `chunking.target_size`
//! - `QUARRY_RETRIEVAL__MAX_TOKENS=4000` sets `retrieval.max_tokens`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the private cache directory under the project root. Every
/// code path that touches disk goes through this one constant.
pub const CACHE_DIR_NAME: &str = ".quarry";

/// Name of the project-level ignore file (same format as .gitignore).
pub const IGNORE_FILE_NAME: &str = ".quarryignore";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Project root. Defaults to the current directory at load time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub bm25: Bm25Config,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Language-specific settings keyed by language id.
    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Number of parallel threads for re-parsing changed files.
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    /// Extra ignore globs, unioned with the built-in exclusions and the
    /// repo's ignore files.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Files above this size are skipped and reported.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Whether the walker follows symbolic links.
    #[serde(default = "default_false")]
    pub follow_symlinks: bool,

    /// Grammar load deadline in seconds; a grammar that misses it is
    /// marked unavailable for the rest of the process.
    #[serde(default = "default_grammar_timeout")]
    pub grammar_timeout_secs: u64,

    /// Keep per-hash parse results under cache/parse/.
    #[serde(default = "default_true")]
    pub parse_cache: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChunkingConfig {
    /// Preferred chunk size in non-whitespace characters.
    #[serde(default = "default_chunk_target")]
    pub target_size: u32,

    /// Hard floor; spans below it are merged or discarded.
    #[serde(default = "default_chunk_min")]
    pub min_non_ws_chars: u32,

    /// Hard ceiling; nodes above it are recursively broken.
    #[serde(default = "default_chunk_max")]
    pub max_non_ws_chars: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Bm25Config {
    #[serde(default = "default_k1")]
    pub k1: f32,

    #[serde(default = "default_b")]
    pub b: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    /// Token budget for packed context.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Score floor when fusing sparse and dense rankings.
    #[serde(default = "default_min_score_hybrid")]
    pub min_score_hybrid: f32,

    /// Score floor when only BM25 is available.
    #[serde(default = "default_min_score_sparse")]
    pub min_score_sparse: f32,

    /// Reciprocal rank fusion constant.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,

    /// How many candidates to pull from each backend before fusing.
    #[serde(default = "default_overfetch")]
    pub overfetch: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level filter (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `indexing = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LanguageConfig {
    /// Whether this language is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// File extensions for this language
    #[serde(default)]
    pub extensions: Vec<String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_parallel_threads() -> usize {
    num_cpus::get()
}
fn default_max_file_size() -> u64 {
    1024 * 1024
}
fn default_grammar_timeout() -> u64 {
    10
}
fn default_chunk_target() -> u32 {
    800
}
fn default_chunk_min() -> u32 {
    50
}
fn default_chunk_max() -> u32 {
    1600
}
fn default_k1() -> f32 {
    1.2
}
fn default_b() -> f32 {
    0.75
}
fn default_max_tokens() -> u32 {
    8000
}
fn default_min_score_hybrid() -> f32 {
    0.3
}
fn default_min_score_sparse() -> f32 {
    0.1
}
fn default_rrf_k() -> u32 {
    60
}
fn default_overfetch() -> usize {
    50
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            indexing: IndexingConfig::default(),
            chunking: ChunkingConfig::default(),
            bm25: Bm25Config::default(),
            retrieval: RetrievalConfig::default(),
            logging: LoggingConfig::default(),
            languages: default_languages(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            ignore_patterns: Vec::new(),
            max_file_size: default_max_file_size(),
            follow_symlinks: false,
            grammar_timeout_secs: default_grammar_timeout(),
            parse_cache: true,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_size: default_chunk_target(),
            min_non_ws_chars: default_chunk_min(),
            max_non_ws_chars: default_chunk_max(),
        }
    }
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            min_score_hybrid: default_min_score_hybrid(),
            min_score_sparse: default_min_score_sparse(),
            rrf_k: default_rrf_k(),
            overfetch: default_overfetch(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    let mut langs = HashMap::new();

    for (key, exts) in [
        ("typescript", vec!["ts", "tsx", "mts", "cts"]),
        ("javascript", vec!["js", "jsx", "mjs", "cjs"]),
        ("python", vec!["py", "pyi"]),
        ("rust", vec!["rs"]),
        ("go", vec!["go"]),
    ] {
        langs.insert(
            key.to_string(),
            LanguageConfig {
                enabled: true,
                extensions: exts.into_iter().map(str::to_string).collect(),
            },
        );
    }

    langs
}

impl Settings {
    /// Load configuration for the given project root.
    pub fn load_for(root: &Path) -> Result<Self, figment::Error> {
        let config_path = root.join(CACHE_DIR_NAME).join("settings.toml");

        let mut settings: Settings = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("QUARRY_").split("__"))
            .extract()?;

        if settings.workspace_root.is_none() {
            settings.workspace_root = Some(root.to_path_buf());
        }
        Ok(settings)
    }

    /// Load configuration rooted at the current directory.
    pub fn load() -> Result<Self, figment::Error> {
        let cwd = std::env::current_dir().map_err(|e| figment::Error::from(e.to_string()))?;
        Self::load_for(&cwd)
    }

    /// The project root this configuration applies to.
    pub fn root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Absolute path of the cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.root().join(CACHE_DIR_NAME)
    }

    /// Language id for a file extension, honoring per-language enable
    /// flags and extension overrides.
    pub fn language_for_extension(&self, ext: &str) -> Option<&str> {
        let ext = ext.to_lowercase();
        self.languages
            .iter()
            .find(|(_, cfg)| cfg.enabled && cfg.extensions.iter().any(|e| *e == ext))
            .map(|(key, _)| key.as_str())
    }

    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), crate::IndexError> {
        let c = &self.chunking;
        if c.min_non_ws_chars >= c.max_non_ws_chars {
            return Err(crate::IndexError::ConfigError {
                reason: format!(
                    "chunking.min_non_ws_chars ({}) must be below max_non_ws_chars ({})",
                    c.min_non_ws_chars, c.max_non_ws_chars
                ),
            });
        }
        if c.target_size > c.max_non_ws_chars {
            return Err(crate::IndexError::ConfigError {
                reason: format!(
                    "chunking.target_size ({}) must not exceed max_non_ws_chars ({})",
                    c.target_size, c.max_non_ws_chars
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(crate::IndexError::ConfigError {
                reason: format!("bm25.b ({}) must be within [0, 1]", self.bm25.b),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.retrieval.max_tokens, 8000);
        assert_eq!(settings.retrieval.rrf_k, 60);
        assert_eq!(settings.chunking.min_non_ws_chars, 50);
        assert_eq!(settings.indexing.max_file_size, 1024 * 1024);
    }

    #[test]
    fn extension_lookup_respects_enabled_flag() {
        let mut settings = Settings::default();
        assert_eq!(settings.language_for_extension("ts"), Some("typescript"));
        assert_eq!(settings.language_for_extension("TS"), Some("typescript"));

        settings.languages.get_mut("typescript").unwrap().enabled = false;
        assert_eq!(settings.language_for_extension("ts"), None);
    }

    #[test]
    fn invalid_chunk_window_rejected() {
        let mut settings = Settings::default();
        settings.chunking.min_non_ws_chars = 2000;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        use std::fs;
        let dir = tempfile::TempDir::new().unwrap();
        let cache = dir.path().join(CACHE_DIR_NAME);
        fs::create_dir_all(&cache).unwrap();
        fs::write(
            cache.join("settings.toml"),
            "[retrieval]\nmax_tokens = 1234\n",
        )
        .unwrap();

        let settings = Settings::load_for(dir.path()).unwrap();
        assert_eq!(settings.retrieval.max_tokens, 1234);
        assert_eq!(settings.cache_dir(), cache);
    }
}
