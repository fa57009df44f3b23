//! Error types for the code intelligence core.
//!
//! Structured errors via thiserror. Every variant carries a stable
//! machine code (for callers that format their own messages) and
//! recovery suggestions where a remediation exists.
//!
//! Propagation policy: errors scoped to a single file become
//! `Diagnostic`s on the resulting `FileIndex` and the batch continues;
//! errors scoped to a retrieval backend degrade to the next tier
//! silently; errors that compromise the whole index propagate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the indexer and its persistence layer.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Cache directory or snapshot missing.
    #[error("No index snapshot found at '{path}'")]
    NotFound { path: PathBuf },

    /// Snapshot exists but cannot be read back.
    #[error("Index snapshot at '{path}' is corrupted: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    /// Snapshot schema does not match this build.
    #[error("Index snapshot schema {found} does not match expected {expected}")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Another process holds the cache directory lock.
    #[error("Cache directory '{path}' is locked by another process")]
    CacheLocked { path: PathBuf },

    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },

    /// Indexing was cancelled at a batch boundary; partial progress was
    /// discarded and the generation did not advance.
    #[error("Indexing cancelled")]
    Cancelled,

    /// Wraps unexpected conditions. Seeing this is a bug.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IndexError {
    /// Stable machine-readable code for each variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "index_not_found",
            Self::Corrupted { .. } => "index_corrupted",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::FileRead { .. } => "file_read",
            Self::FileWrite { .. } => "file_write",
            Self::CacheLocked { .. } => "cache_locked",
            Self::ConfigError { .. } => "config_invalid",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
        }
    }

    /// Get recovery suggestions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::NotFound { .. } => vec![
                "Run a full index to create the snapshot",
                "Check that the cache directory has not been deleted",
            ],
            Self::Corrupted { .. } | Self::SchemaMismatch { .. } => vec![
                "Delete the cache directory and re-index from scratch",
                "Check for disk errors or filesystem corruption",
            ],
            Self::CacheLocked { .. } => vec![
                "Wait for the other quarry process to finish",
                "Remove the stale .lock file if no other process is running",
            ],
            Self::FileRead { .. } => vec![
                "Check that the file exists and you have read permissions",
                "Ensure the file is not locked by another process",
            ],
            Self::FileWrite { .. } => vec![
                "Check disk space and permissions in the cache directory",
            ],
            _ => vec![],
        }
    }
}

/// Errors scoped to parsing a single file. Non-fatal: the file is
/// recorded with empty symbols and a diagnostic.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to parse '{path}': {reason}")]
    Failed { path: PathBuf, reason: String },

    #[error("No parser available for '{path}'")]
    UnsupportedLanguage { path: PathBuf },

    #[error("Grammar for {language} failed to load: {reason}")]
    GrammarUnavailable { language: String, reason: String },

    #[error("Invalid UTF-8 in '{path}'")]
    InvalidUtf8 { path: PathBuf },
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Failed { .. } => "parse_failed",
            Self::UnsupportedLanguage { .. } => "unsupported_language",
            Self::GrammarUnavailable { .. } => "grammar_unavailable",
            Self::InvalidUtf8 { .. } => "invalid_utf8",
        }
    }
}

/// Per-file filesystem failures. Non-fatal: the file is skipped.
#[derive(Error, Debug)]
pub enum FileSystemError {
    #[error("File not found: '{path}'")]
    NotFound { path: PathBuf },

    #[error("Permission denied: '{path}'")]
    PermissionDenied { path: PathBuf },
}

/// Errors surfaced by the retriever.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Query is empty")]
    QueryEmpty,

    /// Informational: results exist but all scored below the floor.
    #[error("No result cleared the score threshold {min_score}")]
    LowConfidence { min_score: f32 },

    #[error("Retrieval timed out after {ms} ms")]
    Timeout { ms: u64 },
}

impl RetrievalError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::QueryEmpty => "query_empty",
            Self::LowConfidence { .. } => "low_confidence",
            Self::Timeout { .. } => "timeout",
        }
    }
}

/// Result type alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for parse operations.
pub type ParseOutcome<T> = Result<T, ParseError>;

/// Result type alias for retrieval operations.
pub type RetrievalResult<T> = Result<T, RetrievalError>;
