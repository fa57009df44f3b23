pub mod file_info;
pub mod indexer;
pub mod persistence;
pub mod resolver;
pub mod walker;

pub use file_info::{content_hash, utc_timestamp};
pub use indexer::{Indexer, SymbolSearchOptions};
pub use persistence::{CacheLock, SnapshotStore};
pub use resolver::resolve_import;
pub use walker::{FileWalker, SkipReason, SkippedFile, WalkOutcome};
