//! quarry: local code intelligence for LLM context.
//!
//! Watches a working tree, maintains an incremental index of symbols
//! and content-addressed chunks, and answers retrieval and graph
//! queries over it. The core pipeline:
//!
//! parse (tree-sitter, regex fallback) -> chunk (non-whitespace budget)
//! -> index (content-hash incremental) -> graph + BM25 -> hybrid
//! retrieval with token-budget packing.

pub mod config;
pub mod error;
pub mod graph;
pub mod indexing;
pub mod logging;
pub mod parsing;
pub mod retrieve;
pub mod search;
pub mod types;
pub mod vector;

pub use config::Settings;
pub use error::{IndexError, IndexResult, ParseError, RetrievalError, RetrievalResult};
pub use graph::{EdgeType, GraphBuilder, KnowledgeGraph, NodeFilter, NodeType, TraversalOptions};
pub use indexing::{Indexer, SymbolSearchOptions};
pub use parsing::{Language, ParseResult, SourceParser};
pub use retrieve::{RetrieveOptions, RetrievedContext, Retriever};
pub use search::{Bm25Index, tokenize};
pub use types::{
    ChangeReport, FileIndex, ProjectIndex, SemanticChunk, Symbol, SymbolKind, SymbolRef,
};
pub use vector::{EmbeddingProvider, FlatVectorStore, VectorStore};
