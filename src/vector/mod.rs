//! Vector store and embedding capabilities.
//!
//! The core treats dense retrieval as a capability, not a requirement:
//! both traits here are optional collaborators wired in by the caller.
//! `FlatVectorStore` is the in-memory reference implementation with
//! brute-force cosine search, enough for tests and small corpora.

use crate::types::SemanticChunk;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One dense hit: chunk id and cosine similarity in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    pub score: f32,
}

/// Filter forwarded from retrieval options.
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    /// Restrict to chunks of this language id.
    pub language: Option<String>,
}

/// A store of fixed-dimension chunk embeddings. Externally provided;
/// errors degrade retrieval to the sparse tier.
pub trait VectorStore: Send + Sync {
    fn initialize(&mut self) -> Result<(), String>;

    /// Register chunks (with embeddings produced by the caller's
    /// embedding provider).
    fn add(&mut self, chunks: &[(SemanticChunk, Vec<f32>)]) -> Result<(), String>;

    /// Nearest neighbors by cosine similarity, best first.
    fn search(&self, vector: &[f32], k: usize, filter: &VectorFilter) -> Result<Vec<VectorHit>, String>;

    fn count(&self) -> usize;

    fn clear(&mut self);
}

/// Produces embeddings for text. Externally provided.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, String>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Embedding dimension, fixed per provider.
    fn dimension(&self) -> usize;
}

/// Cosine similarity of two equal-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Brute-force in-memory vector store.
#[derive(Default)]
pub struct FlatVectorStore {
    dimension: Option<usize>,
    entries: Vec<(String, String, Vec<f32>)>,
    by_id: HashMap<String, usize>,
}

impl FlatVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorStore for FlatVectorStore {
    fn initialize(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn add(&mut self, chunks: &[(SemanticChunk, Vec<f32>)]) -> Result<(), String> {
        for (chunk, vector) in chunks {
            match self.dimension {
                None => self.dimension = Some(vector.len()),
                Some(dim) if dim != vector.len() => {
                    return Err(format!(
                        "dimension mismatch: store has {dim}, got {}",
                        vector.len()
                    ));
                }
                _ => {}
            }
            if let Some(&idx) = self.by_id.get(&chunk.id) {
                self.entries[idx] = (
                    chunk.id.clone(),
                    chunk.metadata.language.clone(),
                    vector.clone(),
                );
            } else {
                self.by_id.insert(chunk.id.clone(), self.entries.len());
                self.entries.push((
                    chunk.id.clone(),
                    chunk.metadata.language.clone(),
                    vector.clone(),
                ));
            }
        }
        Ok(())
    }

    fn search(&self, vector: &[f32], k: usize, filter: &VectorFilter) -> Result<Vec<VectorHit>, String> {
        if let Some(dim) = self.dimension {
            if vector.len() != dim {
                return Err(format!("query dimension {} != store {dim}", vector.len()));
            }
        }
        let mut hits: Vec<VectorHit> = self
            .entries
            .iter()
            .filter(|(_, language, _)| {
                filter
                    .language
                    .as_deref()
                    .map(|l| language == l)
                    .unwrap_or(true)
            })
            .map(|(id, _, stored)| VectorHit {
                id: id.clone(),
                score: cosine_similarity(vector, stored),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn count(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.by_id.clear();
        self.dimension = None;
    }
}

/// Deterministic hash-bucket embedder for tests: texts sharing tokens
/// land near each other. Not a semantic model.
#[cfg(test)]
pub struct HashedEmbedding {
    pub dimension: usize,
}

#[cfg(test)]
impl EmbeddingProvider for HashedEmbedding {
    fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vector = vec![0.0f32; self.dimension];
        for token in crate::search::tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkKind, ChunkMetadata};

    fn chunk(id: &str, language: &str) -> SemanticChunk {
        SemanticChunk {
            id: id.to_string(),
            content: String::new(),
            kind: ChunkKind::Function,
            file_path: "src/x.ts".to_string(),
            start_line: 1,
            end_line: 1,
            primary_symbol: None,
            symbols: Vec::new(),
            import_sources: Vec::new(),
            token_estimate: 1,
            non_ws_size: 1,
            metadata: ChunkMetadata {
                language: language.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.5, 0.2, 0.1];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn flat_store_ranks_by_similarity() {
        let mut store = FlatVectorStore::new();
        store
            .add(&[
                (chunk("near", "typescript"), vec![1.0, 0.0, 0.0]),
                (chunk("far", "typescript"), vec![0.0, 1.0, 0.0]),
            ])
            .unwrap();

        let hits = store
            .search(&[0.9, 0.1, 0.0], 2, &VectorFilter::default())
            .unwrap();
        assert_eq!(hits[0].id, "near");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn language_filter_applies() {
        let mut store = FlatVectorStore::new();
        store
            .add(&[
                (chunk("ts", "typescript"), vec![1.0, 0.0]),
                (chunk("py", "python"), vec![1.0, 0.0]),
            ])
            .unwrap();

        let hits = store
            .search(
                &[1.0, 0.0],
                10,
                &VectorFilter {
                    language: Some("python".to_string()),
                },
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "py");
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let mut store = FlatVectorStore::new();
        store.add(&[(chunk("a", "rust"), vec![1.0, 0.0])]).unwrap();
        assert!(store.add(&[(chunk("b", "rust"), vec![1.0])]).is_err());
        assert!(store.search(&[1.0], 1, &VectorFilter::default()).is_err());
    }

    #[test]
    fn hashed_embedding_clusters_shared_tokens() {
        let provider = HashedEmbedding { dimension: 64 };
        let a = provider.embed("token refresh session").unwrap();
        let b = provider.embed("session token expiry").unwrap();
        let c = provider.embed("matrix determinant kernel").unwrap();
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }
}
