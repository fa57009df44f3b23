//! Hybrid retrieval over the chunk corpus.
//!
//! Dispatches to the best available backend: BM25 plus a vector store
//! fuse via Reciprocal Rank Fusion; BM25 alone ranks sparsely; with
//! neither, a deterministic keyword fallback scores substring and
//! symbol-name matches. Backend failures degrade to the next tier
//! silently, recording a diagnostic. Selected chunks are packed into a
//! token budget, score-descending, stopping at the first overflow.

use crate::config::RetrievalConfig;
use crate::error::{RetrievalError, RetrievalResult};
use crate::search::Bm25Index;
use crate::types::{Diagnostic, SemanticChunk};
use crate::vector::{EmbeddingProvider, VectorFilter, VectorStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which backend produced a `RetrievedContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalTier {
    Hybrid,
    Sparse,
    Keyword,
}

/// Options for one retrieval call.
#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    /// Token budget for the packed context.
    pub max_tokens: u32,
    /// Score floor in the fused (normalized) ranking. When unset, the
    /// configured default for the active tier applies.
    pub min_score: Option<f32>,
    /// Substring allow-list on chunk paths.
    pub files: Vec<String>,
    /// Globs whose matches are packed first, relative order preserved.
    pub priority_files: Vec<String>,
    /// Forwarded to the vector store filter.
    pub language: Option<String>,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            max_tokens: 8000,
            min_score: None,
            files: Vec::new(),
            priority_files: Vec::new(),
            language: None,
        }
    }
}

/// One selected chunk with its fused score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: SemanticChunk,
    pub score: f32,
}

/// The packed result of a retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub query: String,
    pub tier: RetrievalTier,
    pub chunks: Vec<ScoredChunk>,
    pub token_count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl RetrievedContext {
    fn empty(query: &str, tier: RetrievalTier) -> Self {
        Self {
            query: query.to_string(),
            tier,
            chunks: Vec::new(),
            token_count: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Concatenate selected chunks with `// File:` headers.
    pub fn format(&self) -> String {
        self.chunks
            .iter()
            .map(|scored| {
                format!(
                    "// File: {}:{}-{}\n{}",
                    scored.chunk.file_path,
                    scored.chunk.start_line,
                    scored.chunk.end_line,
                    scored.chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Reciprocal rank fusion: `score(d) = Σ 1 / (k + rank_i(d))` over the
/// input rankings, rank 1-based; documents absent from a ranking
/// contribute nothing from it. Output sorts by score descending, ties
/// lexicographic by document id.
pub fn rrf_fuse(rankings: &[Vec<String>], k: u32) -> Vec<(String, f64)> {
    let mut scores: HashMap<String, f64> = HashMap::new();
    for ranking in rankings {
        for (i, id) in ranking.iter().enumerate() {
            *scores.entry(id.clone()).or_insert(0.0) += 1.0 / (f64::from(k) + (i as f64 + 1.0));
        }
    }
    let mut fused: Vec<(String, f64)> = scores.into_iter().collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    fused
}

/// The retrieval engine. Vector search is a capability: both the store
/// and the embedder must be present for the hybrid tier to exist.
pub struct Retriever {
    config: RetrievalConfig,
    vector_store: Option<Box<dyn VectorStore>>,
    embedder: Option<Box<dyn EmbeddingProvider>>,
}

impl Retriever {
    pub fn new(config: RetrievalConfig) -> Self {
        Self {
            config,
            vector_store: None,
            embedder: None,
        }
    }

    /// Attach the dense backend.
    pub fn with_vector_search(
        mut self,
        store: Box<dyn VectorStore>,
        embedder: Box<dyn EmbeddingProvider>,
    ) -> Self {
        self.vector_store = Some(store);
        self.embedder = Some(embedder);
        self
    }

    pub fn has_vector_search(&self) -> bool {
        self.vector_store.is_some() && self.embedder.is_some()
    }

    /// Mutable access to the attached store, for embedding ingestion.
    pub fn vector_store_mut(&mut self) -> Option<&mut Box<dyn VectorStore>> {
        self.vector_store.as_mut()
    }

    /// Retrieve context for a query over the given chunk corpus.
    ///
    /// Never fails on empty result sets; returns an empty context with
    /// `token_count == 0`.
    pub fn retrieve(
        &self,
        query: &str,
        corpus: &[SemanticChunk],
        bm25: Option<&Bm25Index>,
        options: &RetrieveOptions,
    ) -> RetrievalResult<RetrievedContext> {
        if query.trim().is_empty() {
            return Err(RetrievalError::QueryEmpty);
        }

        let by_id: HashMap<&str, &SemanticChunk> =
            corpus.iter().map(|c| (c.id.as_str(), c)).collect();
        let mut diagnostics = Vec::new();

        let sparse_usable = bm25.map(|b| !b.is_empty()).unwrap_or(false);

        // Hybrid tier.
        if sparse_usable && self.has_vector_search() {
            match self.dense_ranking(query, options) {
                Ok(dense) => {
                    let bm25 = bm25.expect("sparse_usable implies bm25");
                    let sparse: Vec<String> = bm25
                        .search(query, self.config.overfetch)
                        .into_iter()
                        .map(|h| h.id)
                        .collect();
                    let fused = rrf_fuse(&[sparse, dense], self.config.rrf_k);
                    let min_score = options.min_score.unwrap_or(self.config.min_score_hybrid);
                    let mut context = self.pack(
                        query,
                        RetrievalTier::Hybrid,
                        fused,
                        &by_id,
                        min_score,
                        options,
                    );
                    context.diagnostics.append(&mut diagnostics);
                    return Ok(context);
                }
                Err(reason) => {
                    tracing::debug!(reason = %reason, "vector backend failed; degrading to sparse");
                    diagnostics.push(Diagnostic::info(format!(
                        "vector backend unavailable ({reason}); degraded to BM25"
                    )));
                }
            }
        }

        // Sparse tier.
        if sparse_usable {
            let bm25 = bm25.expect("sparse_usable implies bm25");
            let hits = bm25.search(query, self.config.overfetch);
            let ranked: Vec<(String, f64)> = hits
                .into_iter()
                .map(|h| (h.id, f64::from(h.score)))
                .collect();
            let min_score = options.min_score.unwrap_or(self.config.min_score_sparse);
            let mut context = self.pack(
                query,
                RetrievalTier::Sparse,
                ranked,
                &by_id,
                min_score,
                options,
            );
            context.diagnostics.append(&mut diagnostics);
            return Ok(context);
        }

        // Keyword fallback: deterministic, no index required.
        let ranked = keyword_ranking(query, corpus);
        let mut context = self.pack(
            query,
            RetrievalTier::Keyword,
            ranked,
            &by_id,
            options.min_score.unwrap_or(0.0),
            options,
        );
        if !sparse_usable {
            context
                .diagnostics
                .push(Diagnostic::info("BM25 index not built; keyword fallback used"));
        }
        context.diagnostics.append(&mut diagnostics);
        Ok(context)
    }

    fn dense_ranking(&self, query: &str, options: &RetrieveOptions) -> Result<Vec<String>, String> {
        let embedder = self.embedder.as_ref().ok_or("no embedding provider")?;
        let store = self.vector_store.as_ref().ok_or("no vector store")?;
        let vector = embedder.embed(query)?;
        let filter = VectorFilter {
            language: options.language.clone(),
        };
        let hits = store.search(&vector, self.config.overfetch, &filter)?;
        Ok(hits.into_iter().map(|h| h.id).collect())
    }

    /// Filter by score floor and allow-list, then pack into the token
    /// budget. Scores are normalized by the top score before the floor
    /// applies, so the threshold is scale-free across tiers.
    fn pack(
        &self,
        query: &str,
        tier: RetrievalTier,
        ranked: Vec<(String, f64)>,
        by_id: &HashMap<&str, &SemanticChunk>,
        min_score: f32,
        options: &RetrieveOptions,
    ) -> RetrievedContext {
        let top = ranked.first().map(|(_, s)| *s).unwrap_or(0.0);
        if top <= 0.0 {
            return RetrievedContext::empty(query, tier);
        }

        let mut eligible: Vec<(&SemanticChunk, f32)> = ranked
            .iter()
            .filter_map(|(id, score)| {
                let chunk = by_id.get(id.as_str())?;
                let normalized = (*score / top) as f32;
                (normalized >= min_score).then_some((*chunk, *score as f32))
            })
            .filter(|(chunk, _)| {
                options.files.is_empty()
                    || options.files.iter().any(|f| chunk.file_path.contains(f.as_str()))
            })
            .collect();

        if eligible.is_empty() {
            return RetrievedContext::empty(query, tier);
        }

        // Priority globs jump the queue, keeping their relative order.
        if !options.priority_files.is_empty() {
            let patterns: Vec<glob::Pattern> = options
                .priority_files
                .iter()
                .filter_map(|p| glob::Pattern::new(p).ok())
                .collect();
            let (front, back): (Vec<_>, Vec<_>) = eligible
                .into_iter()
                .partition(|(chunk, _)| patterns.iter().any(|p| p.matches(&chunk.file_path)));
            eligible = front.into_iter().chain(back).collect();
        }

        let mut selected = Vec::new();
        let mut token_count = 0u32;
        for (chunk, score) in eligible {
            if token_count + chunk.token_estimate > options.max_tokens {
                break;
            }
            token_count += chunk.token_estimate;
            selected.push(ScoredChunk {
                chunk: chunk.clone(),
                score,
            });
        }

        RetrievedContext {
            query: query.to_string(),
            tier,
            chunks: selected,
            token_count,
            diagnostics: Vec::new(),
        }
    }
}

/// Deterministic fallback scoring: +3 per query token matching a symbol
/// name, +1 per content occurrence, +0.5 once when the chunk carries
/// exports.
fn keyword_ranking(query: &str, corpus: &[SemanticChunk]) -> Vec<(String, f64)> {
    let mut tokens = crate::search::tokenize(query);
    if tokens.is_empty() {
        tokens = vec![query.trim().to_lowercase()];
    }
    tokens.dedup();

    let mut ranked: Vec<(String, f64)> = corpus
        .iter()
        .filter_map(|chunk| {
            let content = chunk.content.to_lowercase();
            let mut score = 0.0f64;
            for token in &tokens {
                if chunk
                    .symbols
                    .iter()
                    .any(|s| s.to_lowercase().contains(token.as_str()))
                {
                    score += 3.0;
                }
                score += content.matches(token.as_str()).count() as f64;
            }
            if score > 0.0 && chunk.metadata.has_exports {
                score += 0.5;
            }
            (score > 0.0).then(|| (chunk.id.clone(), score))
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked
}
