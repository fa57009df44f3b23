//! Retrieval behavior: BM25 ranking, hybrid fusion, budget packing.

use quarry::retrieve::{RetrieveOptions, RetrievalTier, Retriever, rrf_fuse};
use quarry::search::Bm25Index;
use quarry::vector::{EmbeddingProvider, FlatVectorStore, VectorStore};
use quarry::{Indexer, Settings};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn indexer_for(root: &Path) -> Indexer {
    let mut settings = Settings::default();
    settings.workspace_root = Some(root.to_path_buf());
    let indexer = Indexer::new(Arc::new(settings));
    indexer.initialize().unwrap();
    indexer
}

/// Deterministic bag-of-tokens embedder; near-duplicate texts embed
/// close together. Stands in for the external provider capability.
struct BagEmbedding {
    dimension: usize,
}

impl EmbeddingProvider for BagEmbedding {
    fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut vector = vec![0.0f32; self.dimension];
        for token in quarry::tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            vector[(hasher.finish() as usize) % self.dimension] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[test]
fn bm25_ranks_matching_chunk_strictly_higher() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("auth.ts"),
        "export function authenticate(user: string) { return verifyCredentials(user); }\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("session.ts"),
        "export function logout(session: string) { return closeSession(session); }\n",
    )
    .unwrap();

    let indexer = indexer_for(temp.path());
    indexer.index().unwrap();

    let hits = indexer.with_bm25(|bm25| bm25.search("authenticate", 10));
    assert!(!hits.is_empty());
    assert!(hits[0].id.starts_with("auth.ts:"));
    // The chunk lacking every query token scores zero and is absent.
    assert!(hits.iter().all(|h| !h.id.starts_with("session.ts:")));
}

#[test]
fn bm25_roundtrip_preserves_scores_on_real_corpus() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("a.ts"),
        "export function parseConfig(raw: string) { return JSON.parse(raw); }\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("b.ts"),
        "export function writeConfig(data: object) { return serialize(data); }\n",
    )
    .unwrap();

    let indexer = indexer_for(temp.path());
    indexer.index().unwrap();

    indexer.with_bm25(|bm25| {
        let restored = Bm25Index::from_json(bm25.to_json()).unwrap();
        for query in ["parse config", "serialize", "config", "absent"] {
            let a = bm25.search(query, 10);
            let b = restored.search(query, 10);
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(b.iter()) {
                assert_eq!(x.id, y.id);
                assert!((x.score - y.score).abs() < 1e-6);
            }
        }
    });
}

#[test]
fn rrf_reference_arithmetic_and_tie_break() {
    let sparse = vec!["A".to_string(), "B".to_string(), "C".to_string()];
    let dense = vec!["B".to_string(), "A".to_string(), "D".to_string()];
    let fused = rrf_fuse(&[sparse, dense], 60);

    let order: Vec<&str> = fused.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(order, vec!["A", "B", "C", "D"]);
    assert!((fused[0].1 - fused[1].1).abs() < 1e-12, "A and B tie");
    assert!((fused[2].1 - 1.0 / 63.0).abs() < 1e-12);
}

#[test]
fn hybrid_tier_engages_with_vector_capability() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("token.ts"),
        "export function refreshToken(session: string) { return issueToken(session); }\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("chart.ts"),
        "export function drawChart(canvas: object) { return renderAxes(canvas); }\n",
    )
    .unwrap();

    let indexer = indexer_for(temp.path());
    indexer.index().unwrap();

    let embedder = BagEmbedding { dimension: 128 };
    let mut store = FlatVectorStore::new();
    let chunks = indexer.get_all_chunks();
    let pairs: Vec<_> = chunks
        .iter()
        .map(|c| (c.clone(), embedder.embed(&c.content).unwrap()))
        .collect();
    store.add(&pairs).unwrap();

    let settings = Settings::default();
    let retriever = Retriever::new(settings.retrieval.clone())
        .with_vector_search(Box::new(store), Box::new(BagEmbedding { dimension: 128 }));

    let context = indexer
        .retrieve(&retriever, "refresh token session", &RetrieveOptions::default())
        .unwrap();
    assert_eq!(context.tier, RetrievalTier::Hybrid);
    assert!(!context.chunks.is_empty());
    assert!(context.chunks[0].chunk.file_path.contains("token.ts"));
}

#[test]
fn agreement_between_backends_survives_fusion() {
    // If a document outranks another in both rankings, fusion must
    // preserve that order, whatever k.
    for k in [1, 10, 60, 600] {
        let fused = rrf_fuse(
            &[
                vec!["top".to_string(), "mid".to_string(), "low".to_string()],
                vec!["top".to_string(), "low".to_string(), "mid".to_string()],
            ],
            k,
        );
        assert_eq!(fused[0].0, "top");
        let mid = fused.iter().position(|(id, _)| id == "mid").unwrap();
        let low = fused.iter().position(|(id, _)| id == "low").unwrap();
        // mid beats low in sparse, loses in dense: either order is
        // legal. top must stay first.
        assert!(mid != 0 && low != 0);
    }
}

#[test]
fn budget_packer_respects_max_tokens_end_to_end() {
    let temp = TempDir::new().unwrap();
    for i in 0..6 {
        fs::write(
            temp.path().join(format!("mod{i}.ts")),
            format!(
                "export function handler{i}(payload: object) {{\n  return dispatchEvent(payload, {i});\n}}\n"
            ),
        )
        .unwrap();
    }

    let indexer = indexer_for(temp.path());
    indexer.index().unwrap();

    let retriever = Retriever::new(Settings::default().retrieval.clone());
    let options = RetrieveOptions {
        max_tokens: 40,
        ..Default::default()
    };
    let context = indexer
        .retrieve(&retriever, "dispatch event payload handler", &options)
        .unwrap();

    assert!(context.token_count <= 40);
    assert!(!context.chunks.is_empty());
    for pair in context.chunks.windows(2) {
        assert!(pair[0].score >= pair[1].score, "selection must stay score-sorted");
    }
}

#[test]
fn degraded_tiers_never_error_on_empty_sets() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("only.ts"), "export const only = 1;\n").unwrap();

    let indexer = indexer_for(temp.path());
    indexer.index().unwrap();

    let retriever = Retriever::new(Settings::default().retrieval.clone());
    let context = indexer
        .retrieve(&retriever, "zzz_nothing_matches_this", &RetrieveOptions::default())
        .unwrap();
    assert!(context.chunks.is_empty());
    assert_eq!(context.token_count, 0);
}

#[test]
fn formatted_context_carries_file_headers() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("fmt.ts"),
        "export function formatInvoice(total: number) { return renderTemplate(total); }\n",
    )
    .unwrap();

    let indexer = indexer_for(temp.path());
    indexer.index().unwrap();

    let retriever = Retriever::new(Settings::default().retrieval.clone());
    let context = indexer
        .retrieve(&retriever, "format invoice", &RetrieveOptions::default())
        .unwrap();
    let formatted = context.format();
    assert!(formatted.contains("// File: fmt.ts:"));
    assert!(formatted.contains("formatInvoice"));
}
