//! Okapi BM25 over the chunk corpus.
//!
//! `idf(t) = ln((N - df + 0.5) / (df + 0.5) + 1)`, document score is the
//! sum over query tokens of
//! `idf(t) * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * dl / avgdl))`
//! with `k1 = 1.2`, `b = 0.75` by default. Ties break on document id
//! for determinism.
//!
//! The JSON form carries the document-frequency vocabulary, so
//! `from_json(x.to_json())` scores every query identically to `x`.

use super::tokenizer::tokenize;
use crate::config::Bm25Config;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Per-document state: id, length in tokens, and term frequencies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bm25Document {
    pub id: String,
    pub len: u32,
    pub tf: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

/// Serialized layout: `{ docs, df, avgdl, N }`.
#[derive(Debug, Serialize, Deserialize)]
struct Bm25Json {
    docs: Vec<Bm25Document>,
    df: BTreeMap<String, u32>,
    avgdl: f32,
    #[serde(rename = "N")]
    n: usize,
    #[serde(default = "default_k1")]
    k1: f32,
    #[serde(default = "default_b")]
    b: f32,
}

fn default_k1() -> f32 {
    1.2
}
fn default_b() -> f32 {
    0.75
}

/// Inverted index with Okapi scoring.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    k1: f32,
    b: f32,
    docs: Vec<Bm25Document>,
    by_id: HashMap<String, usize>,
    df: BTreeMap<String, u32>,
    postings: HashMap<String, Vec<(usize, u32)>>,
    total_len: u64,
}

impl Default for Bm25Index {
    fn default() -> Self {
        Self::new(&Bm25Config::default())
    }
}

impl Bm25Index {
    pub fn new(config: &Bm25Config) -> Self {
        Self {
            k1: config.k1,
            b: config.b,
            docs: Vec::new(),
            by_id: HashMap::new(),
            df: BTreeMap::new(),
            postings: HashMap::new(),
            total_len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Index one document. A duplicate id is ignored; the corpus is
    /// rebuilt from scratch when chunks change, never patched.
    pub fn add_document(&mut self, id: &str, text: &str) {
        self.add_document_with_metadata(id, text, serde_json::Value::Null);
    }

    pub fn add_document_with_metadata(&mut self, id: &str, text: &str, metadata: serde_json::Value) {
        if self.by_id.contains_key(id) {
            tracing::warn!(id, "duplicate BM25 document id ignored");
            return;
        }
        let tokens = tokenize(text);
        let len = tokens.len() as u32;

        let mut tf: BTreeMap<String, u32> = BTreeMap::new();
        for token in tokens {
            *tf.entry(token).or_insert(0) += 1;
        }

        let doc_idx = self.docs.len();
        for (token, count) in &tf {
            *self.df.entry(token.clone()).or_insert(0) += 1;
            self.postings
                .entry(token.clone())
                .or_default()
                .push((doc_idx, *count));
        }

        self.by_id.insert(id.to_string(), doc_idx);
        self.total_len += u64::from(len);
        self.docs.push(Bm25Document {
            id: id.to_string(),
            len,
            tf,
            metadata,
        });
    }

    pub fn add_documents<'a, I>(&mut self, documents: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (id, text) in documents {
            self.add_document(id, text);
        }
    }

    fn avgdl(&self) -> f32 {
        if self.docs.is_empty() {
            0.0
        } else {
            self.total_len as f32 / self.docs.len() as f32
        }
    }

    fn idf(&self, token: &str) -> f32 {
        let n = self.docs.len() as f32;
        let df = self.df.get(token).copied().unwrap_or(0) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Rank the corpus for a query. Returns at most `top_k` hits with a
    /// positive score, best first; equal scores order by document id.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        if self.docs.is_empty() || top_k == 0 {
            return Vec::new();
        }
        // Each distinct query token contributes once, wherever it
        // appears; tokenize output is unsorted, so adjacency-based
        // dedup is not enough.
        let mut query_tokens = tokenize(query);
        let mut seen: HashSet<String> = HashSet::new();
        query_tokens.retain(|t| seen.insert(t.clone()));

        let avgdl = self.avgdl();
        let mut scores: HashMap<usize, f32> = HashMap::new();

        for token in &query_tokens {
            let Some(postings) = self.postings.get(token) else {
                continue;
            };
            let idf = self.idf(token);
            for &(doc_idx, tf) in postings {
                let dl = self.docs[doc_idx].len as f32;
                let tf = tf as f32;
                let denom = tf + self.k1 * (1.0 - self.b + self.b * dl / avgdl.max(f32::EPSILON));
                let contribution = idf * (tf * (self.k1 + 1.0)) / denom;
                *scores.entry(doc_idx).or_insert(0.0) += contribution;
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(idx, score)| SearchHit {
                id: self.docs[idx].id.clone(),
                score,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        hits
    }

    /// Serialize with the full vocabulary.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(Bm25Json {
            docs: self.docs.clone(),
            df: self.df.clone(),
            avgdl: self.avgdl(),
            n: self.docs.len(),
            k1: self.k1,
            b: self.b,
        })
        .unwrap_or(serde_json::Value::Null)
    }

    /// Restore from the `to_json` shape; postings are rebuilt.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let parsed: Bm25Json = serde_json::from_value(value)?;
        let mut index = Self {
            k1: parsed.k1,
            b: parsed.b,
            docs: Vec::new(),
            by_id: HashMap::new(),
            df: parsed.df,
            postings: HashMap::new(),
            total_len: 0,
        };
        for (doc_idx, doc) in parsed.docs.into_iter().enumerate() {
            for (token, count) in &doc.tf {
                index
                    .postings
                    .entry(token.clone())
                    .or_default()
                    .push((doc_idx, *count));
            }
            index.by_id.insert(doc.id.clone(), doc_idx);
            index.total_len += u64::from(doc.len);
            index.docs.push(doc);
        }
        Ok(index)
    }
}
