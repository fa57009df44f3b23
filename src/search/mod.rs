pub mod bm25;
pub mod tokenizer;

pub use bm25::{Bm25Document, Bm25Index, SearchHit};
pub use tokenizer::tokenize;
