//! Indexes a handful of documents into an in-memory store and runs one
//! term query against them, printing BM25 scores. Run with
//! `RUST_LOG=debug cargo run --example build_index` to see the writer's
//! row/counter batch commits logged.

use std::sync::Arc;

use upside_down::analysis::{Analyzer, SimpleAnalyzer};
use upside_down::kv::memory::MemoryStore;
use upside_down::kv::merge::NoopMergeOperator;
use upside_down::kv::KvStore;
use upside_down::scorer::Bm25Scorer;
use upside_down::{DocumentField, Index};

fn text(name: &str, body: &str) -> DocumentField {
    DocumentField { name: name.to_owned(), array_positions: Vec::new(), text: Some(body.to_owned()), store: None }
}

fn main() {
    let _ = env_logger::try_init();

    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new(Arc::new(NoopMergeOperator)));
    let analyzer: Arc<dyn Analyzer> = Arc::new(SimpleAnalyzer::default());
    let index = Index::open(store, analyzer, 4).expect("open index");

    index.update(b"1".to_vec(), vec![text("title", "the quick brown fox")]).expect("update 1");
    index.update(b"2".to_vec(), vec![text("title", "the lazy dog sleeps")]).expect("update 2");
    index.update(b"3".to_vec(), vec![text("title", "a quick fox jumps over the lazy dog")]).expect("update 3");

    let reader = index.reader();
    let field_id = reader.field_id("title").unwrap().expect("title field was indexed");
    let mut postings = reader.term_field_reader(field_id, b"quick").expect("open term reader");
    let total_docs = reader.doc_count().unwrap();
    let doc_freq = postings.count();

    let scorer = Bm25Scorer::new(total_docs, 6.0);
    println!("documents containing \"quick\": {}", doc_freq);
    while let Some(posting) = postings.next().unwrap() {
        let result = scorer.score_term(&posting, doc_freq, 6.0, true);
        println!("{:?} -> {:.4}", String::from_utf8_lossy(&result.doc_id), result.score);
    }
}
