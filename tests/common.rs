use std::sync::Arc;

use upside_down::analysis::{Analyzer, SimpleAnalyzer};
use upside_down::kv::memory::MemoryStore;
use upside_down::kv::merge::NoopMergeOperator;
use upside_down::kv::KvStore;
use upside_down::Index;

pub fn simple_index() -> Index {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new(Arc::new(NoopMergeOperator)));
    let analyzer: Arc<dyn Analyzer> = Arc::new(SimpleAnalyzer::default());
    Index::open(store, analyzer, 2).unwrap()
}

pub fn text(name: &str, text: &str) -> upside_down::DocumentField {
    upside_down::DocumentField { name: name.to_owned(), array_positions: Vec::new(), text: Some(text.to_owned()), store: None }
}
