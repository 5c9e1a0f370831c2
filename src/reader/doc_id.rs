use crate::error::Result;
use crate::kv::{KvIterator, Reader};
use crate::row::{BackIndexRow, Table};

enum Source<'a> {
    /// Walks every live document via the Back-index table.
    Scan(Box<dyn KvIterator + 'a>),
    /// A caller-supplied set, sorted once up front so `advance` can binary
    /// search instead of re-scanning — the shape a boolean-filter
    /// intersection needs.
    Sorted { docs: Vec<Vec<u8>>, pos: usize },
}

/// Enumerates doc-ids in ascending order, either over the whole index or
/// restricted to a fixed set.
pub struct DocIdReader<'a> {
    source: Source<'a>,
}

impl<'a> DocIdReader<'a> {
    pub fn full_scan(reader: &'a dyn Reader) -> Result<DocIdReader<'a>> {
        let iter = reader.prefix_iterator(Table::BackIndex, &[])?;
        Ok(DocIdReader { source: Source::Scan(iter) })
    }

    pub fn restricted_to(doc_ids: impl IntoIterator<Item = Vec<u8>>) -> DocIdReader<'a> {
        let mut docs: Vec<Vec<u8>> = doc_ids.into_iter().collect();
        docs.sort();
        docs.dedup();
        DocIdReader { source: Source::Sorted { docs, pos: 0 } }
    }

    pub fn next(&mut self) -> Result<Option<Vec<u8>>> {
        match &mut self.source {
            Source::Scan(iter) => {
                if !iter.valid() {
                    return Ok(None);
                }
                let (key, _) = iter.current().expect("valid() checked above");
                let doc_id = BackIndexRow::decode_key(key)?.to_vec();
                iter.next()?;
                Ok(Some(doc_id))
            }
            Source::Sorted { docs, pos } => {
                if *pos >= docs.len() {
                    return Ok(None);
                }
                let doc_id = docs[*pos].clone();
                *pos += 1;
                Ok(Some(doc_id))
            }
        }
    }

    /// Skips forward to the first doc-id `>= target`. A KV seek for a
    /// full scan; a `partition_point` binary search for a restricted set.
    pub fn advance(&mut self, target: &[u8]) -> Result<Option<Vec<u8>>> {
        match &mut self.source {
            Source::Scan(iter) => {
                iter.seek(&BackIndexRow::key_for(target))?;
                if !iter.valid() {
                    return Ok(None);
                }
                let (key, _) = iter.current().expect("valid() checked above");
                let doc_id = BackIndexRow::decode_key(key)?.to_vec();
                iter.next()?;
                Ok(Some(doc_id))
            }
            Source::Sorted { docs, pos } => {
                *pos += docs[*pos..].partition_point(|doc_id| doc_id.as_slice() < target);
                if *pos >= docs.len() {
                    return Ok(None);
                }
                let doc_id = docs[*pos].clone();
                *pos += 1;
                Ok(Some(doc_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryStore;
    use crate::kv::KvStore;

    fn seed(store: &MemoryStore, doc_ids: &[&[u8]]) {
        let mut batch = store.new_batch();
        for doc_id in doc_ids {
            batch.set(Table::BackIndex, &BackIndexRow::key_for(doc_id), &[]);
        }
        store.execute(batch).unwrap();
    }

    #[test]
    fn full_scan_yields_doc_ids_in_order() {
        let store = MemoryStore::default();
        seed(&store, &[b"c", b"a", b"b"]);

        let mut reader = DocIdReader::full_scan(&store).unwrap();
        let mut seen = Vec::new();
        while let Some(doc_id) = reader.next().unwrap() {
            seen.push(doc_id);
        }
        assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn restricted_to_set_sorts_and_dedupes() {
        let mut reader: DocIdReader = DocIdReader::restricted_to(vec![b"c".to_vec(), b"a".to_vec(), b"a".to_vec()]);
        let mut seen = Vec::new();
        while let Some(doc_id) = reader.next().unwrap() {
            seen.push(doc_id);
        }
        assert_eq!(seen, vec![b"a".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn advance_on_restricted_set_binary_searches() {
        let mut reader: DocIdReader =
            DocIdReader::restricted_to(vec![b"a".to_vec(), b"c".to_vec(), b"e".to_vec()]);
        assert_eq!(reader.advance(b"b").unwrap(), Some(b"c".to_vec()));
        assert_eq!(reader.next().unwrap(), Some(b"e".to_vec()));
    }

    #[test]
    fn advance_past_the_end_exhausts_the_reader() {
        let mut reader: DocIdReader = DocIdReader::restricted_to(vec![b"a".to_vec()]);
        assert_eq!(reader.advance(b"z").unwrap(), None);
        assert_eq!(reader.next().unwrap(), None);
    }
}
