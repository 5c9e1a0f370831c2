//! An in-memory reference backend, grounded in the goleveldb `null` test
//! store (an in-memory map used to exercise the crud contract without a
//! real database) and in `CfTree`'s per-table split. Used by the crate's
//! own tests and available to callers that don't need durability.
//!
//! Dictionary counters get a dedicated path (a plain `u64` map mutated by
//! `increment`) rather than going through [`MergeOperator`] emulation,
//! since they're this store's hottest read: the merge path is reserved
//! for tables where a caller issues `Batch::merge`.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{Error, Result};
use crate::row::Table;

use super::merge::{self, MergeOperator, NoopMergeOperator};
use super::{Batch, KvIterator, KvStore, Reader};

const TABLE_COUNT: usize = 7;

fn table_index(table: Table) -> usize {
    match table {
        Table::Version => 0,
        Table::Internal => 1,
        Table::Field => 2,
        Table::Dictionary => 3,
        Table::TermFrequency => 4,
        Table::BackIndex => 5,
        Table::Stored => 6,
    }
}

pub struct MemoryStore {
    tables: [RwLock<BTreeMap<Vec<u8>, Vec<u8>>>; TABLE_COUNT],
    counters: RwLock<BTreeMap<Vec<u8>, u64>>,
    pending_merges: Mutex<HashMap<(u8, Vec<u8>), Vec<Vec<u8>>>>,
    merge_operator: Arc<dyn MergeOperator>,
}

impl MemoryStore {
    pub fn new(merge_operator: Arc<dyn MergeOperator>) -> MemoryStore {
        MemoryStore {
            tables: Default::default(),
            counters: RwLock::new(BTreeMap::new()),
            pending_merges: Mutex::new(HashMap::new()),
            merge_operator,
        }
    }

    fn table_slot(&self, table: Table) -> &RwLock<BTreeMap<Vec<u8>, Vec<u8>>> {
        &self.tables[table_index(table)]
    }

    /// Dictionary rows live in `self.counters`, not `tables[3]` — this
    /// synthesizes the `(key, varint(count))` pairs an iterator over the
    /// Dictionary table would otherwise have to find there.
    fn dictionary_entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.counters
            .read()
            .unwrap()
            .iter()
            .map(|(key, count)| {
                let mut buf = Vec::new();
                crate::row::varint::write_uvarint(&mut buf, *count);
                (key.clone(), buf)
            })
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> MemoryStore {
        MemoryStore::new(Arc::new(NoopMergeOperator))
    }
}

impl Reader for MemoryStore {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if table == Table::Dictionary {
            return Ok(self.counters.read().unwrap().get(key).map(|count| {
                let mut buf = Vec::new();
                crate::row::varint::write_uvarint(&mut buf, *count);
                buf
            }));
        }

        let existing = self.table_slot(table).read().unwrap().get(key).cloned();
        let pending = self.pending_merges.lock().unwrap();
        match pending.get(&(table.tag(), key.to_vec())) {
            Some(operands) if !operands.is_empty() => {
                let (merged, ok) = merge::collapse(self.merge_operator.as_ref(), key, existing.as_deref(), operands);
                if ok {
                    Ok(Some(merged))
                } else {
                    Err(Error::MergeFailure { operator: "MemoryStore" })
                }
            }
            _ => Ok(existing),
        }
    }

    fn get_counter(&self, table: Table, key: &[u8]) -> Result<u64> {
        if table == Table::Dictionary {
            return Ok(*self.counters.read().unwrap().get(key).unwrap_or(&0));
        }
        match self.get(table, key)? {
            Some(bytes) => crate::row::varint::read_uvarint(&bytes).map(|(value, _)| value),
            None => Ok(0),
        }
    }

    fn prefix_iterator<'a>(&'a self, table: Table, prefix: &[u8]) -> Result<Box<dyn KvIterator + 'a>> {
        let mut items: Vec<(Vec<u8>, Vec<u8>)> = if table == Table::Dictionary {
            self.dictionary_entries()
        } else {
            self.table_slot(table).read().unwrap().iter().map(|(key, value)| (key.clone(), value.clone())).collect()
        };
        items.retain(|(key, _)| key.starts_with(prefix));
        items.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        Ok(Box::new(MemoryIterator { items, pos: 0 }))
    }

    fn range_iterator<'a>(&'a self, table: Table, start: &[u8], end: &[u8]) -> Result<Box<dyn KvIterator + 'a>> {
        let mut items: Vec<(Vec<u8>, Vec<u8>)> = if table == Table::Dictionary {
            self.dictionary_entries()
        } else {
            self.table_slot(table).read().unwrap().iter().map(|(key, value)| (key.clone(), value.clone())).collect()
        };
        items.retain(|(key, _)| key.as_slice() >= start && key.as_slice() <= end);
        items.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        Ok(Box::new(MemoryIterator { items, pos: 0 }))
    }

    fn doc_count(&self) -> Result<u64> {
        Ok(self.table_slot(Table::BackIndex).read().unwrap().len() as u64)
    }
}

impl KvStore for MemoryStore {
    fn new_batch(&self) -> Box<dyn Batch> {
        Box::new(MemoryBatch { ops: Vec::new() })
    }

    fn execute(&self, batch: Box<dyn Batch>) -> Result<()> {
        let batch = batch
            .as_any()
            .downcast_ref::<MemoryBatch>()
            .expect("MemoryStore::execute called with a batch from a different store");

        for op in &batch.ops {
            match op {
                Op::Set { table, key, value } => {
                    if *table == Table::Dictionary {
                        let (count, _) = crate::row::varint::read_uvarint(value)?;
                        self.counters.write().unwrap().insert(key.clone(), count);
                    } else {
                        self.table_slot(*table).write().unwrap().insert(key.clone(), value.clone());
                        self.pending_merges.lock().unwrap().remove(&(table.tag(), key.clone()));
                    }
                }
                Op::Delete { table, key } => {
                    if *table == Table::Dictionary {
                        self.counters.write().unwrap().remove(key);
                    } else {
                        self.table_slot(*table).write().unwrap().remove(key);
                        self.pending_merges.lock().unwrap().remove(&(table.tag(), key.clone()));
                    }
                }
                Op::Increment { table, key, delta } => {
                    debug_assert_eq!(*table, Table::Dictionary, "increment is reserved for Dictionary counters");
                    let mut counters = self.counters.write().unwrap();
                    let entry = counters.entry(key.clone()).or_insert(0);
                    *entry = (*entry as i64 + delta).max(0) as u64;
                }
                Op::Merge { table, key, operand } => {
                    let mut pending = self.pending_merges.lock().unwrap();
                    pending.entry((table.tag(), key.clone())).or_default().push(operand.clone());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Op {
    Set { table: Table, key: Vec<u8>, value: Vec<u8> },
    Delete { table: Table, key: Vec<u8> },
    Increment { table: Table, key: Vec<u8>, delta: i64 },
    Merge { table: Table, key: Vec<u8>, operand: Vec<u8> },
}

pub struct MemoryBatch {
    ops: Vec<Op>,
}

impl Batch for MemoryBatch {
    fn set(&mut self, table: Table, key: &[u8], value: &[u8]) {
        self.ops.push(Op::Set { table, key: key.to_vec(), value: value.to_vec() });
    }

    fn delete(&mut self, table: Table, key: &[u8]) {
        self.ops.push(Op::Delete { table, key: key.to_vec() });
    }

    fn increment(&mut self, table: Table, key: &[u8], delta: i64) {
        self.ops.push(Op::Increment { table, key: key.to_vec(), delta });
    }

    fn merge(&mut self, table: Table, key: &[u8], operand: &[u8]) {
        self.ops.push(Op::Merge { table, key: key.to_vec(), operand: operand.to_vec() });
    }

    fn reset(&mut self) {
        self.ops.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MemoryIterator {
    items: Vec<(Vec<u8>, Vec<u8>)>,
    pos: usize,
}

impl KvIterator for MemoryIterator {
    fn seek(&mut self, key: &[u8]) -> Result<()> {
        self.pos = self.items.partition_point(|(k, _)| k.as_slice() < key);
        Ok(())
    }

    fn next(&mut self) -> Result<()> {
        if self.pos < self.items.len() {
            self.pos += 1;
        }
        Ok(())
    }

    fn valid(&self) -> bool {
        self.pos < self.items.len()
    }

    fn current(&self) -> Option<(&[u8], &[u8])> {
        self.items.get(self.pos).map(|(key, value)| (key.as_slice(), value.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::DictionaryRow;
    use crate::row::Row;

    #[test]
    fn set_then_get_roundtrips() {
        let store = MemoryStore::default();
        let mut batch = store.new_batch();
        batch.set(Table::Internal, b"k", b"v");
        store.execute(batch).unwrap();
        assert_eq!(store.get(Table::Internal, b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn delete_removes_key() {
        let store = MemoryStore::default();
        let mut batch = store.new_batch();
        batch.set(Table::Internal, b"k", b"v");
        store.execute(batch).unwrap();
        let mut batch = store.new_batch();
        batch.delete(Table::Internal, b"k");
        store.execute(batch).unwrap();
        assert_eq!(store.get(Table::Internal, b"k").unwrap(), None);
    }

    #[test]
    fn prefix_iterator_is_sorted_and_bounded() {
        let store = MemoryStore::default();
        let mut batch = store.new_batch();
        batch.set(Table::TermFrequency, b"aa", b"1");
        batch.set(Table::TermFrequency, b"ab", b"2");
        batch.set(Table::TermFrequency, b"b", b"3");
        store.execute(batch).unwrap();

        let mut iter = store.prefix_iterator(Table::TermFrequency, b"a").unwrap();
        let mut seen = Vec::new();
        while iter.valid() {
            let (key, _) = iter.current().unwrap();
            seen.push(key.to_vec());
            iter.next().unwrap();
        }
        assert_eq!(seen, vec![b"aa".to_vec(), b"ab".to_vec()]);
    }

    #[test]
    fn range_iterator_is_inclusive_on_both_bounds() {
        let store = MemoryStore::default();
        let mut batch = store.new_batch();
        for key in [b"a", b"b", b"c", b"d"] {
            batch.set(Table::Field, key, b"x");
        }
        store.execute(batch).unwrap();

        let mut iter = store.range_iterator(Table::Field, b"b", b"c").unwrap();
        let mut seen = Vec::new();
        while iter.valid() {
            seen.push(iter.current().unwrap().0.to_vec());
            iter.next().unwrap();
        }
        assert_eq!(seen, vec![b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn dictionary_counters_use_native_increment_not_merge() {
        let store = MemoryStore::default();
        let key = DictionaryRow::key_for(0, b"beer");

        let mut batch = store.new_batch();
        batch.increment(Table::Dictionary, &key, 3);
        store.execute(batch).unwrap();
        assert_eq!(store.get_counter(Table::Dictionary, &key).unwrap(), 3);

        let mut batch = store.new_batch();
        batch.increment(Table::Dictionary, &key, -1);
        store.execute(batch).unwrap();
        assert_eq!(store.get_counter(Table::Dictionary, &key).unwrap(), 2);

        let value = store.get(Table::Dictionary, &key).unwrap().unwrap();
        assert_eq!(DictionaryRow::decode_count(&value).unwrap(), 2);
    }

    #[test]
    fn doc_count_tracks_back_index_rows() {
        let store = MemoryStore::default();
        assert_eq!(store.doc_count().unwrap(), 0);
        let mut batch = store.new_batch();
        batch.set(Table::BackIndex, b"doc-1\xff", b"");
        batch.set(Table::BackIndex, b"doc-2\xff", b"");
        store.execute(batch).unwrap();
        assert_eq!(store.doc_count().unwrap(), 2);
    }

    struct ConcatMerge;

    impl MergeOperator for ConcatMerge {
        fn full_merge(&self, _key: &[u8], existing: Option<&[u8]>, operands: &[Vec<u8>]) -> (Vec<u8>, bool) {
            let mut out = existing.map(|v| v.to_vec()).unwrap_or_default();
            for operand in operands {
                out.extend_from_slice(operand);
            }
            (out, true)
        }

        fn partial_merge(&self, _key: &[u8], left: &[u8], right: &[u8]) -> (Vec<u8>, bool) {
            let mut out = left.to_vec();
            out.extend_from_slice(right);
            (out, true)
        }
    }

    #[test]
    fn merge_is_collapsed_lazily_on_read() {
        let store = MemoryStore::new(Arc::new(ConcatMerge));
        let mut batch = store.new_batch();
        batch.set(Table::Stored, b"k", b"a");
        batch.merge(Table::Stored, b"k", b"b");
        batch.merge(Table::Stored, b"k", b"c");
        store.execute(batch).unwrap();

        assert_eq!(store.get(Table::Stored, b"k").unwrap(), Some(b"abc".to_vec()));
    }
}
