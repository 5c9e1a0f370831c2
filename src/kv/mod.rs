//! The pluggable ordered key-value abstraction every row family is stored
//! through. Modeled after `parity_util_mem::KeyValueDB`'s column-oriented
//! transaction API and `meilidb-data`'s `CfTree`, generalized to a trait
//! so a backend can be swapped in without touching row codecs or the
//! writer/reader layers above them.

pub mod memory;
pub mod merge;

use crate::error::Result;
use crate::row::Table;

pub use merge::MergeOperator;

/// A cursor over a table's keys in ascending byte-lexicographic order.
/// Bounded: once the cursor walks past the requested prefix or range, it
/// becomes permanently invalid, mirroring `CfIter`'s `end_bound` check.
pub trait KvIterator {
    /// Repositions the cursor at the first key `>= key` that is still
    /// inside the iterator's bound. A seek past the bound invalidates it.
    fn seek(&mut self, key: &[u8]) -> Result<()>;
    /// Advances to the next key, if any.
    fn next(&mut self) -> Result<()>;
    /// Whether the cursor currently sits on a key inside its bound.
    fn valid(&self) -> bool;
    /// The key/value pair the cursor currently sits on, if `valid()`.
    fn current(&self) -> Option<(&[u8], &[u8])>;
}

/// Read-only operations against one logical store. Implementors back
/// every table (Version, Internal, Field, Dictionary, TermFrequency,
/// BackIndex, Stored) behind a single handle, distinguished by `Table`.
pub trait Reader {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Reads a Dictionary row's posting count. Backends with a native
    /// counter facility (e.g. RocksDB's merge operator on an integer)
    /// should override this to avoid the varint decode; the default
    /// treats the stored bytes as a [`DictionaryRow`](crate::row::DictionaryRow)
    /// value.
    fn get_counter(&self, table: Table, key: &[u8]) -> Result<u64> {
        match self.get(table, key)? {
            Some(bytes) => crate::row::varint::read_uvarint(&bytes).map(|(value, _)| value),
            None => Ok(0),
        }
    }

    fn multi_get(&self, table: Table, keys: &[&[u8]]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|key| self.get(table, key)).collect()
    }

    /// An iterator over every key in `table` starting with `prefix`.
    fn prefix_iterator<'a>(&'a self, table: Table, prefix: &[u8]) -> Result<Box<dyn KvIterator + 'a>>;

    /// An iterator over every key in `table` within `[start, end]`,
    /// inclusive on both bounds.
    fn range_iterator<'a>(&'a self, table: Table, start: &[u8], end: &[u8]) -> Result<Box<dyn KvIterator + 'a>>;

    /// Number of live documents, i.e. Back-index rows.
    fn doc_count(&self) -> Result<u64>;
}

/// Accumulates table mutations to be applied together. `increment` and
/// `merge` are distinct operations: `increment` is for the Dictionary
/// table's monotone counters (backends may implement these natively,
/// e.g. RocksDB's integer merge operand), while `merge` invokes the
/// store's [`MergeOperator`] for backends that lack a native counter and
/// must emulate one by combining operands at read or compaction time.
pub trait Batch: std::any::Any {
    fn set(&mut self, table: Table, key: &[u8], value: &[u8]);
    fn delete(&mut self, table: Table, key: &[u8]);
    fn increment(&mut self, table: Table, key: &[u8], delta: i64);
    fn merge(&mut self, table: Table, key: &[u8], operand: &[u8]);
    /// Discards every operation recorded so far, for batch reuse.
    fn reset(&mut self);
    /// Lets a [`KvStore`] recover its own concrete batch type back out of
    /// the trait object `execute` receives.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// The write side of a store: builds batches and commits them. `execute`
/// lives here rather than on `Batch` because committing needs the
/// backend handle (the connection, the WAL, ...), not just the recorded
/// operations — mirroring `rocksdb::DB::write` and goleveldb's
/// `store.Execute(batch)`.
pub trait KvStore: Reader {
    fn new_batch(&self) -> Box<dyn Batch>;
    fn execute(&self, batch: Box<dyn Batch>) -> Result<()>;
}

/// Like [`Reader::prefix_iterator`], but decodes each key/value pair with
/// `decode` as it walks. A free function, not a trait method, so `Reader`
/// stays object-safe (`decode`'s `T` can't be a generic trait method).
pub fn typed_prefix_iterator<'a, T>(
    reader: &'a dyn Reader,
    table: Table,
    prefix: &[u8],
    decode: impl Fn(&[u8], &[u8]) -> Result<T> + 'a,
) -> Result<impl Iterator<Item = Result<T>> + 'a> {
    let mut iter = reader.prefix_iterator(table, prefix)?;
    Ok(std::iter::from_fn(move || {
        if !iter.valid() {
            return None;
        }
        let item = match iter.current() {
            Some((key, value)) => decode(key, value),
            None => return None,
        };
        let _ = iter.next();
        Some(item)
    }))
}
