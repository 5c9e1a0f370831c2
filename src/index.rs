//! The public entry point: wires a [`KvStore`] backend, an [`Analyzer`],
//! and the [`AnalysisQueue`] worker pool together behind a single handle a
//! caller opens once and shares. Grounded in `meilidb-core`'s `Database`
//! (a KV handle plus an update queue, reopened readers per-query rather
//! than kept live across writes) — generalized from meilidb's "one index
//! = one RocksDB column family set" to this crate's pluggable `KvStore`.
//!
//! Writes are serialized through a single mutex (mirroring meilidb's
//! single update-queue-at-a-time discipline: only one writer may be
//! active, readers never block on it) since the row/counter two-batch
//! protocol in [`crate::writer`] is not safe to interleave with itself.
//! Reads take no lock and observe whatever the last committed batch left.

use std::sync::{Arc, Mutex};

use crate::analysis::{Analyzer, AnalysisQueue};
use crate::error::{Error, Result};
use crate::kv::KvStore;
use crate::reader::{DocIdReader, FieldDictReader, TermFieldReader};
use crate::row::stored::StoredValueType;
use crate::row::{FieldRow, InternalRow, Row, StoredRow, Table, VersionRow, SCHEMA_VERSION};
use crate::writer::{DocumentField, Writer};

fn ensure_version(store: &dyn KvStore) -> Result<()> {
    match store.get(Table::Version, &VersionRow::key_bytes())? {
        Some(value) => {
            let on_disk = VersionRow::decode_value(&value)?;
            if on_disk.version != SCHEMA_VERSION {
                log::warn!("schema version mismatch: on-disk {}, supported {}", on_disk.version, SCHEMA_VERSION);
                return Err(Error::SchemaVersionMismatch { on_disk: on_disk.version, supported: SCHEMA_VERSION });
            }
            Ok(())
        }
        None => {
            let mut batch = store.new_batch();
            let row = VersionRow::current();
            batch.set(row.table(), &row.key(), &row.value());
            store.execute(batch)
        }
    }
}

/// One stored value for a document, as handed back from [`IndexReader::document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredField {
    pub field_id: u16,
    pub array_positions: Vec<u64>,
    pub value_type: StoredValueType,
    pub raw_value: Vec<u8>,
}

/// An open index: a KV backend, an analyzer, and the analysis worker pool.
pub struct Index {
    store: Arc<dyn KvStore>,
    queue: Arc<AnalysisQueue>,
    analyzer: Arc<dyn Analyzer>,
    write_lock: Mutex<()>,
}

impl Index {
    /// Opens `store`, writing the schema version row on first use and
    /// checking it against this crate's supported version otherwise.
    /// `worker_count` sizes the analysis pool; see [`AnalysisQueue::new`].
    pub fn open(store: Arc<dyn KvStore>, analyzer: Arc<dyn Analyzer>, worker_count: usize) -> Result<Index> {
        ensure_version(store.as_ref())?;
        log::info!("index opened, {} analysis workers", worker_count);
        Ok(Index { store, queue: Arc::new(AnalysisQueue::new(worker_count)), analyzer, write_lock: Mutex::new(()) })
    }

    /// Replaces everything indexed for `doc_id` with `fields`, or deletes
    /// it outright if `fields` is empty. See [`Writer::update`].
    pub fn update(&self, doc_id: Vec<u8>, fields: Vec<DocumentField>) -> Result<()> {
        log::debug!("updating doc-id {:?} ({} fields)", doc_id, fields.len());
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let mut writer = Writer::open(self.store.as_ref(), Arc::clone(&self.queue), Arc::clone(&self.analyzer))?;
        writer.update(doc_id, fields)
    }

    /// Removes a document entirely.
    pub fn delete(&self, doc_id: Vec<u8>) -> Result<()> {
        log::debug!("deleting doc-id {:?}", doc_id);
        self.update(doc_id, Vec::new())
    }

    /// Applies a sequence of updates under one held write lock and one
    /// loaded [`FieldRegistry`](crate::writer::FieldRegistry), rather than
    /// one per call — the bulk-load path.
    pub fn batch(&self, updates: Vec<(Vec<u8>, Vec<DocumentField>)>) -> Result<()> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let mut writer = Writer::open(self.store.as_ref(), Arc::clone(&self.queue), Arc::clone(&self.analyzer))?;
        for (doc_id, fields) in updates {
            writer.update(doc_id, fields)?;
        }
        Ok(())
    }

    /// Reads an opaque engine-internal value, e.g. a serialized mapping
    /// the search layer above this crate chooses to persist.
    pub fn internal(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.get(Table::Internal, key)
    }

    /// Writes an opaque engine-internal value.
    pub fn set_internal(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let _guard = self.write_lock.lock().expect("write lock poisoned");
        let mut batch = self.store.new_batch();
        let row = InternalRow::new(key, value);
        batch.set(row.table(), &row.key(), &row.value());
        self.store.execute(batch)
    }

    /// A read-only view over the index's current committed state.
    pub fn reader(&self) -> IndexReader<'_> {
        IndexReader { store: self.store.as_ref() }
    }

    /// Shuts down the analysis queue, waiting for in-flight jobs to drain.
    pub fn close(self) {
        drop(self);
    }
}

/// Read-only access to one index's committed rows. Borrows the index for
/// its lifetime; opening several is cheap; each reader it hands out owns
/// its own cursor.
pub struct IndexReader<'a> {
    store: &'a dyn KvStore,
}

impl<'a> IndexReader<'a> {
    /// Iterates postings for `(field_id, term)` in doc-id order.
    pub fn term_field_reader(&self, field_id: u16, term: &[u8]) -> Result<TermFieldReader<'a>> {
        TermFieldReader::new(self.store, field_id, term)
    }

    /// Enumerates every live document, in doc-id order.
    pub fn doc_id_reader(&self) -> Result<DocIdReader<'a>> {
        DocIdReader::full_scan(self.store)
    }

    /// Enumerates a fixed set of doc-ids, in ascending order, deduplicated.
    pub fn doc_id_reader_restricted(&self, doc_ids: impl IntoIterator<Item = Vec<u8>>) -> DocIdReader<'a> {
        DocIdReader::restricted_to(doc_ids)
    }

    /// Walks a field's dictionary, optionally bounded by `start`/`end` term.
    pub fn field_dict(
        &self,
        field_id: u16,
        start_term: Option<&[u8]>,
        end_term: Option<&[u8]>,
    ) -> Result<FieldDictReader<'a>> {
        FieldDictReader::new(self.store, field_id, start_term, end_term)
    }

    /// The stable field id assigned to `name`, if one has been assigned.
    pub fn field_id(&self, name: &str) -> Result<Option<u16>> {
        let mut iter = self.store.prefix_iterator(Table::Field, &[])?;
        while iter.valid() {
            let (key, value) = iter.current().expect("valid() checked above");
            let field_id = FieldRow::decode_key(key)?;
            let row = FieldRow::decode_value(field_id, value)?;
            if row.name == name {
                return Ok(Some(field_id));
            }
            iter.next()?;
        }
        Ok(None)
    }

    /// The name a field id was assigned, if any.
    pub fn field_name(&self, field_id: u16) -> Result<Option<String>> {
        match self.store.get(Table::Field, &FieldRow::key_for(field_id))? {
            Some(value) => Ok(Some(FieldRow::decode_value(field_id, &value)?.name)),
            None => Ok(None),
        }
    }

    /// Every stored value for `doc_id`, or `None` if no such document is
    /// live. Scans the Stored table's `doc_id`-prefixed range — cheap
    /// relative to postings scans since only stored (not merely indexed)
    /// fields land here.
    pub fn document(&self, doc_id: &[u8]) -> Result<Option<Vec<StoredField>>> {
        if self.store.get(Table::BackIndex, &crate::row::BackIndexRow::key_for(doc_id))?.is_none() {
            return Ok(None);
        }

        let mut prefix = doc_id.to_vec();
        prefix.push(crate::row::SEPARATOR);
        let mut iter = self.store.prefix_iterator(Table::Stored, &prefix)?;
        let mut fields = Vec::new();
        while iter.valid() {
            let (key, value) = iter.current().expect("valid() checked above");
            let (_, field_id, array_positions) = StoredRow::decode_key(key)?;
            let (value_type, raw_value) = StoredRow::decode_value(value)?;
            fields.push(StoredField { field_id, array_positions, value_type, raw_value: raw_value.to_vec() });
            iter.next()?;
        }
        Ok(Some(fields))
    }

    /// Number of live documents.
    pub fn doc_count(&self) -> Result<u64> {
        self.store.doc_count()
    }
}
