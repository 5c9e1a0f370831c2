//! The index writer: turns a document's fields into row mutations.
//!
//! Grounded in `meilidb-core`'s `apply_documents_addition` — delete the
//! old postings before writing new ones, then fold the delta into the
//! shared dictionary — generalized from meilidb's FST-of-all-words
//! structure to this crate's per-`(field, term)` Dictionary counters and
//! its Back-index row as the diff oracle instead of a document-id set.
//!
//! Two batches are committed per update, not one: the row batch (Field,
//! TermFrequency, BackIndex, Stored) commits first, then the Dictionary
//! counter batch. A reader can therefore observe new postings slightly
//! before the dictionary count for them lands, but never a bumped count
//! with no postings to back it — the safer direction to be inconsistent
//! in, since a term-field reader's `count()` is an optimization hint, not
//! a correctness dependency (it bounds scoring math, the postings
//! themselves are authoritative). See `DESIGN.md` for the open-question
//! writeup.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::analysis::{Analyzer, AnalysisQueue, PendingField};
use crate::error::{ConfigError, Result};
use crate::kv::{Batch, KvStore, Reader};
use crate::row::stored::StoredValueType;
use crate::row::{validate_doc_id, BackIndexRow, DictionaryRow, FieldRow, Row, StoredRow, Table, TermFrequencyRow, TermVector};

/// One field's worth of input to an update, before a field id has been
/// assigned. `name` is resolved against the [`FieldRegistry`] at update
/// time, assigning a fresh id (and persisting a [`FieldRow`]) the first
/// time a name is seen.
pub struct DocumentField {
    pub name: String,
    pub array_positions: Vec<u64>,
    pub text: Option<String>,
    pub store: Option<(StoredValueType, Vec<u8>)>,
}

/// The persisted name ↔ id mapping for fields, assigned at first
/// appearance and never reused — mirrors `meilidb-schema`'s
/// assign-on-first-appearance `SchemaBuilder`, minus the richer
/// attribute properties that crate's `Schema` carries (ranking,
/// indexed/displayed flags): this crate has no schema/mapping engine, a
/// field is just a stable id for a name.
pub struct FieldRegistry {
    name_to_id: HashMap<String, u16>,
    next_id: u32,
}

impl FieldRegistry {
    pub fn load(reader: &dyn Reader) -> Result<FieldRegistry> {
        let mut name_to_id = HashMap::new();
        let mut max_id: i32 = -1;

        let mut iter = reader.prefix_iterator(Table::Field, &[])?;
        while iter.valid() {
            let (key, value) = iter.current().expect("valid() checked above");
            let field_id = FieldRow::decode_key(key)?;
            let row = FieldRow::decode_value(field_id, value)?;
            max_id = max_id.max(i32::from(field_id));
            name_to_id.insert(row.name, field_id);
            iter.next()?;
        }

        Ok(FieldRegistry { name_to_id, next_id: (max_id + 1) as u32 })
    }

    /// Resolves `name` to its field id, assigning a new one (recorded
    /// into `batch`) the first time it's seen.
    pub fn id_for(&mut self, batch: &mut dyn Batch, name: &str) -> Result<u16> {
        if let Some(&id) = self.name_to_id.get(name) {
            return Ok(id);
        }
        if self.next_id > u32::from(u16::MAX) {
            return Err(ConfigError::FieldIdSpaceExhausted(name.to_owned()).into());
        }
        let field_id = self.next_id as u16;
        self.next_id += 1;

        let row = FieldRow::new(field_id, name)?;
        batch.set(row.table(), &row.key(), &row.value());
        self.name_to_id.insert(name.to_owned(), field_id);
        Ok(field_id)
    }
}

/// Builds document updates against a [`KvStore`], dispatching analysis
/// through a shared [`AnalysisQueue`].
pub struct Writer<'s> {
    store: &'s dyn KvStore,
    queue: Arc<AnalysisQueue>,
    analyzer: Arc<dyn Analyzer>,
    registry: FieldRegistry,
}

impl<'s> Writer<'s> {
    pub fn open(store: &'s dyn KvStore, queue: Arc<AnalysisQueue>, analyzer: Arc<dyn Analyzer>) -> Result<Writer<'s>> {
        let registry = FieldRegistry::load(store)?;
        Ok(Writer { store, queue, analyzer, registry })
    }

    /// Analyzes `fields` and replaces everything previously indexed for
    /// `doc_id` with the result. Passing an empty `fields` is how a
    /// document is deleted: every posting and stored value disappears,
    /// and the Back-index row itself is removed rather than left behind
    /// empty, so `doc_count` doesn't count tombstones.
    pub fn update(&mut self, doc_id: Vec<u8>, fields: Vec<DocumentField>) -> Result<()> {
        validate_doc_id(&doc_id)?;

        let mut row_batch = self.store.new_batch();
        let mut pending_fields = Vec::with_capacity(fields.len());
        for field in fields {
            let field_id = self.registry.id_for(&mut *row_batch, &field.name)?;
            pending_fields.push(PendingField {
                field_id,
                array_positions: field.array_positions,
                text: field.text,
                store: field.store,
            });
        }

        let previous = match self.store.get(Table::BackIndex, &BackIndexRow::key_for(&doc_id))? {
            Some(value) => BackIndexRow::decode(&doc_id, &value)?,
            None => BackIndexRow::new(doc_id.clone())?,
        };

        let analysis = self.queue.submit(doc_id.clone(), pending_fields, Arc::clone(&self.analyzer))?;

        let mut postings: BTreeMap<(u16, Vec<u8>), Vec<TermVector>> = BTreeMap::new();
        for occurrence in analysis.occurrences {
            postings.entry((occurrence.field_id, occurrence.term)).or_default().push(TermVector {
                field_id: occurrence.field_id,
                pos: occurrence.pos,
                start: occurrence.start,
                end: occurrence.end,
                array_positions: occurrence.array_positions,
            });
        }

        let previous_terms: BTreeSet<(u16, Vec<u8>)> = previous
            .term_entries
            .iter()
            .flat_map(|(field_id, terms)| terms.iter().map(move |term| (*field_id, term.clone())))
            .collect();
        let new_terms: BTreeSet<(u16, Vec<u8>)> = postings.keys().cloned().collect();

        for (field_id, term) in previous_terms.difference(&new_terms) {
            let key = TermFrequencyRow::key_for(*field_id, term, &doc_id);
            row_batch.delete(Table::TermFrequency, &key);
        }
        for ((field_id, term), vectors) in &postings {
            let freq = vectors.len() as u64;
            let row = TermFrequencyRow::new(*field_id, term, &doc_id, freq, 1.0, vectors.clone())?;
            row_batch.set(row.table(), &row.key(), &row.value());
        }

        let previous_stored: BTreeSet<(u16, Vec<u64>)> = previous
            .stored_entries
            .iter()
            .flat_map(|(field_id, entries)| entries.iter().map(move |positions| (*field_id, positions.clone())))
            .collect();
        let new_stored: Vec<(u16, Vec<u64>, StoredValueType, Vec<u8>)> = analysis
            .stored
            .into_iter()
            .map(|entry| (entry.field_id, entry.array_positions, entry.value_type, entry.raw_value))
            .collect();
        let new_stored_keys: BTreeSet<(u16, Vec<u64>)> =
            new_stored.iter().map(|(field_id, positions, _, _)| (*field_id, positions.clone())).collect();

        for (field_id, positions) in previous_stored.difference(&new_stored_keys) {
            let key = StoredRow::key_for(&doc_id, *field_id, positions);
            row_batch.delete(Table::Stored, &key);
        }
        for (field_id, positions, value_type, raw_value) in &new_stored {
            let row = StoredRow::new(&doc_id, *field_id, positions.clone(), *value_type, raw_value.clone())?;
            row_batch.set(row.table(), &row.key(), &row.value());
        }

        let back_index_key = BackIndexRow::key_for(&doc_id);
        if postings.is_empty() && new_stored.is_empty() {
            row_batch.delete(Table::BackIndex, &back_index_key);
        } else {
            let mut back_index = BackIndexRow::new(doc_id.clone())?;
            for (field_id, term) in postings.keys() {
                group_by_field(&mut back_index.term_entries, *field_id, term.clone());
            }
            for (field_id, positions, _, _) in &new_stored {
                group_stored_by_field(&mut back_index.stored_entries, *field_id, positions.clone());
            }
            row_batch.set(Table::BackIndex, &back_index_key, &back_index.value());
        }

        self.store.execute(row_batch)?;
        log::trace!("row batch committed for doc-id {:?}", doc_id);

        let mut counter_batch = self.store.new_batch();
        for (field_id, term) in previous_terms.difference(&new_terms) {
            counter_batch.increment(Table::Dictionary, &DictionaryRow::key_for(*field_id, term), -1);
        }
        for (field_id, term) in new_terms.difference(&previous_terms) {
            counter_batch.increment(Table::Dictionary, &DictionaryRow::key_for(*field_id, term), 1);
        }
        self.store.execute(counter_batch)?;
        log::trace!("counter batch committed for doc-id {:?}", doc_id);

        Ok(())
    }

    /// Removes a document entirely: equivalent to `update` with no fields.
    pub fn delete(&mut self, doc_id: Vec<u8>) -> Result<()> {
        self.update(doc_id, Vec::new())
    }
}

fn group_by_field(entries: &mut Vec<(u16, Vec<Vec<u8>>)>, field_id: u16, term: Vec<u8>) {
    match entries.iter_mut().find(|(id, _)| *id == field_id) {
        Some((_, terms)) => terms.push(term),
        None => entries.push((field_id, vec![term])),
    }
}

fn group_stored_by_field(entries: &mut Vec<(u16, Vec<Vec<u64>>)>, field_id: u16, positions: Vec<u64>) {
    match entries.iter_mut().find(|(id, _)| *id == field_id) {
        Some((_, list)) => list.push(positions),
        None => entries.push((field_id, vec![positions])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SimpleAnalyzer;
    use crate::kv::memory::MemoryStore;
    use crate::reader::{DocIdReader, TermFieldReader};

    fn field(name: &str, text: &str) -> DocumentField {
        DocumentField { name: name.to_owned(), array_positions: Vec::new(), text: Some(text.to_owned()), store: None }
    }

    #[test]
    fn insert_one_document_creates_postings_and_dictionary_counts() {
        let store = MemoryStore::default();
        let queue = Arc::new(AnalysisQueue::new(2));
        let analyzer: Arc<dyn Analyzer> = Arc::new(SimpleAnalyzer::default());
        let mut writer = Writer::open(&store, queue, analyzer).unwrap();

        writer.update(b"1".to_vec(), vec![field("title", "hello world")]).unwrap();

        let field_id = FieldRegistry::load(&store).unwrap().id_for(&mut *store.new_batch(), "title").unwrap();
        let mut reader = TermFieldReader::new(&store, field_id, b"hello").unwrap();
        assert_eq!(reader.count(), 1);
        let doc = reader.next().unwrap().unwrap();
        assert_eq!(doc.doc_id, b"1");
        assert_eq!(doc.freq, 1);
        assert_eq!(store.doc_count().unwrap(), 1);
    }

    #[test]
    fn reupdating_a_document_changes_its_postings() {
        let store = MemoryStore::default();
        let queue = Arc::new(AnalysisQueue::new(2));
        let analyzer: Arc<dyn Analyzer> = Arc::new(SimpleAnalyzer::default());
        let mut writer = Writer::open(&store, queue, analyzer).unwrap();

        writer.update(b"1".to_vec(), vec![field("title", "alpha beta")]).unwrap();
        writer.update(b"1".to_vec(), vec![field("title", "beta gamma")]).unwrap();

        let field_id = writer.registry.id_for(&mut *store.new_batch(), "title").unwrap();

        let mut alpha_reader = TermFieldReader::new(&store, field_id, b"alpha").unwrap();
        assert_eq!(alpha_reader.count(), 0);
        assert!(alpha_reader.next().unwrap().is_none());

        let mut gamma_reader = TermFieldReader::new(&store, field_id, b"gamma").unwrap();
        assert_eq!(gamma_reader.count(), 1);

        let mut beta_reader = TermFieldReader::new(&store, field_id, b"beta").unwrap();
        assert_eq!(beta_reader.count(), 1);
    }

    #[test]
    fn delete_removes_postings_counts_and_the_back_index_row() {
        let store = MemoryStore::default();
        let queue = Arc::new(AnalysisQueue::new(2));
        let analyzer: Arc<dyn Analyzer> = Arc::new(SimpleAnalyzer::default());
        let mut writer = Writer::open(&store, queue, analyzer).unwrap();

        writer.update(b"1".to_vec(), vec![field("title", "hello")]).unwrap();
        assert_eq!(store.doc_count().unwrap(), 1);

        writer.delete(b"1".to_vec()).unwrap();
        assert_eq!(store.doc_count().unwrap(), 0);

        let field_id = writer.registry.id_for(&mut *store.new_batch(), "title").unwrap();
        let mut reader = TermFieldReader::new(&store, field_id, b"hello").unwrap();
        assert_eq!(reader.count(), 0);
        assert!(reader.next().unwrap().is_none());
    }

    #[test]
    fn two_documents_are_both_enumerable_by_doc_id_reader() {
        let store = MemoryStore::default();
        let queue = Arc::new(AnalysisQueue::new(2));
        let analyzer: Arc<dyn Analyzer> = Arc::new(SimpleAnalyzer::default());
        let mut writer = Writer::open(&store, queue, analyzer).unwrap();

        writer.update(b"1".to_vec(), vec![field("title", "red")]).unwrap();
        writer.update(b"2".to_vec(), vec![field("title", "blue")]).unwrap();

        let mut reader = DocIdReader::full_scan(&store).unwrap();
        let mut seen = Vec::new();
        while let Some(doc_id) = reader.next().unwrap() {
            seen.push(doc_id);
        }
        assert_eq!(seen, vec![b"1".to_vec(), b"2".to_vec()]);
    }
}
