use std::sync::atomic::Ordering;

use crate::error::Result;
use crate::kv::{KvIterator, Reader};
use crate::row::{DictionaryRow, Table, TermFrequencyRow, TermVector};

use super::{TERM_SEARCHERS_FINISHED, TERM_SEARCHERS_STARTED};

/// One posting, decoded from a TermFrequency row.
#[derive(Debug, Clone, PartialEq)]
pub struct TermFieldDoc {
    pub doc_id: Vec<u8>,
    pub freq: u64,
    pub pre_score: f32,
    pub vectors: Vec<TermVector>,
}

/// Iterates the postings for one `(field, term)` pair in doc-id order.
/// `count()` answers "how many documents" in O(1) off the Dictionary
/// counter, without touching the postings themselves.
pub struct TermFieldReader<'a> {
    field_id: u16,
    term: Vec<u8>,
    iter: Box<dyn KvIterator + 'a>,
    count: u64,
    closed: bool,
}

impl<'a> TermFieldReader<'a> {
    pub fn new(reader: &'a dyn Reader, field_id: u16, term: &[u8]) -> Result<TermFieldReader<'a>> {
        let prefix = TermFrequencyRow::term_prefix(field_id, term);
        let iter = reader.prefix_iterator(Table::TermFrequency, &prefix)?;
        let count = reader.get_counter(Table::Dictionary, &DictionaryRow::key_for(field_id, term))?;
        TERM_SEARCHERS_STARTED.fetch_add(1, Ordering::Relaxed);
        Ok(TermFieldReader { field_id, term: term.to_vec(), iter, count, closed: false })
    }

    /// Number of documents that contain this term in this field.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the next posting in ascending doc-id order.
    pub fn next(&mut self) -> Result<Option<TermFieldDoc>> {
        if !self.iter.valid() {
            return Ok(None);
        }
        let (key, value) = self.iter.current().expect("valid() checked above");
        let (_, _, doc_id) = TermFrequencyRow::decode_key(key)?;
        let doc_id = doc_id.to_vec();
        let (freq, pre_score, vectors) = TermFrequencyRow::decode_value(value)?;
        self.iter.next()?;
        Ok(Some(TermFieldDoc { doc_id, freq, pre_score, vectors }))
    }

    /// Skips forward to the first posting with doc-id `>= target`, for
    /// merge-joining against another reader's cursor.
    pub fn advance(&mut self, target: &[u8]) -> Result<Option<TermFieldDoc>> {
        let seek_key = TermFrequencyRow::key_for(self.field_id, &self.term, target);
        self.iter.seek(&seek_key)?;
        self.next()
    }

    /// Releases the reader. Equivalent to dropping it; kept explicit so
    /// call sites can close a reader without waiting on scope exit.
    pub fn close(mut self) {
        self.closed = true;
    }
}

impl Drop for TermFieldReader<'_> {
    fn drop(&mut self) {
        let _ = self.closed;
        TERM_SEARCHERS_FINISHED.fetch_add(1, Ordering::Relaxed);
    }
}
