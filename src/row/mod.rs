//! The seven row families and their binary key/value formats.
//!
//! Every row belongs to a table identified by a one-byte tag; keys are
//! compared byte-lexicographically within a table. Integer fields in
//! keys are little-endian fixed-width (to preserve lex order); value
//! fields are unsigned varints.

pub mod back_index;
pub mod dictionary;
pub mod field;
pub mod internal;
pub mod stored;
pub mod term_frequency;
pub(crate) mod varint;
pub mod version;

pub use back_index::BackIndexRow;
pub use dictionary::DictionaryRow;
pub use field::FieldRow;
pub use internal::InternalRow;
pub use stored::StoredRow;
pub use term_frequency::{TermFrequencyRow, TermVector};
pub use version::VersionRow;

/// Reserved byte delimiting variable-length key segments. May not appear
/// inside a field name, a term, or a doc-id.
pub const SEPARATOR: u8 = 0xFF;

/// Current on-disk schema version. Stored once, in the single Version row.
pub const SCHEMA_VERSION: u8 = 1;

/// The one-byte table tag each row family is keyed under.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Table {
    Version = b'v',
    Internal = b'i',
    Field = b'f',
    Dictionary = b'd',
    TermFrequency = b't',
    BackIndex = b'b',
    Stored = b's',
}

impl Table {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Common operations on a row value: which table it lives in, its key,
/// and how to serialize its value without an intermediate allocation
/// where avoidable.
pub trait Row {
    fn table(&self) -> Table;
    fn key(&self) -> Vec<u8>;
    fn value_size(&self) -> usize;
    /// Writes the encoded value into `buffer`, returning the number of
    /// bytes written. `buffer` is not cleared first so callers can reuse
    /// scratch space across rows.
    fn value_to(&self, buffer: &mut Vec<u8>) -> usize;

    fn value(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.value_size());
        self.value_to(&mut buffer);
        buffer
    }
}

/// Rejects doc-ids that contain the reserved separator byte, or that are
/// empty.
pub fn validate_doc_id(doc_id: &[u8]) -> crate::error::Result<()> {
    use crate::error::MalformedError;
    if doc_id.is_empty() {
        return Err(MalformedError::EmptyDocId.into());
    }
    if doc_id.contains(&SEPARATOR) {
        return Err(MalformedError::DocIdContainsSeparator.into());
    }
    Ok(())
}

/// Rejects field names or terms that contain the reserved separator byte.
pub fn validate_segment(segment: &[u8]) -> crate::error::Result<()> {
    use crate::error::MalformedError;
    if segment.contains(&SEPARATOR) {
        return Err(MalformedError::SegmentContainsSeparator.into());
    }
    Ok(())
}
