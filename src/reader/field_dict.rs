use byteorder::{ByteOrder, LittleEndian};

use crate::error::Result;
use crate::kv::{KvIterator, Reader};
use crate::row::{DictionaryRow, Table};

/// An "all terms past this field" upper bound for a range scan, built by
/// pairing the field's own prefix with a run of `0xFF` bytes long enough
/// to sort after any term a caller could reasonably index. Used instead
/// of a prefix scan when a range query needs an explicit end key, e.g. to
/// start a dictionary walk partway through a field and still stop at the
/// field boundary.
fn unbounded_upper_bound(field_id: u16) -> Vec<u8> {
    let mut bound = vec![0u8; 2];
    LittleEndian::write_u16(&mut bound, field_id);
    bound.extend(std::iter::repeat(0xFFu8).take(256));
    bound
}

/// Iterates a field's dictionary, alphabetically by term, starting at an
/// optional `start_term` and optionally stopping before an `end_term`.
/// Backs prefix/range/wildcard term expansion.
pub struct FieldDictReader<'a> {
    field_id: u16,
    end_term: Option<Vec<u8>>,
    iter: Box<dyn KvIterator + 'a>,
}

impl<'a> FieldDictReader<'a> {
    pub fn new(
        reader: &'a dyn Reader,
        field_id: u16,
        start_term: Option<&[u8]>,
        end_term: Option<&[u8]>,
    ) -> Result<FieldDictReader<'a>> {
        let mut field_prefix = vec![0u8; 2];
        LittleEndian::write_u16(&mut field_prefix, field_id);

        let iter = match (start_term, end_term) {
            (None, None) => reader.prefix_iterator(Table::Dictionary, &field_prefix)?,
            _ => {
                let start_key = match start_term {
                    Some(term) => DictionaryRow::key_for(field_id, term),
                    None => field_prefix.clone(),
                };
                let end_key = match end_term {
                    Some(term) => DictionaryRow::key_for(field_id, term),
                    None => unbounded_upper_bound(field_id),
                };
                reader.range_iterator(Table::Dictionary, &start_key, &end_key)?
            }
        };

        Ok(FieldDictReader { field_id, end_term: end_term.map(|t| t.to_vec()), iter })
    }

    /// Returns the next `(term, posting count)` pair, or `None` once the
    /// field's terms (or `end_term`, if given) are exhausted.
    pub fn next(&mut self) -> Result<Option<(Vec<u8>, u64)>> {
        if !self.iter.valid() {
            return Ok(None);
        }
        let (key, value) = self.iter.current().expect("valid() checked above");
        let (field_id, term) = DictionaryRow::decode_key(key)?;
        if field_id != self.field_id {
            return Ok(None);
        }
        if let Some(end_term) = &self.end_term {
            if term > end_term.as_slice() {
                return Ok(None);
            }
        }
        let term = term.to_vec();
        let count = DictionaryRow::decode_count(value)?;
        self.iter.next()?;
        Ok(Some((term, count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryStore;
    use crate::kv::KvStore;
    use crate::row::Row;

    fn seed(store: &MemoryStore, field_id: u16, terms: &[(&[u8], u64)]) {
        let mut batch = store.new_batch();
        for (term, count) in terms {
            let row = DictionaryRow::new(field_id, term, *count).unwrap();
            batch.set(row.table(), &row.key(), &row.value());
        }
        store.execute(batch).unwrap();
    }

    #[test]
    fn iterates_all_terms_alphabetically() {
        let store = MemoryStore::default();
        seed(&store, 0, &[(b"zebra", 1), (b"apple", 2), (b"mango", 3)]);

        let mut reader = FieldDictReader::new(&store, 0, None, None).unwrap();
        let mut seen = Vec::new();
        while let Some((term, _)) = reader.next().unwrap() {
            seen.push(term);
        }
        assert_eq!(seen, vec![b"apple".to_vec(), b"mango".to_vec(), b"zebra".to_vec()]);
    }

    #[test]
    fn stops_at_the_field_boundary() {
        let store = MemoryStore::default();
        seed(&store, 0, &[(b"a", 1)]);
        seed(&store, 1, &[(b"b", 1)]);

        let mut reader = FieldDictReader::new(&store, 0, None, None).unwrap();
        let mut seen = Vec::new();
        while let Some((term, _)) = reader.next().unwrap() {
            seen.push(term);
        }
        assert_eq!(seen, vec![b"a".to_vec()]);
    }

    #[test]
    fn start_and_end_term_bound_the_walk() {
        let store = MemoryStore::default();
        seed(&store, 0, &[(b"a", 1), (b"b", 1), (b"c", 1), (b"d", 1)]);

        let mut reader = FieldDictReader::new(&store, 0, Some(b"b"), Some(b"c")).unwrap();
        let mut seen = Vec::new();
        while let Some((term, _)) = reader.next().unwrap() {
            seen.push(term);
        }
        assert_eq!(seen, vec![b"b".to_vec(), b"c".to_vec()]);
    }
}
