use byteorder::{ByteOrder, LittleEndian};

use super::varint::{read_uvarint, write_uvarint};
use super::{validate_segment, Row, Table};
use crate::error::{MalformedError, Result};

/// The monotone nonnegative posting count for `(field, term)`. Backed by
/// the KV abstraction's native counter facility where available; this
/// encoding is the fallback representation for backends without one, and
/// is also what dictionary-counter parsing tests exercise directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DictionaryRow<'a> {
    pub field_id: u16,
    pub term: &'a [u8],
    pub count: u64,
}

impl<'a> DictionaryRow<'a> {
    pub fn new(field_id: u16, term: &'a [u8], count: u64) -> Result<DictionaryRow<'a>> {
        validate_segment(term)?;
        Ok(DictionaryRow { field_id, term, count })
    }

    pub fn key_for(field_id: u16, term: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(2 + term.len());
        key.resize(2, 0);
        LittleEndian::write_u16(&mut key[..2], field_id);
        key.extend_from_slice(term);
        key
    }

    pub fn decode_key(key: &[u8]) -> Result<(u16, &[u8])> {
        if key.len() < 2 {
            return Err(MalformedError::ShortKey { expected: 2, got: key.len() }.into());
        }
        let field_id = LittleEndian::read_u16(&key[..2]);
        Ok((field_id, &key[2..]))
    }

    pub fn decode_count(value: &[u8]) -> Result<u64> {
        let (count, _) = read_uvarint(value)?;
        Ok(count)
    }
}

impl Row for DictionaryRow<'_> {
    fn table(&self) -> Table {
        Table::Dictionary
    }

    fn key(&self) -> Vec<u8> {
        DictionaryRow::key_for(self.field_id, self.term)
    }

    fn value_size(&self) -> usize {
        super::varint::uvarint_len(self.count)
    }

    fn value_to(&self, buffer: &mut Vec<u8>) -> usize {
        write_uvarint(buffer, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let row = DictionaryRow::new(3, b"beer", 42).unwrap();
        let key = row.key();
        let (field_id, term) = DictionaryRow::decode_key(&key).unwrap();
        assert_eq!(field_id, 3);
        assert_eq!(term, b"beer");
        let value = row.value();
        assert_eq!(DictionaryRow::decode_count(&value).unwrap(), 42);
    }

    #[test]
    fn max_u64_count_roundtrips() {
        let row = DictionaryRow::new(0, b"x", u64::MAX).unwrap();
        let value = row.value();
        assert_eq!(DictionaryRow::decode_count(&value).unwrap(), u64::MAX);
    }

    #[test]
    fn prefix_key_selects_terms_for_field() {
        let a = DictionaryRow::key_for(1, b"aa");
        let b = DictionaryRow::key_for(1, b"ab");
        let other_field = DictionaryRow::key_for(2, b"aa");
        assert!(a < b);
        // the field-id prefix alone distinguishes rows of different fields
        assert_ne!(&a[..2], &other_field[..2]);
    }
}
