use byteorder::{ByteOrder, LittleEndian};

use super::varint::{read_uvarint, uvarint_len, write_uvarint};
use super::{validate_doc_id, Row, Table, SEPARATOR};
use crate::error::{MalformedError, Result};

/// Tag byte identifying how to interpret a Stored row's raw value.
/// Opaque to the core beyond round-tripping; the search layer's document
/// (de)serializer assigns meaning to each variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum StoredValueType {
    Bytes = 0,
    Utf8String = 1,
    I64 = 2,
    F64 = 3,
    Bool = 4,
    Json = 5,
}

impl StoredValueType {
    fn from_tag(tag: u8) -> Result<StoredValueType> {
        Ok(match tag {
            0 => StoredValueType::Bytes,
            1 => StoredValueType::Utf8String,
            2 => StoredValueType::I64,
            3 => StoredValueType::F64,
            4 => StoredValueType::Bool,
            5 => StoredValueType::Json,
            _ => return Err(MalformedError::InvalidVarint.into()),
        })
    }
}

/// One stored value for `(doc, field, array-positions)`. Reconstructing
/// the key requires the doc-id, field-id, and the exact array-position
/// path recorded at index time, which is why the back-index keeps a copy
/// of `StoredEntries`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow<'a> {
    pub doc_id: &'a [u8],
    pub field_id: u16,
    pub array_positions: Vec<u64>,
    pub value_type: StoredValueType,
    pub raw_value: Vec<u8>,
}

impl<'a> StoredRow<'a> {
    pub fn new(
        doc_id: &'a [u8],
        field_id: u16,
        array_positions: Vec<u64>,
        value_type: StoredValueType,
        raw_value: Vec<u8>,
    ) -> Result<StoredRow<'a>> {
        validate_doc_id(doc_id)?;
        Ok(StoredRow { doc_id, field_id, array_positions, value_type, raw_value })
    }

    pub fn key_for(doc_id: &[u8], field_id: u16, array_positions: &[u64]) -> Vec<u8> {
        let mut key = Vec::with_capacity(doc_id.len() + 1 + 2 + array_positions.len() * 2);
        key.extend_from_slice(doc_id);
        key.push(SEPARATOR);
        let mut field_bytes = [0u8; 2];
        LittleEndian::write_u16(&mut field_bytes, field_id);
        key.extend_from_slice(&field_bytes);
        for position in array_positions {
            write_uvarint(&mut key, *position);
        }
        key
    }

    /// Splits a Stored key into `(doc_id, field_id, array_positions)`.
    pub fn decode_key(key: &[u8]) -> Result<(&[u8], u16, Vec<u64>)> {
        let sep = key.iter().position(|&b| b == SEPARATOR).ok_or(MalformedError::MissingSeparator)?;
        let doc_id = &key[..sep];
        validate_doc_id(doc_id)?;
        let rest = &key[sep + 1..];
        if rest.len() < 2 {
            return Err(MalformedError::ShortKey { expected: 2, got: rest.len() }.into());
        }
        let field_id = LittleEndian::read_u16(&rest[..2]);
        let mut offset = 2;
        let mut array_positions = Vec::new();
        while offset < rest.len() {
            let (position, read) = read_uvarint(&rest[offset..])?;
            array_positions.push(position);
            offset += read;
        }
        Ok((doc_id, field_id, array_positions))
    }

    pub fn decode_value(value: &[u8]) -> Result<(StoredValueType, &[u8])> {
        let tag = *value.first().ok_or(MalformedError::ShortKey { expected: 1, got: 0 })?;
        Ok((StoredValueType::from_tag(tag)?, &value[1..]))
    }
}

impl Row for StoredRow<'_> {
    fn table(&self) -> Table {
        Table::Stored
    }

    fn key(&self) -> Vec<u8> {
        StoredRow::key_for(self.doc_id, self.field_id, &self.array_positions)
    }

    fn value_size(&self) -> usize {
        1 + self.raw_value.len()
    }

    fn value_to(&self, buffer: &mut Vec<u8>) -> usize {
        buffer.push(self.value_type as u8);
        buffer.extend_from_slice(&self.raw_value);
        1 + self.raw_value.len()
    }
}

/// Upper bound on `StoredRow::key_for`'s output length for a given
/// number of array positions, useful for pre-sizing scratch buffers.
pub fn max_key_len(doc_id_len: usize, array_positions: usize) -> usize {
    doc_id_len + 1 + 2 + array_positions * uvarint_len(u64::MAX)
}
