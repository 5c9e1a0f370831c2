use byteorder::{ByteOrder, LittleEndian};

use super::{validate_segment, Row, Table, SEPARATOR};
use crate::error::{MalformedError, Result};

/// Maps a stable u16 field id to its name. Assigned at first appearance
/// and never reused; persisted so the mapping survives a reopen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    pub field_id: u16,
    pub name: String,
}

impl FieldRow {
    pub fn new(field_id: u16, name: impl Into<String>) -> Result<FieldRow> {
        let name = name.into();
        validate_segment(name.as_bytes())?;
        Ok(FieldRow { field_id, name })
    }

    pub fn key_for(field_id: u16) -> Vec<u8> {
        let mut key = vec![0u8; 2];
        LittleEndian::write_u16(&mut key, field_id);
        key
    }

    pub fn decode_key(key: &[u8]) -> Result<u16> {
        if key.len() != 2 {
            return Err(MalformedError::ShortKey { expected: 2, got: key.len() }.into());
        }
        Ok(LittleEndian::read_u16(key))
    }

    pub fn decode_value(field_id: u16, value: &[u8]) -> Result<FieldRow> {
        let terminator = value
            .iter()
            .position(|&b| b == SEPARATOR)
            .ok_or(MalformedError::MissingSeparator)?;
        let name = std::str::from_utf8(&value[..terminator])
            .map_err(|_| MalformedError::InvalidVarint)?
            .to_owned();
        Ok(FieldRow { field_id, name })
    }
}

impl Row for FieldRow {
    fn table(&self) -> Table {
        Table::Field
    }

    fn key(&self) -> Vec<u8> {
        FieldRow::key_for(self.field_id)
    }

    fn value_size(&self) -> usize {
        self.name.len() + 1
    }

    fn value_to(&self, buffer: &mut Vec<u8>) -> usize {
        buffer.extend_from_slice(self.name.as_bytes());
        buffer.push(SEPARATOR);
        self.name.len() + 1
    }
}
