use super::{Row, Table, SCHEMA_VERSION};
use crate::error::{MalformedError, Result};

/// The singleton Version row. Its key is a fixed constant (the empty
/// key, since the table alone already disambiguates it); its value is a
/// single byte holding the schema version.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VersionRow {
    pub version: u8,
}

impl VersionRow {
    pub fn current() -> VersionRow {
        VersionRow { version: SCHEMA_VERSION }
    }

    pub fn key_bytes() -> Vec<u8> {
        Vec::new()
    }

    pub fn decode_value(value: &[u8]) -> Result<VersionRow> {
        match value.first() {
            Some(&version) => Ok(VersionRow { version }),
            None => Err(MalformedError::ShortKey { expected: 1, got: 0 }.into()),
        }
    }
}

impl Row for VersionRow {
    fn table(&self) -> Table {
        Table::Version
    }

    fn key(&self) -> Vec<u8> {
        VersionRow::key_bytes()
    }

    fn value_size(&self) -> usize {
        1
    }

    fn value_to(&self, buffer: &mut Vec<u8>) -> usize {
        buffer.push(self.version);
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let row = VersionRow::current();
        let value = row.value();
        let decoded = VersionRow::decode_value(&value).unwrap();
        assert_eq!(decoded, row);
    }
}
