use super::{Row, Table};

/// Engine metadata keyed by arbitrary bytes (e.g. a serialized mapping).
/// The core does not interpret the value; it is opaque to the writer and
/// readers alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalRow {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl InternalRow {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> InternalRow {
        InternalRow { key: key.into(), value: value.into() }
    }
}

impl Row for InternalRow {
    fn table(&self) -> Table {
        Table::Internal
    }

    fn key(&self) -> Vec<u8> {
        self.key.clone()
    }

    fn value_size(&self) -> usize {
        self.value.len()
    }

    fn value_to(&self, buffer: &mut Vec<u8>) -> usize {
        buffer.extend_from_slice(&self.value);
        self.value.len()
    }
}
