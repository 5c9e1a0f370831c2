use byteorder::{ByteOrder, LittleEndian};

use super::varint::{read_f32_from_varint, read_uvarint, uvarint_len, write_f32_as_varint, write_uvarint};
use super::{validate_doc_id, validate_segment, Row, Table, SEPARATOR};
use crate::error::{MalformedError, Result};

/// The positional/offset breadcrumbs a highlighter uses to reconstruct a
/// term occurrence. `array_positions` records which positions of a
/// repeated/array field this occurrence came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermVector {
    pub field_id: u16,
    pub pos: u64,
    pub start: u64,
    pub end: u64,
    pub array_positions: Vec<u64>,
}

impl TermVector {
    fn encoded_len(&self) -> usize {
        uvarint_len(u64::from(self.field_id))
            + uvarint_len(self.pos)
            + uvarint_len(self.start)
            + uvarint_len(self.end)
            + uvarint_len(self.array_positions.len() as u64)
            + self.array_positions.iter().map(|p| uvarint_len(*p)).sum::<usize>()
    }

    fn encode_to(&self, buffer: &mut Vec<u8>) {
        write_uvarint(buffer, u64::from(self.field_id));
        write_uvarint(buffer, self.pos);
        write_uvarint(buffer, self.start);
        write_uvarint(buffer, self.end);
        write_uvarint(buffer, self.array_positions.len() as u64);
        for p in &self.array_positions {
            write_uvarint(buffer, *p);
        }
    }

    fn decode_from(buf: &[u8]) -> Result<(TermVector, usize)> {
        let mut offset = 0;
        let (field_id, n) = read_uvarint(&buf[offset..])?;
        offset += n;
        if field_id > u64::from(u16::MAX) {
            return Err(MalformedError::InvalidVarint.into());
        }
        let (pos, n) = read_uvarint(&buf[offset..])?;
        offset += n;
        let (start, n) = read_uvarint(&buf[offset..])?;
        offset += n;
        let (end, n) = read_uvarint(&buf[offset..])?;
        offset += n;
        let (count, n) = read_uvarint(&buf[offset..])?;
        offset += n;
        let mut array_positions = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (p, n) = read_uvarint(&buf[offset..])?;
            offset += n;
            array_positions.push(p);
        }
        Ok((
            TermVector { field_id: field_id as u16, pos, start, end, array_positions },
            offset,
        ))
    }
}

/// One posting: `(term, field, doc, freq, vectors)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TermFrequencyRow<'a> {
    pub field_id: u16,
    pub term: &'a [u8],
    pub doc_id: &'a [u8],
    pub freq: u64,
    pub pre_score: f32,
    pub vectors: Vec<TermVector>,
}

impl<'a> TermFrequencyRow<'a> {
    pub fn new(
        field_id: u16,
        term: &'a [u8],
        doc_id: &'a [u8],
        freq: u64,
        pre_score: f32,
        vectors: Vec<TermVector>,
    ) -> Result<TermFrequencyRow<'a>> {
        validate_segment(term)?;
        validate_doc_id(doc_id)?;
        Ok(TermFrequencyRow { field_id, term, doc_id, freq, pre_score, vectors })
    }

    /// `field-id ∥ term ∥ 0xFF`: a prefix that selects exactly the
    /// postings for `term` in `field_id`, sorted by doc-id.
    pub fn term_prefix(field_id: u16, term: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(2 + term.len() + 1);
        key.resize(2, 0);
        LittleEndian::write_u16(&mut key[..2], field_id);
        key.extend_from_slice(term);
        key.push(SEPARATOR);
        key
    }

    pub fn key_for(field_id: u16, term: &[u8], doc_id: &[u8]) -> Vec<u8> {
        let mut key = TermFrequencyRow::term_prefix(field_id, term);
        key.extend_from_slice(doc_id);
        key
    }

    /// Splits a TermFrequency key into `(field_id, term, doc_id)`.
    pub fn decode_key(key: &[u8]) -> Result<(u16, &[u8], &[u8])> {
        if key.len() < 2 {
            return Err(MalformedError::ShortKey { expected: 2, got: key.len() }.into());
        }
        let field_id = LittleEndian::read_u16(&key[..2]);
        let rest = &key[2..];
        let sep = rest.iter().position(|&b| b == SEPARATOR).ok_or(MalformedError::MissingSeparator)?;
        let term = &rest[..sep];
        let doc_id = &rest[sep + 1..];
        if doc_id.is_empty() {
            return Err(MalformedError::EmptyDocId.into());
        }
        Ok((field_id, term, doc_id))
    }

    pub fn decode_value(value: &[u8]) -> Result<(u64, f32, Vec<TermVector>)> {
        let mut offset = 0;
        let (freq, n) = read_uvarint(&value[offset..])?;
        offset += n;
        let (pre_score, n) = read_f32_from_varint(&value[offset..])?;
        offset += n;
        let (vector_count, n) = read_uvarint(&value[offset..])?;
        offset += n;
        let mut vectors = Vec::with_capacity(vector_count as usize);
        for _ in 0..vector_count {
            if offset > value.len() {
                return Err(MalformedError::InvalidVarint.into());
            }
            let (vector, n) = TermVector::decode_from(&value[offset..])?;
            offset += n;
            vectors.push(vector);
        }
        Ok((freq, pre_score, vectors))
    }
}

impl Row for TermFrequencyRow<'_> {
    fn table(&self) -> Table {
        Table::TermFrequency
    }

    fn key(&self) -> Vec<u8> {
        TermFrequencyRow::key_for(self.field_id, self.term, self.doc_id)
    }

    fn value_size(&self) -> usize {
        uvarint_len(self.freq)
            + uvarint_len(u64::from(self.pre_score.to_bits()))
            + uvarint_len(self.vectors.len() as u64)
            + self.vectors.iter().map(TermVector::encoded_len).sum::<usize>()
    }

    fn value_to(&self, buffer: &mut Vec<u8>) -> usize {
        let start = buffer.len();
        write_uvarint(buffer, self.freq);
        write_f32_as_varint(buffer, self.pre_score);
        write_uvarint(buffer, self.vectors.len() as u64);
        for vector in &self.vectors {
            vector.encode_to(buffer);
        }
        buffer.len() - start
    }
}
