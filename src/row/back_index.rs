//! The Back-index row: a per-document summary of everything the document
//! contributes to the index, used as the diff oracle for update/delete.
//!
//! The value is framed exactly like the common protocol-buffers wire
//! encoding for two repeated message fields (`TermsEntries` = field 1,
//! `StoredEntries` = field 2), so [`visit_terms`]/[`visit_stored`] can
//! walk it with a tag/length state machine and hand the caller borrowed
//! slices, without ever materializing the message tree. The writer reads
//! this row on every update, so that decode has to stay allocation-free.

use super::varint::{read_uvarint, uvarint_len, write_uvarint};
use super::{validate_doc_id, Row, Table, SEPARATOR};
use crate::error::{MalformedError, Result};

const WIRE_VARINT: u64 = 0;
const WIRE_LENGTH_DELIMITED: u64 = 2;

const TAG_TERMS_ENTRY: u64 = (1 << 3) | WIRE_LENGTH_DELIMITED;
const TAG_STORED_ENTRY: u64 = (2 << 3) | WIRE_LENGTH_DELIMITED;
const TAG_ENTRY_FIELD_ID: u64 = (1 << 3) | WIRE_VARINT;
const TAG_ENTRY_TERM: u64 = (2 << 3) | WIRE_LENGTH_DELIMITED;
const TAG_ENTRY_POSITIONS: u64 = (2 << 3) | WIRE_LENGTH_DELIMITED;

/// Owned, decoded form of a Back-index row. Convenient for building a new
/// row and for tests; the writer's diff step uses the zero-alloc visitors
/// below instead of this type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackIndexRow {
    pub doc_id: Vec<u8>,
    /// `(field_id, terms)` — the terms indexed for this document, per field.
    pub term_entries: Vec<(u16, Vec<Vec<u8>>)>,
    /// `(field_id, array_positions)` — the stored tuples emitted, per field.
    pub stored_entries: Vec<(u16, Vec<Vec<u64>>)>,
}

impl BackIndexRow {
    pub fn new(doc_id: impl Into<Vec<u8>>) -> Result<BackIndexRow> {
        let doc_id = doc_id.into();
        validate_doc_id(&doc_id)?;
        Ok(BackIndexRow { doc_id, term_entries: Vec::new(), stored_entries: Vec::new() })
    }

    pub fn key_for(doc_id: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(doc_id.len() + 1);
        key.extend_from_slice(doc_id);
        key.push(SEPARATOR);
        key
    }

    pub fn decode_key(key: &[u8]) -> Result<&[u8]> {
        if key.last() != Some(&SEPARATOR) {
            return Err(MalformedError::MissingSeparator.into());
        }
        let doc_id = &key[..key.len() - 1];
        validate_doc_id(doc_id)?;
        Ok(doc_id)
    }

    pub fn decode(doc_id: &[u8], value: &[u8]) -> Result<BackIndexRow> {
        let mut row = BackIndexRow { doc_id: doc_id.to_vec(), term_entries: Vec::new(), stored_entries: Vec::new() };

        let mut terms_by_field: Vec<(u16, Vec<Vec<u8>>)> = Vec::new();
        visit_terms(value, &mut |field_id, term| {
            match terms_by_field.iter_mut().find(|(f, _)| *f == field_id) {
                Some((_, terms)) => terms.push(term.to_vec()),
                None => terms_by_field.push((field_id, vec![term.to_vec()])),
            }
            Ok(())
        })?;
        row.term_entries = terms_by_field;

        let mut stored_by_field: Vec<(u16, Vec<Vec<u64>>)> = Vec::new();
        visit_stored(value, &mut |field_id, positions_bytes| {
            let positions = decode_packed_positions(positions_bytes)?;
            match stored_by_field.iter_mut().find(|(f, _)| *f == field_id) {
                Some((_, entries)) => entries.push(positions),
                None => stored_by_field.push((field_id, vec![positions])),
            }
            Ok(())
        })?;
        row.stored_entries = stored_by_field;

        Ok(row)
    }
}

impl Row for BackIndexRow {
    fn table(&self) -> Table {
        Table::BackIndex
    }

    fn key(&self) -> Vec<u8> {
        BackIndexRow::key_for(&self.doc_id)
    }

    fn value_size(&self) -> usize {
        let mut value = Vec::new();
        self.value_to(&mut value);
        value.len()
    }

    fn value_to(&self, buffer: &mut Vec<u8>) -> usize {
        let start = buffer.len();

        for (field_id, terms) in &self.term_entries {
            let mut entry = Vec::new();
            write_uvarint(&mut entry, TAG_ENTRY_FIELD_ID);
            write_uvarint(&mut entry, u64::from(*field_id));
            for term in terms {
                write_uvarint(&mut entry, TAG_ENTRY_TERM);
                write_uvarint(&mut entry, term.len() as u64);
                entry.extend_from_slice(term);
            }
            write_uvarint(buffer, TAG_TERMS_ENTRY);
            write_uvarint(buffer, entry.len() as u64);
            buffer.extend_from_slice(&entry);
        }

        for (field_id, positions_list) in &self.stored_entries {
            for positions in positions_list {
                let mut entry = Vec::new();
                write_uvarint(&mut entry, TAG_ENTRY_FIELD_ID);
                write_uvarint(&mut entry, u64::from(*field_id));

                let mut packed = Vec::new();
                for position in positions {
                    write_uvarint(&mut packed, *position);
                }
                write_uvarint(&mut entry, TAG_ENTRY_POSITIONS);
                write_uvarint(&mut entry, packed.len() as u64);
                entry.extend_from_slice(&packed);

                write_uvarint(buffer, TAG_STORED_ENTRY);
                write_uvarint(buffer, entry.len() as u64);
                buffer.extend_from_slice(&entry);
            }
        }

        buffer.len() - start
    }
}

fn decode_packed_positions(bytes: &[u8]) -> Result<Vec<u64>> {
    let mut positions = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let (position, read) = read_uvarint(&bytes[offset..])?;
        positions.push(position);
        offset += read;
    }
    Ok(positions)
}

/// Reads one length-delimited field's payload starting at `offset` in
/// `value`, given its already-consumed tag. Returns `(payload, next_offset)`.
fn read_length_delimited(value: &[u8], offset: usize) -> Result<(&[u8], usize)> {
    let (len, read) = read_uvarint(&value[offset..])?;
    let start = offset + read;
    let end = start.checked_add(len as usize).ok_or(MalformedError::TruncatedValue)?;
    if end > value.len() {
        return Err(MalformedError::TruncatedValue.into());
    }
    Ok((&value[start..end], end))
}

/// Walks a Back-index value and calls `f(field_id, term)` once per term,
/// without allocating beyond what `f` itself chooses to do.
pub fn visit_terms(value: &[u8], f: &mut dyn FnMut(u16, &[u8]) -> Result<()>) -> Result<()> {
    let mut offset = 0;
    while offset < value.len() {
        let (tag, read) = read_uvarint(&value[offset..])?;
        offset += read;
        let (entry, next) = read_length_delimited(value, offset)?;
        offset = next;

        if tag == TAG_TERMS_ENTRY {
            visit_terms_entry(entry, f)?;
        } else if tag == TAG_STORED_ENTRY {
            // not ours, skip: already consumed via read_length_delimited
        } else {
            return Err(MalformedError::UnknownTag { tag }.into());
        }
    }
    Ok(())
}

fn visit_terms_entry(entry: &[u8], f: &mut dyn FnMut(u16, &[u8]) -> Result<()>) -> Result<()> {
    let mut offset = 0;
    let mut field_id: Option<u16> = None;
    let mut pending_terms: Vec<&[u8]> = Vec::new();

    while offset < entry.len() {
        let (tag, read) = read_uvarint(&entry[offset..])?;
        offset += read;
        if tag == TAG_ENTRY_FIELD_ID {
            let (value, read) = read_uvarint(&entry[offset..])?;
            offset += read;
            if value > u64::from(u16::MAX) {
                return Err(MalformedError::InvalidVarint.into());
            }
            field_id = Some(value as u16);
        } else if tag == TAG_ENTRY_TERM {
            let (term, next) = read_length_delimited(entry, offset)?;
            offset = next;
            match field_id {
                Some(fid) => f(fid, term)?,
                None => pending_terms.push(term),
            }
        } else {
            return Err(MalformedError::UnknownTag { tag }.into());
        }
    }

    // protobuf fields may arrive in any order; flush anything seen before
    // the field id tag.
    if let Some(fid) = field_id {
        for term in pending_terms {
            f(fid, term)?;
        }
    } else if !pending_terms.is_empty() {
        return Err(MalformedError::UnknownTag { tag: TAG_ENTRY_TERM }.into());
    }
    Ok(())
}

/// Walks a Back-index value and calls `f(field_id, packed_positions)` once
/// per stored entry; `packed_positions` is the raw concatenated-varint
/// payload, left to the caller to decode on demand.
pub fn visit_stored(value: &[u8], f: &mut dyn FnMut(u16, &[u8]) -> Result<()>) -> Result<()> {
    let mut offset = 0;
    while offset < value.len() {
        let (tag, read) = read_uvarint(&value[offset..])?;
        offset += read;
        let (entry, next) = read_length_delimited(value, offset)?;
        offset = next;

        if tag == TAG_STORED_ENTRY {
            visit_stored_entry(entry, f)?;
        } else if tag == TAG_TERMS_ENTRY {
            // not ours, skip
        } else {
            return Err(MalformedError::UnknownTag { tag }.into());
        }
    }
    Ok(())
}

fn visit_stored_entry(entry: &[u8], f: &mut dyn FnMut(u16, &[u8]) -> Result<()>) -> Result<()> {
    let mut offset = 0;
    let mut field_id: Option<u16> = None;
    let mut positions: Option<&[u8]> = None;

    while offset < entry.len() {
        let (tag, read) = read_uvarint(&entry[offset..])?;
        offset += read;
        if tag == TAG_ENTRY_FIELD_ID {
            let (value, read) = read_uvarint(&entry[offset..])?;
            offset += read;
            if value > u64::from(u16::MAX) {
                return Err(MalformedError::InvalidVarint.into());
            }
            field_id = Some(value as u16);
        } else if tag == TAG_ENTRY_POSITIONS {
            let (payload, next) = read_length_delimited(entry, offset)?;
            offset = next;
            positions = Some(payload);
        } else {
            return Err(MalformedError::UnknownTag { tag }.into());
        }
    }

    match (field_id, positions) {
        (Some(fid), Some(payload)) => f(fid, payload),
        (Some(fid), None) => f(fid, &[]),
        _ => Err(MalformedError::TruncatedValue.into()),
    }
}

#[allow(dead_code)]
fn entry_overhead(field_id: u16) -> usize {
    uvarint_len(TAG_ENTRY_FIELD_ID) + uvarint_len(u64::from(field_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_empty() {
        let row = BackIndexRow::new(b"1").unwrap();
        let value = row.value();
        let decoded = BackIndexRow::decode(b"1", &value).unwrap();
        assert_eq!(decoded.term_entries, Vec::new());
        assert_eq!(decoded.stored_entries, Vec::new());
    }

    #[test]
    fn roundtrip_terms_and_stored() {
        let mut row = BackIndexRow::new(b"2").unwrap();
        row.term_entries.push((0, vec![b"hello".to_vec(), b"world".to_vec()]));
        row.term_entries.push((1, vec![b"lorem".to_vec()]));
        row.stored_entries.push((0, vec![vec![], vec![0, 1, 2]]));

        let value = row.value();
        let decoded = BackIndexRow::decode(b"2", &value).unwrap();
        assert_eq!(decoded.term_entries, row.term_entries);
        assert_eq!(decoded.stored_entries, row.stored_entries);
    }

    #[test]
    fn visit_terms_yields_field_term_pairs_without_full_decode() {
        let mut row = BackIndexRow::new(b"3").unwrap();
        row.term_entries.push((5, vec![b"a".to_vec(), b"b".to_vec()]));

        let value = row.value();
        let mut seen = Vec::new();
        visit_terms(&value, &mut |field_id, term| {
            seen.push((field_id, term.to_vec()));
            Ok(())
        })
        .unwrap();

        assert_eq!(seen, vec![(5, b"a".to_vec()), (5, b"b".to_vec())]);
    }

    #[test]
    fn thousands_of_distinct_terms() {
        let mut row = BackIndexRow::new(b"big").unwrap();
        let terms: Vec<Vec<u8>> = (0..3000).map(|i| format!("term{}", i).into_bytes()).collect();
        row.term_entries.push((0, terms.clone()));

        let value = row.value();
        let mut count = 0;
        visit_terms(&value, &mut |_, _| {
            count += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(count, terms.len());
    }

    #[test]
    fn key_roundtrip() {
        let key = BackIndexRow::key_for(b"doc-1");
        assert_eq!(BackIndexRow::decode_key(&key).unwrap(), b"doc-1");
    }
}
