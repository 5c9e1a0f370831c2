//! The three reader shapes callers drive a query through: term postings,
//! doc-id enumeration (for filters and deletion-aware scans), and field
//! dictionaries (for prefix/wildcard expansion). Each wraps a
//! [`crate::kv::KvIterator`] over the relevant table and stays purely
//! read-side — scoring lives in [`crate::scorer`].

pub mod doc_id;
pub mod field_dict;
pub mod term_field;

pub use doc_id::DocIdReader;
pub use field_dict::FieldDictReader;
pub use term_field::{TermFieldDoc, TermFieldReader};

use std::sync::atomic::AtomicU64;

/// Running counts of term-field readers opened and closed, exposed for
/// operational visibility (a reader leaked without a matching close shows
/// up as `started - finished` growing without bound).
pub static TERM_SEARCHERS_STARTED: AtomicU64 = AtomicU64::new(0);
pub static TERM_SEARCHERS_FINISHED: AtomicU64 = AtomicU64::new(0);
