//! An inverted-index storage core: a pluggable ordered key-value
//! abstraction below seven row families (Version, Internal, Field,
//! Dictionary, TermFrequency, Back-index, Stored), an analysis pipeline
//! in front of them, and a writer/reader pair that keeps the Dictionary's
//! posting counts and the Back-index's per-document diff oracle in sync.
//!
//! Grounded in `meilidb-core`/`meilidb-data`'s layering (schema → tokens →
//! FST/postings over a `rkv`-style KV handle), generalized from that
//! crate's RocksDB-specific column families to the [`kv::KvStore`] trait
//! so a caller can swap in any backend that can offer ordered iteration
//! and a batched write.
//!
//! [`index::Index`] is the entry point most callers want; the row, kv,
//! analysis, reader, and writer modules are public for callers building
//! a different entry point on the same primitives (e.g. a segment merger,
//! or a backend-specific bulk loader).

pub mod analysis;
pub mod error;
pub mod index;
pub mod kv;
pub mod reader;
pub mod registry;
pub mod row;
pub mod scorer;
pub mod writer;

pub use error::{BackendError, ConfigError, Error, MalformedError, Result};
pub use index::{Index, IndexReader, StoredField};
pub use registry::{config_from_json, Config, ConfigValue, Registry};
pub use row::Table;
pub use writer::DocumentField;
