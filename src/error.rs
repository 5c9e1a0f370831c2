use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the storage core.
///
/// Variants correspond to the error kinds of the error handling design:
/// malformed rows, transient backend failures, absent-key signalling,
/// bad construction configuration, and merge-operator failures.
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed row: {0}")]
    Malformed(#[from] MalformedError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("merge operator {operator:?} refused to merge key")]
    MergeFailure { operator: &'static str },

    #[error("index schema version {on_disk} is not supported by this build (supports {supported})")]
    SchemaVersionMismatch { on_disk: u8, supported: u8 },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Errors raised while parsing a row's key or value. Never retried.
#[derive(Error, Debug)]
pub enum MalformedError {
    #[error("key is shorter than the table's minimum length ({expected} bytes, got {got})")]
    ShortKey { expected: usize, got: usize },

    #[error("key is missing the 0xFF byte separator")]
    MissingSeparator,

    #[error("value contains an invalid varint")]
    InvalidVarint,

    #[error("doc-id is empty")]
    EmptyDocId,

    #[error("doc-id contains the reserved 0xFF byte separator")]
    DocIdContainsSeparator,

    #[error("field name or term contains the reserved 0xFF byte separator")]
    SegmentContainsSeparator,

    #[error("back-index protobuf-style tag {tag} did not match any known field")]
    UnknownTag { tag: u64 },

    #[error("back-index value ended in the middle of a length-delimited field")]
    TruncatedValue,
}

/// Errors surfaced by the KV backend. `AbsentKey` is distinguished from
/// `Transient` because readers (in particular the dictionary counter
/// path) interpret it as "no postings" rather than as a failure.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("key not found")]
    AbsentKey,

    #[error("iterator scan failed: {0}")]
    ScanFailed(String),

    #[error("batch execute failed: {0}")]
    ExecuteFailed(String),
}

/// Errors raised from the registry/constructor, before any I/O happens.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no plugin named {0:?} is registered")]
    UnknownPlugin(String),

    #[error("must specify: {0}")]
    MissingOption(&'static str),

    #[error("option {name:?} has the wrong type, expected {expected}")]
    WrongOptionType { name: &'static str, expected: &'static str },

    #[error("field id space is exhausted, no id left to assign to {0:?}")]
    FieldIdSpaceExhausted(String),
}
