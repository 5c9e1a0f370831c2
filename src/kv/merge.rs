//! Merge-operator emulation for backends that lack a native counter or
//! read-modify-write primitive. Grounded in `kite_rocksdb`'s `merge_keys`
//! (which folds directory-list and statistic operands at read time) and
//! in the goleveldb `emulated_merge` store, which keeps unmerged operands
//! in a pending list and collapses them with `FullMerge`/`PartialMerge`
//! the first time the key is read or the store compacts.
//!
//! Dictionary row counters do **not** go through this path: they use the
//! backend's native atomic counter where available (see
//! [`crate::kv::memory::MemoryStore`]), since a counter is read far more
//! often than it's merged and deserves a dedicated fast path.

/// Combines a base value with zero or more pending merge operands.
/// `full_merge` is called when a full value is available (a `set`, or no
/// prior value at all); `partial_merge` lets two operands fold into one
/// before either is combined with a base value, the way LevelDB/RocksDB
/// collapse operand chains during compaction.
pub trait MergeOperator: Send + Sync {
    /// Combines `existing` (`None` if the key was never set) with
    /// `operands`, in the order they were recorded. Returns `(merged,
    /// true)` on success; `(_, false)` signals the merge is irreconcilable
    /// and the caller should surface a `MergeFailure` error.
    fn full_merge(&self, key: &[u8], existing: Option<&[u8]>, operands: &[Vec<u8>]) -> (Vec<u8>, bool);

    /// Folds two adjacent operands into one, without a base value.
    /// Returning `(_, false)` tells the caller to keep both operands
    /// separate and defer to `full_merge` instead.
    fn partial_merge(&self, key: &[u8], left: &[u8], right: &[u8]) -> (Vec<u8>, bool);
}

/// Collapses `operands` against `existing` using `partial_merge` first
/// (left-to-right), then `full_merge` for whatever didn't collapse. This
/// is the emulation path a backend without native merge support runs on
/// every read of a key with pending operands.
pub fn collapse(
    operator: &dyn MergeOperator,
    key: &[u8],
    existing: Option<&[u8]>,
    operands: &[Vec<u8>],
) -> (Vec<u8>, bool) {
    if operands.is_empty() {
        return (existing.map(|v| v.to_vec()).unwrap_or_default(), true);
    }

    let mut folded: Vec<Vec<u8>> = Vec::with_capacity(operands.len());
    let mut pending = operands[0].clone();
    for operand in &operands[1..] {
        let (merged, ok) = operator.partial_merge(key, &pending, operand);
        if ok {
            pending = merged;
        } else {
            folded.push(pending);
            pending = operand.clone();
        }
    }
    folded.push(pending);

    operator.full_merge(key, existing, &folded)
}

/// A merge operator for stores with no counters or accumulators at all:
/// every merge fails, forcing callers onto `set`/`delete`. Useful as a
/// default for tables that never issue a `merge` batch operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMergeOperator;

impl MergeOperator for NoopMergeOperator {
    fn full_merge(&self, _key: &[u8], existing: Option<&[u8]>, operands: &[Vec<u8>]) -> (Vec<u8>, bool) {
        if operands.is_empty() {
            (existing.map(|v| v.to_vec()).unwrap_or_default(), true)
        } else {
            (Vec::new(), false)
        }
    }

    fn partial_merge(&self, _key: &[u8], _left: &[u8], _right: &[u8]) -> (Vec<u8>, bool) {
        (Vec::new(), false)
    }
}
