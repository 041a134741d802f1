mod lookup_table;

use common_error::SkiffResult;

pub use lookup_table::{LookupTable, LookupTableBuilder};

use crate::RecordBatch;

/// Join position returned when a probe row matches no build-side row.
pub const NO_MATCH: i64 = -1;

/// A built join index mapping probe-key rows to build-side join positions.
///
/// Implementations are immutable once constructed and may be shared behind an
/// `Arc` across many probes at once.
pub trait LookupSource: Send + Sync {
    /// Return the join position for row `position` of `keys`, or [`NO_MATCH`].
    ///
    /// `keys` holds only the key columns; `page` is the full probe page for
    /// implementations that consume pass-through columns. When `hash` is
    /// provided it must be the precomputed row hash for `position` and saves
    /// the implementation from rehashing.
    fn join_position(
        &self,
        position: usize,
        keys: &RecordBatch,
        page: &RecordBatch,
        hash: Option<u64>,
    ) -> SkiffResult<i64>;

    /// Batched variant of [`LookupSource::join_position`].
    ///
    /// `hashes`, when present, aligns 1:1 with `positions`. The returned
    /// vector aligns 1:1 with `positions`.
    fn join_positions(
        &self,
        positions: &[u32],
        keys: &RecordBatch,
        page: &RecordBatch,
        hashes: Option<&[u64]>,
    ) -> SkiffResult<Vec<i64>>;

    /// Whether callers may precompute every join position for a page up front.
    fn supports_caching(&self) -> bool;

    /// Number of addressable join positions. Feeds caching heuristics only.
    fn join_position_count(&self) -> usize;
}
