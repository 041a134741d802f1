use std::sync::Arc;

use arrow2::array::UInt64Array;
use arrow2::bitmap::Bitmap;
use common_error::{SkiffError, SkiffResult};
use common_skiff_config::SkiffExecutionConfig;
use itertools::Itertools;
use skiff_recordbatch::lookup::{LookupSource, NO_MATCH};
use skiff_recordbatch::RecordBatch;
use tracing::{info_span, instrument};

/// How the probe resolves join positions, decided once when a lookup source
/// is attached.
enum PositionLookup {
    Unbound,
    Cached { positions: Vec<i64> },
    PerRow { source: Arc<dyn LookupSource> },
}

/// Per-operator configuration for creating [`JoinProbe`]s: which page columns
/// are carried to the output, which form the join key, and where precomputed
/// row hashes live, if anywhere.
pub struct JoinProbeFactory {
    output_channels: Arc<Vec<usize>>,
    key_channels: Arc<Vec<usize>>,
    hash_channel: Option<usize>,
    position_cache_threshold: usize,
}

impl JoinProbeFactory {
    pub fn new(
        output_channels: Vec<usize>,
        key_channels: Vec<usize>,
        hash_channel: Option<usize>,
        config: &SkiffExecutionConfig,
    ) -> Self {
        assert!(
            !key_channels.is_empty(),
            "JoinProbeFactory requires at least one key channel"
        );
        Self {
            output_channels: Arc::new(output_channels),
            key_channels: Arc::new(key_channels),
            hash_channel,
            position_cache_threshold: config.join_position_cache_threshold,
        }
    }

    /// Build one probe over `page`.
    ///
    /// Key columns are materialized here, exactly once, so that every later
    /// per-row access is a direct array read rather than a view indirection.
    pub fn create_probe(&self, page: RecordBatch) -> SkiffResult<JoinProbe> {
        let num_columns = page.num_columns();
        for &channel in self
            .key_channels
            .iter()
            .chain(self.output_channels.iter())
            .chain(self.hash_channel.iter())
        {
            assert!(
                channel < num_columns,
                "channel {channel} is out of range for a page with {num_columns} columns"
            );
        }

        let key_columns = self
            .key_channels
            .iter()
            .map(|&channel| page.get_column_by_index(channel)?.materialize())
            .collect::<SkiffResult<Vec<_>>>()?;

        // Masks are collected only for key columns that can actually hold a
        // null; an all-null typed column contributes an all-unset mask.
        let mut key_validities = Vec::new();
        for column in &key_columns {
            if column.data_type().is_null() {
                key_validities.push(Bitmap::new_zeroed(column.len()));
            } else if let Some(validity) = column.as_arrow()?.validity() {
                key_validities.push(validity.clone());
            }
        }

        let hashes = match self.hash_channel {
            Some(channel) => {
                let column = page.get_column_by_index(channel)?.materialize()?;
                let array = column
                    .as_arrow()?
                    .as_any()
                    .downcast_ref::<UInt64Array>()
                    .ok_or_else(|| {
                        SkiffError::TypeError(format!(
                            "Expected the hash channel to hold UInt64 row hashes, got {}",
                            column.data_type()
                        ))
                    })?
                    .clone();
                Some(array)
            }
            None => None,
        };

        let position_count = page.len();
        let keys = RecordBatch::from_nonempty_columns(key_columns)?;
        Ok(JoinProbe {
            output_channels: self.output_channels.clone(),
            page,
            keys,
            key_validities,
            hashes,
            position: None,
            position_count,
            position_cache_threshold: self.position_cache_threshold,
            lookup: PositionLookup::Unbound,
        })
    }
}

/// A cursor over one probe page that reports, row by row, the matching
/// build-side join position (or [`NO_MATCH`]).
///
/// Drive it with [`JoinProbe::advance_next_position`] /
/// [`JoinProbe::current_join_position`] after attaching a lookup source:
///
/// ```ignore
/// probe.attach_lookup_source(source)?;
/// while probe.advance_next_position() {
///     match probe.current_join_position()? { ... }
/// }
/// ```
pub struct JoinProbe {
    output_channels: Arc<Vec<usize>>,
    page: RecordBatch,
    keys: RecordBatch,
    key_validities: Vec<Bitmap>,
    hashes: Option<UInt64Array>,
    position: Option<usize>,
    position_count: usize,
    position_cache_threshold: usize,
    lookup: PositionLookup,
}

impl JoinProbe {
    /// Bind the build side and decide, once, between eagerly caching every
    /// row's join position with a single batched lookup and querying the
    /// source lazily per row.
    ///
    /// Caching is taken only when the source supports it and reports strictly
    /// more positions than the configured threshold. The decision is final
    /// for the life of the probe; attaching twice panics.
    #[instrument(skip_all, name = "JoinProbe::attach_lookup_source")]
    pub fn attach_lookup_source(&mut self, source: Arc<dyn LookupSource>) -> SkiffResult<()> {
        assert!(
            matches!(self.lookup, PositionLookup::Unbound),
            "the lookup strategy should only be in the Unbound state when attaching a lookup source"
        );
        if source.supports_caching()
            && source.join_position_count() > self.position_cache_threshold
        {
            let _fill = info_span!("JoinProbe::fill_position_cache").entered();
            let positions = self.fill_position_cache(source.as_ref())?;
            drop(_fill);
            log::debug!(
                "Filled the join-position cache for {} probe rows from a source with {} positions",
                positions.len(),
                source.join_position_count()
            );
            self.lookup = PositionLookup::Cached { positions };
        } else {
            self.lookup = PositionLookup::PerRow { source };
        }
        Ok(())
    }

    /// Resolve every row's join position in one batched call.
    ///
    /// Rows with a null join key can never match, so when any are present the
    /// lookup covers only the compacted non-null positions and the results
    /// are scattered back over a `NO_MATCH`-prefilled cache. The source never
    /// sees a null-key row.
    fn fill_position_cache(&self, source: &dyn LookupSource) -> SkiffResult<Vec<i64>> {
        let position_count = self.position_count;
        if !self.key_validities.is_empty() {
            // Count first, then fill, so the compacted array is sized exactly.
            let non_null_count = (0..position_count)
                .filter(|&position| !self.row_contains_null(position))
                .count();
            if non_null_count < position_count {
                let mut positions = Vec::with_capacity(non_null_count);
                for position in 0..position_count {
                    if !self.row_contains_null(position) {
                        positions.push(position as u32);
                    }
                }
                let gathered = self.hashes.as_ref().map(|hashes| {
                    positions
                        .iter()
                        .map(|&position| hashes.value(position as usize))
                        .collect::<Vec<_>>()
                });
                let looked_up =
                    source.join_positions(&positions, &self.keys, &self.page, gathered.as_deref())?;
                let mut cache = vec![NO_MATCH; position_count];
                for (position, join_position) in positions.iter().zip_eq(looked_up) {
                    cache[*position as usize] = join_position;
                }
                return Ok(cache);
            }
        }

        let positions = (0..position_count as u32).collect::<Vec<_>>();
        let hashes = self.hashes.as_ref().map(|hashes| hashes.values().as_slice());
        let looked_up = source.join_positions(&positions, &self.keys, &self.page, hashes)?;
        assert_eq!(
            looked_up.len(),
            position_count,
            "the lookup source should return one join position per probe row"
        );
        Ok(looked_up)
    }

    /// Step the cursor and report whether it landed on a row.
    ///
    /// Must not be called once the probe is finished.
    pub fn advance_next_position(&mut self) -> bool {
        assert!(
            !self.is_finished(),
            "advance_next_position should not be called after the probe is finished"
        );
        self.position = Some(self.position.map_or(0, |position| position + 1));
        !self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.position == Some(self.position_count)
    }

    /// The join position for the row under the cursor, or [`NO_MATCH`].
    ///
    /// Reading is idempotent and never moves the cursor. The cursor must be
    /// on a row and a lookup source must have been attached.
    pub fn current_join_position(&self) -> SkiffResult<i64> {
        let position = self.current_position();
        match &self.lookup {
            PositionLookup::Unbound => {
                panic!("current_join_position can only be used after a lookup source is attached")
            }
            PositionLookup::Cached { positions } => Ok(positions[position]),
            PositionLookup::PerRow { source } => {
                if self.row_contains_null(position) {
                    return Ok(NO_MATCH);
                }
                let hash = self.hashes.as_ref().map(|hashes| hashes.value(position));
                source.join_position(position, &self.keys, &self.page, hash)
            }
        }
    }

    fn current_position(&self) -> usize {
        let position = self
            .position
            .expect("current_join_position should not be called before the first advance");
        assert!(
            position < self.position_count,
            "current_join_position should not be called after the probe is finished"
        );
        position
    }

    fn row_contains_null(&self, position: usize) -> bool {
        self.key_validities
            .iter()
            .any(|validity| !validity.get_bit(position))
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn page(&self) -> &RecordBatch {
        &self.page
    }

    pub fn output_channels(&self) -> &[usize] {
        &self.output_channels
    }
}
