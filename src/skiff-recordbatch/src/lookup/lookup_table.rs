use arrow2::array::new_empty_array;
use arrow2::compute::concatenate::concatenate;
use common_error::{SkiffError, SkiffResult};
use hashbrown::{hash_map::RawEntryMut, HashMap};
use itertools::Itertools;
use skiff_core::kernels::comparison::build_multi_array_is_equal;
use skiff_core::schema::SchemaRef;
use skiff_core::Column;

use super::{LookupSource, NO_MATCH};
use crate::ops::hash::{IdentityBuildHasher, IndexHash};
use crate::RecordBatch;

/// A hash index over build-side join keys.
///
/// Join positions are row indices into the concatenated build keys. Only the
/// first row of a duplicate key is addressable; build rows with a null key are
/// never inserted and so never match.
pub struct LookupTable {
    keys: RecordBatch,
    hash_table: HashMap<IndexHash, (), IdentityBuildHasher>,
}

pub struct LookupTableBuilder {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl LookupTableBuilder {
    pub fn new(schema: SchemaRef) -> SkiffResult<Self> {
        if schema.is_empty() {
            return Err(SkiffError::ValueError(
                "Cannot build a LookupTable over zero key columns".to_string(),
            ));
        }
        Ok(Self {
            schema,
            batches: vec![],
        })
    }

    pub fn add_batch(&mut self, batch: &RecordBatch) -> SkiffResult<()> {
        if batch.schema.as_ref() != self.schema.as_ref() {
            return Err(SkiffError::SchemaMismatch(format!(
                "While adding a batch to a LookupTableBuilder, we found that the batch schema did not match the key schema. expected: {:?} vs got: {:?}",
                self.schema, batch.schema
            )));
        }
        self.batches.push(batch.clone());
        Ok(())
    }

    /// Concatenate the accumulated batches, hash every row, and index them
    /// first-wins: a key seen in an earlier row keeps that row's position.
    pub fn build(self) -> SkiffResult<LookupTable> {
        let keys = self.concat_batches()?;
        let mut hash_table =
            HashMap::<IndexHash, (), IdentityBuildHasher>::with_capacity_and_hasher(
                keys.len(),
                Default::default(),
            );
        if !keys.is_empty() {
            let hashes = keys.hash_rows()?;
            let is_equal =
                build_multi_array_is_equal(keys.columns(), keys.columns(), false, false)?;
            for (i, h) in hashes.values_iter().enumerate() {
                if keys.columns().iter().any(|c| c.is_null(i)) {
                    continue;
                }
                let entry = hash_table.raw_entry_mut().from_hash(*h, |other| {
                    (*h == other.hash) && is_equal(other.idx as usize, i)
                });
                match entry {
                    RawEntryMut::Vacant(entry) => {
                        entry.insert_hashed_nocheck(
                            *h,
                            IndexHash {
                                idx: i as u64,
                                hash: *h,
                            },
                            (),
                        );
                    }
                    RawEntryMut::Occupied(_) => {}
                }
            }
        }
        log::debug!(
            "Built LookupTable with {} rows and {} distinct keys",
            keys.len(),
            hash_table.len()
        );
        Ok(LookupTable { keys, hash_table })
    }

    fn concat_batches(&self) -> SkiffResult<RecordBatch> {
        if self.batches.is_empty() {
            let columns = self
                .schema
                .fields()
                .iter()
                .map(|field| Column::new(field.clone(), new_empty_array(field.dtype.to_arrow())))
                .collect::<SkiffResult<Vec<_>>>()?;
            return RecordBatch::new_with_size(self.schema.clone(), columns, 0);
        }
        let num_rows = self.batches.iter().map(|b| b.len()).sum();
        let mut columns = Vec::with_capacity(self.schema.len());
        for (i, field) in self.schema.fields().iter().enumerate() {
            let materialized = self
                .batches
                .iter()
                .map(|b| b.get_column_by_index(i)?.materialize())
                .collect::<SkiffResult<Vec<_>>>()?;
            let refs = materialized
                .iter()
                .map(|c| c.as_arrow())
                .collect::<SkiffResult<Vec<_>>>()?;
            columns.push(Column::new(field.clone(), concatenate(refs.as_slice())?)?);
        }
        RecordBatch::new_with_size(self.schema.clone(), columns, num_rows)
    }
}

impl LookupTable {
    /// Key dtypes must line up positionally; names are free to differ between
    /// the build and probe sides.
    fn check_key_dtypes(&self, keys: &RecordBatch) {
        assert_eq!(self.keys.schema.len(), keys.schema.len());
        assert!(self
            .keys
            .schema
            .fields()
            .iter()
            .zip(keys.schema.fields())
            .all(|(l, r)| l.dtype == r.dtype));
    }

    fn find<F: Fn(usize, usize) -> bool>(&self, hash: u64, probe_idx: usize, is_equal: &F) -> i64 {
        self.hash_table
            .raw_entry()
            .from_hash(hash, |other| {
                hash == other.hash && is_equal(other.idx as usize, probe_idx)
            })
            .map_or(NO_MATCH, |(entry, _)| entry.idx as i64)
    }

    fn materialized_columns(batch: &RecordBatch) -> SkiffResult<Vec<Column>> {
        batch.columns().iter().map(|c| c.materialize()).collect()
    }
}

impl LookupSource for LookupTable {
    fn join_position(
        &self,
        position: usize,
        keys: &RecordBatch,
        _page: &RecordBatch,
        hash: Option<u64>,
    ) -> SkiffResult<i64> {
        self.check_key_dtypes(keys);
        let hash = match hash {
            Some(hash) => hash,
            None => keys.hash_row(position)?,
        };
        let probe_columns = Self::materialized_columns(keys)?;
        let is_equal =
            build_multi_array_is_equal(self.keys.columns(), &probe_columns, false, false)?;
        Ok(self.find(hash, position, &is_equal))
    }

    fn join_positions(
        &self,
        positions: &[u32],
        keys: &RecordBatch,
        _page: &RecordBatch,
        hashes: Option<&[u64]>,
    ) -> SkiffResult<Vec<i64>> {
        self.check_key_dtypes(keys);
        let probe_columns = Self::materialized_columns(keys)?;
        let is_equal =
            build_multi_array_is_equal(self.keys.columns(), &probe_columns, false, false)?;
        match hashes {
            Some(hashes) => Ok(positions
                .iter()
                .zip_eq(hashes)
                .map(|(&position, &hash)| self.find(hash, position as usize, &is_equal))
                .collect()),
            None => {
                let computed = keys.hash_rows()?;
                Ok(positions
                    .iter()
                    .map(|&position| {
                        self.find(computed.value(position as usize), position as usize, &is_equal)
                    })
                    .collect())
            }
        }
    }

    fn supports_caching(&self) -> bool {
        true
    }

    fn join_position_count(&self) -> usize {
        self.keys.len()
    }
}
