use std::hash::{BuildHasherDefault, Hash, Hasher};

use arrow2::array::UInt64Array;
use common_error::{SkiffError, SkiffResult};
use skiff_core::kernels::hashing;

use crate::RecordBatch;

/// A row index paired with its precomputed row hash.
///
/// Used as a hash-table key together with [`IdentityBuildHasher`] so the table
/// reuses the stored hash instead of rehashing the struct.
pub struct IndexHash {
    pub idx: u64,
    pub hash: u64,
}

impl Hash for IndexHash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash)
    }
}

#[derive(Default)]
pub struct IdentityHasher {
    hash: u64,
}

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, _bytes: &[u8]) {
        unreachable!("IdentityHasher should be used by u64")
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = i;
    }
}

pub type IdentityBuildHasher = BuildHasherDefault<IdentityHasher>;

impl RecordBatch {
    /// Hash every row into a single `u64`, folding columns left to right.
    ///
    /// The first column is hashed unseeded and each subsequent column is hashed
    /// with the running hashes as per-row seeds.
    pub fn hash_rows(&self) -> SkiffResult<UInt64Array> {
        if self.num_columns() == 0 {
            return Err(SkiffError::ValueError(
                "Attempting to hash a RecordBatch with no columns".to_string(),
            ));
        }
        let materialized = self
            .columns()
            .iter()
            .map(|c| c.materialize())
            .collect::<SkiffResult<Vec<_>>>()?;
        let mut hash_so_far = hashing::hash(materialized.first().unwrap().as_arrow()?, None)?;
        for c in materialized.iter().skip(1) {
            hash_so_far = hashing::hash(c.as_arrow()?, Some(&hash_so_far))?;
        }
        Ok(hash_so_far)
    }

    /// Hash a single row, with the same column-folding scheme as [`RecordBatch::hash_rows`].
    pub fn hash_row(&self, idx: usize) -> SkiffResult<u64> {
        if self.num_columns() == 0 {
            return Err(SkiffError::ValueError(
                "Attempting to hash a RecordBatch with no columns".to_string(),
            ));
        }
        if idx >= self.len() {
            return Err(SkiffError::ValueError(format!(
                "Row index {idx} is out of bounds for a RecordBatch with {} rows",
                self.len()
            )));
        }
        let materialized = self
            .columns()
            .iter()
            .map(|c| c.materialize())
            .collect::<SkiffResult<Vec<_>>>()?;
        let mut hash_so_far =
            hashing::hash_at(materialized.first().unwrap().as_arrow()?, idx, None)?;
        for c in materialized.iter().skip(1) {
            hash_so_far = hashing::hash_at(c.as_arrow()?, idx, Some(hash_so_far))?;
        }
        Ok(hash_so_far)
    }
}
