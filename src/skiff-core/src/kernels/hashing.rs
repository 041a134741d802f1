use arrow2::{
    array::{Array, BinaryArray, BooleanArray, PrimitiveArray, Utf8Array},
    datatypes::{DataType, PhysicalType},
    error::{Error, Result},
    types::{NativeType, Offset},
};
use xxhash_rust::const_xxh3;
use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

const NULL_HASH: u64 = const_xxh3::xxh3_64(b"");
const FALSE_HASH: u64 = const_xxh3::xxh3_64(b"0");
const TRUE_HASH: u64 = const_xxh3::xxh3_64(b"1");

// Each per-element helper is shared by the vectorized kernels and the scalar
// `hash_at`, so the two paths cannot drift apart.

#[inline]
fn hash_bytes_value(value: &[u8], seed: Option<u64>) -> u64 {
    match seed {
        Some(seed) => xxh3_64_with_seed(value, seed),
        None => xxh3_64(value),
    }
}

#[inline]
fn hash_null_value(seed: Option<u64>) -> u64 {
    match seed {
        Some(seed) => xxh3_64_with_seed(b"", seed),
        None => NULL_HASH,
    }
}

#[inline]
fn hash_primitive_value<T: NativeType>(value: Option<T>, seed: Option<u64>) -> u64 {
    match value {
        Some(value) => hash_bytes_value(value.to_le_bytes().as_ref(), seed),
        None => hash_null_value(seed),
    }
}

#[inline]
fn hash_boolean_value(value: Option<bool>, seed: Option<u64>) -> u64 {
    match value {
        Some(true) => match seed {
            Some(seed) => xxh3_64_with_seed(b"1", seed),
            None => TRUE_HASH,
        },
        Some(false) => match seed {
            Some(seed) => xxh3_64_with_seed(b"0", seed),
            None => FALSE_HASH,
        },
        None => hash_null_value(seed),
    }
}

#[inline]
fn hash_utf8_value(value: Option<&str>, seed: Option<u64>) -> u64 {
    match value {
        Some(value) => hash_bytes_value(value.as_bytes(), seed),
        None => hash_null_value(seed),
    }
}

#[inline]
fn hash_binary_value(value: Option<&[u8]>, seed: Option<u64>) -> u64 {
    match value {
        Some(value) => hash_bytes_value(value, seed),
        None => hash_null_value(seed),
    }
}

fn hash_primitive<T: NativeType>(
    array: &PrimitiveArray<T>,
    seed: Option<&PrimitiveArray<u64>>,
) -> PrimitiveArray<u64> {
    let hashes = if let Some(seed) = seed {
        array
            .iter()
            .zip(seed.values_iter())
            .map(|(v, s)| hash_primitive_value(v.copied(), Some(*s)))
            .collect::<Vec<_>>()
    } else {
        array
            .iter()
            .map(|v| hash_primitive_value(v.copied(), None))
            .collect::<Vec<_>>()
    };
    PrimitiveArray::<u64>::new(DataType::UInt64, hashes.into(), None)
}

fn hash_boolean(array: &BooleanArray, seed: Option<&PrimitiveArray<u64>>) -> PrimitiveArray<u64> {
    let hashes = if let Some(seed) = seed {
        array
            .iter()
            .zip(seed.values_iter())
            .map(|(v, s)| hash_boolean_value(v, Some(*s)))
            .collect::<Vec<_>>()
    } else {
        array
            .iter()
            .map(|v| hash_boolean_value(v, None))
            .collect::<Vec<_>>()
    };
    PrimitiveArray::<u64>::new(DataType::UInt64, hashes.into(), None)
}

fn hash_null(length: usize, seed: Option<&PrimitiveArray<u64>>) -> PrimitiveArray<u64> {
    let hashes = if let Some(seed) = seed {
        seed.values_iter()
            .map(|s| hash_null_value(Some(*s)))
            .collect::<Vec<_>>()
    } else {
        (0..length).map(|_| NULL_HASH).collect::<Vec<_>>()
    };
    PrimitiveArray::<u64>::new(DataType::UInt64, hashes.into(), None)
}

fn hash_utf8<O: Offset>(
    array: &Utf8Array<O>,
    seed: Option<&PrimitiveArray<u64>>,
) -> PrimitiveArray<u64> {
    let hashes = if let Some(seed) = seed {
        array
            .iter()
            .zip(seed.values_iter())
            .map(|(v, s)| hash_utf8_value(v, Some(*s)))
            .collect::<Vec<_>>()
    } else {
        array
            .iter()
            .map(|v| hash_utf8_value(v, None))
            .collect::<Vec<_>>()
    };
    PrimitiveArray::<u64>::new(DataType::UInt64, hashes.into(), None)
}

fn hash_binary<O: Offset>(
    array: &BinaryArray<O>,
    seed: Option<&PrimitiveArray<u64>>,
) -> PrimitiveArray<u64> {
    let hashes = if let Some(seed) = seed {
        array
            .iter()
            .zip(seed.values_iter())
            .map(|(v, s)| hash_binary_value(v, Some(*s)))
            .collect::<Vec<_>>()
    } else {
        array
            .iter()
            .map(|v| hash_binary_value(v, None))
            .collect::<Vec<_>>()
    };
    PrimitiveArray::<u64>::new(DataType::UInt64, hashes.into(), None)
}

macro_rules! with_match_hashing_primitive_type {(
    $key_type:expr, | $_:tt $T:ident | $($body:tt)*
) => ({
    macro_rules! __with_ty__ {( $_ $T:ident ) => ( $($body)* )}
    use arrow2::datatypes::PrimitiveType::*;
    match $key_type {
        Int8 => __with_ty__! { i8 },
        Int16 => __with_ty__! { i16 },
        Int32 => __with_ty__! { i32 },
        Int64 => __with_ty__! { i64 },
        UInt8 => __with_ty__! { u8 },
        UInt16 => __with_ty__! { u16 },
        UInt32 => __with_ty__! { u32 },
        UInt64 => __with_ty__! { u64 },
        Float32 => __with_ty__! { f32 },
        Float64 => __with_ty__! { f64 },
        _ => return Err(Error::NotYetImplemented(format!(
            "Hash not implemented for type {:?}",
            $key_type
        )))
    }
})}

fn check_seed(array: &dyn Array, seed: Option<&PrimitiveArray<u64>>) -> Result<()> {
    if let Some(s) = seed {
        if s.len() != array.len() {
            return Err(Error::InvalidArgumentError(format!(
                "seed length does not match array length: {} vs {}",
                s.len(),
                array.len()
            )));
        }
        if *s.data_type() != DataType::UInt64 {
            return Err(Error::InvalidArgumentError(format!(
                "seed data type expected to be uint64, got {:?}",
                *s.data_type()
            )));
        }
    }
    Ok(())
}

/// Hashes every row of `array`, optionally chaining a per-row seed.
pub fn hash(array: &dyn Array, seed: Option<&PrimitiveArray<u64>>) -> Result<PrimitiveArray<u64>> {
    check_seed(array, seed)?;

    use PhysicalType::*;
    Ok(match array.data_type().to_physical_type() {
        Null => hash_null(array.len(), seed),
        Boolean => hash_boolean(array.as_any().downcast_ref().unwrap(), seed),
        Primitive(primitive) => with_match_hashing_primitive_type!(primitive, |$T| {
            hash_primitive::<$T>(array.as_any().downcast_ref().unwrap(), seed)
        }),
        Binary => hash_binary::<i32>(array.as_any().downcast_ref().unwrap(), seed),
        LargeBinary => hash_binary::<i64>(array.as_any().downcast_ref().unwrap(), seed),
        Utf8 => hash_utf8::<i32>(array.as_any().downcast_ref().unwrap(), seed),
        LargeUtf8 => hash_utf8::<i64>(array.as_any().downcast_ref().unwrap(), seed),
        t => {
            return Err(Error::NotYetImplemented(format!(
                "Hash not implemented for type {t:?}"
            )))
        }
    })
}

/// Hashes one row of `array`. Produces exactly the value `hash` produces at
/// `idx` for the same seed.
pub fn hash_at(array: &dyn Array, idx: usize, seed: Option<u64>) -> Result<u64> {
    use PhysicalType::*;

    macro_rules! scalar_primitive {
        ($T:ty) => {{
            let array = array
                .as_any()
                .downcast_ref::<PrimitiveArray<$T>>()
                .unwrap();
            let value = array.is_valid(idx).then(|| array.value(idx));
            Ok(hash_primitive_value(value, seed))
        }};
    }

    match array.data_type().to_physical_type() {
        Null => Ok(hash_null_value(seed)),
        Boolean => {
            let array = array.as_any().downcast_ref::<BooleanArray>().unwrap();
            let value = array.is_valid(idx).then(|| array.value(idx));
            Ok(hash_boolean_value(value, seed))
        }
        Primitive(primitive) => {
            use arrow2::datatypes::PrimitiveType::*;
            match primitive {
                Int8 => scalar_primitive!(i8),
                Int16 => scalar_primitive!(i16),
                Int32 => scalar_primitive!(i32),
                Int64 => scalar_primitive!(i64),
                UInt8 => scalar_primitive!(u8),
                UInt16 => scalar_primitive!(u16),
                UInt32 => scalar_primitive!(u32),
                UInt64 => scalar_primitive!(u64),
                Float32 => scalar_primitive!(f32),
                Float64 => scalar_primitive!(f64),
                t => Err(Error::NotYetImplemented(format!(
                    "Hash not implemented for type {t:?}"
                ))),
            }
        }
        Binary => {
            let array = array.as_any().downcast_ref::<BinaryArray<i32>>().unwrap();
            let value = array.is_valid(idx).then(|| array.value(idx));
            Ok(hash_binary_value(value, seed))
        }
        LargeBinary => {
            let array = array.as_any().downcast_ref::<BinaryArray<i64>>().unwrap();
            let value = array.is_valid(idx).then(|| array.value(idx));
            Ok(hash_binary_value(value, seed))
        }
        Utf8 => {
            let array = array.as_any().downcast_ref::<Utf8Array<i32>>().unwrap();
            let value = array.is_valid(idx).then(|| array.value(idx));
            Ok(hash_utf8_value(value, seed))
        }
        LargeUtf8 => {
            let array = array.as_any().downcast_ref::<Utf8Array<i64>>().unwrap();
            let value = array.is_valid(idx).then(|| array.value(idx));
            Ok(hash_utf8_value(value, seed))
        }
        t => Err(Error::NotYetImplemented(format!(
            "Hash not implemented for type {t:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use arrow2::array::{Array, Int64Array, PrimitiveArray, Utf8Array};

    use super::{hash, hash_at};

    #[test]
    fn scalar_hash_matches_vectorized() -> arrow2::error::Result<()> {
        let ints = Int64Array::from(&[Some(42), None, Some(-1), Some(42)]);
        let strs = Utf8Array::<i64>::from([Some("a"), Some("bb"), None, Some("a")]);

        for array in [&ints as &dyn Array, &strs as &dyn Array] {
            let hashes = hash(array, None)?;
            for idx in 0..array.len() {
                assert_eq!(hash_at(array, idx, None)?, hashes.value(idx));
            }
        }
        Ok(())
    }

    #[test]
    fn scalar_hash_matches_vectorized_with_seed() -> arrow2::error::Result<()> {
        let ints = Int64Array::from(&[Some(7), None, Some(7)]);
        let seeds = PrimitiveArray::<u64>::from_vec(vec![1, 2, 3]);

        let hashes = hash(&ints, Some(&seeds))?;
        for idx in 0..ints.len() {
            assert_eq!(
                hash_at(&ints, idx, Some(seeds.value(idx)))?,
                hashes.value(idx)
            );
        }
        Ok(())
    }

    #[test]
    fn equal_values_hash_equal() -> arrow2::error::Result<()> {
        let ints = Int64Array::from(&[Some(42), Some(42)]);
        let hashes = hash(&ints, None)?;
        assert_eq!(hashes.value(0), hashes.value(1));
        Ok(())
    }

    #[test]
    fn seed_changes_hash() -> arrow2::error::Result<()> {
        let ints = Int64Array::from(&[Some(42), Some(42)]);
        let seeds = PrimitiveArray::<u64>::from_vec(vec![1, 2]);
        let hashes = hash(&ints, Some(&seeds))?;
        assert_ne!(hashes.value(0), hashes.value(1));
        Ok(())
    }

    #[test]
    fn seed_length_mismatch_errors() {
        let ints = Int64Array::from(&[Some(1), Some(2)]);
        let seeds = PrimitiveArray::<u64>::from_vec(vec![1]);
        assert!(hash(&ints, Some(&seeds)).is_err());
    }
}
