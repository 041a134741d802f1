use arrow2::{
    array::{ord::build_compare, Array, PrimitiveArray},
    datatypes::DataType,
    types::NativeType,
};
use common_error::{SkiffError, SkiffResult};
use num_traits::Float;

use crate::column::Column;

pub fn build_is_valid(array: &dyn Array) -> Box<dyn Fn(usize) -> bool + Send + Sync> {
    if array.data_type() == &DataType::Null {
        Box::new(|_| false)
    } else if let Some(validity) = array.validity() {
        let validity = validity.clone();
        Box::new(move |i| validity.get_bit(i))
    } else {
        Box::new(|_| true)
    }
}

fn build_is_equal_float<F: Float + NativeType>(
    left: &dyn Array,
    right: &dyn Array,
    nan_equal: bool,
) -> Box<dyn Fn(usize, usize) -> bool + Send + Sync> {
    let left = left
        .as_any()
        .downcast_ref::<PrimitiveArray<F>>()
        .unwrap()
        .clone();
    let right = right
        .as_any()
        .downcast_ref::<PrimitiveArray<F>>()
        .unwrap()
        .clone();
    if nan_equal {
        Box::new(move |i, j| {
            let (l, r) = (left.value(i), right.value(j));
            l.eq(&r) || (l.is_nan() && r.is_nan())
        })
    } else {
        Box::new(move |i, j| left.value(i).eq(&right.value(j)))
    }
}

fn build_is_equal_values(
    left: &dyn Array,
    right: &dyn Array,
    nan_equal: bool,
) -> SkiffResult<Box<dyn Fn(usize, usize) -> bool + Send + Sync>> {
    if left.data_type() != right.data_type() {
        return Err(SkiffError::ComputeError(format!(
            "Cannot compare arrays of different types: {:?} vs {:?}",
            left.data_type(),
            right.data_type()
        )));
    }
    if left.data_type() == &DataType::Null {
        // Null slots never reach the value comparison; see build_is_equal.
        Ok(Box::new(|_, _| true))
    } else if left.data_type() == &DataType::Float32 {
        Ok(build_is_equal_float::<f32>(left, right, nan_equal))
    } else if left.data_type() == &DataType::Float64 {
        Ok(build_is_equal_float::<f64>(left, right, nan_equal))
    } else {
        let comp = build_compare(left, right)?;
        Ok(Box::new(move |i, j| comp(i, j).is_eq()))
    }
}

fn build_is_equal(
    left: &dyn Array,
    right: &dyn Array,
    nulls_equal: bool,
    nan_equal: bool,
) -> SkiffResult<Box<dyn Fn(usize, usize) -> bool + Send + Sync>> {
    let is_equal_fn = build_is_equal_values(left, right, nan_equal)?;
    let left_is_valid = build_is_valid(left);
    let right_is_valid = build_is_valid(right);

    if nulls_equal {
        Ok(Box::new(move |i: usize, j: usize| {
            match (left_is_valid(i), right_is_valid(j)) {
                (true, true) => is_equal_fn(i, j),
                (false, false) => true,
                _ => false,
            }
        }))
    } else {
        Ok(Box::new(move |i: usize, j: usize| {
            match (left_is_valid(i), right_is_valid(j)) {
                (true, true) => is_equal_fn(i, j),
                _ => false,
            }
        }))
    }
}

/// Builds a row comparator over two column lists of identical arity. The
/// per-column downcasts happen once, here; the returned closure only reads
/// values.
pub fn build_multi_array_is_equal(
    left: &[Column],
    right: &[Column],
    nulls_equal: bool,
    nan_equal: bool,
) -> SkiffResult<Box<dyn Fn(usize, usize) -> bool + Send + Sync>> {
    if left.len() != right.len() {
        return Err(SkiffError::InternalError(format!(
            "Expected the same number of columns on both sides of a row comparison, got {} vs {}",
            left.len(),
            right.len()
        )));
    }

    let mut fn_list = Vec::with_capacity(left.len());
    for (l, r) in left.iter().zip(right.iter()) {
        fn_list.push(build_is_equal(
            l.as_arrow()?,
            r.as_arrow()?,
            nulls_equal,
            nan_equal,
        )?);
    }

    let combined_fn = Box::new(move |a_idx: usize, b_idx: usize| -> bool {
        for f in &fn_list {
            if !f(a_idx, b_idx) {
                return false;
            }
        }
        true
    });
    Ok(combined_fn)
}
