use std::sync::Arc;

use arrow2::array::{Array, PrimitiveArray};
use arrow2::buffer::Buffer;
use common_error::{SkiffError, SkiffResult};

use crate::datatypes::{DataType, Field, FieldRef};

/// An immutable typed column of values with an optional validity mask.
///
/// A column is either fully materialized arrow storage, or a view: a
/// positional selection over another column that copies no values until it
/// is explicitly materialized.
#[derive(Debug)]
pub struct Column {
    field: FieldRef,
    data: ColumnData,
}

#[derive(Debug)]
enum ColumnData {
    /// Fully decoded values, directly addressable.
    Values(Box<dyn Array>),
    /// A positional selection over another column. Values are gathered only
    /// when the column is materialized.
    View {
        source: Arc<Column>,
        indices: Buffer<u64>,
    },
}

impl Clone for ColumnData {
    fn clone(&self) -> Self {
        match self {
            Self::Values(array) => Self::Values(array.to_boxed()),
            Self::View { source, indices } => Self::View {
                source: source.clone(),
                indices: indices.clone(),
            },
        }
    }
}

impl Clone for Column {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            data: self.data.clone(),
        }
    }
}

impl Column {
    pub fn new(field: Field, values: Box<dyn Array>) -> SkiffResult<Self> {
        let expected = field.dtype.to_arrow();
        if values.data_type() != &expected {
            return Err(SkiffError::SchemaMismatch(format!(
                "Column {} expected arrow type {:?}, got {:?}",
                field.name,
                expected,
                values.data_type()
            )));
        }
        Ok(Self {
            field: Arc::new(field),
            data: ColumnData::Values(values),
        })
    }

    /// Builds a column straight from an arrow array, deriving the field from
    /// the array's type.
    pub fn from_arrow<S: Into<String>>(name: S, values: Box<dyn Array>) -> SkiffResult<Self> {
        let dtype = DataType::from_arrow(values.data_type())?;
        Ok(Self {
            field: Arc::new(Field::new(name, dtype)),
            data: ColumnData::Values(values),
        })
    }

    /// A positional selection over `source`. The view keeps the source's
    /// field and copies no values.
    pub fn view(source: Arc<Column>, indices: Vec<u64>) -> SkiffResult<Self> {
        let source_len = source.len() as u64;
        if let Some(bad) = indices.iter().find(|&&idx| idx >= source_len) {
            return Err(SkiffError::ValueError(format!(
                "View index {} out of bounds for column {} of length {}",
                bad,
                source.name(),
                source_len
            )));
        }
        Ok(Self {
            field: source.field.clone(),
            data: ColumnData::View {
                source,
                indices: indices.into(),
            },
        })
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.field.dtype
    }

    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Values(array) => array.len(),
            ColumnData::View { indices, .. } => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self.data, ColumnData::Values(_))
    }

    /// Conservative nullability: reports mask presence (or an all-null
    /// type), not mask contents.
    pub fn may_have_nulls(&self) -> bool {
        match &self.data {
            ColumnData::Values(array) => {
                self.field.dtype.is_null() || array.validity().is_some()
            }
            ColumnData::View { source, .. } => source.may_have_nulls(),
        }
    }

    /// Null test for a single row, resolving view indirection.
    pub fn is_null(&self, idx: usize) -> bool {
        match &self.data {
            ColumnData::Values(array) => self.field.dtype.is_null() || array.is_null(idx),
            ColumnData::View { source, indices } => source.is_null(indices[idx] as usize),
        }
    }

    /// Resolves any view indirection, returning a column whose values are
    /// directly addressable. Materialized columns return a shallow clone:
    /// buffers are shared, never copied.
    pub fn materialize(&self) -> SkiffResult<Self> {
        match &self.data {
            ColumnData::Values(_) => Ok(self.clone()),
            ColumnData::View { source, indices } => {
                let source = source.materialize()?;
                let indices = PrimitiveArray::new(
                    arrow2::datatypes::DataType::UInt64,
                    indices.clone(),
                    None,
                );
                let gathered = arrow2::compute::take::take(source.as_arrow()?, &indices)?;
                Ok(Self {
                    field: self.field.clone(),
                    data: ColumnData::Values(gathered),
                })
            }
        }
    }

    /// Borrows the underlying arrow array. Views must be materialized first.
    pub fn as_arrow(&self) -> SkiffResult<&dyn Array> {
        match &self.data {
            ColumnData::Values(array) => Ok(array.as_ref()),
            ColumnData::View { .. } => Err(SkiffError::ComputeError(format!(
                "Column {} is an unmaterialized view; call materialize() before accessing values",
                self.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow2::array::{Array, Int64Array, NullArray};

    use super::Column;
    use crate::datatypes::{DataType, Field};

    fn int64_column(name: &str, values: &[Option<i64>]) -> Column {
        Column::from_arrow(name, Box::new(Int64Array::from(values))).unwrap()
    }

    #[test]
    fn view_materializes_values_and_validity() -> common_error::SkiffResult<()> {
        let base = Arc::new(int64_column("a", &[Some(10), None, Some(30), Some(40)]));
        let view = Column::view(base, vec![3, 1, 0])?;
        assert!(!view.is_materialized());
        assert_eq!(view.len(), 3);
        assert!(!view.is_null(0));
        assert!(view.is_null(1));

        let materialized = view.materialize()?;
        assert!(materialized.is_materialized());
        let array = materialized
            .as_arrow()?
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(array.value(0), 40);
        assert!(array.is_null(1));
        assert_eq!(array.value(2), 10);
        Ok(())
    }

    #[test]
    fn nested_view_materializes() -> common_error::SkiffResult<()> {
        let base = Arc::new(int64_column("a", &[Some(1), Some(2), Some(3)]));
        let outer = Column::view(Arc::new(Column::view(base, vec![2, 0, 1])?), vec![1])?;
        let materialized = outer.materialize()?;
        let array = materialized
            .as_arrow()?
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array.value(0), 1);
        Ok(())
    }

    #[test]
    fn materialize_is_shallow_for_values() -> common_error::SkiffResult<()> {
        let column = int64_column("a", &[Some(1), Some(2)]);
        let materialized = column.materialize()?;
        assert_eq!(materialized.len(), column.len());
        assert!(materialized.is_materialized());
        Ok(())
    }

    #[test]
    fn nullability_is_mask_presence() {
        // A mask with no unset bits still counts: presence, not contents.
        let with_mask = Column::from_arrow(
            "a",
            Int64Array::from_vec(vec![1, 2])
                .with_validity(Some(arrow2::bitmap::Bitmap::from([true, true])))
                .boxed(),
        )
        .unwrap();
        assert!(with_mask.may_have_nulls());
        assert!(!with_mask.is_null(0));

        let no_mask = Column::from_arrow("b", Int64Array::from_vec(vec![1, 2]).boxed()).unwrap();
        assert!(!no_mask.may_have_nulls());
        assert!(!no_mask.is_null(0));
    }

    #[test]
    fn null_type_column_is_all_null() {
        let column = Column::new(
            Field::new("n", DataType::Null),
            Box::new(NullArray::new(arrow2::datatypes::DataType::Null, 3)),
        )
        .unwrap();
        assert!(column.may_have_nulls());
        assert!(column.is_null(0));
        assert!(column.is_null(2));
    }

    #[test]
    fn view_rejects_out_of_bounds_indices() {
        let base = Arc::new(int64_column("a", &[Some(1)]));
        assert!(Column::view(base, vec![1]).is_err());
    }

    #[test]
    fn as_arrow_requires_materialization() {
        let base = Arc::new(int64_column("a", &[Some(1), Some(2)]));
        let view = Column::view(base, vec![0]).unwrap();
        assert!(view.as_arrow().is_err());
    }

    #[test]
    fn new_rejects_mismatched_types() {
        let result = Column::new(
            Field::new("a", DataType::Utf8),
            Box::new(Int64Array::from_vec(vec![1])),
        );
        assert!(result.is_err());
    }
}
