use common_error::{SkiffError, SkiffResult};
use skiff_core::schema::{Schema, SchemaRef};
use skiff_core::Column;

pub mod lookup;
mod ops;

/// A horizontal slice of data: a schema plus one equal-length [`Column`] per field.
///
/// The row count is carried explicitly so that batches with no columns can still
/// represent a position count.
#[derive(Clone, Debug)]
pub struct RecordBatch {
    pub schema: SchemaRef,
    columns: Vec<Column>,
    num_rows: usize,
}

#[inline]
fn _validate_schema(schema: &Schema, columns: &[Column]) -> SkiffResult<()> {
    if schema.len() != columns.len() {
        return Err(SkiffError::SchemaMismatch(format!("While building a RecordBatch, we found that the number of fields did not match between the schema and the input columns.\n {:?}\n vs\n {:?}", schema.len(), columns.len())));
    }
    for (field, column) in schema.fields().iter().zip(columns.iter()) {
        if field != column.field().as_ref() {
            return Err(SkiffError::SchemaMismatch(format!("While building a RecordBatch, we found that the Schema Field and the Column Field did not match. schema field: {field} vs column field: {}", column.field())));
        }
    }
    Ok(())
}

impl RecordBatch {
    /// Create a new [`RecordBatch`] and validate all columns against `num_rows`.
    ///
    /// `num_rows` is passed explicitly to handle cases where `columns` is empty.
    pub fn new_with_size<S: Into<SchemaRef>>(
        schema: S,
        columns: Vec<Column>,
        num_rows: usize,
    ) -> SkiffResult<Self> {
        let schema: SchemaRef = schema.into();
        _validate_schema(schema.as_ref(), columns.as_slice())?;

        for (field, column) in schema.fields().iter().zip(columns.iter()) {
            if column.len() != num_rows {
                return Err(SkiffError::ValueError(format!("While building a RecordBatch with RecordBatch::new_with_size, we found that the Column lengths did not match. Column named: {} had length: {} vs the specified RecordBatch length: {}", field.name, column.len(), num_rows)));
            }
        }

        Ok(Self::new_unchecked(schema, columns, num_rows))
    }

    /// Create a new [`RecordBatch`] without any validations.
    ///
    /// Meant for callers that have already validated schema and lengths themselves.
    pub fn new_unchecked<S: Into<SchemaRef>>(
        schema: S,
        columns: Vec<Column>,
        num_rows: usize,
    ) -> Self {
        Self {
            schema: schema.into(),
            columns,
            num_rows,
        }
    }

    /// Create a [`RecordBatch`] from a set of columns, inferring the schema and row count.
    ///
    /// Note: `columns` cannot be empty (will panic if so) and must all have the same length.
    pub fn from_nonempty_columns(columns: Vec<Column>) -> SkiffResult<Self> {
        if columns.is_empty() {
            panic!("Cannot call RecordBatch::from_nonempty_columns with no columns. This indicates an internal error, please file an issue.");
        }

        let schema = Schema::new(columns.iter().map(|c| c.field().as_ref().clone()).collect())?;
        let schema: SchemaRef = schema.into();
        _validate_schema(schema.as_ref(), columns.as_slice())?;

        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        for (field, column) in schema.fields().iter().zip(columns.iter()) {
            if column.len() != num_rows {
                return Err(SkiffError::ValueError(format!("While building a RecordBatch with RecordBatch::from_nonempty_columns, we found that the Column lengths did not match. Column named: {} had length: {} vs inferred RecordBatch length: {}", field.name, column.len(), num_rows)));
            }
        }

        Ok(Self::new_unchecked(schema, columns, num_rows))
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.names()
    }

    pub fn len(&self) -> usize {
        self.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_column_by_index(&self, idx: usize) -> SkiffResult<&Column> {
        self.columns.get(idx).ok_or_else(|| {
            SkiffError::ValueError(format!(
                "Column index {idx} is out of bounds for a RecordBatch with {} columns",
                self.columns.len()
            ))
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}
