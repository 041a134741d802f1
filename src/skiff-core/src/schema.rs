use std::{collections::HashSet, sync::Arc};

use common_error::{SkiffError, SkiffResult};
use serde::{Deserialize, Serialize};

use crate::datatypes::Field;

pub type SchemaRef = Arc<Schema>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> SkiffResult<Self> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SkiffError::ValueError(format!(
                    "Attempting to make a Schema with duplicate field names: {}",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    pub fn empty() -> Self {
        Self { fields: vec![] }
    }

    pub fn field(&self, idx: usize) -> &Field {
        &self.fields[idx]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
