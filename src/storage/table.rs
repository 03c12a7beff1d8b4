use crate::core::{ChangeError, Column, DataType, Result, Row, Schema, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Name of the generated primary key column every table starts with.
pub const PRIMARY_KEY: &str = "id";

#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    schema: Schema,
}

impl TableSchema {
    /// Builds a schema whose first column is the integer primary key.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        let mut all = Vec::with_capacity(columns.len() + 1);
        all.push(Column::new(PRIMARY_KEY, DataType::Integer));
        all.extend(columns.into_iter().filter(|c| c.name != PRIMARY_KEY));
        Self {
            name: name.into(),
            schema: Schema::new(all),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

#[derive(Debug, Default)]
struct TableData {
    rows: BTreeMap<i64, Row>,
    next_id: i64,
}

/// Shared handle to one in-memory table. Clones see the same rows.
#[derive(Debug, Clone)]
pub struct Table {
    schema: Arc<TableSchema>,
    data: Arc<RwLock<TableData>>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema: Arc::new(schema),
            data: Arc::new(RwLock::new(TableData {
                rows: BTreeMap::new(),
                next_id: 1,
            })),
        }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Inserts a row and returns its id. A `NULL` primary key is generated.
    pub fn insert(&self, mut row: Row) -> Result<i64> {
        let mut data = self.data.write()?;

        let id = match row.first() {
            Some(Value::Integer(id)) => *id,
            Some(Value::Null) => data.next_id,
            _ => {
                return Err(ChangeError::ConstraintViolation(format!(
                    "Row for '{}' has no usable primary key",
                    self.name()
                )));
            }
        };
        if data.rows.contains_key(&id) {
            return Err(ChangeError::ConstraintViolation(format!(
                "Duplicate primary key {} in '{}'",
                id,
                self.name()
            )));
        }

        row[0] = Value::Integer(id);
        self.schema.schema().validate_row(&row)?;

        data.next_id = data.next_id.max(id + 1);
        data.rows.insert(id, row);
        Ok(id)
    }

    /// Replaces the row stored under `id`, returning the previous row.
    pub fn update(&self, id: i64, row: Row) -> Result<Row> {
        self.schema.schema().validate_row(&row)?;
        if row.first() != Some(&Value::Integer(id)) {
            return Err(ChangeError::ConstraintViolation(format!(
                "Primary key of '{}' row {} cannot change",
                self.name(),
                id
            )));
        }

        let mut data = self.data.write()?;
        match data.rows.get_mut(&id) {
            Some(existing) => Ok(std::mem::replace(existing, row)),
            None => Err(ChangeError::RecordNotFound(id, self.name().to_string())),
        }
    }

    pub fn delete(&self, id: i64) -> Result<Option<Row>> {
        let mut data = self.data.write()?;
        Ok(data.rows.remove(&id))
    }

    pub fn get(&self, id: i64) -> Result<Option<Row>> {
        let data = self.data.read()?;
        Ok(data.rows.get(&id).cloned())
    }

    pub fn row_count(&self) -> Result<usize> {
        let data = self.data.read()?;
        Ok(data.rows.len())
    }
}
