//! Rows and structured field paths.

use crate::errors::{ChainError, Result};
use crate::model::schema::Schema;
use crate::model::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dotted path into a row, e.g. `file.name` or `meta.page`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// # Errors
    ///
    /// `InvalidInput` if the path is empty or has an empty segment.
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return Err(ChainError::InvalidInput {
                reason: format!("invalid field path '{}'", path),
            });
        }
        Ok(Self { segments })
    }

    pub fn column(&self) -> &str {
        &self.segments[0]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Ordered mapping from column name to value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert (overwrites an existing column in place)
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Insert or overwrite a column. New columns are appended.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Resolve a structured path through nested Struct/File values.
    pub fn get_path(&self, path: &FieldPath) -> Option<Value> {
        let mut current = self.get(path.column())?.clone();
        for segment in &path.segments()[1..] {
            current = current.member(segment)?;
        }
        Some(current)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// (source, path) of the first File column, used to name a row in errors.
    pub fn identity(&self) -> Option<(&str, &str)> {
        self.columns.iter().find_map(|(_, v)| match v {
            Value::File(f) => Some((f.source.as_str(), f.path.as_str())),
            _ => None,
        })
    }

    /// Reorder columns to match `schema`; callers validate conformance first.
    pub(crate) fn reordered(mut self, schema: &Schema) -> Row {
        let mut columns = Vec::with_capacity(self.columns.len());
        for field in schema.fields() {
            if let Some(pos) = self.columns.iter().position(|(n, _)| *n == field.name) {
                columns.push(self.columns.swap_remove(pos));
            }
        }
        Row { columns }
    }
}
