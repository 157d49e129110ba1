//! Column types and row schemas.

use crate::errors::{ChainError, Result};
use crate::model::row::Row;
use crate::model::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column type.
///
/// `Null` is the type of a column first observed holding a null; such a
/// column accepts any value afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Timestamp,
    Vector,
    File,
    Struct(Vec<Field>),
}

impl DataType {
    /// Whether `value` may be stored in a column of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (DataType::Null, _) => true,
            (DataType::Bool, Value::Bool(_))
            | (DataType::Int, Value::Int(_))
            | (DataType::Float, Value::Float(_))
            | (DataType::Str, Value::Str(_))
            | (DataType::Timestamp, Value::Timestamp(_))
            | (DataType::Vector, Value::Vector(_))
            | (DataType::File, Value::File(_)) => true,
            (DataType::Struct(fields), Value::Struct(members)) => {
                fields.len() == members.len()
                    && fields
                        .iter()
                        .zip(members.iter())
                        .all(|(f, (name, v))| f.name == *name && f.data_type.accepts(v))
            }
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Null => write!(f, "null"),
            DataType::Bool => write!(f, "bool"),
            DataType::Int => write!(f, "int"),
            DataType::Float => write!(f, "float"),
            DataType::Str => write!(f, "str"),
            DataType::Timestamp => write!(f, "timestamp"),
            DataType::Vector => write!(f, "vector"),
            DataType::File => write!(f, "file"),
            DataType::Struct(fields) => {
                write!(f, "struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                write!(f, ">")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered column set shared by every row of one stage output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Column name of the FileRef produced by a storage source.
    pub const FILE_COLUMN: &'static str = "file";

    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field append
    pub fn with_field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(Field::new(name, data_type));
        self
    }

    /// Schema of rows emitted by a storage source: a single `file` column.
    pub fn file_source() -> Self {
        Self::new().with_field(Self::FILE_COLUMN, DataType::File)
    }

    /// Infer a schema from one row (column order and value types).
    pub fn infer(row: &Row) -> Self {
        Self {
            fields: row
                .columns()
                .map(|(name, v)| Field::new(name, v.data_type()))
                .collect(),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace the type of an existing column or append a new one.
    pub fn with_column(mut self, name: &str, data_type: DataType) -> Self {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.data_type = data_type,
            None => self.fields.push(Field::new(name, data_type)),
        }
        self
    }

    /// Check that `row` has exactly this column set with conforming values.
    ///
    /// # Errors
    ///
    /// `SchemaViolation` naming `stage` and the first offending column.
    pub fn check(&self, row: &Row, stage: &str) -> Result<()> {
        let violation = |detail: String| ChainError::SchemaViolation {
            stage: stage.to_string(),
            detail,
        };

        for field in &self.fields {
            match row.get(&field.name) {
                None => return Err(violation(format!("missing column '{}'", field.name))),
                Some(value) if !field.data_type.accepts(value) => {
                    return Err(violation(format!(
                        "column '{}' expected {}, found {}",
                        field.name,
                        field.data_type,
                        value.data_type()
                    )))
                }
                Some(_) => {}
            }
        }
        if let Some((extra, _)) = row.columns().find(|(n, _)| self.field(n).is_none()) {
            return Err(violation(format!("unexpected column '{}'", extra)));
        }
        Ok(())
    }

    /// Validate `row` and return it with columns in schema order.
    pub fn conform(&self, row: Row, stage: &str) -> Result<Row> {
        self.check(&row, stage)?;
        Ok(row.reordered(self))
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.data_type)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_schema() -> Schema {
        Schema::new()
            .with_field("key", DataType::Str)
            .with_field("text", DataType::Str)
            .with_field("embeddings", DataType::Vector)
    }

    #[test]
    fn test_conform_reorders_columns() {
        let row = Row::new()
            .with("text", "hello")
            .with("embeddings", vec![0.1f32, 0.2])
            .with("key", "paper");

        let row = chunk_schema().conform(row, "expand").unwrap();
        assert_eq!(row.column_names(), vec!["key", "text", "embeddings"]);
    }

    #[test]
    fn test_extra_column_is_violation() {
        let row = Row::new()
            .with("key", "k")
            .with("text", "t")
            .with("embeddings", vec![0.0f32])
            .with("embeddings_new", vec![0.0f32]);

        let err = chunk_schema().check(&row, "expand(pdf_chunks)").unwrap_err();
        match err {
            ChainError::SchemaViolation { stage, detail } => {
                assert_eq!(stage, "expand(pdf_chunks)");
                assert!(detail.contains("embeddings_new"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_wrong_type_is_violation() {
        let row = Row::new()
            .with("key", 1)
            .with("text", "t")
            .with("embeddings", vec![0.0f32]);
        assert!(chunk_schema().check(&row, "expand").is_err());
    }

    #[test]
    fn test_null_conforms_to_any_type() {
        let row = Row::new()
            .with("key", Value::Null)
            .with("text", "t")
            .with("embeddings", Value::Null);
        assert!(chunk_schema().check(&row, "expand").is_ok());
    }

    #[test]
    fn test_infer_and_with_column() {
        let row = Row::new().with("a", 1).with("b", "x");
        let schema = Schema::infer(&row).with_column("a", DataType::Float);
        assert_eq!(schema.to_string(), "a: float, b: str");
        let schema = schema.with_column("score", DataType::Float);
        assert_eq!(schema.names(), vec!["a", "b", "score"]);
    }
}
