//! Typed cell values.

use crate::model::file_ref::FileRef;
use crate::model::schema::{DataType, Field};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One cell of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(DateTime<Utc>),
    /// Dense float sequence, typically an embedding
    Vector(Vec<f32>),
    File(FileRef),
    /// Nested record; field order is significant
    Struct(Vec<(String, Value)>),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Bool(_) => DataType::Bool,
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Str(_) => DataType::Str,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Vector(_) => DataType::Vector,
            Value::File(_) => DataType::File,
            Value::Struct(fields) => DataType::Struct(
                fields
                    .iter()
                    .map(|(name, v)| Field::new(name.clone(), v.data_type()))
                    .collect(),
            ),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// False if a Float, a Vector element or a nested member is NaN or
    /// infinite. Such values have no JSON encoding.
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            Value::Vector(v) => v.iter().all(|x| x.is_finite()),
            Value::Struct(fields) => fields.iter().all(|(_, v)| v.is_finite()),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view used by arithmetic and comparisons (Int widens to f64).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileRef> {
        match self {
            Value::File(f) => Some(f),
            _ => None,
        }
    }

    /// Named member of a Struct or File value.
    pub fn member(&self, name: &str) -> Option<Value> {
        match self {
            Value::Struct(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, v)| v.clone()),
            Value::File(file) => file.field(name),
            _ => None,
        }
    }

    /// Total order used by OrderBy.
    ///
    /// Nulls sort first. Int and Float compare numerically; other mixed-type
    /// pairs fall back to a fixed rank per type so sorting never fails.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let a = self.as_f64().unwrap_or(f64::NAN);
                let b = other.as_f64().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Vector(a), Value::Vector(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.total_cmp(y) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::File(a), Value::File(b)) => a.identity().cmp(&b.identity()),
            (Value::Struct(a), Value::Struct(b)) => {
                for ((na, va), (nb, vb)) in a.iter().zip(b.iter()) {
                    let ord = na.cmp(nb).then_with(|| va.sort_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::Timestamp(_) => 4,
            Value::Vector(_) => 5,
            Value::File(_) => 6,
            Value::Struct(_) => 7,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Vector(v) => {
                let head: Vec<String> = v.iter().take(3).map(|x| format!("{:.4}", x)).collect();
                if v.len() > 3 {
                    write!(f, "[{}, … ({} dims)]", head.join(", "), v.len())
                } else {
                    write!(f, "[{}]", head.join(", "))
                }
            }
            Value::File(file) => write!(f, "{}/{}", file.source, file.path),
            Value::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::Vector(v)
    }
}

impl From<FileRef> for Value {
    fn from(v: FileRef) -> Self {
        Value::File(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_cross_compare() {
        assert_eq!(Value::Int(2).sort_cmp(&Value::Float(2.5)), Ordering::Less);
        assert_eq!(Value::Float(3.0).sort_cmp(&Value::Int(3)), Ordering::Equal);
    }

    #[test]
    fn test_null_sorts_first() {
        assert_eq!(Value::Null.sort_cmp(&Value::Int(-10)), Ordering::Less);
        assert_eq!(Value::Str("a".into()).sort_cmp(&Value::Null), Ordering::Greater);
    }

    #[test]
    fn test_struct_member_lookup() {
        let v = Value::Struct(vec![
            ("title".into(), Value::from("Intro")),
            ("page".into(), Value::Int(1)),
        ]);
        assert_eq!(v.member("page"), Some(Value::Int(1)));
        assert_eq!(v.member("missing"), None);
    }

    #[test]
    fn test_vector_display_is_abbreviated() {
        let v = Value::Vector(vec![0.5; 384]);
        let text = v.to_string();
        assert!(text.contains("384 dims"));
        assert!(text.len() < 64);
    }

    #[test]
    fn test_serde_tagged_representation() {
        let json = serde_json::to_string(&Value::Int(7)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":7}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Int(7));
    }
}
