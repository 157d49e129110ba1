//! Row-level data model: file references, typed values, rows and schemas.

pub mod file_ref;
pub mod row;
pub mod schema;
pub mod value;

pub use file_ref::{FileIdentity, FileRef};
pub use row::{FieldPath, Row};
pub use schema::{DataType, Field, Schema};
pub use value::Value;
