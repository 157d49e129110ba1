//! Declarative pipeline stages.

use crate::expr::Expr;
use crate::glob::GlobPattern;
use crate::model::{FieldPath, Schema};
use crate::plan::udf::{ExpandFn, MapFn};
use std::fmt;
use std::sync::Arc;

/// One step of a plan. Pure description; nothing runs until an action.
///
/// Map and Expand stages with an empty `output_schema` take the schema of
/// their first produced row.
#[derive(Clone)]
pub enum Stage {
    Source {
        location: String,
        pattern: Option<GlobPattern>,
    },
    Filter(Expr),
    Map {
        name: String,
        func: Arc<dyn MapFn>,
        output_schema: Schema,
    },
    Expand {
        name: String,
        func: Arc<dyn ExpandFn>,
        output_schema: Schema,
    },
    Mutate {
        column: String,
        expr: Expr,
    },
    OrderBy {
        column: FieldPath,
        descending: bool,
    },
    /// Keep the first row for each distinct value of a column
    Distinct(FieldPath),
    Limit(usize),
}

impl Stage {
    /// Short human-readable description used in logs and errors.
    pub fn label(&self) -> String {
        match self {
            Stage::Source {
                location,
                pattern: Some(p),
            } => format!("source({}, {})", location, p),
            Stage::Source { location, .. } => format!("source({})", location),
            Stage::Filter(expr) => format!("filter({})", expr),
            Stage::Map { name, .. } => format!("map({})", name),
            Stage::Expand { name, .. } => format!("expand({})", name),
            Stage::Mutate { column, expr } => format!("mutate({} = {})", column, expr),
            Stage::OrderBy {
                column,
                descending: true,
            } => format!("order_by({} desc)", column),
            Stage::OrderBy { column, .. } => format!("order_by({})", column),
            Stage::Distinct(column) => format!("distinct({})", column),
            Stage::Limit(n) => format!("limit({})", n),
        }
    }

    /// Stages that call user code on the worker pool.
    pub fn is_parallel(&self) -> bool {
        matches!(self, Stage::Map { .. } | Stage::Expand { .. })
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
