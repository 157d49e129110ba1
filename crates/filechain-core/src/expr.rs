//! Pure expressions evaluated per row by Filter and Mutate stages.
//!
//! Expressions only read the row they are evaluated against. Caller-supplied
//! scalar functions (`Expr::func`) are expected to honour the same rule so
//! that re-running a plan reproduces the same snapshot.

use crate::errors::{panic_message, ChainError, Result, UdfResult};
use crate::glob::GlobPattern;
use crate::model::{FieldPath, Row, Value};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

type ScalarImpl = dyn Fn(&[Value]) -> UdfResult<Value> + Send + Sync;

/// Named caller-supplied scalar function.
#[derive(Clone)]
pub struct ScalarFn {
    name: String,
    func: Arc<ScalarImpl>,
}

impl ScalarFn {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> UdfResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ScalarFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarFn").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Column(FieldPath),
    Literal(Value),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    Glob {
        expr: Box<Expr>,
        pattern: GlobPattern,
    },
    /// Character count of a string, dimension of a vector
    Length(Box<Expr>),
    CosineSimilarity(Box<Expr>, Box<Expr>),
    Func {
        func: ScalarFn,
        args: Vec<Expr>,
    },
}

/// Column reference by dotted path, e.g. `col("file.path")`.
///
/// # Errors
///
/// `InvalidInput` for a malformed path.
pub fn col(path: &str) -> Result<Expr> {
    Ok(Expr::Column(FieldPath::parse(path)?))
}

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

impl Expr {
    fn binary(self, op: BinaryOp, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(rhs),
        }
    }

    pub fn equals(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Eq, rhs.into())
    }

    pub fn not_equals(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::NotEq, rhs.into())
    }

    pub fn less_than(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Lt, rhs.into())
    }

    pub fn less_eq(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::LtEq, rhs.into())
    }

    pub fn greater_than(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Gt, rhs.into())
    }

    pub fn greater_eq(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::GtEq, rhs.into())
    }

    pub fn and(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::And, rhs)
    }

    pub fn or(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Or, rhs)
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn length(self) -> Expr {
        Expr::Length(Box::new(self))
    }

    /// # Errors
    ///
    /// `InvalidPattern` if the glob does not compile.
    pub fn glob(self, pattern: &str) -> Result<Expr> {
        Ok(Expr::Glob {
            expr: Box::new(self),
            pattern: GlobPattern::compile(pattern)?,
        })
    }

    pub fn cosine_similarity(self, other: impl Into<Expr>) -> Expr {
        Expr::CosineSimilarity(Box::new(self), Box::new(other.into()))
    }

    pub fn func(func: ScalarFn, args: Vec<Expr>) -> Expr {
        Expr::Func { func, args }
    }

    /// Evaluate against one row.
    pub fn eval(&self, row: &Row) -> Result<Value> {
        match self {
            Expr::Column(path) => row.get_path(path).ok_or_else(|| ChainError::ColumnNotFound {
                column: path.to_string(),
            }),
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And | BinaryOp::Or => eval_logical(*op, left, right, row),
                _ => eval_binary(*op, left.eval(row)?, right.eval(row)?),
            },
            Expr::Not(inner) => match inner.eval(row)? {
                Value::Null => Ok(Value::Null),
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(mismatch("not", "bool", &other)),
            },
            Expr::IsNull(inner) => Ok(Value::Bool(inner.eval(row)?.is_null())),
            Expr::Glob { expr, pattern } => match expr.eval(row)? {
                Value::Null => Ok(Value::Null),
                Value::Str(s) => Ok(Value::Bool(pattern.matches(&s))),
                Value::File(f) => Ok(Value::Bool(pattern.matches(&f.path))),
                other => Err(mismatch("glob", "str", &other)),
            },
            Expr::Length(inner) => match inner.eval(row)? {
                Value::Null => Ok(Value::Null),
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::Vector(v) => Ok(Value::Int(v.len() as i64)),
                other => Err(mismatch("length", "str or vector", &other)),
            },
            Expr::CosineSimilarity(a, b) => cosine_similarity(a.eval(row)?, b.eval(row)?),
            Expr::Func { func, args } => {
                let values = args
                    .iter()
                    .map(|a| a.eval(row))
                    .collect::<Result<Vec<_>>>()?;
                let message = match catch_unwind(AssertUnwindSafe(|| (func.func)(&values))) {
                    Ok(Ok(value)) => return Ok(value),
                    Ok(Err(e)) => e.to_string(),
                    Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
                };
                Err(ChainError::FunctionFailed {
                    name: func.name.clone(),
                    message,
                })
            }
        }
    }

    /// Evaluate as a filter predicate; `Null` counts as false.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the expression does not produce a boolean.
    pub fn eval_predicate(&self, row: &Row) -> Result<bool> {
        match self.eval(row)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(mismatch("filter predicate", "bool", &other)),
        }
    }
}

fn mismatch(context: &str, expected: &str, found: &Value) -> ChainError {
    ChainError::TypeMismatch {
        context: context.to_string(),
        expected: expected.to_string(),
        found: found.data_type().to_string(),
    }
}

fn eval_logical(op: BinaryOp, left: &Expr, right: &Expr, row: &Row) -> Result<Value> {
    let as_bool = |v: Value| match v {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        other => Err(mismatch(op.symbol(), "bool", &other)),
    };
    let l = as_bool(left.eval(row)?)?;
    // Short-circuit: the right side is not evaluated when the left decides.
    let result = match op {
        BinaryOp::And => l && as_bool(right.eval(row)?)?,
        _ => l || as_bool(right.eval(row)?)?,
    };
    Ok(Value::Bool(result))
}

fn eval_binary(op: BinaryOp, l: Value, r: Value) -> Result<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => arithmetic(op, l, r),
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&l, &r))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&l, &r))),
        _ => {
            let comparable = matches!(
                (&l, &r),
                (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_))
                    | (Value::Str(_), Value::Str(_))
                    | (Value::Bool(_), Value::Bool(_))
                    | (Value::Timestamp(_), Value::Timestamp(_))
            );
            if !comparable {
                return Err(ChainError::TypeMismatch {
                    context: op.symbol().to_string(),
                    expected: l.data_type().to_string(),
                    found: r.data_type().to_string(),
                });
            }
            let ord = l.sort_cmp(&r);
            let result = match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::LtEq => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            };
            Ok(Value::Bool(result))
        }
    }
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => l == r,
    }
}

fn arithmetic(op: BinaryOp, l: Value, r: Value) -> Result<Value> {
    match (&l, &r) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                _ => {
                    if b == 0 {
                        return Err(ChainError::InvalidInput {
                            reason: "integer division by zero".to_string(),
                        });
                    }
                    a.checked_div(b)
                }
            };
            result.map(Value::Int).ok_or_else(|| ChainError::InvalidInput {
                reason: format!("integer overflow in {} {} {}", a, op.symbol(), b),
            })
        }
        (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => Ok(Value::Str(format!("{}{}", a, b))),
        _ => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => a / b,
            })),
            _ => Err(ChainError::TypeMismatch {
                context: op.symbol().to_string(),
                expected: "numbers".to_string(),
                found: format!("{} and {}", l.data_type(), r.data_type()),
            }),
        },
    }
}

fn cosine_similarity(a: Value, b: Value) -> Result<Value> {
    let (a, b) = match (&a, &b) {
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Null),
        (Value::Vector(a), Value::Vector(b)) => (a, b),
        (Value::Vector(_), other) | (other, _) => {
            return Err(mismatch("cosine_similarity", "vector", other))
        }
    };
    if a.len() != b.len() {
        return Err(ChainError::InvalidInput {
            reason: format!(
                "cosine_similarity over vectors of different length ({} vs {})",
                a.len(),
                b.len()
            ),
        });
    }
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return Ok(Value::Float(0.0));
    }
    Ok(Value::Float(dot / (na.sqrt() * nb.sqrt())))
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        lit(v)
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        lit(v)
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        lit(v)
    }
}

impl From<Vec<f32>> for Expr {
    fn from(v: Vec<f32>) -> Self {
        lit(v)
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

macro_rules! arith_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<Expr>> std::ops::$trait<T> for Expr {
            type Output = Expr;

            fn $method(self, rhs: T) -> Expr {
                self.binary($op, rhs.into())
            }
        }
    };
}

arith_op!(Add, add, BinaryOp::Add);
arith_op!(Sub, sub, BinaryOp::Sub);
arith_op!(Mul, mul, BinaryOp::Mul);
arith_op!(Div, div, BinaryOp::Div);

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(path) => write!(f, "{}", path),
            Expr::Literal(Value::Str(s)) => write!(f, "'{}'", s),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expr::Not(inner) => write!(f, "not {}", inner),
            Expr::IsNull(inner) => write!(f, "{} is null", inner),
            Expr::Glob { expr, pattern } => write!(f, "{} glob '{}'", expr, pattern),
            Expr::Length(inner) => write!(f, "length({})", inner),
            Expr::CosineSimilarity(a, b) => write!(f, "cosine_similarity({}, {})", a, b),
            Expr::Func { func, args } => {
                write!(f, "{}(", func.name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new()
            .with("key", "paper")
            .with("pages", 12)
            .with("score", 0.5)
            .with("embeddings", vec![1.0f32, 0.0])
            .with("missing_title", Value::Null)
    }

    #[test]
    fn test_comparison_and_logic() {
        let expr = col("pages")
            .unwrap()
            .greater_than(10i64)
            .and(col("key").unwrap().equals("paper"));
        assert!(expr.eval_predicate(&row()).unwrap());

        let expr = !col("pages").unwrap().less_eq(11i64);
        assert!(expr.eval_predicate(&row()).unwrap());
    }

    #[test]
    fn test_int_float_arithmetic() {
        let expr = col("pages").unwrap() * 2i64 + col("score").unwrap();
        assert_eq!(expr.eval(&row()).unwrap(), Value::Float(24.5));
    }

    #[test]
    fn test_integer_division_by_zero() {
        let expr = col("pages").unwrap() / 0i64;
        assert!(matches!(
            expr.eval(&row()),
            Err(ChainError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_null_predicate_is_false() {
        let expr = col("missing_title").unwrap().equals("x");
        assert!(!expr.eval_predicate(&row()).unwrap());
    }

    #[test]
    fn test_non_bool_predicate_is_type_mismatch() {
        let expr = col("pages").unwrap();
        assert!(matches!(
            expr.eval_predicate(&row()),
            Err(ChainError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_column() {
        let err = col("nope").unwrap().eval(&row()).unwrap_err();
        assert_eq!(
            err,
            ChainError::ColumnNotFound {
                column: "nope".into()
            }
        );
    }

    #[test]
    fn test_cosine_similarity() {
        let expr = col("embeddings")
            .unwrap()
            .cosine_similarity(vec![1.0f32, 1.0]);
        let v = expr.eval(&row()).unwrap().as_f64().unwrap();
        assert!((v - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);

        let bad = col("embeddings")
            .unwrap()
            .cosine_similarity(vec![1.0f32, 1.0, 1.0]);
        assert!(bad.eval(&row()).is_err());
    }

    #[test]
    fn test_scalar_function_failure_is_reported() {
        let f = ScalarFn::new("explode", |_args: &[Value]| Err("kaboom".into()));
        let err = Expr::func(f, vec![col("key").unwrap()])
            .eval(&row())
            .unwrap_err();
        match err {
            ChainError::FunctionFailed { name, message } => {
                assert_eq!(name, "explode");
                assert_eq!(message, "kaboom");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scalar_function_panic_is_reported() {
        let f = ScalarFn::new("divide_by_zero", |_args: &[Value]| panic!("attempt to divide by zero"));
        let err = Expr::func(f, vec![col("key").unwrap()])
            .eval(&row())
            .unwrap_err();
        match err {
            ChainError::FunctionFailed { name, message } => {
                assert_eq!(name, "divide_by_zero");
                assert_eq!(message, "panicked: attempt to divide by zero");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_display() {
        let expr = col("file.name").unwrap().glob("*.pdf").unwrap();
        assert_eq!(expr.to_string(), "file.name glob '*.pdf'");
    }
}
