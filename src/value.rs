//! Runtime values produced by evaluation.
//!
//! [`Value`] is separate from the parsed [`Expr`] tree: it adds booleans,
//! procedures and the unspecified marker, none of which can be written
//! directly in source. Quoted data crosses over through `From<&Expr>`.

use std::rc::Rc;
use std::sync::Arc;

use crate::Error;
use crate::ast::Expr;
use crate::evaluator::Environment;
use crate::evaluator::intooperation::OperationFn;

/// Runtime value
#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Symbol(String),
    List(Vec<Value>),
    /// Built-in procedure; compared by id, not by function pointer
    Primitive {
        id: String,
        func: Arc<OperationFn>,
    },
    /// User-defined procedure created by `lambda` or `delay`
    Closure(Rc<Closure>),
    /// Result of forms that produce nothing, such as `define` and `display`.
    /// Unspecified never equals anything, including itself.
    Unspecified,
}

/// A procedure value closing over the environment it was created in.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Expr,
    pub env: Rc<Environment>,
}

impl Closure {
    /// Rendering of the lambda head used in diagnostics, e.g. `(lambda (x y))`
    pub fn signature(&self) -> String {
        format!("(lambda ({}))", self.params.join(" "))
    }
}

/// A numeric argument: the two numeric variants of [`Value`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(n) => n as f64,
            Number::Float(x) => x,
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Integer(n) => Value::Integer(n),
            Number::Float(x) => Value::Float(x),
        }
    }
}

impl TryFrom<&Value> for Number {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Integer(n) => Ok(Number::Integer(*n)),
            Value::Float(x) => Ok(Number::Float(*x)),
            other => Err(Error::TypeError(format!("expected number, got {other}"))),
        }
    }
}

impl Value {
    /// Truthiness used by `cond` and `if`
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::List(items) => !items.is_empty(),
            Value::Unspecified => false,
            Value::Symbol(_) | Value::Primitive { .. } | Value::Closure(_) => true,
        }
    }

    /// Check if a value represents nil (empty list)
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    pub fn is_procedure(&self) -> bool {
        matches!(self, Value::Primitive { .. } | Value::Closure(_))
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::List(list) => f.debug_tuple("List").field(list).finish(),
            Value::Primitive { id, .. } => write!(f, "Primitive({id})"),
            // The captured environment is left out: it may contain this closure
            Value::Closure(closure) => write!(
                f,
                "Closure(params={:?}, body={:?})",
                closure.params, closure.body
            ),
            Value::Unspecified => write!(f, "Unspecified"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Primitive { id: id1, .. }, Value::Primitive { id: id2, .. }) => id1 == id2,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Unspecified, _) | (_, Value::Unspecified) => false,
            _ => false,
        }
    }
}

impl From<&Expr> for Value {
    fn from(expr: &Expr) -> Self {
        match expr {
            Expr::Integer(n) => Value::Integer(*n),
            Expr::Float(x) => Value::Float(*x),
            Expr::Symbol(s) => Value::Symbol(s.clone()),
            Expr::List(items) => Value::List(items.iter().map(Value::from).collect()),
        }
    }
}

impl From<Expr> for Value {
    fn from(expr: Expr) -> Self {
        Value::from(&expr)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(i64::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(Into::into).collect())
    }
}

/// Helper function for creating Values - works great in mixed lists!
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}
