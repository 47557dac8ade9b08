//! Built-in operations registry.
//!
//! Every name bound in a fresh global environment comes from one table,
//! [`BUILTIN_OPS`], built once at first use. Each entry is either a primitive
//! procedure or a constant.
//!
//! ```scheme
//! (+ 1 2)              ; 3
//! (/ 7 2)              ; 3, integer division floors
//! (cons 1 2)           ; (1 2)
//! (sqrt 16)            ; 4.0
//! (log 8 2)            ; 3.0
//! ```
//!
//! ## Numbers
//!
//! Integer arithmetic stays integer and reports overflow as an error. As soon
//! as one operand is a float the result is a float. Math functions accept
//! either and return floats, except `abs`, `trunc`, `factorial` and `gcd`.
//! `frexp` and `modf` return two-element lists and `fsum` sums a list.
//! The special functions (`erf`, `erfc`, `gamma`, `lgamma`, `frexp`, `modf`)
//! come from `libm`.
//! Results that would be NaN or infinite from finite input are reported as
//! math domain or range errors.
//!
//! ## Adding New Operations
//!
//! 1. **Implement the function** with typed parameters (`i64`, `f64`,
//!    `Number`, `bool`, `Value`, `ValueIter`) and a typed or `Result` return
//! 2. **Add to BUILTIN_OPS** with `fixed` (arity read from the signature) or
//!    `variadic` (arity given once)
//! 3. **Add tests** covering edge cases and error conditions

use crate::Error;
use crate::evaluator::intooperation::{IntoOperation, IntoVariadicOperation, OperationFn};
use crate::evaluator::ValueIter;
use crate::value::{Number, Value};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Number of arguments an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly n arguments
    Exact(usize),
    /// At least n arguments
    AtLeast(usize),
    /// Between min and max arguments (inclusive)
    Range(usize, usize),
    /// Any number of arguments
    Any,
}

impl Arity {
    /// Check if the given number of arguments is valid
    pub fn validate(self, arg_count: usize) -> Result<(), Error> {
        let ok = match self {
            Arity::Exact(n) => arg_count == n,
            Arity::AtLeast(n) => arg_count >= n,
            Arity::Range(min, max) => (min..=max).contains(&arg_count),
            Arity::Any => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::arity_error(self, arg_count))
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Range(min, max) => write!(f, "{min} to {max}"),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

/// A named constant installed in the global environment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    Float(f64),
    Bool(bool),
}

impl From<Constant> for Value {
    fn from(constant: Constant) -> Self {
        match constant {
            Constant::Float(x) => Value::Float(x),
            Constant::Bool(b) => Value::Bool(b),
        }
    }
}

/// Represents the implementation of a built-in
#[derive(Clone)]
pub enum OpKind {
    /// Procedure taking evaluated arguments, via the canonical erased signature.
    /// Argument counts are checked inside `func`; `arity` documents them.
    Function {
        func: Arc<OperationFn>,
        arity: Arity,
    },
    Constant(Constant),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Function { arity, .. } => write!(f, "Function(<fn>, {arity:?})"),
            OpKind::Constant(c) => write!(f, "Constant({c:?})"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// The name this operation is bound to
    pub id: &'static str,
    pub op_kind: OpKind,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl BuiltinOp {
    fn function(id: &'static str, arity: Arity, func: Arc<OperationFn>) -> Self {
        BuiltinOp {
            id,
            op_kind: OpKind::Function { func, arity },
        }
    }

    fn constant(id: &'static str, constant: Constant) -> Self {
        BuiltinOp {
            id,
            op_kind: OpKind::Constant(constant),
        }
    }

    /// The value bound to this operation's name in a global environment
    pub fn to_value(&self) -> Value {
        match &self.op_kind {
            OpKind::Function { func, .. } => Value::Primitive {
                id: self.id.to_owned(),
                func: Arc::clone(func),
            },
            OpKind::Constant(constant) => Value::from(*constant),
        }
    }
}

//
// Arithmetic and comparison
//

fn overflow(what: &str) -> Error {
    Error::EvalError(format!("Integer overflow in {what}"))
}

fn division_by_zero() -> Error {
    Error::EvalError("division by zero".into())
}

// Integer pairs use checked integer arithmetic; anything involving a float is done in floats
macro_rules! arithmetic_op {
    ($name:ident, $checked:ident, $op:tt, $what:literal) => {
        fn $name(a: Number, b: Number) -> Result<Number, Error> {
            match (a, b) {
                (Number::Integer(x), Number::Integer(y)) => {
                    x.$checked(y).map(Number::Integer).ok_or_else(|| overflow($what))
                }
                _ => Ok(Number::Float(a.as_f64() $op b.as_f64())),
            }
        }
    };
}

arithmetic_op!(builtin_add, checked_add, +, "addition");
arithmetic_op!(builtin_sub, checked_sub, -, "subtraction");
arithmetic_op!(builtin_mul, checked_mul, *, "multiplication");

/// Integer division rounds toward negative infinity
fn floor_div(x: i64, y: i64) -> Result<i64, Error> {
    let quotient = x.checked_div(y).ok_or_else(|| overflow("division"))?;
    let remainder = x.checked_rem(y).ok_or_else(|| overflow("division"))?;
    if remainder != 0 && ((remainder < 0) != (y < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn builtin_div(a: Number, b: Number) -> Result<Number, Error> {
    match (a, b) {
        (_, Number::Integer(0)) => Err(division_by_zero()),
        (_, Number::Float(y)) if y == 0.0 => Err(division_by_zero()),
        (Number::Integer(x), Number::Integer(y)) => floor_div(x, y).map(Number::Integer),
        _ => Ok(Number::Float(a.as_f64() / b.as_f64())),
    }
}

/// Equality: numbers compare by value across integer and float, lists element-wise
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            match (Number::try_from(a), Number::try_from(b)) {
                (Ok(Number::Integer(x)), Ok(Number::Integer(y))) => x == y,
                (Ok(x), Ok(y)) => x.as_f64() == y.as_f64(),
                _ => false,
            }
        }
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        // Procedures by identity; the unspecified marker equals nothing
        _ => a == b,
    }
}

fn builtin_eq(a: Value, b: Value) -> bool {
    values_equal(&a, &b)
}

fn numeric_extreme(
    first: Number,
    rest: ValueIter<'_>,
    prefer: fn(f64, f64) -> bool,
) -> Result<Number, Error> {
    let mut best = first;
    for value in rest {
        let candidate = Number::try_from(value)?;
        if prefer(candidate.as_f64(), best.as_f64()) {
            best = candidate;
        }
    }
    Ok(best)
}

fn builtin_max(first: Number, rest: ValueIter<'_>) -> Result<Number, Error> {
    numeric_extreme(first, rest, |candidate, best| candidate > best)
}

fn builtin_min(first: Number, rest: ValueIter<'_>) -> Result<Number, Error> {
    numeric_extreme(first, rest, |candidate, best| candidate < best)
}

//
// Lists
//

fn builtin_car(mut list: ValueIter<'_>) -> Result<Value, Error> {
    match list.next() {
        Some(first) => Ok(first.clone()),
        None => Err(Error::EvalError("car of empty list".into())),
    }
}

fn builtin_cdr(mut list: ValueIter<'_>) -> Result<Value, Error> {
    let Some(_) = list.next() else {
        return Err(Error::EvalError("cdr of empty list".into()));
    };

    Ok(Value::List(list.cloned().collect()))
}

/// Prepends onto a list; any other second argument yields a two-element list
fn builtin_cons(first: Value, rest: Value) -> Value {
    match rest {
        Value::List(tail) => {
            let mut new_list = Vec::with_capacity(tail.len() + 1);
            new_list.push(first);
            new_list.extend(tail);
            Value::List(new_list)
        }
        other => Value::List(vec![first, other]),
    }
}

fn builtin_list(args: ValueIter<'_>) -> Value {
    Value::List(args.cloned().collect())
}

fn builtin_null(value: Value) -> bool {
    value.is_nil()
}

//
// Output
//

fn builtin_display(args: ValueIter<'_>) -> Value {
    for value in args {
        println!("{value}");
    }
    Value::Unspecified
}

//
// Math
//

/// Report NaN or infinite results that came from well-behaved input
fn checked_math(id: &str, inputs: &[f64], result: f64) -> Result<f64, Error> {
    if result.is_nan() && !inputs.iter().any(|x| x.is_nan()) {
        Err(Error::EvalError(format!("{id}: math domain error")))
    } else if result.is_infinite() && inputs.iter().all(|x| x.is_finite()) {
        Err(Error::EvalError(format!("{id}: math range error")))
    } else {
        Ok(result)
    }
}

macro_rules! math_unary {
    ($($name:ident, $id:literal => |$x:ident| $body:expr;)+) => {
        $(
            fn $name($x: f64) -> Result<f64, Error> {
                checked_math($id, &[$x], $body)
            }
        )+
    };
}

math_unary! {
    builtin_sin, "sin" => |x| x.sin();
    builtin_cos, "cos" => |x| x.cos();
    builtin_tan, "tan" => |x| x.tan();
    builtin_asin, "asin" => |x| x.asin();
    builtin_acos, "acos" => |x| x.acos();
    builtin_atan, "atan" => |x| x.atan();
    builtin_sinh, "sinh" => |x| x.sinh();
    builtin_cosh, "cosh" => |x| x.cosh();
    builtin_tanh, "tanh" => |x| x.tanh();
    builtin_asinh, "asinh" => |x| x.asinh();
    builtin_acosh, "acosh" => |x| x.acosh();
    builtin_atanh, "atanh" => |x| x.atanh();
    builtin_exp, "exp" => |x| x.exp();
    builtin_expm1, "expm1" => |x| x.exp_m1();
    builtin_log10, "log10" => |x| x.log10();
    builtin_log2, "log2" => |x| x.log2();
    builtin_log1p, "log1p" => |x| x.ln_1p();
    builtin_sqrt, "sqrt" => |x| x.sqrt();
    builtin_fabs, "fabs" => |x| x.abs();
    builtin_floor, "floor" => |x| x.floor();
    builtin_ceil, "ceil" => |x| x.ceil();
    builtin_degrees, "degrees" => |x| x.to_degrees();
    builtin_radians, "radians" => |x| x.to_radians();
    builtin_erf, "erf" => |x| libm::erf(x);
    builtin_erfc, "erfc" => |x| libm::erfc(x);
    builtin_gamma, "gamma" => |x| libm::tgamma(x);
    builtin_lgamma, "lgamma" => |x| libm::lgamma(x);
}

macro_rules! math_binary {
    ($($name:ident, $id:literal => |$x:ident, $y:ident| $body:expr;)+) => {
        $(
            fn $name($x: f64, $y: f64) -> Result<f64, Error> {
                checked_math($id, &[$x, $y], $body)
            }
        )+
    };
}

math_binary! {
    builtin_atan2, "atan2" => |y, x| y.atan2(x);
    builtin_pow, "pow" => |x, y| x.powf(y);
    builtin_fmod, "fmod" => |x, y| x % y;
    builtin_hypot, "hypot" => |x, y| x.hypot(y);
    builtin_copysign, "copysign" => |x, y| x.copysign(y);
}

/// Natural logarithm, or the logarithm in an optional base
fn builtin_log(x: f64, mut base: ValueIter<'_>) -> Result<f64, Error> {
    let ln_x = checked_math("log", &[x], x.ln())?;
    match base.next() {
        None => Ok(ln_x),
        Some(base) => {
            let base = Number::try_from(base)?.as_f64();
            let ln_base = checked_math("log", &[base], base.ln())?;
            if ln_base == 0.0 {
                return Err(division_by_zero());
            }
            Ok(ln_x / ln_base)
        }
    }
}

fn builtin_ldexp(x: f64, exp: i64) -> Result<f64, Error> {
    if x == 0.0 || !x.is_finite() {
        return Ok(x);
    }
    // Scale in two steps so neither factor overflows on its own
    let exp = exp.clamp(-2200, 2200) as i32;
    let half = exp / 2;
    checked_math("ldexp", &[x], x * 2f64.powi(half) * 2f64.powi(exp - half))
}

/// Mantissa and exponent: `(m e)` with `x = m * 2^e` and `0.5 <= |m| < 1`
fn builtin_frexp(x: f64) -> Value {
    let (mantissa, exp) = libm::frexp(x);
    Value::List(vec![Value::Float(mantissa), Value::Integer(i64::from(exp))])
}

/// Fractional and integral parts, both carrying the sign of `x`
fn builtin_modf(x: f64) -> Value {
    let (fractional, integral) = libm::modf(x);
    Value::List(vec![Value::Float(fractional), Value::Float(integral)])
}

/// Sum of a list of numbers without intermediate rounding loss.
///
/// Keeps a list of non-overlapping partial sums (Shewchuk's algorithm), so
/// `(fsum (list 1e100 1.0 -1e100))` is `1.0`.
fn builtin_fsum(items: ValueIter<'_>) -> Result<f64, Error> {
    let inputs = items
        .map(|v| Number::try_from(v).map(Number::as_f64))
        .collect::<Result<Vec<_>, _>>()?;

    if inputs.iter().any(|x| !x.is_finite()) {
        return checked_math("fsum", &inputs, inputs.iter().sum());
    }

    let mut partials: Vec<f64> = Vec::new();
    for &input in &inputs {
        let mut x = input;
        let mut kept = 0;
        for i in 0..partials.len() {
            let mut y = partials[i];
            if x.abs() < y.abs() {
                std::mem::swap(&mut x, &mut y);
            }
            let hi = x + y;
            if hi.is_infinite() {
                return checked_math("fsum", &inputs, hi);
            }
            let lo = y - (hi - x);
            if lo != 0.0 {
                partials[kept] = lo;
                kept += 1;
            }
            x = hi;
        }
        partials.truncate(kept);
        partials.push(x);
    }

    // Add from the largest partial down, stopping once the rest cannot matter
    let mut total = partials.pop().unwrap_or(0.0);
    while let Some(y) = partials.pop() {
        let x = total;
        total = x + y;
        if y - (total - x) != 0.0 {
            break;
        }
    }
    checked_math("fsum", &inputs, total)
}

fn builtin_trunc(x: Number) -> Result<i64, Error> {
    match x {
        Number::Integer(n) => Ok(n),
        Number::Float(f) => {
            let truncated = f.trunc();
            if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64
            {
                Ok(truncated as i64)
            } else {
                Err(Error::EvalError(format!(
                    "trunc: cannot convert {f} to integer"
                )))
            }
        }
    }
}

fn builtin_abs(x: Number) -> Result<Number, Error> {
    match x {
        Number::Integer(n) => n
            .checked_abs()
            .map(Number::Integer)
            .ok_or_else(|| overflow("abs")),
        Number::Float(f) => Ok(Number::Float(f.abs())),
    }
}

fn builtin_isnan(x: f64) -> bool {
    x.is_nan()
}

fn builtin_isinf(x: f64) -> bool {
    x.is_infinite()
}

fn builtin_isfinite(x: f64) -> bool {
    x.is_finite()
}

fn builtin_factorial(n: i64) -> Result<i64, Error> {
    if n < 0 {
        return Err(Error::EvalError(
            "factorial() not defined for negative values".into(),
        ));
    }
    (1..=n).try_fold(1i64, |acc, k| acc.checked_mul(k).ok_or_else(|| overflow("factorial")))
}

fn builtin_gcd(a: i64, b: i64) -> Result<i64, Error> {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    i64::try_from(a).map_err(|_| overflow("gcd"))
}

/// Global registry of all built-in operations.
///
/// The typed implementations above are wired through the same adapter layer
/// used for custom registration on `Environment`. This is done once at
/// initialization time via a `LazyLock`.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    /// Fixed-arity entry; the argument count comes from the Rust signature
    fn fixed<Args, F>(id: &'static str, f: F) -> BuiltinOp
    where
        F: IntoOperation<Args>,
    {
        let arity = Arity::Exact(<F as IntoOperation<Args>>::ARITY);
        BuiltinOp::function(id, arity, <F as IntoOperation<Args>>::into_operation(f))
    }

    /// Entry ending in a rest parameter, validated against `arity`
    fn variadic<Args, F>(id: &'static str, arity: Arity, f: F) -> BuiltinOp
    where
        F: IntoVariadicOperation<Args>,
    {
        let func = <F as IntoVariadicOperation<Args>>::into_variadic_operation(f, arity);
        BuiltinOp::function(id, arity, func)
    }

    type Num1 = (Number,);
    type Num2 = (Number, Number);
    type F1 = (f64,);
    type F2 = (f64, f64);
    type List1 = (ValueIter<'static>,);
    type Rest = (ValueIter<'static>,);

    vec![
        // Arithmetic operations
        fixed::<Num2, _>("+", builtin_add),
        fixed::<Num2, _>("-", builtin_sub),
        fixed::<Num2, _>("*", builtin_mul),
        fixed::<Num2, _>("/", builtin_div),
        fixed::<(Value, Value), _>("=", builtin_eq),
        variadic::<(Number, ValueIter<'static>), _>("max", Arity::AtLeast(1), builtin_max),
        variadic::<(Number, ValueIter<'static>), _>("min", Arity::AtLeast(1), builtin_min),
        // List operations
        fixed::<(Value, Value), _>("cons", builtin_cons),
        fixed::<List1, _>("car", builtin_car),
        fixed::<List1, _>("cdr", builtin_cdr),
        variadic::<Rest, _>("list", Arity::Any, builtin_list),
        fixed::<(Value,), _>("null?", builtin_null),
        // Output
        variadic::<Rest, _>("display", Arity::Any, builtin_display),
        // Constants
        BuiltinOp::constant("else", Constant::Bool(true)),
        BuiltinOp::constant("pi", Constant::Float(std::f64::consts::PI)),
        BuiltinOp::constant("e", Constant::Float(std::f64::consts::E)),
        BuiltinOp::constant("tau", Constant::Float(std::f64::consts::TAU)),
        // Math: one float argument
        fixed::<F1, _>("sin", builtin_sin),
        fixed::<F1, _>("cos", builtin_cos),
        fixed::<F1, _>("tan", builtin_tan),
        fixed::<F1, _>("asin", builtin_asin),
        fixed::<F1, _>("acos", builtin_acos),
        fixed::<F1, _>("atan", builtin_atan),
        fixed::<F1, _>("sinh", builtin_sinh),
        fixed::<F1, _>("cosh", builtin_cosh),
        fixed::<F1, _>("tanh", builtin_tanh),
        fixed::<F1, _>("asinh", builtin_asinh),
        fixed::<F1, _>("acosh", builtin_acosh),
        fixed::<F1, _>("atanh", builtin_atanh),
        fixed::<F1, _>("exp", builtin_exp),
        fixed::<F1, _>("expm1", builtin_expm1),
        fixed::<F1, _>("log10", builtin_log10),
        fixed::<F1, _>("log2", builtin_log2),
        fixed::<F1, _>("log1p", builtin_log1p),
        fixed::<F1, _>("sqrt", builtin_sqrt),
        fixed::<F1, _>("fabs", builtin_fabs),
        fixed::<F1, _>("floor", builtin_floor),
        fixed::<F1, _>("ceil", builtin_ceil),
        fixed::<F1, _>("degrees", builtin_degrees),
        fixed::<F1, _>("radians", builtin_radians),
        fixed::<F1, _>("erf", builtin_erf),
        fixed::<F1, _>("erfc", builtin_erfc),
        fixed::<F1, _>("gamma", builtin_gamma),
        fixed::<F1, _>("lgamma", builtin_lgamma),
        variadic::<(f64, ValueIter<'static>), _>("log", Arity::Range(1, 2), builtin_log),
        // Math: two float arguments
        fixed::<F2, _>("atan2", builtin_atan2),
        fixed::<F2, _>("pow", builtin_pow),
        fixed::<F2, _>("fmod", builtin_fmod),
        fixed::<F2, _>("hypot", builtin_hypot),
        fixed::<F2, _>("copysign", builtin_copysign),
        fixed::<(f64, i64), _>("ldexp", builtin_ldexp),
        // Math: list-valued results and list arguments
        fixed::<F1, _>("frexp", builtin_frexp),
        fixed::<F1, _>("modf", builtin_modf),
        fixed::<List1, _>("fsum", builtin_fsum),
        // Math: predicates and integer-valued results
        fixed::<F1, _>("isnan", builtin_isnan),
        fixed::<F1, _>("isinf", builtin_isinf),
        fixed::<F1, _>("isfinite", builtin_isfinite),
        fixed::<Num1, _>("trunc", builtin_trunc),
        fixed::<Num1, _>("abs", builtin_abs),
        fixed::<(i64,), _>("factorial", builtin_factorial),
        fixed::<(i64, i64), _>("gcd", builtin_gcd),
    ]
});

/// Lazy static map from id to BuiltinOp (private - use find_builtin_op)
static BUILTIN_BY_ID: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter().map(|op| (op.id, op)).collect()
});

/// Get all builtin operations, in registry order
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin operation by the name it is bound to
pub fn find_builtin_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_BY_ID.get(id).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::sym;
    use crate::value::val;

    /// Micro-helper for success cases
    fn success<T: Into<Value>>(value: T) -> Option<Value> {
        Some(val(value))
    }

    /// Helper to invoke a builtin through the registry using the canonical
    /// erased signature (Vec<Value> -> Result<Value, Error>).
    fn call_builtin(name: &str, args: &[Value]) -> Result<Value, Error> {
        let op = find_builtin_op(name).unwrap();
        match &op.op_kind {
            OpKind::Function { func, .. } => func(args.to_vec()),
            OpKind::Constant(_) => panic!("expected function builtin in tests, got constant: {name}"),
        }
    }

    /// Macro to create test cases, invoking builtins via the registry.
    macro_rules! test {
        ($name:expr, $args:expr, $expected:expr) => {
            ($name, call_builtin($name, $args), $expected)
        };
    }

    #[test]
    fn test_builtin_ops_registry() {
        let add_op = find_builtin_op("+").unwrap();
        assert!(matches!(
            add_op.op_kind,
            OpKind::Function {
                arity: Arity::Exact(2),
                ..
            }
        ));

        let log_op = find_builtin_op("log").unwrap();
        assert!(matches!(
            log_op.op_kind,
            OpKind::Function {
                arity: Arity::Range(1, 2),
                ..
            }
        ));

        assert_eq!(find_builtin_op("else").unwrap().to_value(), val(true));
        assert_eq!(
            find_builtin_op("pi").unwrap().to_value(),
            val(std::f64::consts::PI)
        );
        assert!(find_builtin_op("unknown").is_none());

        // No duplicate ids
        assert_eq!(BUILTIN_BY_ID.len(), get_builtin_ops().len());

        // Special forms are handled by the evaluator, not the registry
        for keyword in ["quote", "define", "lambda", "cond", "if", "delay", "force"] {
            assert!(find_builtin_op(keyword).is_none(), "{keyword}");
        }
    }

    #[test]
    fn test_registered_arity_matches_calls() {
        for op in get_builtin_ops() {
            let OpKind::Function { func, arity } = &op.op_kind else {
                continue;
            };
            let fewest = match *arity {
                Arity::Exact(n) | Arity::AtLeast(n) | Arity::Range(n, _) => n,
                Arity::Any => 0,
            };
            let accepted = func(vec![val(1); fewest]);
            assert!(
                !matches!(accepted, Err(Error::ArityError { .. })),
                "{}: {fewest} arguments rejected",
                op.id
            );

            let outside = match *arity {
                Arity::Exact(n) | Arity::Range(_, n) => Some(n + 1),
                Arity::AtLeast(n) => n.checked_sub(1),
                Arity::Any => None,
            };
            if let Some(count) = outside {
                match func(vec![val(1); count]) {
                    Err(Error::ArityError { expected, got, .. }) => {
                        assert_eq!((expected, got), (*arity, count), "{}", op.id);
                    }
                    other => panic!("{}: {count} arguments gave {other:?}", op.id),
                }
            }
        }
    }

    #[test]
    fn test_arity_validate_and_display() {
        assert!(Arity::Exact(2).validate(2).is_ok());
        assert!(Arity::Exact(2).validate(1).is_err());
        assert!(Arity::AtLeast(1).validate(5).is_ok());
        assert!(Arity::AtLeast(1).validate(0).is_err());
        assert!(Arity::Range(1, 2).validate(2).is_ok());
        assert!(Arity::Range(1, 2).validate(3).is_err());
        assert!(Arity::Any.validate(0).is_ok());

        assert_eq!(Arity::Range(1, 2).to_string(), "1 to 2");
        assert_eq!(Arity::AtLeast(3).to_string(), "at least 3");
    }

    #[test]
    #[expect(clippy::too_many_lines)] // Comprehensive test coverage is intentionally thorough
    fn test_builtin_function_implementations() {
        type TestCase = (&'static str, Result<Value, Error>, Option<Value>);

        let int_list = val([1, 2, 3]);
        let nested = val(vec![val([1]), val(2)]);

        let test_cases: Vec<TestCase> = vec![
            // =================================================================
            // ARITHMETIC
            // =================================================================
            test!("+", &[val(1), val(2)], success(3)),
            test!("+", &[val(1), val(2.5)], success(3.5)),
            test!("+", &[val(i64::MAX), val(1)], None),
            test!("-", &[val(10), val(3)], success(7)),
            test!("-", &[val(i64::MIN), val(1)], None),
            test!("*", &[val(2.5), val(4)], success(10.0)),
            test!("*", &[val(i64::MAX), val(2)], None),
            test!("/", &[val(7), val(2)], success(3)),
            test!("/", &[val(-7), val(2)], success(-4)),
            test!("/", &[val(7), val(-2)], success(-4)),
            test!("/", &[val(-7), val(-2)], success(3)),
            test!("/", &[val(6), val(3)], success(2)),
            test!("/", &[val(1), val(4.0)], success(0.25)),
            test!("/", &[val(1), val(0)], None),
            test!("/", &[val(1.5), val(0)], None),
            test!("/", &[val(1), val(0.0)], None),
            test!("/", &[val(i64::MIN), val(-1)], None),
            test!("+", &[val(1)], None),
            test!("+", &[val(1), val(true)], None),
            test!("max", &[val(3), val(7.5), val(1)], success(7.5)),
            test!("max", &[val(3)], success(3)),
            test!("min", &[val(3), val(-2), val(1)], success(-2)),
            test!("min", &[], None),
            test!("min", &[val(1), val([1])], None),
            // =================================================================
            // EQUALITY
            // =================================================================
            test!("=", &[val(1), val(1)], success(true)),
            test!("=", &[val(1), val(1.0)], success(true)),
            test!("=", &[val(1), val(2)], success(false)),
            test!("=", &[int_list.clone(), val([1, 2, 3])], success(true)),
            test!("=", &[int_list.clone(), val([1, 2])], success(false)),
            test!("=", &[val([1]), val([1.0])], success(true)),
            test!("=", &[val(sym("a")), val(sym("a"))], success(true)),
            test!("=", &[val(sym("a")), val(sym("b"))], success(false)),
            test!("=", &[val(true), val(1)], success(false)),
            test!("=", &[Value::Unspecified, Value::Unspecified], success(false)),
            test!("=", &[Value::Unspecified, val(0)], success(false)),
            // =================================================================
            // LISTS
            // =================================================================
            test!("cons", &[val(1), val([2, 3])], success([1, 2, 3])),
            test!("cons", &[val(1), val(2)], success([1, 2])),
            test!("cons", &[val([1]), val(2)], Some(nested.clone())),
            test!("car", &[int_list.clone()], success(1)),
            test!("car", &[nested.clone()], success([1])),
            test!("car", &[val(Vec::<Value>::new())], None),
            test!("car", &[val(1)], None),
            test!("cdr", &[int_list.clone()], success([2, 3])),
            test!("cdr", &[val([1])], success(Vec::<Value>::new())),
            test!("cdr", &[val(Vec::<Value>::new())], None),
            test!("list", &[], success(Vec::<Value>::new())),
            test!("list", &[val(1), val(2.5)], success(vec![val(1), val(2.5)])),
            test!("null?", &[val(Vec::<Value>::new())], success(true)),
            test!("null?", &[int_list.clone()], success(false)),
            test!("null?", &[val(0)], success(false)),
            test!("null?", &[], None),
            // =================================================================
            // OUTPUT
            // =================================================================
            test!("display", &[], Some(Value::Unspecified)),
            test!("display", &[val(1), int_list.clone()], Some(Value::Unspecified)),
            // =================================================================
            // MATH
            // =================================================================
            test!("sqrt", &[val(16)], success(4.0)),
            test!("sqrt", &[val(-1)], None),
            test!("sin", &[val(0)], success(0.0)),
            test!("cos", &[val(0)], success(1.0)),
            test!("exp", &[val(0)], success(1.0)),
            test!("exp", &[val(1000)], None),
            test!("log", &[val(1)], success(0.0)),
            test!("log", &[val(8), val(2)], success(3.0)),
            test!("log", &[val(0)], None),
            test!("log", &[val(-1)], None),
            test!("log", &[val(8), val(1)], None),
            test!("log", &[val(8), val(2), val(2)], None),
            test!("log10", &[val(1000)], success(3.0)),
            test!("log2", &[val(8)], success(3.0)),
            test!("asin", &[val(2)], None),
            test!("atanh", &[val(1)], None),
            test!("pow", &[val(2), val(10)], success(1024.0)),
            test!("pow", &[val(0), val(-1)], None),
            test!("fmod", &[val(7), val(3)], success(1.0)),
            test!("fmod", &[val(-7), val(3)], success(-1.0)),
            test!("fmod", &[val(1), val(0)], None),
            test!("hypot", &[val(3), val(4)], success(5.0)),
            test!("copysign", &[val(2), val(-0.5)], success(-2.0)),
            test!("ldexp", &[val(1.5), val(2)], success(6.0)),
            test!("ldexp", &[val(1.5), val(2.0)], None),
            test!("fabs", &[val(-3)], success(3.0)),
            test!("abs", &[val(-3)], success(3)),
            test!("abs", &[val(-2.5)], success(2.5)),
            test!("abs", &[val(i64::MIN)], None),
            test!("floor", &[val(2.7)], success(2.0)),
            test!("floor", &[val(-2.5)], success(-3.0)),
            test!("ceil", &[val(2.1)], success(3.0)),
            test!("trunc", &[val(-2.7)], success(-2)),
            test!("trunc", &[val(5)], success(5)),
            test!("trunc", &[val(1e300)], None),
            test!("degrees", &[val(0)], success(0.0)),
            test!("radians", &[val(0)], success(0.0)),
            test!("ldexp", &[val(0), val(5000)], success(0.0)),
            test!("ldexp", &[val(1), val(5000)], None),
            test!("isnan", &[val(f64::NAN)], success(true)),
            test!("isnan", &[val(1)], success(false)),
            test!("isinf", &[val(f64::INFINITY)], success(true)),
            test!("isfinite", &[val(1.5)], success(true)),
            test!("factorial", &[val(5)], success(120)),
            test!("factorial", &[val(0)], success(1)),
            test!("factorial", &[val(-1)], None),
            test!("factorial", &[val(21)], None),
            test!("factorial", &[val(5.0)], None),
            test!("erf", &[val(0)], success(0.0)),
            test!("erfc", &[val(0)], success(1.0)),
            test!("gamma", &[val(5)], success(24.0)),
            test!("gamma", &[val(-1)], None),
            test!("gamma", &[val(0)], None),
            test!("lgamma", &[val(1)], success(0.0)),
            test!("lgamma", &[val(0)], None),
            test!("frexp", &[val(8)], success(vec![val(0.5), val(4)])),
            test!("frexp", &[val(0)], success(vec![val(0.0), val(0)])),
            test!("frexp", &[val(-3.0)], success(vec![val(-0.75), val(2)])),
            test!("modf", &[val(3.5)], success([0.5, 3.0])),
            test!("modf", &[val(-2.25)], success([-0.25, -2.0])),
            test!("modf", &[val(4)], success([0.0, 4.0])),
            test!("fsum", &[val([1e100, 1.0, -1e100])], success(1.0)),
            test!("fsum", &[val([0.1; 10])], success(1.0)),
            test!("fsum", &[val(vec![val(1), val(2.5), val(3)])], success(6.5)),
            test!("fsum", &[val(Vec::<Value>::new())], success(0.0)),
            test!("fsum", &[val([f64::MAX, f64::MAX])], None),
            test!("fsum", &[val([f64::INFINITY, -f64::INFINITY])], None),
            test!("fsum", &[val(vec![val(1), val(sym("x"))])], None),
            test!("fsum", &[val(1)], None),
            test!("fsum", &[val(1), val(2)], None),
            test!("gcd", &[val(12), val(18)], success(6)),
            test!("gcd", &[val(-12), val(18)], success(6)),
            test!("gcd", &[val(0), val(0)], success(0)),
            test!("gcd", &[val(i64::MIN), val(0)], None),
            test!("sqrt", &[val(sym("x"))], None),
            test!("sqrt", &[val(1), val(2)], None),
        ];

        for (i, (name, result, expected)) in test_cases.into_iter().enumerate() {
            match (result, expected) {
                (Ok(actual), Some(expected_val)) => match (&actual, &expected_val) {
                    (Value::Unspecified, Value::Unspecified) => {}
                    _ => assert_eq!(
                        actual,
                        expected_val,
                        "#{} {name}: value mismatch",
                        i + 1
                    ),
                },
                (Err(_), None) => {}
                (Ok(actual), None) => {
                    panic!("#{} {name}: expected error, got {actual:?}", i + 1)
                }
                (Err(err), Some(expected_val)) => {
                    panic!("#{} {name}: expected {expected_val:?}, got error {err}", i + 1)
                }
            }
        }
    }

    #[test]
    fn test_floor_div_matches_floor_of_exact_quotient() {
        for x in -20i64..=20 {
            for y in [-7i64, -3, -1, 1, 2, 5] {
                let expected = (x as f64 / y as f64).floor() as i64;
                assert_eq!(floor_div(x, y).unwrap(), expected, "{x} / {y}");
            }
        }
    }
}
