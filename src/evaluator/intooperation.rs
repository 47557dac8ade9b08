use crate::Error;
use crate::builtinops::Arity;
use crate::value::{Number, Value};
use std::sync::Arc;

// NOTE: This module is internal plumbing for the evaluator.
// It defines the adapter layer that turns strongly-typed Rust
// functions into the erased `OperationFn` stored in primitive values.
//
// External users should go through the registration APIs on
// `Environment` rather than implementing these traits.

/// Canonical erased primitive function type used by the evaluator.
///
/// Primitives receive ownership of their argument vector, enabling
/// implementations that consume or rearrange arguments if desired.
pub type OperationFn = dyn Fn(Vec<Value>) -> Result<Value, Error> + Send + Sync;

/// Borrowed iterator over a list argument, or over the rest of the
/// arguments for variadic primitives.
pub type ValueIter<'a> = std::slice::Iter<'a, Value>;

// =====================================================================
// Argument conversion
// =====================================================================

/// Core trait used by the fixed-arity adapters to turn `Value`
/// arguments into strongly-typed parameters.
///
/// The associated `Param<'a>` type is the parameter type as seen by
/// the primitive for a given lifetime of the local `Value` slots used
/// during argument conversion.
pub trait FromParam {
    type Param<'a>;

    /// Convert a single argument into this parameter type, either by
    /// borrowing from it or by moving it out.
    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error>;
}

impl FromParam for Value {
    type Param<'a> = Value;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        // Move the `Value` out so that primitives can consume owned lists without cloning.
        Ok(std::mem::replace(value, Value::Unspecified))
    }
}

impl FromParam for Number {
    type Param<'a> = Number;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        Number::try_from(&*value)
    }
}

impl FromParam for i64 {
    type Param<'a> = i64;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        match value {
            Value::Integer(n) => Ok(*n),
            other => Err(Error::TypeError(format!("expected integer, got {other}"))),
        }
    }
}

/// Floats accept integer arguments as well, widening them
impl FromParam for f64 {
    type Param<'a> = f64;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        Number::try_from(&*value).map(Number::as_f64)
    }
}

impl FromParam for bool {
    type Param<'a> = bool;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(Error::TypeError(format!("expected boolean, got {other}"))),
        }
    }
}

/// A list argument viewed as an iterator over its elements
impl FromParam for ValueIter<'_> {
    type Param<'a> = ValueIter<'a>;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        match value {
            Value::List(items) => Ok(items.iter()),
            other => Err(Error::TypeError(format!("expected list, got {other}"))),
        }
    }
}

/// Construction of rest parameters from the tail of the argument vector.
pub trait FromRest {
    type Param<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error>;
}

impl FromRest for ValueIter<'_> {
    type Param<'a> = ValueIter<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error> {
        Ok(slice.iter())
    }
}

// =====================================================================
// Return-type adaptation
// =====================================================================

/// Internal trait that normalizes primitive return types to the
/// canonical `Result<Value, Error>` expected by the evaluator.
pub trait IntoValueResult {
    fn into_value_result(self) -> Result<Value, Error>;
}

macro_rules! impl_into_value_result {
    ($($t:ty),+) => {
        $(
            impl IntoValueResult for $t {
                fn into_value_result(self) -> Result<Value, Error> {
                    Ok(self.into())
                }
            }

            impl IntoValueResult for Result<$t, Error> {
                fn into_value_result(self) -> Result<Value, Error> {
                    self.map(Into::into)
                }
            }
        )+
    };
}

impl_into_value_result!(Value, Number, i64, f64, bool);

/// Converts strongly-typed Rust functions or closures into the erased
/// [`OperationFn`], parameterized by an argument tuple type. Arity is
/// taken from the Rust signature.
pub trait IntoOperation<Args> {
    /// Number of arguments the Rust signature takes
    const ARITY: usize;

    fn into_operation(self) -> Arc<OperationFn>;
}

/// Operations whose Rust signature ends in a rest parameter
/// (`ValueIter<'a>`), optionally after a fixed prefix of `FromParam`
/// parameters. Arity comes from an explicit [`Arity`].
pub trait IntoVariadicOperation<Args> {
    fn into_variadic_operation(self, arity: Arity) -> Arc<OperationFn>;
}

// =====================================================================
// Variadic adapters
// =====================================================================

impl<F, I, R> IntoVariadicOperation<(I,)> for F
where
    I: FromRest,
    F: for<'a> Fn(<I as FromRest>::Param<'a>) -> R + Send + Sync + 'static,
    R: IntoValueResult,
{
    fn into_variadic_operation(self, arity: Arity) -> Arc<OperationFn> {
        Arc::new(move |args: Vec<Value>| {
            arity.validate(args.len())?;
            let rest_param: <I as FromRest>::Param<'_> = <I as FromRest>::from_rest(&args[..])?;
            let result: R = (self)(rest_param);
            result.into_value_result()
        })
    }
}

/// Implements `IntoVariadicOperation` for a fixed prefix of `FromParam`
/// parameters followed by a single rest parameter.
macro_rules! impl_into_variadic_operation_for_prefix_and_rest {
    ($( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, I, R, $( $A ),+> IntoVariadicOperation<( $( $A, )+ I, )> for F
        where
            I: FromRest,
            $( $A: FromParam, )+
            F: for<'a> Fn(
                    $( <$A as FromParam>::Param<'a> ),+,
                    <I as FromRest>::Param<'a>,
                ) -> R
                + Send
                + Sync
                + 'static,
            R: IntoValueResult,
        {
            fn into_variadic_operation(self, arity: Arity) -> Arc<OperationFn> {
                Arc::new(move |mut args: Vec<Value>| {
                    arity.validate(args.len())?;
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+, ref mut rest @ .. ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+

                            let rest_param: <I as FromRest>::Param<'_> =
                                <I as FromRest>::from_rest(&*rest)?;

                            let result: R = (self)( $( $p ),+, rest_param );
                            result.into_value_result()
                        }
                        _ => Err(Error::arity_error(arity, len)),
                    }
                })
            }
        }
    };
}

impl_into_variadic_operation_for_prefix_and_rest!(v0, p0: A1);
impl_into_variadic_operation_for_prefix_and_rest!(v0, p0: A1, v1, p1: A2);

// =====================================================================
// Fixed-arity adapters
// =====================================================================

/// Implements `IntoOperation` for functions of a given arity.
///
/// It checks the argument count up front, then destructures the owned
/// `Vec<Value>` into local `Value` slots so that `FromParam` can either
/// borrow from or consume each argument before invoking the primitive.
macro_rules! impl_into_operation_for_arity {
    ($arity:expr, $( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, R, $( $A ),+> IntoOperation<( $( $A, )+ )> for F
        where
            F: for<'a> Fn( $( <$A as FromParam>::Param<'a> ),+ ) -> R
                + Send
                + Sync
                + 'static,
            $( $A: FromParam, )+
            R: IntoValueResult,
        {
            const ARITY: usize = $arity;

            fn into_operation(self) -> Arc<OperationFn> {
                Arc::new(move |mut args: Vec<Value>| {
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+ ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+

                            let result: R = (self)( $( $p ),+ );
                            result.into_value_result()
                        }
                        _ => Err(Error::arity_error(Arity::Exact($arity), len)),
                    }
                })
            }
        }
    };
}

// 0-arg functions / closures
impl<F, R> IntoOperation<()> for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: IntoValueResult,
{
    const ARITY: usize = 0;

    fn into_operation(self) -> Arc<OperationFn> {
        Arc::new(move |args: Vec<Value>| {
            if !args.is_empty() {
                return Err(Error::arity_error(Arity::Exact(0), args.len()));
            }

            let result: R = (self)();
            result.into_value_result()
        })
    }
}

impl_into_operation_for_arity!(1, v0, p0: A1);
impl_into_operation_for_arity!(2, v0, p0: A1, v1, p1: A2);
impl_into_operation_for_arity!(3, v0, p0: A1, v1, p1: A2, v2, p2: A3);
