//! This module defines the parsed expression tree, [`Expr`]. The reader produces one
//! `Expr` per top-level form and nothing mutates it afterwards: quoting converts a
//! subtree into a runtime value and closures keep their body by value.
//!
//! Helper functions [`sym`], [`expr`] and [`nil`] build trees by hand, mostly for
//! tests, together with `From` conversions from Rust numbers, arrays and vectors.

/// Parsed expression
///
/// Integers and floats are self-evaluating, symbols are looked up in the
/// environment, and lists are special forms or procedure applications.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(i64),
    Float(f64),
    Symbol(String),
    List(Vec<Expr>),
}

impl Expr {
    /// The symbol name, if this is a symbol
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Expr::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Expr {
            fn from(n: $int_type) -> Self {
                Expr::Integer(i64::from(n))
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

impl From<f64> for Expr {
    fn from(x: f64) -> Self {
        Expr::Float(x)
    }
}

impl<T: Into<Expr>> From<Vec<T>> for Expr {
    fn from(v: Vec<T>) -> Self {
        Expr::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Expr>, const N: usize> From<[T; N]> for Expr {
    fn from(arr: [T; N]) -> Self {
        Expr::List(arr.into_iter().map(Into::into).collect())
    }
}

/// Helper function for creating symbols
pub fn sym<S: AsRef<str>>(name: S) -> Expr {
    Expr::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating expressions from anything convertible
pub fn expr<T: Into<Expr>>(value: T) -> Expr {
    value.into()
}

/// Helper function for creating the empty list
pub fn nil() -> Expr {
    Expr::List(vec![])
}

#[cfg(test)]
mod helper_function_tests {
    use super::*;

    #[test]
    fn test_helper_functions_data_driven() {
        let test_cases = vec![
            (expr(42), Expr::Integer(42)),
            (expr(-17i64), Expr::Integer(-17)),
            (expr(255u8), Expr::Integer(255)),
            (expr(i64::MIN), Expr::Integer(i64::MIN)),
            (expr(2.5), Expr::Float(2.5)),
            (sym("null?"), Expr::Symbol("null?".to_owned())),
            (sym(String::from("x")), Expr::Symbol("x".to_owned())),
            (nil(), Expr::List(vec![])),
            (
                expr([1, 2, 3]),
                Expr::List(vec![Expr::Integer(1), Expr::Integer(2), Expr::Integer(3)]),
            ),
            (
                expr(vec![sym("+"), expr(1), expr(2.0)]),
                Expr::List(vec![
                    Expr::Symbol("+".to_owned()),
                    Expr::Integer(1),
                    Expr::Float(2.0),
                ]),
            ),
        ];

        for (i, (actual, expected)) in test_cases.iter().enumerate() {
            assert_eq!(actual, expected, "Test case {} failed", i + 1);
        }
    }

    #[test]
    fn test_as_symbol() {
        assert_eq!(sym("lambda").as_symbol(), Some("lambda"));
        assert_eq!(expr(1).as_symbol(), None);
        assert_eq!(nil().as_symbol(), None);
    }
}
