//! Textual rendering of source forms and runtime values.
//!
//! Lists print with single spaces between elements, integers in decimal and
//! floats always with a fractional part or exponent, so `10.0` stays
//! distinguishable from `10`. Text produced for numbers, symbols and lists
//! reads back to an equal value.

use std::fmt;

use crate::ast::Expr;
use crate::value::Value;

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        write!(f, "nan")
    } else if x.is_infinite() {
        write!(f, "{}", if x > 0.0 { "inf" } else { "-inf" })
    } else {
        write!(f, "{x:?}")
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Integer(n) => write!(f, "{n}"),
            Expr::Float(x) => write_float(f, *x),
            Expr::Symbol(s) => write!(f, "{s}"),
            Expr::List(items) => write_list(f, items),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write_float(f, *x),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::List(items) => write_list(f, items),
            Value::Primitive { id, .. } => write!(f, "#<primitive:{id}>"),
            Value::Closure(_) => write!(f, "#<closure>"),
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

/// Render a value as text
pub fn to_text(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{expr, nil, sym};
    use crate::reader::parse;
    use crate::value::val;

    #[test]
    fn test_value_rendering_data_driven() {
        let test_cases = vec![
            (val(42), "42"),
            (val(-7), "-7"),
            (val(10.0), "10.0"),
            (val(2.5), "2.5"),
            (val(-0.5), "-0.5"),
            (val(1e100), "1e100"),
            (val(f64::NAN), "nan"),
            (val(f64::NEG_INFINITY), "-inf"),
            (val(true), "#t"),
            (val(false), "#f"),
            (val(sym("hello")), "hello"),
            (val(nil()), "()"),
            (val([1, 2, 3]), "(1 2 3)"),
            (val(vec![val(1), val([2.5]), val(sym("x"))]), "(1 (2.5) x)"),
            (Value::Unspecified, "#<unspecified>"),
        ];

        for (i, (value, expected)) in test_cases.iter().enumerate() {
            assert_eq!(to_text(value), *expected, "case #{}", i + 1);
        }
    }

    #[test]
    fn test_procedures_render_opaquely() {
        let env = std::rc::Rc::new(crate::evaluator::create_global_env());
        assert_eq!(to_text(&env.lookup("car").unwrap()), "#<primitive:car>");

        let closure = crate::evaluator::eval(&parse("(lambda (x) x)").unwrap()[0], &env).unwrap();
        assert_eq!(to_text(&closure), "#<closure>");
    }

    #[test]
    fn test_expr_rendering() {
        assert_eq!(
            expr(vec![sym("define"), sym("x"), expr([1.0, 2.0])]).to_string(),
            "(define x (1.0 2.0))"
        );
    }

    #[test]
    fn test_parsed_text_round_trips() {
        for source in ["(1 2 3)", "(a (b 2.5) () -4)", "x", "0.001"] {
            let parsed = parse(source).unwrap();
            assert_eq!(to_text(&Value::from(&parsed[0])), source);
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod properties {
    use super::*;
    use crate::reader::parse;
    use proptest::prelude::*;

    fn nested_list() -> impl Strategy<Value = Expr> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(Expr::Integer),
            "s[a-z0-9?!-]{0,6}".prop_map(Expr::Symbol),
        ];
        leaf.prop_recursive(3, 24, 5, |inner| {
            prop::collection::vec(inner, 0..5).prop_map(Expr::List)
        })
    }

    proptest! {
        #[test]
        fn printed_data_reads_back_equal(form in nested_list()) {
            let text = to_text(&Value::from(&form));
            let reparsed = parse(&text).unwrap();
            prop_assert_eq!(reparsed.len(), 1);
            prop_assert_eq!(Value::from(&reparsed[0]), Value::from(&form));
        }
    }
}
