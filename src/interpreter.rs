//! Whole-source evaluation against one persistent global environment.

use std::rc::Rc;

use log::debug;

use crate::Error;
use crate::evaluator::{Environment, create_global_env, eval};
use crate::reader::parse;
use crate::value::Value;

/// An evaluation session. Definitions made by one call to
/// [`Interpreter::eval_source`] are visible to the next.
pub struct Interpreter {
    env: Rc<Environment>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Start a session with every builtin bound
    pub fn new() -> Self {
        Interpreter {
            env: Rc::new(create_global_env()),
        }
    }

    /// The global environment of this session
    pub fn environment(&self) -> &Rc<Environment> {
        &self.env
    }

    /// Parse all of `source`, then evaluate each top-level form in order.
    ///
    /// Parsing happens up front, so a syntax error anywhere means nothing is
    /// evaluated. Evaluation stops at the first failing form; effects of the
    /// forms before it (definitions, output) remain.
    pub fn eval_source(&self, source: &str) -> Result<Vec<Value>, Error> {
        let forms = parse(source)?;
        let mut results = Vec::with_capacity(forms.len());
        for form in &forms {
            debug!("evaluating {form}");
            results.push(eval(form, &self.env)?);
        }
        Ok(results)
    }

    /// Evaluate `source` like [`Interpreter::eval_source`], handing each
    /// printable result to `on_result` as soon as its form finishes.
    /// Unspecified results are skipped.
    pub fn for_each_result<F>(&self, source: &str, mut on_result: F) -> Result<(), Error>
    where
        F: FnMut(&Value),
    {
        let forms = parse(source)?;
        for form in &forms {
            debug!("evaluating {form}");
            let value = eval(form, &self.env)?;
            if !matches!(value, Value::Unspecified) {
                on_result(&value);
            }
        }
        Ok(())
    }
}
