use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::Error;
use crate::builtinops::Arity;
use crate::evaluator::intooperation::{IntoOperation, IntoVariadicOperation};
use crate::value::Value;

/// A frame of variable bindings with an optional enclosing frame.
///
/// Frames are shared through `Rc`: closures hold on to the frame they were
/// created in, and each call gets a fresh child frame. Lookup walks outward,
/// `define` only ever writes to the frame it is called on.
#[derive(Default)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.bindings.borrow().keys().cloned().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("bindings", &names)
            .field("parent", &self.parent)
            .finish()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn with_parent(parent: Rc<Environment>) -> Self {
        Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        }
    }

    /// Create the frame for one procedure call, binding parameters to
    /// arguments by position.
    pub fn child_frame(
        parent: &Rc<Environment>,
        params: &[String],
        args: Vec<Value>,
    ) -> Result<Rc<Environment>, Error> {
        if params.len() != args.len() {
            return Err(Error::arity_error(Arity::Exact(params.len()), args.len()));
        }

        trace!("new frame binding {params:?}");
        let frame = Environment::with_parent(Rc::clone(parent));
        {
            let mut bindings = frame.bindings.borrow_mut();
            for (param, arg) in params.iter().zip(args) {
                bindings.insert(param.clone(), arg);
            }
        }
        Ok(Rc::new(frame))
    }

    /// Bind a name in this frame, replacing any existing binding here.
    /// Bindings of the same name in enclosing frames are shadowed, not touched.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Resolve a name, innermost frame first
    pub fn lookup(&self, name: &str) -> Result<Value, Error> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Ok(value.clone());
        }
        match &self.parent {
            Some(parent) => parent.lookup(name),
            None => Err(Error::NameError(name.to_owned())),
        }
    }

    /// Register a strongly-typed Rust function as a primitive using
    /// automatic argument extraction and result conversion.
    ///
    /// ```rust,ignore
    /// fn add(a: i64, b: i64) -> i64 { a + b }
    /// env.register_builtin_operation::<_, (i64, i64)>("add", add);
    /// ```
    ///
    /// Supported parameter types: `i64`, `f64` (also accepts integers),
    /// `bool`, [`crate::value::Number`], `Value`, and `ValueIter<'_>` for a
    /// list argument. Return types are any of those scalars or `Value`,
    /// optionally wrapped in `Result<_, Error>`.
    ///
    /// Arity is enforced from the Rust signature. Conversion failures are
    /// `TypeError`s.
    pub fn register_builtin_operation<F, Args>(&self, name: &str, func: F)
    where
        F: IntoOperation<Args>,
    {
        let func = func.into_operation();
        self.define(
            name,
            Value::Primitive {
                id: name.to_owned(),
                func,
            },
        );
    }

    /// Register a primitive whose Rust signature ends in a rest parameter
    /// (`ValueIter<'_>`), validating the argument count against `arity`.
    pub fn register_variadic_builtin_operation<F, Args>(&self, name: &str, arity: Arity, func: F)
    where
        F: IntoVariadicOperation<Args>,
    {
        let func = func.into_variadic_operation(arity);
        self.define(
            name,
            Value::Primitive {
                id: name.to_owned(),
                func,
            },
        );
    }

    /// Get all bindings visible from this frame.
    /// Returns a Vec of (name, value) pairs sorted by name
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings = HashMap::new();

        // Start with parent bindings so they can be overridden by local ones
        if let Some(parent) = &self.parent {
            bindings.extend(parent.get_all_bindings());
        }

        for (name, value) in self.bindings.borrow().iter() {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}
