use std::rc::Rc;

use log::{debug, trace, warn};

use crate::Error;
use crate::MAX_EVAL_DEPTH;
use crate::ast::Expr;
use crate::builtinops::get_builtin_ops;
use crate::value::{Closure, Value};

mod environment;
pub mod intooperation;

pub use environment::Environment;
pub use intooperation::ValueIter;

/// The fixed set of syntactic forms that receive their operands unevaluated.
///
/// A list whose head is one of these keywords is dispatched here before any
/// environment lookup, so special forms cannot be shadowed by `define`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Quote,
    Define,
    Lambda,
    Cond,
    If,
    Delay,
    Force,
}

impl SpecialForm {
    pub const ALL: [SpecialForm; 7] = [
        SpecialForm::Quote,
        SpecialForm::Define,
        SpecialForm::Lambda,
        SpecialForm::Cond,
        SpecialForm::If,
        SpecialForm::Delay,
        SpecialForm::Force,
    ];

    pub fn from_keyword(name: &str) -> Option<Self> {
        Some(match name {
            "quote" => SpecialForm::Quote,
            "define" => SpecialForm::Define,
            "lambda" => SpecialForm::Lambda,
            "cond" => SpecialForm::Cond,
            "if" => SpecialForm::If,
            "delay" => SpecialForm::Delay,
            "force" => SpecialForm::Force,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SpecialForm::Quote => "quote",
            SpecialForm::Define => "define",
            SpecialForm::Lambda => "lambda",
            SpecialForm::Cond => "cond",
            SpecialForm::If => "if",
            SpecialForm::Delay => "delay",
            SpecialForm::Force => "force",
        }
    }

    fn eval(self, args: &[Expr], env: &Rc<Environment>, depth: usize) -> Result<Value, Error> {
        match self {
            SpecialForm::Quote => eval_quote(args),
            SpecialForm::Define => eval_define(args, env, depth),
            SpecialForm::Lambda => eval_lambda(args, env),
            SpecialForm::Cond => eval_cond(args, env, depth),
            SpecialForm::If => eval_if(args, env, depth),
            SpecialForm::Delay => eval_delay(args, env),
            SpecialForm::Force => eval_force(args, env, depth),
        }
    }
}

/// Evaluate an expression (public API)
pub fn eval(expr: &Expr, env: &Rc<Environment>) -> Result<Value, Error> {
    eval_with_depth_tracking(expr, env, 0)
}

/// Apply a procedure value to already evaluated arguments (public API)
pub fn apply(procedure: &Value, args: Vec<Value>) -> Result<Value, Error> {
    apply_with_depth_tracking(procedure, args, 0)
}

/// Evaluate an expression with depth tracking to prevent stack overflow
fn eval_with_depth_tracking(
    expr: &Expr,
    env: &Rc<Environment>,
    depth: usize,
) -> Result<Value, Error> {
    if depth >= MAX_EVAL_DEPTH {
        warn!("evaluation depth limit of {MAX_EVAL_DEPTH} reached");
        return Err(Error::EvalError(format!(
            "Evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
        )));
    }
    match expr {
        Expr::Integer(n) => Ok(Value::Integer(*n)),
        Expr::Float(x) => Ok(Value::Float(*x)),
        Expr::Symbol(name) => env.lookup(name),
        Expr::List(elements) => {
            eval_list(elements, env, depth).map_err(|err| add_context(err, expr))
        }
    }
}

const CONTEXT_MARKER: &str = "\n  Context: ";

/// Helper function to add expression context to errors.
/// Only the innermost failing expression is recorded.
fn add_context(error: Error, expr: &Expr) -> Error {
    match error {
        Error::EvalError(msg) if !msg.contains(CONTEXT_MARKER) => {
            Error::EvalError(format!("{msg}{CONTEXT_MARKER}while evaluating: {expr}"))
        }
        Error::TypeError(msg) if !msg.contains(CONTEXT_MARKER) => {
            Error::TypeError(format!("{msg}{CONTEXT_MARKER}while evaluating: {expr}"))
        }
        // Syntax, name and arity errors carry their own context
        other => other,
    }
}

/// Helper function to evaluate argument expressions left to right
fn eval_args(args: &[Expr], env: &Rc<Environment>, depth: usize) -> Result<Vec<Value>, Error> {
    args.iter()
        .map(|arg| eval_with_depth_tracking(arg, env, depth + 1))
        .collect()
}

/// Evaluate a list expression: a special form or a procedure application
fn eval_list(elements: &[Expr], env: &Rc<Environment>, depth: usize) -> Result<Value, Error> {
    match elements {
        [] => Err(Error::EvalError("Cannot evaluate empty list".to_owned())),

        [head, operands @ ..] => {
            if let Expr::Symbol(name) = head
                && let Some(form) = SpecialForm::from_keyword(name)
            {
                return form.eval(operands, env, depth);
            }

            let procedure = eval_with_depth_tracking(head, env, depth + 1)?;
            let args = eval_args(operands, env, depth)?;
            apply_with_depth_tracking(&procedure, args, depth + 1)
        }
    }
}

fn apply_with_depth_tracking(
    procedure: &Value,
    args: Vec<Value>,
    depth: usize,
) -> Result<Value, Error> {
    match procedure {
        Value::Primitive { id, func } => {
            trace!("calling primitive {id} with {} arguments", args.len());
            func(args).map_err(|err| err.for_callee(id))
        }
        Value::Closure(closure) => apply_closure(closure, args, depth),
        _ => Err(Error::TypeError(format!(
            "Cannot apply non-procedure: {procedure}"
        ))),
    }
}

/// Run a closure body in a fresh frame whose parent is the closure's
/// defining frame. The defining frame itself is never written to.
fn apply_closure(closure: &Closure, args: Vec<Value>, depth: usize) -> Result<Value, Error> {
    debug!("applying {} to {} arguments", closure.signature(), args.len());
    let frame = Environment::child_frame(&closure.env, &closure.params, args)
        .map_err(|err| err.for_callee(&closure.signature()))?;

    eval_with_depth_tracking(&closure.body, &frame, depth + 1).map_err(|err| match err {
        Error::EvalError(msg) if !msg.contains("\n  In lambda: ") => {
            Error::EvalError(format!("{msg}\n  In lambda: {}", closure.body))
        }
        Error::TypeError(msg) if !msg.contains("\n  In lambda: ") => {
            Error::TypeError(format!("{msg}\n  In lambda: {}", closure.body))
        }
        other => other,
    })
}

/// Evaluate quote special form
fn eval_quote(args: &[Expr]) -> Result<Value, Error> {
    match args {
        [expr] => Ok(Value::from(expr)),
        _ => Err(Error::malformed(format!(
            "quote expects 1 operand, got {}",
            args.len()
        ))),
    }
}

/// Evaluate define special form
fn eval_define(args: &[Expr], env: &Rc<Environment>, depth: usize) -> Result<Value, Error> {
    match args {
        [Expr::Symbol(name), expr] => {
            let value = eval_with_depth_tracking(expr, env, depth + 1)?;
            debug!("define {name}");
            env.define(name.clone(), value);
            Ok(Value::Unspecified)
        }
        [_, _] => Err(Error::malformed("define requires a symbol")),
        _ => Err(Error::malformed(format!(
            "define expects 2 operands, got {}",
            args.len()
        ))),
    }
}

/// Collect lambda parameter names, rejecting non-symbols and duplicates
fn parse_params(param_list: &[Expr]) -> Result<Vec<String>, Error> {
    let mut params = Vec::with_capacity(param_list.len());
    for param in param_list {
        match param {
            Expr::Symbol(name) => {
                if params.contains(name) {
                    return Err(Error::malformed(format!(
                        "Duplicate parameter name: {name}"
                    )));
                }
                params.push(name.clone());
            }
            _ => return Err(Error::malformed("Lambda parameters must be symbols")),
        }
    }
    Ok(params)
}

/// Evaluate lambda special form. The body is not evaluated until the closure is applied.
fn eval_lambda(args: &[Expr], env: &Rc<Environment>) -> Result<Value, Error> {
    match args {
        [Expr::List(param_list), body] => Ok(make_closure(parse_params(param_list)?, body, env)),
        [_, _] => Err(Error::malformed("Lambda parameters must be a list")),
        _ => Err(Error::malformed(format!(
            "lambda expects 2 operands, got {}",
            args.len()
        ))),
    }
}

fn make_closure(params: Vec<String>, body: &Expr, env: &Rc<Environment>) -> Value {
    Value::Closure(Rc::new(Closure {
        params,
        body: body.clone(),
        env: Rc::clone(env),
    }))
}

/// Try each (test, result) pair in order; Unspecified when no test is truthy
fn eval_clauses<'e>(
    clauses: impl IntoIterator<Item = (&'e Expr, &'e Expr)>,
    env: &Rc<Environment>,
    depth: usize,
) -> Result<Value, Error> {
    for (test, result) in clauses {
        if eval_with_depth_tracking(test, env, depth + 1)?.is_truthy() {
            return eval_with_depth_tracking(result, env, depth + 1);
        }
    }
    Ok(Value::Unspecified)
}

/// Evaluate cond special form
fn eval_cond(args: &[Expr], env: &Rc<Environment>, depth: usize) -> Result<Value, Error> {
    let mut clauses = Vec::with_capacity(args.len());
    for clause in args {
        match clause {
            Expr::List(pair) if pair.len() == 2 => clauses.push((&pair[0], &pair[1])),
            _ => {
                return Err(Error::malformed(format!(
                    "cond clause must be a (test result) pair, got {clause}"
                )));
            }
        }
    }
    eval_clauses(clauses, env, depth)
}

/// Evaluate if special form, as `cond` with the clauses `(test then)` and `(else alt)`
fn eval_if(args: &[Expr], env: &Rc<Environment>, depth: usize) -> Result<Value, Error> {
    match args {
        [test, then_expr, else_expr] => {
            let else_test = Expr::Symbol("else".to_owned());
            eval_clauses([(test, then_expr), (&else_test, else_expr)], env, depth)
        }
        _ => Err(Error::malformed(format!(
            "if expects 3 operands, got {}",
            args.len()
        ))),
    }
}

/// Evaluate delay special form: a zero-parameter closure over the operand
fn eval_delay(args: &[Expr], env: &Rc<Environment>) -> Result<Value, Error> {
    match args {
        [body] => Ok(make_closure(Vec::new(), body, env)),
        _ => Err(Error::malformed(format!(
            "delay expects 1 operand, got {}",
            args.len()
        ))),
    }
}

/// Evaluate force special form. Nothing is cached: every force re-runs the body.
fn eval_force(args: &[Expr], env: &Rc<Environment>, depth: usize) -> Result<Value, Error> {
    match args {
        [expr] => {
            let procedure = eval_with_depth_tracking(expr, env, depth + 1)?;
            if !procedure.is_procedure() {
                return Err(Error::TypeError(format!(
                    "force requires a procedure, got {procedure}"
                )));
            }
            debug!("forcing {procedure}");
            apply_with_depth_tracking(&procedure, Vec::new(), depth + 1)
        }
        _ => Err(Error::malformed(format!(
            "force expects 1 operand, got {}",
            args.len()
        ))),
    }
}

/// Create a global environment holding every builtin operation and constant
pub fn create_global_env() -> Environment {
    let env = Environment::new();

    for builtin_op in get_builtin_ops() {
        env.define(builtin_op.id, builtin_op.to_value());
    }
    debug!("global environment holds {} builtins", get_builtin_ops().len());

    env
}
