//! Lispy - a minimal Lisp interpreter
//!
//! This crate reads a small Lisp dialect from text and evaluates it against a
//! chain of lexical environments. The language has integers, floats, symbols
//! and lists, a handful of special forms, user-defined closures and a library
//! of primitive procedures.
//!
//! ```scheme
//! (define sq (lambda (x) (* x x)))
//! (sq 5)                          ; 25
//! (cons 1 (list 2 3))             ; (1 2 3)
//! (if (= 1 1) 10 20)              ; 10
//! (force (delay (+ 1 2)))         ; 3
//! ```
//!
//! ## Pipeline
//!
//! Source text goes through [`reader::tokenize`], [`reader::check_balance`]
//! and the parser, producing one [`ast::Expr`] per top-level form. Each form
//! is evaluated by [`evaluator::eval`] in an [`evaluator::Environment`]
//! seeded from [`builtinops`], and results are rendered by [`printer`].
//! [`interpreter::Interpreter`] ties these together for a session.
//!
//! ## Semantics worth knowing
//!
//! - `cond` and `if` use truthiness: `#f`, `0`, `0.0`, `()` and the
//!   unspecified value are false, everything else is true
//! - Integer arithmetic is checked; `/` on two integers floors
//! - `cons` onto a non-list builds a two-element list rather than a pair
//! - `force` re-runs the delayed body every time
//!
//! ## Modules
//!
//! - `reader`: tokenizer, balance checker and parser
//! - `ast`: parsed expression trees
//! - `value`: runtime values
//! - `evaluator`: special forms, application and environments
//! - `builtinops`: primitive procedure registry
//! - `printer`: textual rendering
//! - `interpreter`: form-by-form evaluation of whole sources

use thiserror::Error;

use crate::builtinops::Arity;

/// Maximum evaluation depth to prevent native stack overflow in recursive evaluation.
/// Every nested expression and every procedure call counts one level.
pub const MAX_EVAL_DEPTH: usize = 512;

/// Maximum parenthesis nesting accepted by the parser. Parsed trees are walked
/// recursively when quoted, printed and dropped, so their depth is bounded too.
pub const MAX_NESTING_DEPTH: usize = 1024;

/// Prompt shown by the interactive loop
pub const PROMPT: &str = "lisp> ";

/// Categorizes the different kinds of syntax errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SyntaxErrorKind {
    /// A `)` appeared with no open `(` to close
    UnbalancedClose,
    /// Input ended with one or more `(` still open
    UnbalancedOpen,
    /// The token stream ran out in the middle of a form
    UnexpectedEnd,
    /// A special form was used with the wrong shape
    MalformedForm,
    /// Parentheses nest deeper than [`MAX_NESTING_DEPTH`]
    NestingTooDeep,
}

/// A structured error describing malformed source or a malformed special form.
#[derive(Debug, PartialEq, Clone)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    /// Nearby source text, when the error can be located
    pub context: Option<String>,
    /// Byte offset into the source of the offending token
    pub offset: Option<usize>,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, message: impl Into<String>) -> Self {
        SyntaxError {
            kind,
            message: message.into(),
            context: None,
            offset: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(context) = &self.context {
            write!(f, " near `{context}`")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " (at offset {offset})")?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxError {}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("SyntaxError: {0}")]
    SyntaxError(#[from] SyntaxError),
    #[error("NameError: {0} not found")]
    NameError(String),
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("ArityError: {}expected {expected} arguments, got {got}", describe_callee(.callee))]
    ArityError {
        expected: Arity,
        got: usize,
        callee: Option<String>,
    },
    #[error("EvaluationError: {0}")]
    EvalError(String),
}

fn describe_callee(callee: &Option<String>) -> String {
    match callee {
        Some(name) => format!("{name}: "),
        None => String::new(),
    }
}

impl Error {
    /// Create an ArityError without callee context
    pub fn arity_error(expected: Arity, got: usize) -> Self {
        Error::ArityError {
            expected,
            got,
            callee: None,
        }
    }

    /// Attach the name of the called procedure to an ArityError; other errors pass through
    pub fn for_callee(self, name: &str) -> Self {
        match self {
            Error::ArityError {
                expected,
                got,
                callee: None,
            } => Error::ArityError {
                expected,
                got,
                callee: Some(name.to_owned()),
            },
            other => other,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::SyntaxError(SyntaxError::new(SyntaxErrorKind::MalformedForm, message))
    }

    /// The syntax error kind, if this is a syntax error
    pub fn syntax_kind(&self) -> Option<SyntaxErrorKind> {
        match self {
            Error::SyntaxError(e) => Some(e.kind),
            _ => None,
        }
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod interpreter;
pub mod printer;
pub mod reader;
pub mod value;
