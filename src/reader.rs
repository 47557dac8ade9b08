use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    sequence::preceded,
};

use crate::ast::Expr;
use crate::{Error, MAX_NESTING_DEPTH, SyntaxError, SyntaxErrorKind};

/// A token and its byte offset in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub offset: usize,
}

impl Token<'_> {
    fn is_open(&self) -> bool {
        self.text == "("
    }

    fn is_close(&self) -> bool {
        self.text == ")"
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == '(' || c == ')'
}

/// Parse a single parenthesis
fn parse_paren(input: &str) -> IResult<&str, &str> {
    alt((tag("("), tag(")"))).parse(input)
}

/// Parse an atom: everything up to the next whitespace or parenthesis
fn parse_atom(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !is_delimiter(c)).parse(input)
}

fn parse_token(input: &str) -> IResult<&str, &str> {
    preceded(
        take_while(|c: char| c.is_whitespace()),
        alt((parse_paren, parse_atom)),
    )
    .parse(input)
}

/// Split source text into tokens. Parentheses are always tokens of their own and
/// everything else is split on whitespace. There is no string or comment syntax,
/// so this never fails.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut input = source;

    // Stops once only whitespace is left
    while let Ok((remaining, text)) = parse_token(input) {
        let offset = source.len() - remaining.len() - text.len();
        tokens.push(Token { text, offset });
        input = remaining;
    }

    tokens
}

/// Verify parentheses nest properly before any tree is built.
///
/// A `)` with nothing open fails immediately and reports the two tokens before
/// it. Parentheses still open at the end fail with the position of the
/// outermost one left unclosed.
pub fn check_balance(tokens: &[Token<'_>]) -> Result<(), Error> {
    let mut open_offsets = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        if token.is_open() {
            open_offsets.push(token.offset);
        } else if token.is_close() && open_offsets.pop().is_none() {
            let context = tokens[i.saturating_sub(2)..i]
                .iter()
                .map(|t| t.text)
                .collect::<Vec<_>>()
                .join(" ");
            let mut error = SyntaxError::new(SyntaxErrorKind::UnbalancedClose, "unexpected `)`")
                .at_offset(token.offset);
            if !context.is_empty() {
                error = error.with_context(context);
            }
            return Err(error.into());
        }
    }

    match open_offsets.first() {
        None => Ok(()),
        Some(&offset) => Err(SyntaxError::new(
            SyntaxErrorKind::UnbalancedOpen,
            format!("{} unclosed `(`", open_offsets.len()),
        )
        .at_offset(offset)
        .into()),
    }
}

/// Classify an atom: integer first, then float, otherwise a symbol
fn parse_atom_expr(text: &str) -> Expr {
    if let Ok(n) = text.parse::<i64>() {
        Expr::Integer(n)
    } else if let Ok(x) = text.parse::<f64>() {
        Expr::Float(x)
    } else {
        Expr::Symbol(text.to_owned())
    }
}

/// Cursor-driven recursive descent over a token slice
struct TokenCursor<'t, 'a> {
    tokens: &'t [Token<'a>],
    position: usize,
    /// Lists currently open
    depth: usize,
}

impl<'t, 'a> TokenCursor<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        TokenCursor {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.position).copied();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        let Some(token) = self.next_token() else {
            return Err(self.unexpected_end());
        };

        if token.is_open() {
            if self.depth >= MAX_NESTING_DEPTH {
                return Err(SyntaxError::new(
                    SyntaxErrorKind::NestingTooDeep,
                    format!("lists nested deeper than {MAX_NESTING_DEPTH}"),
                )
                .at_offset(token.offset)
                .into());
            }
            self.depth += 1;
            let list = self.parse_list();
            self.depth -= 1;
            list
        } else if token.is_close() {
            Err(SyntaxError::new(SyntaxErrorKind::UnbalancedClose, "unexpected `)`")
                .at_offset(token.offset)
                .into())
        } else {
            Ok(parse_atom_expr(token.text))
        }
    }

    /// Parse list elements after the opening `(` up to and including its `)`
    fn parse_list(&mut self) -> Result<Expr, Error> {
        let mut elements = Vec::new();
        loop {
            match self.tokens.get(self.position) {
                None => return Err(self.unexpected_end()),
                Some(token) if token.is_close() => {
                    self.position += 1;
                    return Ok(Expr::List(elements));
                }
                Some(_) => elements.push(self.parse_expr()?),
            }
        }
    }

    fn unexpected_end(&self) -> Error {
        SyntaxError::new(SyntaxErrorKind::UnexpectedEnd, "unexpected end of input").into()
    }
}

/// Build expression trees from an already balanced token stream
pub fn parse_tokens(tokens: &[Token<'_>]) -> Result<Vec<Expr>, Error> {
    let mut parser = TokenCursor::new(tokens);
    let mut forms = Vec::new();
    while !parser.at_end() {
        forms.push(parser.parse_expr()?);
    }
    Ok(forms)
}

/// Parse source text into its top-level forms, in order.
pub fn parse(source: &str) -> Result<Vec<Expr>, Error> {
    let tokens = tokenize(source);
    check_balance(&tokens)?;
    parse_tokens(&tokens)
}
