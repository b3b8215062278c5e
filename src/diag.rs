//! Errors reported to the user and the source locations they point at.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::token::{Token, TokenKind};

/// Line number (starting at one).
pub type Position = u32;

/// Where a diagnostic applies: a line and the offending lexeme, or the end of input.
#[derive(Debug, PartialEq, Clone)]
pub struct Location {
    pub line: Position,
    pub lexeme: Option<String>,
}

impl Location {
    pub fn at(token: &Token) -> Location {
        let lexeme = match token.kind {
            TokenKind::Eof => None,
            _ => Some(token.lexeme.clone()),
        };
        Location {
            line: token.line,
            lexeme,
        }
    }

    pub fn end(line: Position) -> Location {
        Location { line, lexeme: None }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lexeme {
            Some(lexeme) => write!(f, "On line {} at '{}'", self.line, lexeme),
            None => write!(f, "On line {} at end", self.line),
        }
    }
}

/// A lexical or syntactic error.
#[derive(Debug, PartialEq, Clone, Error)]
#[error("{location}: {kind}")]
pub struct ParseError {
    pub location: Location,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn at(token: &Token, kind: ParseErrorKind) -> ParseError {
        ParseError {
            location: Location::at(token),
            kind,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Error)]
pub enum ParseErrorKind {
    #[error("Unexpected character.")]
    BadChar,
    #[error("Unterminated string.")]
    UnterminatedString,
    #[error("Cannot parse number literal.")]
    BadNumberLiteral,
    #[error("Expected {0}.")]
    Expected(&'static str),
    #[error("Expected an expression.")]
    ExpectedExpression,
    #[error("Invalid assignment target.")]
    InvalidAssignmentTarget,
}

/// An error raised while executing a program.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{location}: {kind}")]
    Fault {
        location: Location,
        kind: RuntimeErrorKind,
    },

    /// The output sink rejected a write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    pub fn at(token: &Token, kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError::Fault {
            location: Location::at(token),
            kind,
        }
    }

    /// Kind of the fault, `None` for I/O failures.
    pub fn kind(&self) -> Option<&RuntimeErrorKind> {
        match self {
            RuntimeError::Fault { kind, .. } => Some(kind),
            RuntimeError::Io(_) => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Error)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    NumberOperand,
    #[error("Operands must be numbers.")]
    NumberOperands,
    #[error("Operands must be two numbers or two strings.")]
    AddOperands,
    #[error("Division by zero.")]
    DivByZero,
    #[error("Undefined variable '{0}'.")]
    UndefinedVar(String),
    #[error("Variable '{0}' does not exist.")]
    UnknownAssignTarget(String),
}
