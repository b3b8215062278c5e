//! API to control the interpreter.

use std::io;
use std::io::prelude::*;

use thiserror::Error;
use tracing::debug;

use crate::diag::{ParseError, RuntimeError};
use crate::eval::Evaluator;
use crate::parser::parse;
use crate::scanner::scan;

/// Tree-walk interpreter session.
///
/// Program output goes to one sink, diagnostics to another.  Globals persist from one call to
/// [`Interpreter::eval`] to the next.
///
/// # Example
///
/// Invoke the interpreter a first time to declare a variable then additional times to use it:
///
/// ```
/// # use loxwalk::interpreter::{Interpreter, LoxError};
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut diagnostics: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output, &mut diagnostics);
///
/// let decl = r#"
///     var total = 0;
///     for (var i = 1; i <= 4; i = i + 1) {
///         total = total + i;
///     }
/// "#;
/// interp.eval(decl.as_bytes())?;
///
/// interp.eval("print total;".as_bytes()).expect("interpreter error");
/// interp.eval("print total > 5 ? \"big\" : \"small\";".as_bytes()).expect("interpreter error");
///
/// assert_eq!(output, b"10\nbig\n");
/// assert!(diagnostics.is_empty());
/// # Ok::<(), LoxError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write, D: Write> {
    evaluator: Evaluator<'t, W>,
    diagnostics: &'t mut D,
}

/// Errors the interpreter can raise.
///
/// By the time one is returned its details have already been written to the diagnostics sink.
#[derive(Debug, Error)]
pub enum LoxError {
    /// Errors found during lexical or syntactic analysis.  The statements that did parse were
    /// still executed.
    #[error("{} syntax error(s)", .0.len())]
    Parse(Vec<ParseError>),

    /// Error that stopped execution.
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Failure reading the input or writing diagnostics.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl<'t, W: Write, D: Write> Interpreter<'t, W, D> {
    pub fn new(output: &'t mut W, diagnostics: &'t mut D) -> Interpreter<'t, W, D> {
        Interpreter {
            evaluator: Evaluator::new(output),
            diagnostics,
        }
    }

    pub fn eval<R: BufRead>(&mut self, mut input: R) -> Result<(), LoxError> {
        let mut source = String::new();
        input.read_to_string(&mut source)?;
        self.run(&source)
    }

    /// Scan, parse and execute `source`.
    ///
    /// Every syntax error is reported; the statements that parsed are executed anyway.
    /// Execution stops at the first runtime error.
    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        let scanned = scan(source);
        let parsed = parse(scanned.tokens);

        let mut errors = scanned.errors;
        errors.extend(parsed.errors);
        errors.sort_by_key(|e| e.location.line);
        for e in &errors {
            writeln!(self.diagnostics, "{}", e)?;
        }
        debug!(
            statements = parsed.program.len(),
            errors = errors.len(),
            "parsed"
        );

        match self.evaluator.interpret(&parsed.program) {
            Ok(()) => (),
            Err(RuntimeError::Io(e)) => return Err(LoxError::Io(e)),
            Err(e) => {
                writeln!(self.diagnostics, "{}", e)?;
                return Err(LoxError::Runtime(e));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LoxError::Parse(errors))
        }
    }
}
