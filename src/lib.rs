//! A tree-walking interpreter for a small Lox-family scripting language.
//!
//! See [Crafting Interpreters](https://craftinginterpreters.com/).
//!
//! Source text goes through [`scanner::scan`], then [`parser::parse`], and the resulting
//! statements are run by [`eval::Evaluator`].  [`interpreter::Interpreter`] wires the three
//! together and routes output and diagnostics to separate sinks.
//!
//! # Examples
//!
//! See [`crate::interpreter::Interpreter`].
//!
//! # Limitations
//!
//! - No functions, closures or classes.  `fun`, `class` and `return` are reserved words only.
//! - A prefix operator applies to a primary expression, so `!!x` and `--x` do not parse.

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod ast;
pub mod diag;
pub mod eval;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod value;

mod env;
