//! Interpreter command-line.
//!
//! When called without argument it drops into an interactive read-evaluate-print loop.
//!
//! When called with arguments, it interprets the corresponding files in a single interpreter
//! session (so data sharing is possible).  Exits with 65 on a syntax error and 70 on a runtime
//! error.
//!
//! Set `RUST_LOG` (e.g. `RUST_LOG=loxwalk=debug`) to trace the interpreter.

use std::env;
use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::BufReader;
use std::process::ExitCode;

use anyhow::{self, Context};

use loxwalk::interpreter::{Interpreter, LoxError};

const EXIT_SYNTAX_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;

fn main() -> Result<ExitCode, anyhow::Error> {
    init_tracing();
    let args = env::args().skip(1).collect::<Vec<_>>();
    if !args.is_empty() {
        run_all_files(args)
    } else {
        run_prompt()?;
        Ok(ExitCode::SUCCESS)
    }
}

/// Only installs a subscriber when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_all_files(paths: Vec<String>) -> Result<ExitCode, anyhow::Error> {
    let mut interp_stdout = io::stdout();
    let mut interp_stderr = io::stderr();
    let mut interp = Interpreter::new(&mut interp_stdout, &mut interp_stderr);

    for p in &paths {
        let reader =
            BufReader::new(File::open(p).with_context(|| format!("failed to open {}", p))?);
        match interp.eval(reader) {
            Ok(()) => (),
            // Diagnostics have already been written.
            Err(LoxError::Parse(_)) => return Ok(ExitCode::from(EXIT_SYNTAX_ERROR)),
            Err(LoxError::Runtime(_)) => return Ok(ExitCode::from(EXIT_RUNTIME_ERROR)),
            Err(e @ LoxError::Io(_)) => {
                return Err(e).with_context(|| format!("failed to interpret {}", p))
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_prompt() -> Result<(), io::Error> {
    let stdin = io::stdin();
    let mut repl_stdout = io::stdout();
    let mut interp_stdout = io::stdout();
    let mut interp_stderr = io::stderr();

    let mut interp = Interpreter::new(&mut interp_stdout, &mut interp_stderr);

    let mut input = String::new();
    loop {
        repl_stdout.write_all("> ".as_bytes())?;
        repl_stdout.flush()?;

        input.clear();
        let nbytes = stdin.read_line(&mut input)?;
        if nbytes == 0 || input.trim() == "exit" {
            break;
        }

        // Errors were reported on stderr; keep the session going.
        if let Err(LoxError::Io(e)) = interp.eval(input.as_bytes()) {
            return Err(e);
        }
    }

    Ok(())
}
