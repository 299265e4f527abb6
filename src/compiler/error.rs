//! # Compiler Error Definitions
//!
//! This module centralizes the error types of the Common Assembly compiler.
//!
//! Two kinds of failure exist side by side:
//!
//! - [`Diagnostic`]: a plain value describing a problem in the user's
//!   program, carrying a message and a 1-based source location. Diagnostics
//!   are returned, never thrown; a failed statement aborts that statement
//!   while the enclosing block keeps collecting further diagnostics.
//! - [`CompileError`]: the driver-level error enum (`thiserror`), covering
//!   I/O, syntax errors from the front end, collected diagnostics, and
//!   assembler/linker/execution failures.

use crate::ast::nodes::Location;
use serde::Serialize;
use std::fmt;
use std::process::ExitStatus;
use thiserror::Error;

/// A problem found in the user's program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub location: Location,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Shorthand for operations that may report several problems at once.
pub type Diagnostics = Vec<Diagnostic>;

/// The primary error enumeration for the Common Assembly compiler.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Wrapper for standard I/O errors (file reading/writing).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The compiler was not given a `.ca` source file.
    #[error("no .ca source file found at {path}")]
    NoSourceFile { path: String },

    /// A lexical or syntactic error from the front end.
    #[error("syntax error at {location}: {message}")]
    SyntaxError {
        location: Location,
        message: String,
    },

    /// Problems found while lowering the program, in source order.
    #[error("{}", format_diagnostics(.0))]
    Diagnostics(Diagnostics),

    /// The generated assembly targets x86-64 Linux; other hosts can only
    /// emit assembly, not assemble it.
    #[error("cannot assemble on {host}: output is x86-64 Linux assembly")]
    UnsupportedHost { host: String },

    /// The executable file is missing after the compilation stage.
    #[error("binary not found after compilation")]
    BinaryNotFound,

    /// Spawning the assembler, linker, or compiled program failed.
    #[error("execution error: {0}")]
    ExecutionError(#[source] std::io::Error),

    /// The assembler, linker, or compiled program exited with failure.
    #[error("execution failed with status: {0}")]
    ExecutionFailed(ExitStatus),

    /// One or more test files failed to compile.
    #[error("one or more tests failed")]
    TestFailed,
}

impl CompileError {
    /// Constructs a `SyntaxError` for the **lexer** phase.
    pub fn lexer(location: Location, message: impl Into<String>) -> Self {
        Self::SyntaxError {
            location,
            message: message.into(),
        }
    }

    /// Constructs a `SyntaxError` for the **parser** phase.
    pub fn parser(location: Location, message: impl Into<String>) -> Self {
        Self::SyntaxError {
            location,
            message: message.into(),
        }
    }

    /// Wraps the diagnostics collected while lowering a program.
    pub fn diagnostics(diagnostics: Diagnostics) -> Self {
        Self::Diagnostics(diagnostics)
    }
}

fn format_diagnostics(diagnostics: &Diagnostics) -> String {
    let lines: Vec<String> = diagnostics.iter().map(Diagnostic::to_string).collect();
    lines.join("\n")
}
