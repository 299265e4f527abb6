//! # Common Assembly Compiler Crate
//!
//! This crate implements `cac`, a compiler for Common Assembly: a low-level
//! imperative language whose value model is named physical registers
//! (`r0`..`r15`). Functions declare which registers they accept as
//! arguments and which they may mutate; the compiler enforces that
//! ownership discipline and emits GNU AT&T x86-64 assembly for Linux.

// --- Core Modules ---
/// The Abstract Syntax Tree node structures.
pub mod ast;
/// Semantic analysis and code generation.
pub mod codegen;
/// The front end (lexer, parser), error types, and the build driver.
pub mod compiler;
/// Environment-gated debug logging and phase timing.
pub mod debug;

// --- Public Re-exports (The Compiler API) ---
pub use codegen::ProgramGenerator;
pub use compiler::error::{CompileError, Diagnostic, Diagnostics};
pub use compiler::parse;
pub use compiler::tokenize;
pub use compiler::Compiler;

/// Compiles a source string all the way to the final assembly artifact.
///
/// This is the whole pipeline short of file and process I/O:
/// lexing -> parsing -> semantic analysis + code generation.
///
/// # Arguments
///
/// * `source` - The raw Common Assembly source code.
///
/// # Returns
///
/// The AT&T assembly text, or a [`CompileError`] carrying either a syntax
/// error or the collected diagnostics.
pub fn compile_to_assembly(source: &str) -> Result<String, CompileError> {
    let tokens = tokenize(source)?;
    debug::log_lexer(&format!("{} tokens", tokens.len()));

    let items = parse(tokens)?;
    debug::log_parser(&format!("{} top-level items", items.len()));

    let assembly = ProgramGenerator::generate(&items).map_err(CompileError::diagnostics)?;
    debug::log_codegen(&format!("{} assembly lines", assembly.lines().count()));
    Ok(assembly)
}
