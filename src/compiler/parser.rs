//! # Parser Module
//!
//! This module is the interface to the syntactic analysis phase of the
//! Common Assembly compiler. It turns the linear token stream produced by
//! the lexer into the list of top-level items (comments and function
//! definitions) that code generation consumes.

// Sub-modules containing the core parsing logic.
pub mod common;
pub mod statement_parser;
pub mod value_parser;

use crate::ast::nodes::{Item, Location};
use crate::compiler::error::CompileError;
use crate::compiler::lexer::Token;

/// The main entry point for the parsing phase.
///
/// # Arguments
///
/// * `tokens` - The vector of located tokens received from the lexer.
///
/// # Returns
///
/// A `Result` containing the top-level [`Item`] list or a [`CompileError`].
pub fn parse(tokens: Vec<(Token, Location)>) -> Result<Vec<Item>, CompileError> {
    use common::Parser;

    let mut parser = Parser::new(tokens);
    parser.parse_program()
}
