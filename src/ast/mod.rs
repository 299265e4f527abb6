//! # Abstract Syntax Tree (AST) for Common Assembly
//!
//! This module defines the intermediate representation the parser produces
//! and the code generator consumes:
//!
//! - [`nodes`]: items, statements, mutation operations, raw values,
//!   conditions, and source locations.

pub mod nodes;
