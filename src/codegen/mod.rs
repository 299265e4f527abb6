//! # Code Generation Module
//!
//! This module turns the parsed AST into a complete GNU AT&T x86-64
//! assembly artifact for Linux.
//!
//! Key components include:
//! - **Registers**: the logical-index to mnemonic mapping.
//! - **Common Context**: label counters, the data section, and the
//!   compiled-function map threaded through every generator.
//! - **Register State**: the ownership discipline over registers and
//!   variables, enforced while lowering.
//! - **Generators**: specialized lowering for values, conditions,
//!   statements, and calls.
//! - **Linker and Program Driver**: two-phase function compilation and the
//!   final artifact assembly.

pub mod call_generator;
pub mod common;
pub mod condition_generator;
pub mod linker;
pub mod program_generator;
pub mod register_state;
pub mod registers;
pub mod statement_generator;
pub mod value_generator;

pub use program_generator::ProgramGenerator;
