//! # Function Call Lowering
//!
//! This module compiles calls to user-defined functions and to the six
//! built-in syscall wrappers. It emits the argument loads, validates the
//! argument and destination register lists against the callee's declared
//! signature, and emits either the `/callee/` marker the function linker
//! rewrites later (user-defined) or the fixed `mov`+`syscall` sequence
//! (built-in).

use crate::ast::nodes::{CallArgument, Destination, Location, RawValue};
use crate::codegen::common::{CodeGenCommon, FunctionMap};
use crate::codegen::linker::FunctionLinker;
use crate::codegen::register_state::RegisterState;
use crate::codegen::registers;
use crate::codegen::value_generator::ValueGenerator;
use crate::compiler::error::{Diagnostic, Diagnostics};

/// A built-in syscall wrapper. All built-ins leave their result in `r0`.
pub struct BuiltinFunction {
    pub name: &'static str,
    pub syscall_number: u32,
    pub argument_registers: &'static [usize],
    /// The conventional name of the value left in `r0`.
    pub result_name: &'static str,
}

/// The fixed, non-overridable built-in callees (Linux x86-64 syscalls).
pub const BUILTIN_FUNCTIONS: [BuiltinFunction; 6] = [
    BuiltinFunction {
        name: "sysRead",
        syscall_number: 0,
        argument_registers: &[5, 4, 3],
        result_name: "exitCode",
    },
    BuiltinFunction {
        name: "sysWrite",
        syscall_number: 1,
        argument_registers: &[5, 4, 3],
        result_name: "exitCode",
    },
    BuiltinFunction {
        name: "sysOpen",
        syscall_number: 2,
        argument_registers: &[5, 4, 3],
        result_name: "fileDescriptor",
    },
    BuiltinFunction {
        name: "sysClose",
        syscall_number: 3,
        argument_registers: &[5],
        result_name: "exitCode",
    },
    BuiltinFunction {
        name: "sysBrk",
        syscall_number: 12,
        argument_registers: &[5],
        result_name: "exitCode",
    },
    BuiltinFunction {
        name: "sysExit",
        syscall_number: 60,
        argument_registers: &[5],
        result_name: "exitCode",
    },
];

pub fn builtin_function(name: &str) -> Option<&'static BuiltinFunction> {
    BUILTIN_FUNCTIONS.iter().find(|builtin| builtin.name == name)
}

/// A static utility struct for lowering calls.
pub struct CallGenerator;

impl CallGenerator {
    /// Compiles one call: argument loads first, then the dispatch code.
    ///
    /// For a user-defined callee this compiles the callee's body (a no-op
    /// if it already happened), counts the reference, and emits the
    /// `/callee/` marker in place of the eventual `jmp`/`call`.
    pub fn generate_call(
        common: &mut CodeGenCommon,
        functions: &FunctionMap,
        state: &mut RegisterState,
        destinations: &[Destination],
        callee: &str,
        arguments: &[CallArgument],
        location: Location,
    ) -> Result<String, Diagnostics> {
        // Expected signature: argument registers, and mutated registers
        // with the name each declaration carries, if any.
        let dispatch: String;
        let expected_arguments: Vec<usize>;
        let expected_destinations: Vec<(usize, Option<&str>)>;
        if let Some(definition) = functions.get(callee) {
            FunctionLinker::compile_function(common, functions, callee)?;
            let record = common
                .functions
                .get_mut(callee)
                .expect("compile_function inserts a record");
            record.reference_count += 1;
            dispatch = format!("\n/{}/", callee);
            expected_arguments = definition
                .arguments
                .iter()
                .map(|binding| binding.register)
                .collect();
            expected_destinations = definition
                .mutated_registers
                .iter()
                .map(|binding| (binding.register, binding.name.as_deref()))
                .collect();
        } else if let Some(builtin) = builtin_function(callee) {
            dispatch = format!("\nmov ${}, %rax\nsyscall", builtin.syscall_number);
            expected_arguments = builtin.argument_registers.to_vec();
            expected_destinations = vec![(0, Some(builtin.result_name))];
        } else {
            return Err(vec![Diagnostic::new(
                format!("call to undefined function `{}`", callee),
                location,
            )]);
        }

        let mut diagnostics = Diagnostics::new();

        let mut argument_assembly = String::new();
        match Self::generate_argument_moves(common, state, arguments, true) {
            Ok((assembly, argument_registers)) => {
                argument_assembly = assembly;
                if argument_registers != expected_arguments {
                    diagnostics.push(Diagnostic::new(
                        format!(
                            "`{}` takes arguments in [{}] but was given [{}]",
                            callee,
                            format_registers(&expected_arguments),
                            format_registers(&argument_registers)
                        ),
                        location,
                    ));
                }
            }
            Err(mut argument_diagnostics) => diagnostics.append(&mut argument_diagnostics),
        }

        let mut destination_registers = Vec::new();
        for destination in destinations {
            if destination.dereference_depth > 0 {
                diagnostics.push(Diagnostic::new(
                    "cannot dereference the destination of a call",
                    destination.location,
                ));
                continue;
            }
            match state.validate_destination(destination) {
                Ok(register) => destination_registers.push(register),
                Err(diagnostic) => diagnostics.push(diagnostic),
            }
        }

        let expected_registers: Vec<usize> = expected_destinations
            .iter()
            .map(|(register, _)| *register)
            .collect();
        if destination_registers.len() == destinations.len()
            && destination_registers != expected_registers
        {
            diagnostics.push(Diagnostic::new(
                format!(
                    "`{}` mutates [{}] but the destinations are [{}]",
                    callee,
                    format_registers(&expected_registers),
                    format_registers(&destination_registers)
                ),
                location,
            ));
        } else if destination_registers == expected_registers {
            // A destination may only name the result when the callee names
            // the value it leaves in that register.
            for (destination, (register, result_name)) in
                destinations.iter().zip(&expected_destinations)
            {
                if destination.register.is_some()
                    && destination.name.is_some()
                    && result_name.is_none()
                {
                    diagnostics.push(Diagnostic::new(
                        format!(
                            "cannot bind `{}`, `{}` does not name the value it leaves in {}",
                            destination.name.as_deref().unwrap_or_default(),
                            callee,
                            registers::logical_name(*register)
                        ),
                        destination.location,
                    ));
                }
            }
        }

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }
        Ok(argument_assembly + &dispatch)
    }

    /// Emits the `mov`s that place argument values in their registers and
    /// returns the register each argument ends up in.
    ///
    /// An argument with an explicit register must not clobber a variable
    /// silently; that check is suppressed when compiling a `return`, whose
    /// whole point is loading the named return registers.
    pub fn generate_argument_moves(
        common: &mut CodeGenCommon,
        state: &mut RegisterState,
        arguments: &[CallArgument],
        check_implicit_mutation: bool,
    ) -> Result<(String, Vec<usize>), Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let mut assembly = String::new();
        let mut used: Vec<(usize, Location)> = Vec::new();

        for argument in arguments {
            match argument.register {
                Some(register) => {
                    if !state.is_mutable(register) {
                        diagnostics.push(Diagnostic::new(
                            format!(
                                "cannot mutate {} unless the function declares it mutable",
                                registers::logical_name(register)
                            ),
                            argument.location,
                        ));
                        continue;
                    }
                    if check_implicit_mutation {
                        if let Some(variable) = state.bound_name(register) {
                            diagnostics.push(Diagnostic::new(
                                format!(
                                    "only possible to mutate {} through the variable `{}`",
                                    registers::logical_name(register),
                                    variable
                                ),
                                argument.location,
                            ));
                            continue;
                        }
                    }
                    match ValueGenerator::generate_operand(common, state, &argument.value) {
                        Ok(operand) => {
                            assembly.push_str(&format!(
                                "\nmov {}, %{}",
                                operand,
                                registers::mnemonic(register)
                            ));
                            used.push((register, argument.location));
                        }
                        Err(diagnostic) => diagnostics.push(diagnostic),
                    }
                }
                None => match &argument.value {
                    RawValue::Variable {
                        name,
                        drop_after_read,
                        location,
                        ..
                    } => match state.resolve(name, *drop_after_read, *location) {
                        Ok(register) => used.push((register, argument.location)),
                        Err(diagnostic) => diagnostics.push(diagnostic),
                    },
                    other => diagnostics.push(Diagnostic::new(
                        "an argument without a register must be a variable",
                        other.location(),
                    )),
                },
            }
        }

        // Each register may carry only one argument.
        for (index, (register, location)) in used.iter().enumerate() {
            if used[..index].iter().any(|(earlier, _)| earlier == register) {
                diagnostics.push(Diagnostic::new(
                    format!(
                        "{} is used by two arguments",
                        registers::logical_name(*register)
                    ),
                    *location,
                ));
            }
        }

        if diagnostics.is_empty() {
            Ok((assembly, used.into_iter().map(|(register, _)| register).collect()))
        } else {
            Err(diagnostics)
        }
    }
}

fn format_registers(registers_list: &[usize]) -> String {
    let names: Vec<String> = registers_list
        .iter()
        .map(|&register| registers::logical_name(register))
        .collect();
    names.join(", ")
}
