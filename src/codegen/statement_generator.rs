//! # Statement and Block Lowering
//!
//! This module drives the lowering of function bodies: straight-line
//! mutations, `while` and `if`/`else` scaffolding, `break`/`continue`,
//! `drop`, and `return`. A failed statement aborts only itself; the block
//! keeps lowering the remaining statements and returns every diagnostic it
//! collected.

use crate::ast::nodes::*;
use crate::codegen::call_generator::CallGenerator;
use crate::codegen::common::{CodeGenCommon, FunctionMap};
use crate::codegen::condition_generator::ConditionGenerator;
use crate::codegen::register_state::RegisterState;
use crate::codegen::registers;
use crate::codegen::value_generator::ValueGenerator;
use crate::compiler::error::{Diagnostic, Diagnostics};

/// A static utility struct for lowering statements and blocks.
pub struct StatementGenerator;

impl StatementGenerator {
    /// Lowers a list of statements, threading the register state through.
    ///
    /// `break_snippet` and `continue_snippet` are the assembly a `break` or
    /// `continue` expands to; they are empty outside of a loop, which makes
    /// both statements an error there.
    pub fn generate_block(
        common: &mut CodeGenCommon,
        functions: &FunctionMap,
        state: &mut RegisterState,
        statements: &[Statement],
        break_snippet: &str,
        continue_snippet: &str,
    ) -> Result<String, Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let mut assembly = String::new();

        for (index, statement) in statements.iter().enumerate() {
            if let Statement::Return { location, .. } = statement {
                if index + 1 != statements.len() {
                    diagnostics.push(Diagnostic::new(
                        "return must be the last statement in its block",
                        *location,
                    ));
                }
            }
            match Self::generate_statement(
                common,
                functions,
                state,
                statement,
                break_snippet,
                continue_snippet,
            ) {
                Ok(statement_assembly) => assembly.push_str(&statement_assembly),
                Err(mut statement_diagnostics) => {
                    diagnostics.append(&mut statement_diagnostics)
                }
            }
        }

        if diagnostics.is_empty() {
            Ok(assembly)
        } else {
            Err(diagnostics)
        }
    }

    /// Lowers a single statement.
    fn generate_statement(
        common: &mut CodeGenCommon,
        functions: &FunctionMap,
        state: &mut RegisterState,
        statement: &Statement,
        break_snippet: &str,
        continue_snippet: &str,
    ) -> Result<String, Diagnostics> {
        match statement {
            Statement::Comment(_) => Ok(String::new()),
            Statement::Return { values, location } => {
                Self::generate_return(common, state, values, *location)
            }
            Statement::Mutation {
                destinations,
                operation,
                location,
            } => Self::generate_mutation(common, functions, state, destinations, operation, *location),
            Statement::While {
                condition,
                body,
                location: _,
            } => Self::generate_while(common, functions, state, condition, body),
            Statement::If {
                condition,
                then_body,
                else_body,
                location: _,
            } => Self::generate_if(
                common,
                functions,
                state,
                condition,
                then_body,
                else_body.as_deref(),
                break_snippet,
                continue_snippet,
            ),
            Statement::Break { location } => {
                if break_snippet.is_empty() {
                    return Err(vec![Diagnostic::new(
                        "break is not valid in this scope",
                        *location,
                    )]);
                }
                Ok(break_snippet.to_owned())
            }
            Statement::Continue { location } => {
                if continue_snippet.is_empty() {
                    return Err(vec![Diagnostic::new(
                        "continue is not valid in this scope",
                        *location,
                    )]);
                }
                Ok(continue_snippet.to_owned())
            }
            Statement::Drop { name, location } => {
                state
                    .resolve(name, true, *location)
                    .map_err(|diagnostic| vec![diagnostic])?;
                Ok(String::new())
            }
        }
    }

    /// Lowers `return`: the value loads are compiled like call arguments
    /// (with the implicit-mutation check off, since return registers are
    /// usually named), the register set must equal the function's declared
    /// return registers, and the `\` sentinel ends the body.
    fn generate_return(
        common: &mut CodeGenCommon,
        state: &mut RegisterState,
        values: &[CallArgument],
        location: Location,
    ) -> Result<String, Diagnostics> {
        let (assembly, used) =
            CallGenerator::generate_argument_moves(common, state, values, false)?;

        let mut expected = state.return_registers().to_vec();
        let mut provided = used;
        expected.sort_unstable();
        provided.sort_unstable();
        if provided != expected {
            return Err(vec![Diagnostic::new(
                format!(
                    "the function returns values in [{}] but this return sets [{}]",
                    format_registers(&expected),
                    format_registers(&provided)
                ),
                location,
            )]);
        }

        Ok(assembly + "\n\\")
    }

    /// Lowers a mutation: calls are delegated, the in-place operations are
    /// emitted directly.
    fn generate_mutation(
        common: &mut CodeGenCommon,
        functions: &FunctionMap,
        state: &mut RegisterState,
        destinations: &[Destination],
        operation: &MutationOperation,
        location: Location,
    ) -> Result<String, Diagnostics> {
        if let MutationOperation::Call { callee, arguments } = operation {
            return CallGenerator::generate_call(
                common,
                functions,
                state,
                destinations,
                callee,
                arguments,
                location,
            );
        }

        // The in-place operations work on exactly one destination, and a
        // destination must involve a variable: mutating a register that no
        // name can observe would be dead code.
        if destinations.len() != 1 {
            return Err(vec![Diagnostic::new(
                "this operation takes exactly one destination",
                location,
            )]);
        }
        let destination = &destinations[0];
        if destination.name.is_none() {
            return Err(vec![Diagnostic::new(
                "assigning to a register without reserving it is pointless",
                destination.location,
            )]);
        }
        let register = state
            .validate_destination(destination)
            .map_err(|diagnostic| vec![diagnostic])?;
        let target = ValueGenerator::wrap_dereference(
            &format!("%{}", registers::mnemonic(register)),
            destination.dereference_depth,
        );

        let (mnemonic, value) = match operation {
            MutationOperation::Increment => return Ok(format!("\ninc {}", target)),
            MutationOperation::Decrement => return Ok(format!("\ndec {}", target)),
            MutationOperation::Set(value) => ("mov", value),
            MutationOperation::Add(value) => ("add", value),
            MutationOperation::Sub(value) => ("sub", value),
            MutationOperation::Mul(value) => ("mul", value),
            MutationOperation::Div(value) => ("div", value),
            MutationOperation::Call { .. } => unreachable!("calls are handled above"),
        };
        let source = ValueGenerator::generate_operand(common, state, value)
            .map_err(|diagnostic| vec![diagnostic])?;
        Ok(format!("\n{} {}, {}", mnemonic, source, target))
    }

    /// Lowers a `while` loop:
    ///
    /// ```text
    /// jmp cond      body:  …body…      cond:  …condition, true -> body…
    /// end:
    /// ```
    ///
    /// The body runs in an inner scope; `break` and `continue` expand to
    /// jumps to the end and condition labels.
    fn generate_while(
        common: &mut CodeGenCommon,
        functions: &FunctionMap,
        state: &mut RegisterState,
        condition: &Condition,
        body: &[Statement],
    ) -> Result<String, Diagnostics> {
        let body_label = common.next_jump_label();
        let condition_label = common.next_jump_label();
        let end_label = common.next_jump_label();

        let mut diagnostics = Diagnostics::new();

        let mut inner = state.inner_scope();
        let break_snippet = format!("\njmp {}", end_label);
        let continue_snippet = format!("\njmp {}", condition_label);
        let body_assembly = match Self::generate_block(
            common,
            functions,
            &mut inner,
            body,
            &break_snippet,
            &continue_snippet,
        ) {
            Ok(assembly) => assembly,
            Err(mut body_diagnostics) => {
                diagnostics.append(&mut body_diagnostics);
                String::new()
            }
        };

        let condition_assembly = match ConditionGenerator::generate_condition(
            common,
            state,
            condition,
            &body_label,
            "",
        ) {
            Ok(assembly) => assembly,
            Err(mut condition_diagnostics) => {
                diagnostics.append(&mut condition_diagnostics);
                String::new()
            }
        };

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }
        Ok(format!(
            "\njmp {}\n{}:{}\n{}:{}\n{}:",
            condition_label, body_label, body_assembly, condition_label, condition_assembly, end_label
        ))
    }

    /// Lowers `if`/`else`: the condition falls through into the then body
    /// and jumps to the else label otherwise. Each branch body runs in its
    /// own inner scope, so one branch never sees the other's drops.
    #[allow(clippy::too_many_arguments)]
    fn generate_if(
        common: &mut CodeGenCommon,
        functions: &FunctionMap,
        state: &mut RegisterState,
        condition: &Condition,
        then_body: &[Statement],
        else_body: Option<&[Statement]>,
        break_snippet: &str,
        continue_snippet: &str,
    ) -> Result<String, Diagnostics> {
        let else_label = common.next_jump_label();

        let mut diagnostics = Diagnostics::new();

        let condition_assembly = match ConditionGenerator::generate_condition(
            common,
            state,
            condition,
            "",
            &else_label,
        ) {
            Ok(assembly) => assembly,
            Err(mut condition_diagnostics) => {
                diagnostics.append(&mut condition_diagnostics);
                String::new()
            }
        };

        let mut then_scope = state.inner_scope();
        let then_assembly = match Self::generate_block(
            common,
            functions,
            &mut then_scope,
            then_body,
            break_snippet,
            continue_snippet,
        ) {
            Ok(assembly) => assembly,
            Err(mut then_diagnostics) => {
                diagnostics.append(&mut then_diagnostics);
                String::new()
            }
        };

        let assembly = match else_body {
            Some(else_statements) => {
                let end_label = common.next_jump_label();
                let mut else_scope = state.inner_scope();
                let else_assembly = match Self::generate_block(
                    common,
                    functions,
                    &mut else_scope,
                    else_statements,
                    break_snippet,
                    continue_snippet,
                ) {
                    Ok(assembly) => assembly,
                    Err(mut else_diagnostics) => {
                        diagnostics.append(&mut else_diagnostics);
                        String::new()
                    }
                };
                format!(
                    "{}{}\njmp {}\n{}:{}\n{}:",
                    condition_assembly, then_assembly, end_label, else_label, else_assembly, end_label
                )
            }
            None => format!("{}{}\n{}:", condition_assembly, then_assembly, else_label),
        };

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }
        Ok(assembly)
    }
}

fn format_registers(registers_list: &[usize]) -> String {
    let names: Vec<String> = registers_list
        .iter()
        .map(|&register| registers::logical_name(register))
        .collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn here() -> Location {
        Location::new(1, 1)
    }

    fn state_with_counter() -> RegisterState {
        RegisterState::from_declarations(
            &[RegisterBinding {
                register: 1,
                name: Some("counter".into()),
                location: here(),
            }],
            &[],
        )
        .unwrap()
    }

    fn lower(state: &mut RegisterState, statements: &[Statement]) -> Result<String, Diagnostics> {
        let mut common = CodeGenCommon::new();
        StatementGenerator::generate_block(
            &mut common,
            &FunctionMap::new(),
            state,
            statements,
            "",
            "",
        )
    }

    fn set_counter(value: i64) -> Statement {
        Statement::Mutation {
            destinations: vec![Destination {
                register: None,
                name: Some("counter".into()),
                dereference_depth: 0,
                location: here(),
            }],
            operation: MutationOperation::Set(RawValue::Signed(value, here())),
            location: here(),
        }
    }

    #[test]
    fn in_place_operations_emit_their_mnemonics() {
        let mut state = state_with_counter();
        let operations = vec![
            Statement::Mutation {
                destinations: vec![Destination {
                    register: None,
                    name: Some("counter".into()),
                    dereference_depth: 0,
                    location: here(),
                }],
                operation: MutationOperation::Increment,
                location: here(),
            },
            set_counter(4),
        ];
        assert_eq!(
            lower(&mut state, &operations).unwrap(),
            "\ninc %rbx\nmov $4, %rbx"
        );
    }

    #[test]
    fn dereferenced_destinations_are_wrapped() {
        let mut state = state_with_counter();
        let statement = Statement::Mutation {
            destinations: vec![Destination {
                register: None,
                name: Some("counter".into()),
                dereference_depth: 1,
                location: here(),
            }],
            operation: MutationOperation::Add(RawValue::Signed(8, here())),
            location: here(),
        };
        assert_eq!(
            lower(&mut state, &[statement]).unwrap(),
            "\nadd $8, (%rbx)"
        );
    }

    #[test]
    fn register_destinations_need_a_name() {
        let mut state = state_with_counter();
        let statement = Statement::Mutation {
            destinations: vec![Destination {
                register: Some(1),
                name: None,
                dereference_depth: 0,
                location: here(),
            }],
            operation: MutationOperation::Set(RawValue::Signed(1, here())),
            location: here(),
        };
        let errors = lower(&mut state, &[statement]).unwrap_err();
        assert_eq!(
            errors[0].message,
            "assigning to a register without reserving it is pointless"
        );
    }

    #[test]
    fn while_loops_emit_the_three_label_scaffold() {
        let mut state = state_with_counter();
        let statement = Statement::While {
            condition: Condition::Literal(true, here()),
            body: vec![Statement::Break { location: here() }],
            location: here(),
        };
        // jumpLabel0/1/2 are the body, condition and end labels; the body
        // is a single break, and a true condition jumps straight back in.
        assert_eq!(
            lower(&mut state, &[statement]).unwrap(),
            "\njmp jumpLabel1\
             \njumpLabel0:\njmp jumpLabel2\
             \njumpLabel1:\njmp jumpLabel0\
             \njumpLabel2:"
        );
    }

    #[test]
    fn if_without_else_falls_through_to_the_label() {
        let mut state = state_with_counter();
        let statement = Statement::If {
            condition: Condition::Literal(false, here()),
            then_body: vec![set_counter(1)],
            else_body: None,
            location: here(),
        };
        assert_eq!(
            lower(&mut state, &[statement]).unwrap(),
            "\njmp jumpLabel0\nmov $1, %rbx\njumpLabel0:"
        );
    }

    #[test]
    fn if_with_else_jumps_over_the_else_body() {
        let mut state = state_with_counter();
        let statement = Statement::If {
            condition: Condition::Literal(false, here()),
            then_body: vec![set_counter(1)],
            else_body: Some(vec![set_counter(2)]),
            location: here(),
        };
        assert_eq!(
            lower(&mut state, &[statement]).unwrap(),
            "\njmp jumpLabel0\
             \nmov $1, %rbx\
             \njmp jumpLabel1\
             \njumpLabel0:\nmov $2, %rbx\
             \njumpLabel1:"
        );
    }

    #[test]
    fn break_and_continue_outside_a_loop_are_errors() {
        let mut state = state_with_counter();
        let errors = lower(
            &mut state,
            &[
                Statement::Break { location: here() },
                Statement::Continue { location: here() },
            ],
        )
        .unwrap_err();
        assert_eq!(errors[0].message, "break is not valid in this scope");
        assert_eq!(errors[1].message, "continue is not valid in this scope");
    }

    #[test]
    fn return_must_come_last() {
        let mut state = RegisterState::default();
        let errors = lower(
            &mut state,
            &[
                Statement::Return {
                    values: vec![],
                    location: Location::new(3, 1),
                },
                set_counter(1),
            ],
        )
        .unwrap_err();
        assert_eq!(
            errors[0].message,
            "return must be the last statement in its block"
        );
    }

    #[test]
    fn return_checks_the_register_set() {
        let mut state = state_with_counter();
        let errors = lower(
            &mut state,
            &[Statement::Return {
                values: vec![],
                location: here(),
            }],
        )
        .unwrap_err();
        assert_eq!(
            errors[0].message,
            "the function returns values in [r1] but this return sets []"
        );
    }

    #[test]
    fn return_moves_values_and_ends_with_the_sentinel() {
        let mut state = state_with_counter();
        let assembly = lower(
            &mut state,
            &[Statement::Return {
                values: vec![CallArgument {
                    register: Some(1),
                    value: RawValue::Signed(7, here()),
                    location: here(),
                }],
                location: here(),
            }],
        )
        .unwrap();
        assert_eq!(assembly, "\nmov $7, %rbx\n\\");
    }

    #[test]
    fn drop_emits_nothing_and_frees_the_variable() {
        let mut state = state_with_counter();
        let assembly = lower(
            &mut state,
            &[Statement::Drop {
                name: "counter".into(),
                location: here(),
            }],
        )
        .unwrap();
        assert_eq!(assembly, "");
        assert!(state.lookup("counter").is_none());
    }

    #[test]
    fn a_failed_statement_does_not_stop_the_block() {
        let mut state = state_with_counter();
        let errors = lower(
            &mut state,
            &[
                Statement::Drop {
                    name: "missing".into(),
                    location: here(),
                },
                Statement::Break { location: here() },
            ],
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
