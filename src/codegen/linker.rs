//! # Function Linker
//!
//! Compilation of a function happens in two phases. **Phase A** compiles
//! the body into intermediate assembly that carries two sentinels: `\` for
//! "return here" and `/name/` for "call `name` here". **Phase B** rewrites
//! the sentinels into final assembly, choosing a call-site strategy per
//! callee:
//!
//! - a callee referenced exactly once is chained into with a `jmp` and
//!   returns by jumping to a fresh continuation label;
//! - a callee referenced more than once gets a real `call`, and its `\`
//!   becomes `ret`.
//!
//! Both phases break recursion cycles on their own: phase A inserts a
//! placeholder record before compiling the body, and phase B exits early
//! once a jump label is assigned (which also makes finalisation
//! idempotent).

use crate::codegen::common::{CodeGenCommon, CompiledFunction, FunctionMap};
use crate::codegen::register_state::RegisterState;
use crate::codegen::statement_generator::StatementGenerator;
use crate::compiler::error::Diagnostics;

/// A static utility struct for the two-phase function compilation.
pub struct FunctionLinker;

impl FunctionLinker {
    /// Phase A: compiles a function body into intermediate assembly.
    ///
    /// A no-op when the function was already compiled. The caller must have
    /// checked that `name` exists in the function map.
    pub fn compile_function(
        common: &mut CodeGenCommon,
        functions: &FunctionMap,
        name: &str,
    ) -> Result<(), Diagnostics> {
        if common.functions.contains_key(name) {
            return Ok(());
        }
        // The placeholder breaks compilation cycles: a recursive call seen
        // while compiling this body finds the record and stops.
        common
            .functions
            .insert(name.to_owned(), CompiledFunction::default());

        let definition = functions
            .get(name)
            .expect("the caller resolved the callee before compiling it");
        let mut state = RegisterState::from_declarations(
            &definition.mutated_registers,
            &definition.arguments,
        )?;
        let mut body =
            StatementGenerator::generate_block(common, functions, &mut state, &definition.body, "", "")?;
        if !body.ends_with('\\') {
            body.push_str("\n\\");
        }

        common
            .functions
            .get_mut(name)
            .expect("the placeholder was inserted above")
            .assembly = body;
        Ok(())
    }

    /// Phase B: rewrites a compiled body into final assembly under a fresh
    /// jump label (`_start` for `main`), substituting `return_snippet` for
    /// every `\` and a call-site sequence for every `/name/`.
    ///
    /// Finalising an already-finalised function is a no-op.
    pub fn finalise_function(common: &mut CodeGenCommon, name: &str, return_snippet: &str) {
        let record = common
            .functions
            .get(name)
            .expect("finalising a function that was never compiled");
        if !record.jump_label.is_empty() {
            return;
        }

        let label = if name == "main" {
            "_start".to_owned()
        } else {
            common.next_jump_label()
        };
        // Assign the label before rewriting: a call cycle reaching this
        // function again must see it as finalised.
        let record = common
            .functions
            .get_mut(name)
            .expect("the record was just read");
        record.jump_label = label.clone();
        let body = record.assembly.clone();

        let rewritten = Self::rewrite_body(common, &body, return_snippet);
        common
            .functions
            .get_mut(name)
            .expect("the record was just read")
            .assembly = format!("\n{}:{}", label, rewritten);
    }

    /// Scans a body character by character, leaving single-quoted character
    /// literals alone (a backslash inside one escapes exactly one following
    /// character, so `'\''` and `'\\'` are skipped correctly).
    fn rewrite_body(common: &mut CodeGenCommon, body: &str, return_snippet: &str) -> String {
        let mut result = String::with_capacity(body.len());
        let mut characters = body.chars();
        let mut in_character_literal = false;

        while let Some(character) = characters.next() {
            if in_character_literal {
                result.push(character);
                match character {
                    '\\' => {
                        if let Some(escaped) = characters.next() {
                            result.push(escaped);
                        }
                    }
                    '\'' => in_character_literal = false,
                    _ => {}
                }
                continue;
            }
            match character {
                '\'' => {
                    in_character_literal = true;
                    result.push(character);
                }
                '\\' => result.push_str(return_snippet),
                '/' => {
                    let mut callee = String::new();
                    for next in characters.by_ref() {
                        if next == '/' {
                            break;
                        }
                        callee.push(next);
                    }
                    result.push_str(&Self::generate_call_site(common, &callee));
                }
                _ => result.push(character),
            }
        }
        result
    }

    /// Decides how one call site reaches its callee and finalises the
    /// callee accordingly.
    fn generate_call_site(common: &mut CodeGenCommon, callee: &str) -> String {
        let reference_count = common
            .functions
            .get(callee)
            .expect("a call marker always has a compiled callee")
            .reference_count;
        assert!(
            reference_count > 0,
            "reference count of zero at a live call site for `{}`",
            callee
        );

        if reference_count == 1 {
            // Sole caller: chain into the callee with a jump and have it
            // fall back through the continuation label.
            let continue_label = common.next_jump_label();
            Self::finalise_function(common, callee, &format!("jmp {}", continue_label));
            let callee_label = &common.functions[callee].jump_label;
            format!("jmp {}\n{}:", callee_label, continue_label)
        } else {
            Self::finalise_function(common, callee, "ret");
            let callee_label = &common.functions[callee].jump_label;
            format!("call {}", callee_label)
        }
    }
}
