//! # Program Driver
//!
//! The top of the code generation pipeline: collects the function
//! definitions, rejects duplicates, requires `main`, compiles and finalises
//! `main` (pulling in every transitively called function), and concatenates
//! the final assembly artifact.
//!
//! Functions that are declared but never called are never compiled and do
//! not appear in the output.

use crate::ast::nodes::{Item, Location};
use crate::codegen::call_generator::builtin_function;
use crate::codegen::common::{CodeGenCommon, FunctionMap};
use crate::codegen::linker::FunctionLinker;
use crate::compiler::error::{Diagnostic, Diagnostics};

/// The Linux `exit(0)` sequence substituted for `main`'s returns.
pub const MAIN_RETURN_SNIPPET: &str = "mov $60, %rax\nmov $0, %rdi\nsyscall";

/// A static utility struct for whole-program code generation.
pub struct ProgramGenerator;

impl ProgramGenerator {
    /// Compiles a parsed program into a complete AT&T assembly artifact,
    /// or the list of diagnostics that prevented it.
    pub fn generate(items: &[Item]) -> Result<String, Diagnostics> {
        let mut functions = FunctionMap::new();
        let mut diagnostics = Diagnostics::new();

        for item in items {
            let Item::Function(definition) = item else {
                continue;
            };
            if builtin_function(&definition.name).is_some() {
                diagnostics.push(Diagnostic::new(
                    format!("cannot redefine the built-in function `{}`", definition.name),
                    definition.location,
                ));
                continue;
            }
            match functions.get(definition.name.as_str()) {
                Some(existing) => {
                    let message =
                        format!("two declarations of a function called `{}`", definition.name);
                    diagnostics.push(Diagnostic::new(message.clone(), existing.location));
                    diagnostics.push(Diagnostic::new(message, definition.location));
                }
                None => {
                    functions.insert(definition.name.as_str(), definition);
                }
            }
        }

        if !functions.contains_key("main") {
            diagnostics.push(Diagnostic::new(
                "no function called `main`",
                Location::start_of_file(),
            ));
        }
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let mut common = CodeGenCommon::new();
        FunctionLinker::compile_function(&mut common, &functions, "main")?;
        FunctionLinker::finalise_function(&mut common, "main", MAIN_RETURN_SNIPPET);

        let mut assembly = String::from(".global _start\n.text");
        assembly.push_str(&common.data_section);

        // Emission order is not observable (every body is reached through
        // its own label); sorting keeps builds reproducible.
        let mut names: Vec<&String> = common.functions.keys().collect();
        names.sort();
        for name in names {
            assembly.push_str(&common.functions[name.as_str()].assembly);
        }
        assembly.push('\n');
        Ok(assembly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::nodes::*;

    fn function(name: &str, line: usize, body: Vec<Statement>) -> Item {
        Item::Function(FunctionDefinition {
            name: name.to_owned(),
            mutated_registers: vec![RegisterBinding {
                register: 0,
                name: None,
                location: Location::new(line, 4),
            }],
            arguments: vec![],
            body,
            location: Location::new(line, 1),
        })
    }

    #[test]
    fn an_empty_main_is_just_the_exit_snippet() {
        let assembly = ProgramGenerator::generate(&[function("main", 1, vec![])]).unwrap();
        assert_eq!(
            assembly,
            ".global _start\n.text\n_start:\nmov $60, %rax\nmov $0, %rdi\nsyscall\n"
        );
    }

    #[test]
    fn missing_main_is_reported_at_the_start_of_the_file() {
        let errors = ProgramGenerator::generate(&[function("helper", 1, vec![])]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "no function called `main`");
        assert_eq!(errors[0].location, Location::new(1, 1));
    }

    #[test]
    fn duplicate_declarations_are_reported_at_both_sites() {
        let errors = ProgramGenerator::generate(&[
            function("main", 1, vec![]),
            function("main", 9, vec![]),
        ])
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0].message,
            "two declarations of a function called `main`"
        );
        assert_eq!(errors[0].location, Location::new(1, 1));
        assert_eq!(errors[1].location, Location::new(9, 1));
    }

    #[test]
    fn comments_are_ignored_at_the_top_level() {
        let items = [
            Item::Comment("a comment".into()),
            function("main", 2, vec![]),
        ];
        assert!(ProgramGenerator::generate(&items).is_ok());
    }

    #[test]
    fn built_in_names_cannot_be_redefined() {
        let errors = ProgramGenerator::generate(&[
            function("main", 1, vec![]),
            function("sysExit", 4, vec![]),
        ])
        .unwrap_err();
        assert_eq!(
            errors[0].message,
            "cannot redefine the built-in function `sysExit`"
        );
        assert_eq!(errors[0].location, Location::new(4, 1));
    }

    #[test]
    fn uncalled_functions_do_not_appear_in_the_output() {
        let assembly = ProgramGenerator::generate(&[
            function("main", 1, vec![]),
            function("unused", 5, vec![]),
        ])
        .unwrap();
        assert!(!assembly.contains("unused"));
        assert_eq!(assembly.matches("_start").count(), 2); // .global + label
    }
}
