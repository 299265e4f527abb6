//! # Value Lowering
//!
//! This module turns raw values into AT&T operand strings: literals become
//! immediates, string literals are pooled into the data section, and
//! variable reads resolve to the mnemonic of the register they occupy,
//! wrapped in one pair of parentheses per dereference layer.

use crate::ast::nodes::RawValue;
use crate::codegen::common::CodeGenCommon;
use crate::codegen::register_state::RegisterState;
use crate::codegen::registers;
use crate::compiler::error::Diagnostic;

/// A static utility struct for lowering raw values to operands.
pub struct ValueGenerator;

impl ValueGenerator {
    /// Lowers a value to an operand string.
    ///
    /// A variable read with `drop_after_read` performs the drop as part of
    /// the resolution, so the register is free again from the next operand
    /// onwards.
    pub fn generate_operand(
        common: &mut CodeGenCommon,
        state: &mut RegisterState,
        value: &RawValue,
    ) -> Result<String, Diagnostic> {
        match value {
            RawValue::Signed(value, _) => Ok(format!("${}", value)),
            RawValue::Unsigned(value, _) => Ok(format!("${}", value)),
            // Floats are not lowered beyond their literal decimal form.
            RawValue::Float(value, _) => Ok(format!("${}", value)),
            RawValue::Character(character, _) => {
                Ok(format!("$'{}'", escape_character(*character)))
            }
            RawValue::String(text, _) => {
                let label = common.add_to_data_section(text);
                Ok(format!("${}", label))
            }
            RawValue::Variable {
                name,
                drop_after_read,
                dereference_depth,
                location,
            } => {
                let register = state.resolve(name, *drop_after_read, *location)?;
                Ok(Self::wrap_dereference(
                    &format!("%{}", registers::mnemonic(register)),
                    *dereference_depth,
                ))
            }
        }
    }

    /// Wraps an operand in `depth` layers of parentheses.
    pub fn wrap_dereference(operand: &str, depth: usize) -> String {
        let mut result = operand.to_owned();
        for _ in 0..depth {
            result = format!("({})", result);
        }
        result
    }
}

fn escape_character(character: char) -> String {
    match character {
        '\\' => "\\\\".to_owned(),
        '\'' => "\\'".to_owned(),
        '\n' => "\\n".to_owned(),
        '\t' => "\\t".to_owned(),
        '\r' => "\\r".to_owned(),
        '\0' => "\\0".to_owned(),
        _ => character.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::nodes::{Location, RegisterBinding};

    fn state() -> RegisterState {
        RegisterState::from_declarations(
            &[RegisterBinding {
                register: 2,
                name: Some("pointer".into()),
                location: Location::new(1, 1),
            }],
            &[],
        )
        .unwrap()
    }

    fn operand(value: RawValue) -> String {
        let mut common = CodeGenCommon::new();
        ValueGenerator::generate_operand(&mut common, &mut state(), &value).unwrap()
    }

    #[test]
    fn literals_become_immediates() {
        let here = Location::new(1, 1);
        assert_eq!(operand(RawValue::Signed(-3, here)), "$-3");
        assert_eq!(operand(RawValue::Unsigned(7, here)), "$7");
        assert_eq!(operand(RawValue::Float(2.5, here)), "$2.5");
        assert_eq!(operand(RawValue::Character('a', here)), "$'a'");
        assert_eq!(operand(RawValue::Character('\n', here)), "$'\\n'");
    }

    #[test]
    fn strings_are_pooled_and_addressed_by_label() {
        let mut common = CodeGenCommon::new();
        let operand = ValueGenerator::generate_operand(
            &mut common,
            &mut state(),
            &RawValue::String("hi".into(), Location::new(1, 1)),
        )
        .unwrap();
        assert_eq!(operand, "$dataSectionLabel0");
        assert_eq!(common.data_section, "\ndataSectionLabel0: .ascii \"hi\"");
    }

    #[test]
    fn variable_reads_use_the_bound_register() {
        let here = Location::new(1, 1);
        let read = |depth| RawValue::Variable {
            name: "pointer".into(),
            drop_after_read: false,
            dereference_depth: depth,
            location: here,
        };
        assert_eq!(operand(read(0)), "%rcx");
        assert_eq!(operand(read(2)), "((%rcx))");
    }

    #[test]
    fn drop_after_read_frees_the_register() {
        let mut common = CodeGenCommon::new();
        let mut state = state();
        let read = RawValue::Variable {
            name: "pointer".into(),
            drop_after_read: true,
            dereference_depth: 0,
            location: Location::new(1, 1),
        };
        assert_eq!(
            ValueGenerator::generate_operand(&mut common, &mut state, &read).unwrap(),
            "%rcx"
        );
        assert!(state.lookup("pointer").is_none());
        let error = ValueGenerator::generate_operand(&mut common, &mut state, &read).unwrap_err();
        assert_eq!(error.message, "no variable called `pointer`");
    }
}
