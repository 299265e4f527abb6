//! # Condition Lowering
//!
//! This module compiles conditions into compare-and-branch assembly. A
//! condition is lowered against a *true target* and a *false target* label;
//! an empty target means control falls through for that outcome. Boolean
//! `and`/`or` trees short-circuit through a fresh join label.
//!
//! AT&T `cmp a, b` sets flags for `b - a`, so the conditional jump taken
//! when `a ⊗ b` holds uses the mnemonic of the opposite family (`a > b`
//! jumps with `jl`). The table in [`jump_mnemonics`] encodes this.

use crate::ast::nodes::{BooleanOperator, ComparisonOperator, Condition};
use crate::codegen::common::CodeGenCommon;
use crate::codegen::register_state::RegisterState;
use crate::codegen::value_generator::ValueGenerator;
use crate::compiler::error::{Diagnostic, Diagnostics};

/// A static utility struct for lowering conditions.
pub struct ConditionGenerator;

impl ConditionGenerator {
    /// Emits assembly that jumps to `true_target` when the condition holds
    /// and to `false_target` otherwise, falling through for whichever
    /// target is empty. At most one of the two may be empty.
    pub fn generate_condition(
        common: &mut CodeGenCommon,
        state: &mut RegisterState,
        condition: &Condition,
        true_target: &str,
        false_target: &str,
    ) -> Result<String, Diagnostics> {
        debug_assert!(
            !(true_target.is_empty() && false_target.is_empty()),
            "a condition needs at least one branch target"
        );

        match condition {
            Condition::Literal(value, _) => {
                let target = if *value { true_target } else { false_target };
                if target.is_empty() {
                    Ok(String::new())
                } else {
                    Ok(format!("\njmp {}", target))
                }
            }
            Condition::Tree {
                operator, children, ..
            } => Self::generate_tree(common, state, *operator, children, true_target, false_target),
            Condition::Comparison {
                left,
                operator,
                right,
                location,
            } => {
                let mut assembly = String::new();
                Self::generate_comparison(
                    common,
                    state,
                    left,
                    *operator,
                    right,
                    *location,
                    true_target,
                    false_target,
                    &mut assembly,
                )?;
                Ok(assembly)
            }
        }
    }

    /// Short-circuit lowering of an `and`/`or` tree.
    ///
    /// Every non-final child falls through on the non-deciding outcome and
    /// jumps on the deciding one: to the caller's target when one was
    /// given, to the join label otherwise. The final child receives the
    /// caller's targets unchanged, and the join label is emitted last.
    fn generate_tree(
        common: &mut CodeGenCommon,
        state: &mut RegisterState,
        operator: BooleanOperator,
        children: &[Condition],
        true_target: &str,
        false_target: &str,
    ) -> Result<String, Diagnostics> {
        let Some((final_child, leading)) = children.split_last() else {
            unreachable!("the parser only builds trees with two or more children");
        };

        let join_label = common.next_jump_label();
        let mut assembly = String::new();
        for child in leading {
            let (child_true, child_false) = match operator {
                BooleanOperator::And => {
                    let target = if false_target.is_empty() {
                        join_label.as_str()
                    } else {
                        false_target
                    };
                    ("", target)
                }
                BooleanOperator::Or => {
                    let target = if true_target.is_empty() {
                        join_label.as_str()
                    } else {
                        true_target
                    };
                    (target, "")
                }
            };
            assembly.push_str(&Self::generate_condition(
                common,
                state,
                child,
                child_true,
                child_false,
            )?);
        }
        assembly.push_str(&Self::generate_condition(
            common,
            state,
            final_child,
            true_target,
            false_target,
        )?);
        assembly.push_str(&format!("\n{}:", join_label));
        Ok(assembly)
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_comparison(
        common: &mut CodeGenCommon,
        state: &mut RegisterState,
        left: &crate::ast::nodes::RawValue,
        operator: ComparisonOperator,
        right: &crate::ast::nodes::RawValue,
        location: crate::ast::nodes::Location,
        true_target: &str,
        false_target: &str,
        assembly: &mut String,
    ) -> Result<(), Diagnostics> {
        if left.is_literal() && right.is_literal() {
            return Err(vec![Diagnostic::new(
                "at least one operand must be a variable or memory",
                location,
            )]);
        }

        // `cmp` cannot take a literal as its second operand; flip the
        // comparison around when it would.
        let (first, operator, second) = if right.is_literal() {
            (right, operator.swapped(), left)
        } else {
            (left, operator, right)
        };

        let first_operand = ValueGenerator::generate_operand(common, state, first)
            .map_err(|diagnostic| vec![diagnostic])?;
        let second_operand = ValueGenerator::generate_operand(common, state, second)
            .map_err(|diagnostic| vec![diagnostic])?;
        assembly.push_str(&format!("\ncmp {}, {}", first_operand, second_operand));

        let (true_jump, false_jump) = jump_mnemonics(operator);
        if !true_target.is_empty() {
            assembly.push_str(&format!("\n{} {}", true_jump, true_target));
            if !false_target.is_empty() {
                assembly.push_str(&format!("\njmp {}", false_target));
            }
        } else {
            assembly.push_str(&format!("\n{} {}", false_jump, false_target));
        }
        Ok(())
    }
}

/// The (true-jump, false-jump) mnemonics for `cmp a, b` followed by a
/// branch on `a ⊗ b`.
fn jump_mnemonics(operator: ComparisonOperator) -> (&'static str, &'static str) {
    match operator {
        ComparisonOperator::Greater => ("jl", "jge"),
        ComparisonOperator::GreaterEqual => ("jle", "jg"),
        ComparisonOperator::Less => ("jg", "jle"),
        ComparisonOperator::LessEqual => ("jge", "jl"),
        ComparisonOperator::Equal => ("je", "jne"),
        ComparisonOperator::NotEqual => ("jne", "je"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::nodes::{Location, RawValue, RegisterBinding};

    fn state() -> RegisterState {
        RegisterState::from_declarations(
            &[RegisterBinding {
                register: 1,
                name: Some("x".into()),
                location: Location::new(1, 1),
            }],
            &[],
        )
        .unwrap()
    }

    fn variable() -> RawValue {
        RawValue::Variable {
            name: "x".into(),
            drop_after_read: false,
            dereference_depth: 0,
            location: Location::new(1, 1),
        }
    }

    fn comparison(left: RawValue, operator: ComparisonOperator, right: RawValue) -> Condition {
        Condition::Comparison {
            left,
            operator,
            right,
            location: Location::new(1, 1),
        }
    }

    fn lower(condition: &Condition, true_target: &str, false_target: &str) -> String {
        let mut common = CodeGenCommon::new();
        ConditionGenerator::generate_condition(
            &mut common,
            &mut state(),
            condition,
            true_target,
            false_target,
        )
        .unwrap()
    }

    #[test]
    fn literal_booleans_jump_or_fall_through() {
        assert_eq!(lower(&Condition::Literal(true, Location::new(1, 1)), "T", ""), "\njmp T");
        assert_eq!(lower(&Condition::Literal(true, Location::new(1, 1)), "", "F"), "");
        assert_eq!(lower(&Condition::Literal(false, Location::new(1, 1)), "T", "F"), "\njmp F");
    }

    #[test]
    fn comparison_with_true_target_uses_the_opposite_family_jump() {
        let condition = comparison(
            variable(),
            ComparisonOperator::Less,
            RawValue::Signed(10, Location::new(1, 1)),
        );
        // x < 10 becomes cmp $10, %rbx; the literal moves first and the
        // operator flips to >, whose true-jump is jl.
        assert_eq!(lower(&condition, "T", ""), "\ncmp $10, %rbx\njl T");
        assert_eq!(lower(&condition, "T", "F"), "\ncmp $10, %rbx\njl T\njmp F");
        assert_eq!(lower(&condition, "", "F"), "\ncmp $10, %rbx\njge F");
    }

    #[test]
    fn variable_on_the_right_needs_no_swap() {
        let condition = comparison(
            RawValue::Signed(10, Location::new(1, 1)),
            ComparisonOperator::Less,
            variable(),
        );
        // 10 < x holds when x - 10 > 0, so the true-jump is jg.
        assert_eq!(lower(&condition, "T", ""), "\ncmp $10, %rbx\njg T");
    }

    #[test]
    fn two_literals_cannot_be_compared() {
        let condition = comparison(
            RawValue::Signed(3, Location::new(2, 4)),
            ComparisonOperator::Less,
            RawValue::Signed(5, Location::new(2, 8)),
        );
        let mut common = CodeGenCommon::new();
        let errors = ConditionGenerator::generate_condition(
            &mut common,
            &mut state(),
            &condition,
            "T",
            "",
        )
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "at least one operand must be a variable or memory"
        );
        assert_eq!(errors[0].location, Location::new(2, 4));
    }

    #[test]
    fn and_tree_short_circuits_through_the_join_label() {
        // 0 <= x and x < 10, lowered with a true target and no false
        // target: the first comparison falls through to the join label on
        // failure, the second jumps to the caller's target.
        let tree = Condition::Tree {
            operator: BooleanOperator::And,
            children: vec![
                comparison(
                    RawValue::Signed(0, Location::new(1, 1)),
                    ComparisonOperator::LessEqual,
                    variable(),
                ),
                comparison(
                    variable(),
                    ComparisonOperator::Less,
                    RawValue::Signed(10, Location::new(1, 1)),
                ),
            ],
            location: Location::new(1, 1),
        };
        assert_eq!(
            lower(&tree, "T", ""),
            "\ncmp $0, %rbx\njl jumpLabel0\
             \ncmp $10, %rbx\njl T\
             \njumpLabel0:"
        );
    }

    #[test]
    fn or_tree_jumps_to_the_true_target_early() {
        let tree = Condition::Tree {
            operator: BooleanOperator::Or,
            children: vec![
                comparison(
                    variable(),
                    ComparisonOperator::Equal,
                    RawValue::Signed(0, Location::new(1, 1)),
                ),
                comparison(
                    variable(),
                    ComparisonOperator::Equal,
                    RawValue::Signed(1, Location::new(1, 1)),
                ),
            ],
            location: Location::new(1, 1),
        };
        assert_eq!(
            lower(&tree, "T", ""),
            "\ncmp $0, %rbx\nje T\
             \ncmp $1, %rbx\nje T\
             \njumpLabel0:"
        );
    }
}
