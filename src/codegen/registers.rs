//! # Register Name Mapping
//!
//! Maps the logical registers of the language (`r0`..`r15`) to the x86-64
//! mnemonics used in the emitted AT&T assembly. The mapping is the only
//! architecture-specific naming in the code generator; diagnostics always
//! use the logical `rN` names the programmer wrote.

use crate::ast::nodes::REGISTER_COUNT;

/// Logical index of the stack pointer. Reserved for prologue/epilogue use.
pub const STACK_POINTER: usize = 14;

/// Logical index of the base/frame pointer. Reserved like the stack pointer.
pub const BASE_POINTER: usize = 15;

const MNEMONICS: [&str; REGISTER_COUNT] = [
    "rax", "rbx", "rcx", "rdx", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12", "r13", "r14",
    "r15", "rsp", "ebp",
];

/// The x86-64 mnemonic for a logical register index.
///
/// An out-of-range index is a compiler bug, not a user error: the lexer only
/// produces indices 0..=15.
pub fn mnemonic(register: usize) -> &'static str {
    MNEMONICS[register]
}

/// The `rN` spelling used in diagnostics.
pub fn logical_name(register: usize) -> String {
    format!("r{}", register)
}

/// Whether a register is reserved for the stack/frame machinery and may not
/// appear in argument or mutated-register declarations.
pub fn is_reserved(register: usize) -> bool {
    register == STACK_POINTER || register == BASE_POINTER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_covers_all_sixteen_registers() {
        assert_eq!(mnemonic(0), "rax");
        assert_eq!(mnemonic(5), "rdi");
        assert_eq!(mnemonic(6), "r8");
        assert_eq!(mnemonic(13), "r15");
        assert_eq!(mnemonic(STACK_POINTER), "rsp");
        assert_eq!(mnemonic(BASE_POINTER), "ebp");
    }

    #[test]
    fn reserved_registers() {
        assert!(is_reserved(14));
        assert!(is_reserved(15));
        assert!(!is_reserved(0));
        assert!(!is_reserved(13));
    }
}
