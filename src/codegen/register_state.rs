//! # Register State Tracker
//!
//! This module enforces the language's ownership discipline over named
//! registers and user variables. Per register it records the bound variable
//! name (if any), where that binding happened, whether the binding belongs
//! to an outer scope, and where the enclosing function declared the register
//! mutable.
//!
//! The state is a value: entering a loop or branch body takes a
//! scope-locked copy via [`RegisterState::inner_scope`], and leaving the
//! body simply discards it, so sibling branches never see each other's
//! drops and nothing declared inside a body escapes it.

use crate::ast::nodes::{Destination, Location, RegisterBinding, REGISTER_COUNT};
use crate::codegen::registers;
use crate::compiler::error::{Diagnostic, Diagnostics};

/// The tracked state of one register.
#[derive(Debug, Clone, Default)]
pub struct RegisterSlot {
    /// The variable bound to this register in the current scope, or empty.
    pub variable: String,
    /// Where the variable was bound, for attributing errors.
    pub bound_at: Location,
    /// Set on every bound variable when entering a nested scope; forbids
    /// dropping the variable there.
    pub scope_locked: bool,
    /// Where the enclosing function declared this register mutable, or
    /// `None` if it did not.
    pub mutable_at: Option<Location>,
}

/// The state of all sixteen registers plus the function's return-value
/// register list.
#[derive(Debug, Clone)]
pub struct RegisterState {
    slots: [RegisterSlot; REGISTER_COUNT],
    /// The mutated-register declarations that also bound a name: the
    /// registers a `return` must assign.
    return_registers: Vec<usize>,
}

impl Default for RegisterState {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| RegisterSlot::default()),
            return_registers: Vec::new(),
        }
    }
}

impl RegisterState {
    /// Builds the initial state of a function from its declared mutated
    /// registers and arguments, validating both lists.
    pub fn from_declarations(
        mutated_registers: &[RegisterBinding],
        arguments: &[RegisterBinding],
    ) -> Result<Self, Diagnostics> {
        let mut state = Self::default();
        let mut diagnostics = Vec::new();

        for binding in mutated_registers {
            if let Err(diagnostic) = state.declare_mutable(binding) {
                diagnostics.push(diagnostic);
            }
        }

        let mut seen_arguments = Vec::new();
        for binding in arguments {
            if let Err(diagnostic) = state.declare_argument(binding, &seen_arguments) {
                diagnostics.push(diagnostic);
            }
            seen_arguments.push(binding.register);
        }

        if diagnostics.is_empty() {
            Ok(state)
        } else {
            Err(diagnostics)
        }
    }

    fn declare_mutable(&mut self, binding: &RegisterBinding) -> Result<(), Diagnostic> {
        let register = binding.register;
        if registers::is_reserved(register) {
            return Err(Diagnostic::new(
                format!(
                    "{} is reserved for the stack and base pointers",
                    registers::logical_name(register)
                ),
                binding.location,
            ));
        }
        if self.slots[register].mutable_at.is_some() {
            return Err(Diagnostic::new(
                format!(
                    "{} is declared mutable twice",
                    registers::logical_name(register)
                ),
                binding.location,
            ));
        }
        self.slots[register].mutable_at = Some(binding.location);
        if let Some(name) = &binding.name {
            self.bind_checked(register, name, binding.location)?;
            self.return_registers.push(register);
        }
        Ok(())
    }

    fn declare_argument(
        &mut self,
        binding: &RegisterBinding,
        seen_arguments: &[usize],
    ) -> Result<(), Diagnostic> {
        let register = binding.register;
        if registers::is_reserved(register) {
            return Err(Diagnostic::new(
                format!(
                    "{} is reserved for the stack and base pointers",
                    registers::logical_name(register)
                ),
                binding.location,
            ));
        }
        if seen_arguments.contains(&register) {
            return Err(Diagnostic::new(
                format!(
                    "{} is used by two arguments",
                    registers::logical_name(register)
                ),
                binding.location,
            ));
        }
        if let Some(name) = &binding.name {
            self.bind_checked(register, name, binding.location)?;
        }
        Ok(())
    }

    fn bind_checked(
        &mut self,
        register: usize,
        name: &str,
        location: Location,
    ) -> Result<(), Diagnostic> {
        if self.lookup(name).is_some() {
            return Err(Diagnostic::new(
                format!("there is already a variable called `{}`", name),
                location,
            ));
        }
        let slot = &mut self.slots[register];
        if !slot.variable.is_empty() {
            return Err(Diagnostic::new(
                format!(
                    "{} already carries the variable `{}`",
                    registers::logical_name(register),
                    slot.variable
                ),
                location,
            ));
        }
        slot.variable = name.to_owned();
        slot.bound_at = location;
        Ok(())
    }

    /// The register a variable name is bound to, if any.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.variable == name)
    }

    pub fn is_mutable(&self, register: usize) -> bool {
        self.slots[register].mutable_at.is_some()
    }

    /// The bound variable of a register, or `None` when it is free.
    pub fn bound_name(&self, register: usize) -> Option<&str> {
        let variable = &self.slots[register].variable;
        if variable.is_empty() {
            None
        } else {
            Some(variable)
        }
    }

    pub fn return_registers(&self) -> &[usize] {
        &self.return_registers
    }

    /// Finds the register a variable occupies and optionally drops it.
    ///
    /// Dropping requires the variable to belong to the current scope and
    /// its register to be mutable (a drop exists to free the register for
    /// reassignment, which is pointless otherwise).
    pub fn resolve(
        &mut self,
        name: &str,
        drop_variable: bool,
        location: Location,
    ) -> Result<usize, Diagnostic> {
        let register = self.lookup(name).ok_or_else(|| {
            Diagnostic::new(format!("no variable called `{}`", name), location)
        })?;
        if !drop_variable {
            return Ok(register);
        }

        let slot = &self.slots[register];
        if slot.scope_locked {
            return Err(Diagnostic::new(
                format!("cannot drop `{}` in this scope", name),
                location,
            ));
        }
        if slot.mutable_at.is_none() {
            return Err(Diagnostic::new(
                format!(
                    "no point dropping `{}`, {} is not mutable",
                    name,
                    registers::logical_name(register)
                ),
                location,
            ));
        }
        self.slots[register].variable.clear();
        Ok(register)
    }

    /// Decides which register a mutation destination refers to, binding a
    /// fresh variable when the destination declares one.
    ///
    /// | reg | name | bound-to(name)        | outcome                        |
    /// |-----|------|-----------------------|--------------------------------|
    /// | set | -    | -                     | reg, which must be free        |
    /// | -   | set  | none                  | error: not defined             |
    /// | -   | set  | some r                | r                              |
    /// | set | set  | none, reg free        | fresh binding reg <-> name     |
    /// | set | set  | none, reg occupied    | error: reserved, suggest drop  |
    /// | set | set  | r != reg              | error: bound elsewhere         |
    /// | set | set  | reg                   | error: redundant declaration   |
    ///
    /// In every case the register used must be declared mutable.
    pub fn validate_destination(&mut self, destination: &Destination) -> Result<usize, Diagnostic> {
        let location = destination.location;
        let register = match (destination.register, &destination.name) {
            (Some(register), None) => {
                if let Some(variable) = self.bound_name(register) {
                    return Err(Diagnostic::new(
                        format!(
                            "only possible to mutate {} through the variable `{}`",
                            registers::logical_name(register),
                            variable
                        ),
                        location,
                    ));
                }
                register
            }
            (None, Some(name)) => self.lookup(name).ok_or_else(|| {
                Diagnostic::new(
                    format!("the variable `{}` is not defined", name),
                    location,
                )
            })?,
            (Some(register), Some(name)) => match self.lookup(name) {
                None => {
                    if let Some(occupant) = self.bound_name(register) {
                        return Err(Diagnostic::new(
                            format!(
                                "{} is reserved for the variable `{}`, drop it to reuse the register",
                                registers::logical_name(register),
                                occupant
                            ),
                            location,
                        ));
                    }
                    self.require_mutable(register, location)?;
                    self.slots[register].variable = name.clone();
                    self.slots[register].bound_at = location;
                    self.slots[register].scope_locked = false;
                    return Ok(register);
                }
                Some(bound) if bound != register => {
                    return Err(Diagnostic::new(
                        format!(
                            "the variable `{}` is already bound to {}",
                            name,
                            registers::logical_name(bound)
                        ),
                        location,
                    ));
                }
                Some(_) => {
                    return Err(Diagnostic::new(
                        format!(
                            "redundant re-declaration, `{}` is already {}",
                            name,
                            registers::logical_name(register)
                        ),
                        location,
                    ));
                }
            },
            (None, None) => unreachable!("the parser always sets a register or a name"),
        };
        self.require_mutable(register, location)?;
        Ok(register)
    }

    fn require_mutable(&self, register: usize, location: Location) -> Result<(), Diagnostic> {
        if self.is_mutable(register) {
            return Ok(());
        }
        Err(Diagnostic::new(
            format!(
                "cannot mutate {} unless the function declares it mutable",
                registers::logical_name(register)
            ),
            location,
        ))
    }

    /// A copy of the state for compiling a loop or branch body, with every
    /// currently bound variable locked against dropping. The caller keeps
    /// the original; discarding the copy is leaving the scope.
    pub fn inner_scope(&self) -> Self {
        let mut inner = self.clone();
        for slot in &mut inner.slots {
            if !slot.variable.is_empty() {
                slot.scope_locked = true;
            }
        }
        inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(register: usize, name: Option<&str>) -> RegisterBinding {
        RegisterBinding {
            register,
            name: name.map(str::to_owned),
            location: Location::new(1, 1),
        }
    }

    fn destination(register: Option<usize>, name: Option<&str>) -> Destination {
        Destination {
            register,
            name: name.map(str::to_owned),
            dereference_depth: 0,
            location: Location::new(2, 5),
        }
    }

    fn state_with(mutated: &[RegisterBinding], arguments: &[RegisterBinding]) -> RegisterState {
        RegisterState::from_declarations(mutated, arguments).unwrap()
    }

    #[test]
    fn named_mutated_registers_become_return_registers() {
        let state = state_with(
            &[binding(0, Some("result")), binding(1, None)],
            &[binding(5, Some("input"))],
        );
        assert_eq!(state.return_registers(), &[0]);
        assert_eq!(state.lookup("result"), Some(0));
        assert_eq!(state.lookup("input"), Some(5));
        assert!(state.is_mutable(1));
        assert!(!state.is_mutable(5));
    }

    #[test]
    fn reserved_and_duplicate_declarations_are_rejected() {
        let errors =
            RegisterState::from_declarations(&[binding(14, None), binding(3, None), binding(3, None)], &[])
                .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("reserved"));
        assert!(errors[1].message.contains("declared mutable twice"));
    }

    #[test]
    fn resolve_finds_and_drops() {
        let mut state = state_with(&[binding(0, Some("x"))], &[]);
        let here = Location::new(3, 1);
        assert_eq!(state.resolve("x", false, here).unwrap(), 0);
        assert_eq!(state.resolve("x", true, here).unwrap(), 0);
        // The binding is gone but the register stays mutable.
        assert!(state.lookup("x").is_none());
        assert!(state.is_mutable(0));
        let error = state.resolve("x", false, here).unwrap_err();
        assert_eq!(error.message, "no variable called `x`");
    }

    #[test]
    fn drop_is_refused_across_scopes_and_on_immutable_registers() {
        let state = state_with(&[binding(0, Some("x"))], &[binding(5, Some("arg"))]);
        let here = Location::new(4, 1);

        let mut inner = state.inner_scope();
        let error = inner.resolve("x", true, here).unwrap_err();
        assert_eq!(error.message, "cannot drop `x` in this scope");

        let mut outer = state.clone();
        let error = outer.resolve("arg", true, here).unwrap_err();
        assert_eq!(error.message, "no point dropping `arg`, r5 is not mutable");
    }

    #[test]
    fn destination_table_register_only() {
        let mut state = state_with(&[binding(0, Some("x")), binding(1, None)], &[]);
        assert_eq!(
            state.validate_destination(&destination(Some(1), None)).unwrap(),
            1
        );
        let error = state
            .validate_destination(&destination(Some(0), None))
            .unwrap_err();
        assert_eq!(
            error.message,
            "only possible to mutate r0 through the variable `x`"
        );
        let error = state
            .validate_destination(&destination(Some(2), None))
            .unwrap_err();
        assert_eq!(
            error.message,
            "cannot mutate r2 unless the function declares it mutable"
        );
    }

    #[test]
    fn destination_table_name_only() {
        let mut state = state_with(&[binding(0, Some("x"))], &[binding(5, Some("arg"))]);
        assert_eq!(
            state.validate_destination(&destination(None, Some("x"))).unwrap(),
            0
        );
        let error = state
            .validate_destination(&destination(None, Some("missing")))
            .unwrap_err();
        assert_eq!(error.message, "the variable `missing` is not defined");
        // Bound but not mutable.
        let error = state
            .validate_destination(&destination(None, Some("arg")))
            .unwrap_err();
        assert_eq!(
            error.message,
            "cannot mutate r5 unless the function declares it mutable"
        );
    }

    #[test]
    fn destination_table_fresh_binding_and_conflicts() {
        let mut state = state_with(&[binding(0, Some("x")), binding(1, None)], &[]);

        assert_eq!(
            state
                .validate_destination(&destination(Some(1), Some("y")))
                .unwrap(),
            1
        );
        assert_eq!(state.lookup("y"), Some(1));

        let error = state
            .validate_destination(&destination(Some(0), Some("z")))
            .unwrap_err();
        assert_eq!(
            error.message,
            "r0 is reserved for the variable `x`, drop it to reuse the register"
        );

        let error = state
            .validate_destination(&destination(Some(1), Some("x")))
            .unwrap_err();
        assert_eq!(error.message, "the variable `x` is already bound to r0");

        let error = state
            .validate_destination(&destination(Some(1), Some("y")))
            .unwrap_err();
        assert_eq!(
            error.message,
            "redundant re-declaration, `y` is already r1"
        );
    }

    #[test]
    fn inner_scope_changes_do_not_escape() {
        let state = state_with(&[binding(0, Some("x")), binding(1, None)], &[]);

        let mut inner = state.inner_scope();
        inner
            .validate_destination(&destination(Some(1), Some("tmp")))
            .unwrap();
        assert_eq!(inner.lookup("tmp"), Some(1));

        // Discarding the copy is all it takes to leave the scope.
        drop(inner);
        assert!(state.lookup("tmp").is_none());
        assert_eq!(state.lookup("x"), Some(0));
    }
}
