//! # AST Nodes
//!
//! This module defines the data structures that make up the Abstract Syntax
//! Tree (AST) of a Common Assembly source file. Each syntactic category is a
//! sum type, so every consumer dispatches with an exhaustive `match`.

use serde::Serialize;
use std::fmt;

/// Number of general-purpose registers the language exposes (`r0`..`r15`).
pub const REGISTER_COUNT: usize = 16;

/// A 1-based source position, used to attribute diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// The fallback position for program-level diagnostics (missing `main`).
    pub fn start_of_file() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

// -----------------------------------------------------------------------------

/// A top-level item in a source file.
#[derive(Debug, Clone)]
pub enum Item {
    /// A comment outside of any function body. Lowers to nothing.
    Comment(String),
    /// A function definition.
    Function(FunctionDefinition),
}

/// A function definition.
///
/// A function declares which registers it accepts as arguments and which it
/// may mutate; the register discipline enforced during lowering is built
/// entirely from these two lists.
#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub name: String,
    /// Registers the function may mutate. Entries that also bind a name are
    /// the function's return-value registers.
    pub mutated_registers: Vec<RegisterBinding>,
    /// Registers the function accepts values in, with optional names.
    pub arguments: Vec<RegisterBinding>,
    pub body: Vec<Statement>,
    /// Where the function's name appears, for duplicate-declaration reports.
    pub location: Location,
}

/// One entry of a function's argument or mutated-register list.
#[derive(Debug, Clone)]
pub struct RegisterBinding {
    pub register: usize,
    pub name: Option<String>,
    pub location: Location,
}

// -----------------------------------------------------------------------------

/// A statement inside a function body.
#[derive(Debug, Clone)]
pub enum Statement {
    /// A comment. Lowers to nothing.
    Comment(String),
    /// `return r0=value, ...`; must be the last statement in its block.
    Return {
        values: Vec<CallArgument>,
        location: Location,
    },
    /// One or more destinations mutated by an operation.
    Mutation {
        destinations: Vec<Destination>,
        operation: MutationOperation,
        location: Location,
    },
    /// `while condition { … }`
    While {
        condition: Condition,
        body: Vec<Statement>,
        location: Location,
    },
    /// `if condition { … } else { … }`
    If {
        condition: Condition,
        then_body: Vec<Statement>,
        else_body: Option<Vec<Statement>>,
        location: Location,
    },
    Break {
        location: Location,
    },
    Continue {
        location: Location,
    },
    /// `drop name`: releases the register the variable occupies.
    Drop {
        name: String,
        location: Location,
    },
}

/// The operation side of a mutation statement.
#[derive(Debug, Clone)]
pub enum MutationOperation {
    /// Call a user-defined function or a `sys*` built-in.
    Call {
        callee: String,
        arguments: Vec<CallArgument>,
    },
    /// `dest++`
    Increment,
    /// `dest--`
    Decrement,
    /// `dest = value`
    Set(RawValue),
    /// `dest += value`
    Add(RawValue),
    /// `dest -= value`
    Sub(RawValue),
    /// `dest *= value`
    Mul(RawValue),
    /// `dest /= value`
    Div(RawValue),
}

/// The destination of a mutation: a register, a variable, or a register that
/// a new variable name is being bound to, behind zero or more dereferences.
#[derive(Debug, Clone)]
pub struct Destination {
    pub register: Option<usize>,
    pub name: Option<String>,
    /// Number of pointer-dereference layers applied to the destination.
    pub dereference_depth: usize,
    pub location: Location,
}

/// One argument of a call, or one register/value pair of a `return`.
///
/// An argument without an explicit register must be a variable reference;
/// the variable's own register is used.
#[derive(Debug, Clone)]
pub struct CallArgument {
    pub register: Option<usize>,
    pub value: RawValue,
    pub location: Location,
}

// -----------------------------------------------------------------------------

/// A raw value as it appears on the right-hand side of an operation.
#[derive(Debug, Clone)]
pub enum RawValue {
    Signed(i64, Location),
    Unsigned(u64, Location),
    /// Parsed but lowered no further than its literal decimal form.
    Float(f64, Location),
    /// A read of a bound variable, optionally dropping it afterwards.
    Variable {
        name: String,
        drop_after_read: bool,
        dereference_depth: usize,
        location: Location,
    },
    String(String, Location),
    Character(char, Location),
}

impl RawValue {
    pub fn location(&self) -> Location {
        match self {
            RawValue::Signed(_, location)
            | RawValue::Unsigned(_, location)
            | RawValue::Float(_, location)
            | RawValue::String(_, location)
            | RawValue::Character(_, location)
            | RawValue::Variable { location, .. } => *location,
        }
    }

    /// Whether this value is a literal, as opposed to a register or memory
    /// operand. Comparisons need at least one non-literal side.
    pub fn is_literal(&self) -> bool {
        !matches!(self, RawValue::Variable { .. })
    }
}

// -----------------------------------------------------------------------------

/// A condition of a `while` or `if` statement.
#[derive(Debug, Clone)]
pub enum Condition {
    Literal(bool, Location),
    /// An `and`/`or` over an ordered list of sub-conditions, evaluated with
    /// short-circuiting.
    Tree {
        operator: BooleanOperator,
        children: Vec<Condition>,
        location: Location,
    },
    Comparison {
        left: RawValue,
        operator: ComparisonOperator,
        right: RawValue,
        location: Location,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl ComparisonOperator {
    /// The operator with its operands swapped: `a < b` is `b > a`.
    /// Equality and inequality are symmetric.
    pub fn swapped(self) -> Self {
        match self {
            Self::Less => Self::Greater,
            Self::LessEqual => Self::GreaterEqual,
            Self::Greater => Self::Less,
            Self::GreaterEqual => Self::LessEqual,
            Self::Equal => Self::Equal,
            Self::NotEqual => Self::NotEqual,
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        };
        write!(f, "{}", text)
    }
}
