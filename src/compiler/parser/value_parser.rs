//! # Value, Destination, and Condition Parser
//!
//! This module defines the [`ValueParser`], handling the leaf grammar shared
//! by statements: raw values (literals and variable reads), mutation
//! destinations, explicit `rN=value` pairs, and the `and`/`or`/comparison
//! condition grammar of `while` and `if`.

use super::common::Parser;
use crate::ast::nodes::*;
use crate::compiler::error::CompileError;
use crate::compiler::lexer::{IntegerLiteral, Token};

/// A static utility struct for parsing values, destinations and conditions.
pub struct ValueParser;

impl ValueParser {
    /// Parses a raw value: a literal, or `*`*`name`(`!`)? for a variable
    /// read with optional dereferencing and drop-after-read.
    pub fn parse_value(parser: &mut Parser) -> Result<RawValue, CompileError> {
        let location = parser.location();

        let mut dereference_depth = 0;
        while parser.check(&Token::Star) {
            parser.advance();
            dereference_depth += 1;
        }
        if dereference_depth > 0 {
            let (name, _) = parser.expect_identifier("after `*`")?;
            return Ok(Self::finish_variable(
                parser,
                name,
                dereference_depth,
                location,
            ));
        }

        match parser.advance() {
            Some(Token::Integer(IntegerLiteral::Signed(value))) => {
                Ok(RawValue::Signed(value, location))
            }
            Some(Token::Integer(IntegerLiteral::Unsigned(value))) => {
                Ok(RawValue::Unsigned(value, location))
            }
            Some(Token::Float(value)) => Ok(RawValue::Float(value, location)),
            Some(Token::StringLiteral(text)) => Ok(RawValue::String(text, location)),
            Some(Token::Character(character)) => Ok(RawValue::Character(character, location)),
            Some(Token::Identifier(name)) => Ok(Self::finish_variable(parser, name, 0, location)),
            Some(token) => Err(CompileError::parser(
                location,
                format!("expected a value, found {:?}", token),
            )),
            None => Err(CompileError::parser(
                location,
                "expected a value, found end of file",
            )),
        }
    }

    fn finish_variable(
        parser: &mut Parser,
        name: String,
        dereference_depth: usize,
        location: Location,
    ) -> RawValue {
        let drop_after_read = parser.check(&Token::Bang);
        if drop_after_read {
            parser.advance();
        }
        RawValue::Variable {
            name,
            drop_after_read,
            dereference_depth,
            location,
        }
    }

    /// Parses a mutation destination: `*`* then `rN name?` or a bare name.
    pub fn parse_destination(parser: &mut Parser) -> Result<Destination, CompileError> {
        let location = parser.location();

        let mut dereference_depth = 0;
        while parser.check(&Token::Star) {
            parser.advance();
            dereference_depth += 1;
        }

        match parser.advance() {
            Some(Token::Register(register)) => {
                let name = match parser.peek() {
                    Some(Token::Identifier(name)) => {
                        let name = name.clone();
                        parser.advance();
                        Some(name)
                    }
                    _ => None,
                };
                Ok(Destination {
                    register: Some(register),
                    name,
                    dereference_depth,
                    location,
                })
            }
            Some(Token::Identifier(name)) => Ok(Destination {
                register: None,
                name: Some(name),
                dereference_depth,
                location,
            }),
            Some(token) => Err(CompileError::parser(
                location,
                format!("expected a destination, found {:?}", token),
            )),
            None => Err(CompileError::parser(
                location,
                "expected a destination, found end of file",
            )),
        }
    }

    /// Parses an explicit `rN = value` pair (call argument or return value).
    pub fn parse_register_value_pair(parser: &mut Parser) -> Result<CallArgument, CompileError> {
        let location = parser.location();
        let register = match parser.advance() {
            Some(Token::Register(register)) => register,
            Some(token) => {
                return Err(CompileError::parser(
                    location,
                    format!("expected a register, found {:?}", token),
                ));
            }
            None => {
                return Err(CompileError::parser(
                    location,
                    "expected a register, found end of file",
                ));
            }
        };
        parser.expect(&Token::Assign, "after the argument register")?;
        let value = Self::parse_value(parser)?;
        Ok(CallArgument {
            register: Some(register),
            value,
            location,
        })
    }

    /// Parses a condition. `or` binds loosest, then `and`, then comparisons
    /// and parenthesised sub-conditions.
    pub fn parse_condition(parser: &mut Parser) -> Result<Condition, CompileError> {
        let location = parser.location();
        let mut children = vec![Self::parse_and_condition(parser)?];
        while parser.check(&Token::Or) {
            parser.advance();
            children.push(Self::parse_and_condition(parser)?);
        }
        if children.len() == 1 {
            return Ok(children.pop().expect("one child"));
        }
        Ok(Condition::Tree {
            operator: BooleanOperator::Or,
            children,
            location,
        })
    }

    fn parse_and_condition(parser: &mut Parser) -> Result<Condition, CompileError> {
        let location = parser.location();
        let mut children = vec![Self::parse_primary_condition(parser)?];
        while parser.check(&Token::And) {
            parser.advance();
            children.push(Self::parse_primary_condition(parser)?);
        }
        if children.len() == 1 {
            return Ok(children.pop().expect("one child"));
        }
        Ok(Condition::Tree {
            operator: BooleanOperator::And,
            children,
            location,
        })
    }

    fn parse_primary_condition(parser: &mut Parser) -> Result<Condition, CompileError> {
        let location = parser.location();
        match parser.peek() {
            Some(Token::True) => {
                parser.advance();
                Ok(Condition::Literal(true, location))
            }
            Some(Token::False) => {
                parser.advance();
                Ok(Condition::Literal(false, location))
            }
            Some(Token::ParenOpen) => {
                parser.advance();
                let condition = Self::parse_condition(parser)?;
                parser.expect(&Token::ParenClose, "after the condition")?;
                Ok(condition)
            }
            _ => {
                let left = Self::parse_value(parser)?;
                let operator = Self::parse_comparison_operator(parser)?;
                let right = Self::parse_value(parser)?;
                Ok(Condition::Comparison {
                    left,
                    operator,
                    right,
                    location,
                })
            }
        }
    }

    fn parse_comparison_operator(parser: &mut Parser) -> Result<ComparisonOperator, CompileError> {
        let location = parser.location();
        match parser.advance() {
            Some(Token::Less) => Ok(ComparisonOperator::Less),
            Some(Token::LessEqual) => Ok(ComparisonOperator::LessEqual),
            Some(Token::Greater) => Ok(ComparisonOperator::Greater),
            Some(Token::GreaterEqual) => Ok(ComparisonOperator::GreaterEqual),
            Some(Token::Equal) => Ok(ComparisonOperator::Equal),
            Some(Token::NotEqual) => Ok(ComparisonOperator::NotEqual),
            Some(token) => Err(CompileError::parser(
                location,
                format!("expected a comparison operator, found {:?}", token),
            )),
            None => Err(CompileError::parser(
                location,
                "expected a comparison operator, found end of file",
            )),
        }
    }
}
