//! # Statement Parser
//!
//! This module defines the [`StatementParser`], which is responsible for
//! parsing function bodies: mutations (assignments, in-place arithmetic and
//! calls), control flow (`while`, `if`/`else`, `break`, `continue`),
//! `return`, and `drop`.
//!
//! It handles token consumption and delegates value, destination, and
//! condition parsing to the [`ValueParser`].
//!
//! [`ValueParser`]: super::value_parser::ValueParser

use super::common::Parser;
use super::value_parser::ValueParser;
use crate::ast::nodes::*;
use crate::compiler::error::CompileError;
use crate::compiler::lexer::Token;

/// A static utility struct dedicated to parsing statements.
pub struct StatementParser;

impl StatementParser {
    /// Parses a `{ … }` block of statements.
    pub fn parse_block(parser: &mut Parser) -> Result<Vec<Statement>, CompileError> {
        parser.expect(&Token::BraceOpen, "to open a block")?;

        let mut statements = Vec::new();
        while !parser.check(&Token::BraceClose) {
            if parser.is_at_end() {
                return Err(parser.error("unclosed block, expected `}`"));
            }
            statements.push(Self::parse_statement(parser)?);
        }
        parser.expect(&Token::BraceClose, "to close the block")?;

        Ok(statements)
    }

    /// Parses a single statement.
    pub fn parse_statement(parser: &mut Parser) -> Result<Statement, CompileError> {
        let location = parser.location();
        match parser.peek() {
            Some(Token::Comment(text)) => {
                let text = text.clone();
                parser.advance();
                Ok(Statement::Comment(text))
            }
            Some(Token::Return) => Self::parse_return(parser),
            Some(Token::While) => {
                parser.advance();
                let condition = ValueParser::parse_condition(parser)?;
                let body = Self::parse_block(parser)?;
                Ok(Statement::While {
                    condition,
                    body,
                    location,
                })
            }
            Some(Token::If) => {
                parser.advance();
                let condition = ValueParser::parse_condition(parser)?;
                let then_body = Self::parse_block(parser)?;
                let else_body = if parser.check(&Token::Else) {
                    parser.advance();
                    Some(Self::parse_block(parser)?)
                } else {
                    None
                };
                Ok(Statement::If {
                    condition,
                    then_body,
                    else_body,
                    location,
                })
            }
            Some(Token::Break) => {
                parser.advance();
                Ok(Statement::Break { location })
            }
            Some(Token::Continue) => {
                parser.advance();
                Ok(Statement::Continue { location })
            }
            Some(Token::Drop) => {
                parser.advance();
                let (name, _) = parser.expect_identifier("after `drop`")?;
                Ok(Statement::Drop { name, location })
            }
            Some(Token::Register(_)) | Some(Token::Identifier(_)) | Some(Token::Star) => {
                Self::parse_mutation(parser)
            }
            Some(token) => Err(parser.error(format!("expected a statement, found {:?}", token))),
            None => Err(parser.error("expected a statement, found end of file")),
        }
    }

    /// Parses `return` with its optional `rN=value` pairs.
    ///
    /// The pair list is consumed greedily: after `return`, every `rN`
    /// followed by `=` is taken as a return value.
    fn parse_return(parser: &mut Parser) -> Result<Statement, CompileError> {
        let location = parser.location();
        parser.expect(&Token::Return, "to start a return")?;

        let mut values = Vec::new();
        while let (Some(Token::Register(_)), Some(Token::Assign)) =
            (parser.peek(), parser.peek_second())
        {
            values.push(ValueParser::parse_register_value_pair(parser)?);
            if parser.check(&Token::Comma) {
                parser.advance();
            } else {
                break;
            }
        }

        Ok(Statement::Return { values, location })
    }

    /// Parses a mutation: destinations followed by an operation.
    fn parse_mutation(parser: &mut Parser) -> Result<Statement, CompileError> {
        let location = parser.location();

        let mut destinations = vec![ValueParser::parse_destination(parser)?];
        while parser.check(&Token::Comma) {
            parser.advance();
            destinations.push(ValueParser::parse_destination(parser)?);
        }

        let operation = match parser.peek() {
            Some(Token::Assign) => {
                parser.advance();
                // `name(` after `=` is a call; anything else is a plain set.
                if let (Some(Token::Identifier(_)), Some(Token::ParenOpen)) =
                    (parser.peek(), parser.peek_second())
                {
                    Self::parse_call(parser)?
                } else {
                    MutationOperation::Set(ValueParser::parse_value(parser)?)
                }
            }
            Some(Token::AddAssign) => {
                parser.advance();
                MutationOperation::Add(ValueParser::parse_value(parser)?)
            }
            Some(Token::SubAssign) => {
                parser.advance();
                MutationOperation::Sub(ValueParser::parse_value(parser)?)
            }
            Some(Token::MulAssign) => {
                parser.advance();
                MutationOperation::Mul(ValueParser::parse_value(parser)?)
            }
            Some(Token::DivAssign) => {
                parser.advance();
                MutationOperation::Div(ValueParser::parse_value(parser)?)
            }
            Some(Token::Increment) => {
                parser.advance();
                MutationOperation::Increment
            }
            Some(Token::Decrement) => {
                parser.advance();
                MutationOperation::Decrement
            }
            Some(token) => {
                return Err(parser.error(format!(
                    "expected a mutation operator, found {:?}",
                    token
                )));
            }
            None => {
                return Err(parser.error("expected a mutation operator, found end of file"));
            }
        };

        Ok(Statement::Mutation {
            destinations,
            operation,
            location,
        })
    }

    /// Parses `callee(arg, …)` after the destinations and `=`.
    fn parse_call(parser: &mut Parser) -> Result<MutationOperation, CompileError> {
        let (callee, _) = parser.expect_identifier("as the callee")?;
        parser.expect(&Token::ParenOpen, "after the callee name")?;

        let mut arguments = Vec::new();
        if !parser.check(&Token::ParenClose) {
            loop {
                arguments.push(Self::parse_call_argument(parser)?);
                if parser.check(&Token::Comma) {
                    parser.advance();
                } else {
                    break;
                }
            }
        }
        parser.expect(&Token::ParenClose, "after the call arguments")?;

        Ok(MutationOperation::Call { callee, arguments })
    }

    /// Parses one call argument: `rN=value`, or a bare value.
    fn parse_call_argument(parser: &mut Parser) -> Result<CallArgument, CompileError> {
        if let Some(Token::Register(_)) = parser.peek() {
            return ValueParser::parse_register_value_pair(parser);
        }
        let location = parser.location();
        let value = ValueParser::parse_value(parser)?;
        Ok(CallArgument {
            register: None,
            value,
            location,
        })
    }
}
