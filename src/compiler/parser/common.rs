//! # Parser Cursor and Top-Level Items
//!
//! This module defines the [`Parser`] cursor over the located token stream,
//! along with parsing of the top-level grammar: comments and function
//! definitions with their argument and mutated-register lists. Statement
//! bodies are delegated to the [`StatementParser`].
//!
//! [`StatementParser`]: super::statement_parser::StatementParser

use super::statement_parser::StatementParser;
use crate::ast::nodes::*;
use crate::compiler::error::CompileError;
use crate::compiler::lexer::Token;

/// A cursor over the token stream with the usual peek/advance helpers.
pub struct Parser {
    tokens: Vec<(Token, Location)>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<(Token, Location)>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// The current token, or `None` at end of input.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    /// The token after the current one, for the few two-token decisions.
    pub fn peek_second(&self) -> Option<&Token> {
        self.tokens.get(self.position + 1).map(|(token, _)| token)
    }

    /// The location of the current token, or of the end of input.
    pub fn location(&self) -> Location {
        self.tokens
            .get(self.position)
            .or_else(|| self.tokens.last())
            .map(|(_, location)| *location)
            .unwrap_or_else(Location::start_of_file)
    }

    pub fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    pub fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).map(|(token, _)| token.clone());
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Consumes the expected token or fails, naming what was being parsed.
    pub fn expect(&mut self, expected: &Token, context: &str) -> Result<Location, CompileError> {
        let location = self.location();
        match self.peek() {
            Some(token) if token == expected => {
                self.position += 1;
                Ok(location)
            }
            Some(token) => Err(self.error(format!(
                "expected {:?} {}, found {:?}",
                expected, context, token
            ))),
            None => Err(self.error(format!("expected {:?} {}, found end of file", expected, context))),
        }
    }

    /// Consumes an identifier token or fails.
    pub fn expect_identifier(&mut self, context: &str) -> Result<(String, Location), CompileError> {
        let location = self.location();
        match self.advance() {
            Some(Token::Identifier(name)) => Ok((name, location)),
            Some(token) => Err(CompileError::parser(
                location,
                format!("expected an identifier {}, found {:?}", context, token),
            )),
            None => Err(CompileError::parser(
                location,
                format!("expected an identifier {}, found end of file", context),
            )),
        }
    }

    pub fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::parser(self.location(), message)
    }

    /// Parses the whole token stream into top-level items.
    pub fn parse_program(&mut self) -> Result<Vec<Item>, CompileError> {
        let mut items = Vec::new();

        while !self.is_at_end() {
            match self.peek() {
                Some(Token::Comment(text)) => {
                    let text = text.clone();
                    self.advance();
                    items.push(Item::Comment(text));
                }
                Some(Token::Fn) => {
                    items.push(Item::Function(self.parse_function()?));
                }
                Some(token) => {
                    return Err(self.error(format!(
                        "expected a function definition, found {:?}",
                        token
                    )));
                }
                None => break,
            }
        }

        Ok(items)
    }

    /// Parses `fn <mutated registers> = name(<arguments>) { … }`.
    fn parse_function(&mut self) -> Result<FunctionDefinition, CompileError> {
        self.expect(&Token::Fn, "to start a function")?;

        // The registers the function may mutate come before the `=`.
        let mutated_registers = self.parse_register_bindings(&Token::Assign)?;
        self.expect(&Token::Assign, "after the mutated register list")?;

        let (name, location) = self.expect_identifier("as the function name")?;

        self.expect(&Token::ParenOpen, "after the function name")?;
        let arguments = self.parse_register_bindings(&Token::ParenClose)?;
        self.expect(&Token::ParenClose, "after the argument list")?;

        let body = StatementParser::parse_block(self)?;

        Ok(FunctionDefinition {
            name,
            mutated_registers,
            arguments,
            body,
            location,
        })
    }

    /// Parses a possibly empty `rN name?, rM, …` list up to (not consuming)
    /// the given terminator.
    fn parse_register_bindings(
        &mut self,
        terminator: &Token,
    ) -> Result<Vec<RegisterBinding>, CompileError> {
        let mut bindings = Vec::new();
        if self.check(terminator) {
            return Ok(bindings);
        }

        loop {
            let location = self.location();
            let register = match self.advance() {
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
            let name = match self.peek() {
                Some(Token::Identifier(name)) => {
                    let name = name.clone();
                    self.advance();
                    Some(name)
                }
                _ => None,
            };
            bindings.push(RegisterBinding {
                register,
                name,
                location,
            });

            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Ok(bindings)
    }
}
