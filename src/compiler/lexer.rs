use crate::ast::nodes::Location;
use crate::compiler::error::CompileError;
use logos::{Lexer, Logos};

/// An integer literal, kept unsigned only when it does not fit in `i64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntegerLiteral {
    Signed(i64),
    Unsigned(u64),
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Keywords
    #[token("fn")]
    Fn,
    #[token("return")]
    Return,
    #[token("while")]
    While,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("drop")]
    Drop,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Literals
    #[regex(r"r(1[0-5]|[0-9])", parse_register)]
    Register(usize),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Identifier(String),
    #[regex(r"-?[0-9]+", parse_integer)]
    Integer(IntegerLiteral),
    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    StringLiteral(String),
    #[regex(r"'([^'\\\n]|\\.)'", parse_character)]
    Character(char),
    #[regex(r"#[^\n]*", |lex| lex.slice()[1..].trim().to_owned())]
    Comment(String),

    // Operators
    #[token("=")]
    Assign,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,
    #[token("++")]
    Increment,
    #[token("--")]
    Decrement,
    #[token("*")]
    Star,
    #[token("!")]
    Bang,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,

    // Punctuation
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token(",")]
    Comma,
}

fn parse_register(lex: &mut Lexer<Token>) -> Option<usize> {
    lex.slice()[1..].parse().ok()
}

fn parse_integer(lex: &mut Lexer<Token>) -> Option<IntegerLiteral> {
    let slice = lex.slice();
    if let Ok(value) = slice.parse::<i64>() {
        return Some(IntegerLiteral::Signed(value));
    }
    slice.parse::<u64>().ok().map(IntegerLiteral::Unsigned)
}

fn parse_string(lex: &mut Lexer<Token>) -> Option<String> {
    unescape(&lex.slice()[1..lex.slice().len() - 1])
}

fn parse_character(lex: &mut Lexer<Token>) -> Option<char> {
    let text = unescape(&lex.slice()[1..lex.slice().len() - 1])?;
    let mut characters = text.chars();
    let character = characters.next()?;
    if characters.next().is_some() {
        return None;
    }
    Some(character)
}

fn unescape(text: &str) -> Option<String> {
    let mut result = String::with_capacity(text.len());
    let mut characters = text.chars();
    while let Some(ch) = characters.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match characters.next()? {
            'n' => result.push('\n'),
            't' => result.push('\t'),
            'r' => result.push('\r'),
            '0' => result.push('\0'),
            '\\' => result.push('\\'),
            '\'' => result.push('\''),
            '"' => result.push('"'),
            _ => return None,
        }
    }
    Some(result)
}

/// Tokenizes a source file, attaching a 1-based (line, column) to each token.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Location)>, CompileError> {
    // Byte offset of the start of each line, for span -> location conversion.
    let mut line_starts = vec![0];
    for (offset, byte) in source.bytes().enumerate() {
        if byte == b'\n' {
            line_starts.push(offset + 1);
        }
    }
    let location_of = |offset: usize| {
        let line = line_starts.partition_point(|&start| start <= offset);
        Location::new(line, offset - line_starts[line - 1] + 1)
    };

    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let location = location_of(lexer.span().start);
        match result {
            Ok(token) => tokens.push((token, location)),
            Err(()) => {
                return Err(CompileError::lexer(
                    location,
                    format!("unrecognized token `{}`", lexer.slice()),
                ));
            }
        }
    }
    Ok(tokens)
}
