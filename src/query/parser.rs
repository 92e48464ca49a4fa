//! Query Parser
//!
//! Recursive-descent parser over the token stream. Parsing is fail-fast: the
//! first structural or name error aborts the whole batch with one
//! [`ParseError`].

use crate::error::ParseError;
use crate::query::ast::{Arg, Query, Statement};
use crate::query::lexer::{Lexer, Token, TokenKind};
use crate::types::FULL_PRESET;
use std::collections::HashSet;

/// Decides which operation names the parser accepts.
pub trait OperationResolver {
    fn has_operation(&self, name: &str) -> bool;
}

/// Decides which projection names the parser accepts (fields or presets).
pub trait FieldResolver {
    fn has_field(&self, name: &str) -> bool;
}

impl OperationResolver for HashSet<String> {
    fn has_operation(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl FieldResolver for HashSet<String> {
    fn has_field(&self, name: &str) -> bool {
        name == FULL_PRESET || self.contains(name)
    }
}

/// Name validation hooks. A missing resolver accepts any name.
#[derive(Default, Clone, Copy)]
pub struct ParserConfig<'a> {
    pub operations: Option<&'a dyn OperationResolver>,
    pub fields: Option<&'a dyn FieldResolver>,
}

impl<'a> ParserConfig<'a> {
    /// Accept every operation and field name.
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn with_operations(mut self, resolver: &'a dyn OperationResolver) -> Self {
        self.operations = Some(resolver);
        self
    }

    pub fn with_fields(mut self, resolver: &'a dyn FieldResolver) -> Self {
        self.fields = Some(resolver);
        self
    }
}

/// Query parser
pub struct QueryParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    config: ParserConfig<'a>,
}

impl<'a> QueryParser<'a> {
    pub fn new(input: &str, config: ParserConfig<'a>) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: Lexer::new(input).tokenize()?,
            pos: 0,
            config,
        })
    }

    /// Parse the whole batch.
    pub fn parse(mut self) -> Result<Query, ParseError> {
        let mut statements = Vec::new();

        self.skip_semicolons();
        if self.peek().kind == TokenKind::Eof {
            return Err(ParseError::new("empty query", self.peek().pos).with_got("end of input"));
        }

        loop {
            statements.push(self.parse_statement()?);

            match self.peek().kind {
                TokenKind::Semicolon => {
                    self.skip_semicolons();
                    if self.peek().kind == TokenKind::Eof {
                        break;
                    }
                }
                TokenKind::Eof => break,
                _ => {
                    let tok = self.peek();
                    return Err(ParseError::new("expected ';' or end of input", tok.pos)
                        .with_got(tok.display_text())
                        .with_expected("';' or end of input"));
                }
            }
        }

        Ok(Query { statements })
    }

    fn peek(&self) -> &Token {
        // tokenize() always appends Eof, so the last token is a safe fallback
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let tok = self.advance();
        if tok.kind != kind {
            return Err(ParseError::new(format!("expected {}", kind.describe()), tok.pos)
                .with_got(tok.display_text())
                .with_expected(kind.describe()));
        }
        Ok(tok)
    }

    fn skip_semicolons(&mut self) {
        while self.peek().kind == TokenKind::Semicolon {
            self.advance();
        }
    }

    /// statement = operation "(" args? ")" ("{" fields "}")?
    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let op = self.advance();
        if op.kind != TokenKind::Ident {
            return Err(ParseError::new("expected operation name", op.pos)
                .with_got(op.display_text())
                .with_expected("identifier"));
        }

        if let Some(resolver) = self.config.operations {
            if !resolver.has_operation(&op.text) {
                return Err(
                    ParseError::new(format!("unknown operation {:?}", op.text), op.pos)
                        .with_got(op.text.as_str()),
                );
            }
        }

        self.expect(TokenKind::LParen)?;
        let args = if self.peek().kind == TokenKind::RParen {
            Vec::new()
        } else {
            self.parse_args()?
        };
        self.expect(TokenKind::RParen)?;

        let fields = if self.peek().kind == TokenKind::LBrace {
            self.parse_projection()?
        } else {
            Vec::new()
        };

        Ok(Statement {
            operation: op.text,
            args,
            fields,
            pos: op.pos,
        })
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>, ParseError> {
        let mut args = vec![self.parse_arg()?];
        while self.peek().kind == TokenKind::Comma {
            self.advance();
            args.push(self.parse_arg()?);
        }
        Ok(args)
    }

    /// arg = (identifier "=")? value
    fn parse_arg(&mut self) -> Result<Arg, ParseError> {
        let tok = self.advance();
        if !is_value(tok.kind) {
            return Err(ParseError::new("expected argument", tok.pos)
                .with_got(tok.display_text())
                .with_expected("identifier or string"));
        }

        // A quoted string is always a value, never a key.
        if tok.kind == TokenKind::Ident && self.peek().kind == TokenKind::Equals {
            self.advance();
            let value = self.advance();
            if !is_value(value.kind) {
                return Err(ParseError::new("expected value after '='", value.pos)
                    .with_got(value.display_text())
                    .with_expected("identifier or string"));
            }
            return Ok(Arg {
                key: Some(tok.text),
                value: value.text,
                pos: tok.pos,
            });
        }

        Ok(Arg {
            key: None,
            value: tok.text,
            pos: tok.pos,
        })
    }

    /// fields = "{" identifier* "}", de-duplicated in first-seen order.
    fn parse_projection(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(TokenKind::LBrace)?;

        let mut fields: Vec<String> = Vec::new();
        while !matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Eof) {
            let tok = self.advance();
            if tok.kind != TokenKind::Ident {
                return Err(ParseError::new("expected field name", tok.pos)
                    .with_got(tok.display_text())
                    .with_expected("identifier"));
            }

            if let Some(resolver) = self.config.fields {
                if !resolver.has_field(&tok.text) {
                    return Err(
                        ParseError::new(format!("unknown field {:?}", tok.text), tok.pos)
                            .with_got(tok.text.as_str()),
                    );
                }
            }

            if !fields.contains(&tok.text) {
                fields.push(tok.text);
            }
        }

        self.expect(TokenKind::RBrace)?;
        Ok(fields)
    }
}

fn is_value(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Ident | TokenKind::Str)
}

/// Parse without name validation.
pub fn parse(input: &str) -> Result<Query, ParseError> {
    parse_with(input, ParserConfig::permissive())
}

/// Parse, validating operation and field names against `config`.
pub fn parse_with(input: &str, config: ParserConfig<'_>) -> Result<Query, ParseError> {
    QueryParser::new(input, config)?.parse()
}
