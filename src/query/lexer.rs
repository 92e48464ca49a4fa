//! Query tokenizer
//!
//! Single left-to-right pass producing position-tagged tokens. The tokenizer
//! only establishes lexical structure; names are validated by the parser.

use crate::error::ParseError;
use crate::types::Pos;

/// Token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// letters, digits, underscore; hyphen allowed after the first character
    Ident,
    /// double-quoted text, quotes stripped
    Str,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Equals,
    Comma,
    Semicolon,
    Eof,
}

impl TokenKind {
    /// Human-readable name used in parse errors.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Ident => "identifier",
            TokenKind::Str => "string",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Equals => "'='",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Eof => "end of input",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: Pos,
}

impl Token {
    /// Text shown as `got` in parse errors.
    pub fn display_text(&self) -> &str {
        match self.kind {
            TokenKind::Eof => "end of input",
            _ => &self.text,
        }
    }
}

/// Query tokenizer
pub struct Lexer<'a> {
    input: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let start = Pos::start();
        Self {
            input,
            offset: start.offset,
            line: start.line,
            column: start.column,
        }
    }

    /// Scan the whole input. The result always ends with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        while let Some(b) = self.peek_byte() {
            let pos = self.pos();
            let single = match b {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                    continue;
                }
                b'(' => Some(TokenKind::LParen),
                b')' => Some(TokenKind::RParen),
                b'{' => Some(TokenKind::LBrace),
                b'}' => Some(TokenKind::RBrace),
                b'=' => Some(TokenKind::Equals),
                b',' => Some(TokenKind::Comma),
                b';' => Some(TokenKind::Semicolon),
                _ => None,
            };

            if let Some(kind) = single {
                self.bump();
                tokens.push(Token {
                    kind,
                    text: (b as char).to_string(),
                    pos,
                });
            } else if b == b'"' {
                tokens.push(self.read_string()?);
            } else if is_ident_start(b) {
                tokens.push(self.read_ident());
            } else {
                let got = self.input[self.offset..]
                    .chars()
                    .next()
                    .map(String::from)
                    .unwrap_or_default();
                return Err(ParseError::new(format!("unexpected character {:?}", got), pos)
                    .with_got(got));
            }
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            pos: self.pos(),
        });
        Ok(tokens)
    }

    fn pos(&self) -> Pos {
        Pos {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.offset).copied()
    }

    fn bump(&mut self) {
        if let Some(b) = self.peek_byte() {
            self.offset += 1;
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    /// Quoted string. No escape processing: the first `"` closes it.
    fn read_string(&mut self) -> Result<Token, ParseError> {
        let start = self.pos();
        self.bump(); // opening quote
        let content_start = self.offset;

        while let Some(b) = self.peek_byte() {
            if b == b'"' {
                let text = self.input[content_start..self.offset].to_string();
                self.bump(); // closing quote
                return Ok(Token {
                    kind: TokenKind::Str,
                    text,
                    pos: start,
                });
            }
            self.bump();
        }

        Err(ParseError::new("unterminated string literal", start)
            .with_got(&self.input[start.offset..]))
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos();
        while let Some(b) = self.peek_byte() {
            if !is_ident_char(b) {
                break;
            }
            self.bump();
        }
        Token {
            kind: TokenKind::Ident,
            text: self.input[start.offset..self.offset].to_string(),
            pos: start,
        }
    }
}

/// Permissive: letters, digits, underscore.
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Identifier continuation also allows hyphens (slugs, UUIDs).
fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b == b'-'
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_statement() {
        assert_eq!(
            kinds("get(task-1) { id name }"),
            vec![
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_punctuation() {
        assert_eq!(
            kinds("a=b,c;"),
            vec![
                TokenKind::Ident,
                TokenKind::Equals,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_slugs_and_uuids() {
        let tokens = tokenize("550e8400-e29b-41d4 _private 9lives").unwrap();
        assert_eq!(tokens[0].text, "550e8400-e29b-41d4");
        assert_eq!(tokens[1].text, "_private");
        assert_eq!(tokens[2].text, "9lives");
    }

    #[test]
    fn test_hyphen_cannot_start_identifier() {
        let err = tokenize("-abc").unwrap_err();
        assert_eq!(err.pos.offset, 0);
        assert_eq!(err.got.as_deref(), Some("-"));
    }

    #[test]
    fn test_string_has_no_escapes() {
        let tokens = tokenize(r#"create(title="a\b")"#).unwrap();
        let s = tokens.iter().find(|t| t.kind == TokenKind::Str).unwrap();
        assert_eq!(s.text, r"a\b");
        assert_eq!(s.pos.offset, 13);
    }

    #[test]
    fn test_string_with_spaces_and_punctuation() {
        let tokens = tokenize(r#""Fix login, then (retry); done""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].text, "Fix login, then (retry); done");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize(r#"get("abc"#).unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        assert_eq!(err.pos.offset, 4);
        assert_eq!(err.got.as_deref(), Some("\"abc"));
    }

    #[test]
    fn test_unexpected_character_offset() {
        let err = tokenize("list(status=done) @").unwrap_err();
        assert_eq!(err.pos.offset, 18);
        assert_eq!(err.pos.column, 19);
        assert_eq!(err.got.as_deref(), Some("@"));
    }

    #[test]
    fn test_non_ascii_is_rejected() {
        let err = tokenize("get(é)").unwrap_err();
        assert_eq!(err.pos.offset, 4);
        assert_eq!(err.got.as_deref(), Some("é"));
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens = tokenize("count()\n  list()").unwrap();
        let list = &tokens[3];
        assert_eq!(list.text, "list");
        assert_eq!(list.pos.line, 2);
        assert_eq!(list.pos.column, 3);
        assert_eq!(list.pos.offset, 10);
    }

    #[test]
    fn test_eof_position() {
        let tokens = tokenize("  ").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert_eq!(tokens[0].pos.offset, 2);
        assert_eq!(tokens[0].display_text(), "end of input");
    }
}
