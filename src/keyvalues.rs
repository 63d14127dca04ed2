//! Reader for Valve's KeyValues text format
//!
//! Used for `libraryfolders.vdf` and the per-app `appmanifest_<id>.acf` files.
//! Values stay untyped strings; interpreting them is the caller's job.
//! Children are kept in source order.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::error::{ExConfigError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    pub line: usize,
    pub reason: String,
}

impl ParseError {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self { line, reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvValue {
    String(String),
    Object(Vec<KvNode>),
}

/// A named entry: either a scalar or an ordered list of named children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvNode {
    pub key: String,
    pub value: KvValue,
}

impl KvNode {
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            KvValue::String(s) => Some(s),
            KvValue::Object(_) => None,
        }
    }

    /// Named children in source order (empty for scalars)
    pub fn children(&self) -> &[KvNode] {
        match &self.value {
            KvValue::Object(children) => children,
            KvValue::String(_) => &[],
        }
    }

    /// First child whose key matches, ignoring ASCII case
    pub fn child(&self, key: &str) -> Option<&KvNode> {
        self.children().iter().find(|c| c.key.eq_ignore_ascii_case(key))
    }

    /// Scalar value of the first matching child
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.child(key).and_then(KvNode::as_str)
    }
}

/// Parse a whole document. Exactly one root entry is expected.
pub fn parse(input: &[u8]) -> Result<KvNode, ParseError> {
    let input = input.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(input);
    let mut parser = Parser { lexer: Lexer { input, pos: 0, line: 1 } };

    let root = match parser.lexer.next_token()? {
        Some(Token::Str(key)) => parser.parse_entry(key)?,
        Some(_) => return Err(ParseError::new(parser.lexer.line, "expected root key")),
        None => return Err(ParseError::new(parser.lexer.line, "empty document")),
    };

    if parser.lexer.next_token()?.is_some() {
        return Err(ParseError::new(parser.lexer.line, "unexpected data after root entry"));
    }
    Ok(root)
}

/// Read and parse a file, tagging failures with its path
pub fn read_file(path: &Path) -> Result<KvNode> {
    let bytes = fs::read(path).map_err(|e| ExConfigError::io(path, e))?;
    parse(&bytes).map_err(|source| ExConfigError::Parse { path: path.to_path_buf(), source })
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Str(String),
    Open,
    Close,
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.bump();
            } else if c == b'/' && self.input.get(self.pos + 1) == Some(&b'/') {
                while let Some(c) = self.peek() {
                    if c == b'\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    /// Next structural token; `[$CONDITION]` tags are consumed and dropped
    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        loop {
            self.skip_trivia();
            let Some(c) = self.peek() else {
                return Ok(None);
            };
            match c {
                b'{' => {
                    self.bump();
                    return Ok(Some(Token::Open));
                }
                b'}' => {
                    self.bump();
                    return Ok(Some(Token::Close));
                }
                b'"' => {
                    self.bump();
                    return self.quoted().map(|s| Some(Token::Str(s)));
                }
                b'[' => self.condition()?,
                _ => return Ok(Some(Token::Str(self.bare()))),
            }
        }
    }

    fn quoted(&mut self) -> Result<String, ParseError> {
        let start_line = self.line;
        let mut buf = Vec::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::new(start_line, "unterminated string")),
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    Some(b'\\') => buf.push(b'\\'),
                    Some(b'"') => buf.push(b'"'),
                    Some(b'n') => buf.push(b'\n'),
                    Some(b't') => buf.push(b'\t'),
                    Some(other) => buf.extend_from_slice(&[b'\\', other]),
                    None => return Err(ParseError::new(start_line, "unterminated string")),
                },
                Some(c) => buf.push(c),
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn bare(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() || matches!(c, b'{' | b'}' | b'"') {
                break;
            }
            self.bump();
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn condition(&mut self) -> Result<(), ParseError> {
        let start_line = self.line;
        while let Some(c) = self.bump() {
            if c == b']' {
                return Ok(());
            }
        }
        Err(ParseError::new(start_line, "unterminated condition"))
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl Parser<'_> {
    fn parse_entry(&mut self, key: String) -> Result<KvNode, ParseError> {
        let value = match self.lexer.next_token()? {
            Some(Token::Str(s)) => KvValue::String(s),
            Some(Token::Open) => KvValue::Object(self.parse_object()?),
            Some(Token::Close) => {
                return Err(ParseError::new(self.lexer.line, format!("missing value for key '{key}'")));
            }
            None => {
                return Err(ParseError::new(self.lexer.line, format!("unexpected end of input after key '{key}'")));
            }
        };
        Ok(KvNode { key, value })
    }

    fn parse_object(&mut self) -> Result<Vec<KvNode>, ParseError> {
        let mut children = Vec::new();
        loop {
            match self.lexer.next_token()? {
                Some(Token::Close) => return Ok(children),
                Some(Token::Str(key)) => children.push(self.parse_entry(key)?),
                Some(Token::Open) => return Err(ParseError::new(self.lexer.line, "object without a key")),
                None => return Err(ParseError::new(self.lexer.line, "unterminated object")),
            }
        }
    }
}
