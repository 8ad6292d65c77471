//! Hand-written scanner for `CREATE TABLE` text.
//!
//! The scanner walks an immutable `&str` with a byte cursor and produces one
//! [`Token`] per call to [`Scanner::next_token`]. Keywords are recognised
//! case-insensitively; type names are *not* keywords, so columns named `date`
//! or `text` scan as plain identifiers.

use std::fmt;

use crate::error::{MigrateError, Result};

/// Reserved words of the accepted DDL grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Create,
    Table,
    Primary,
    Key,
    Constraint,
    Foreign,
    References,
    On,
    Update,
    Delete,
    Cascade,
    Not,
    Null,
    Unique,
    Default,
    Autoincrement,
    Check,
    And,
    Or,
    In,
    Like,
    Glob,
    Is,
}

impl Keyword {
    /// Look up a bare word in the keyword table.
    pub fn lookup(word: &str) -> Option<Keyword> {
        let keyword = match word.to_ascii_uppercase().as_str() {
            "CREATE" => Keyword::Create,
            "TABLE" => Keyword::Table,
            "PRIMARY" => Keyword::Primary,
            "KEY" => Keyword::Key,
            "CONSTRAINT" => Keyword::Constraint,
            "FOREIGN" => Keyword::Foreign,
            "REFERENCES" => Keyword::References,
            "ON" => Keyword::On,
            "UPDATE" => Keyword::Update,
            "DELETE" => Keyword::Delete,
            "CASCADE" => Keyword::Cascade,
            "NOT" => Keyword::Not,
            "NULL" => Keyword::Null,
            "UNIQUE" => Keyword::Unique,
            "DEFAULT" => Keyword::Default,
            "AUTOINCREMENT" => Keyword::Autoincrement,
            "CHECK" => Keyword::Check,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "IN" => Keyword::In,
            "LIKE" => Keyword::Like,
            "GLOB" => Keyword::Glob,
            "IS" => Keyword::Is,
            _ => return None,
        };
        Some(keyword)
    }

    /// Reserved words need quoting to be used as names; the rest are
    /// accepted bare wherever an identifier is expected, as SQLite does.
    pub fn is_reserved(self) -> bool {
        !matches!(self, Keyword::Key | Keyword::Cascade | Keyword::Like | Keyword::Glob)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Create => "CREATE",
            Keyword::Table => "TABLE",
            Keyword::Primary => "PRIMARY",
            Keyword::Key => "KEY",
            Keyword::Constraint => "CONSTRAINT",
            Keyword::Foreign => "FOREIGN",
            Keyword::References => "REFERENCES",
            Keyword::On => "ON",
            Keyword::Update => "UPDATE",
            Keyword::Delete => "DELETE",
            Keyword::Cascade => "CASCADE",
            Keyword::Not => "NOT",
            Keyword::Null => "NULL",
            Keyword::Unique => "UNIQUE",
            Keyword::Default => "DEFAULT",
            Keyword::Autoincrement => "AUTOINCREMENT",
            Keyword::Check => "CHECK",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::In => "IN",
            Keyword::Like => "LIKE",
            Keyword::Glob => "GLOB",
            Keyword::Is => "IS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Words
    Keyword(Keyword),
    Ident(String),
    /// `[name]`, `"name"` or `` `name` ``, delimiters removed.
    QuotedIdent(String),
    // Literals
    Number(String),
    /// Single-quoted text with `''` unescaped.
    Str(String),
    /// `X'..'` hex digits, as written.
    Blob(String),
    // Punctuation
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,         // =
    EqEq,       // ==
    NotEq,      // !=
    LtGt,       // <>
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    ShiftLeft,  // <<
    ShiftRight, // >>
    Concat,     // ||
    Amp,        // &
    Pipe,       // |
    Eof,
}

impl Token {
    /// True for the given keyword.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Token::Keyword(k) if *k == keyword)
    }

    /// True for a bare identifier spelled `word` (case-insensitive).
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Keyword(k) => return f.write_str(k.as_str()),
            Token::Ident(s) => return f.write_str(s),
            Token::QuotedIdent(s) => return write!(f, "\"{}\"", s),
            Token::Number(s) => return f.write_str(s),
            Token::Str(s) => return write!(f, "'{}'", s),
            Token::Blob(s) => return write!(f, "X'{}'", s),
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Dot => ".",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Eq => "=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::LtGt => "<>",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::ShiftLeft => "<<",
            Token::ShiftRight => ">>",
            Token::Concat => "||",
            Token::Amp => "&",
            Token::Pipe => "|",
            Token::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// Cursor over DDL text.
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    token_start: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            token_start: 0,
        }
    }

    /// Byte offset where the most recently returned token starts.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Scan the next token, or [`Token::Eof`] once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();
        self.token_start = self.pos;

        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };

        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()))
        {
            return Ok(self.scan_number());
        }
        if matches!(c, 'x' | 'X') && self.peek_at(1) == Some('\'') {
            self.bump();
            self.bump();
            return self.scan_blob();
        }
        if c.is_alphabetic() || c == '_' {
            let word = self.take_while(|ch| ch.is_alphanumeric() || ch == '_');
            return Ok(match Keyword::lookup(word) {
                Some(keyword) => Token::Keyword(keyword),
                None => Token::Ident(word.to_string()),
            });
        }

        self.bump();
        let token = match c {
            '\'' => Token::Str(self.scan_delimited('\'', true, "character literal")?),
            '"' => Token::QuotedIdent(self.scan_delimited('"', true, "quoted identifier")?),
            '`' => Token::QuotedIdent(self.scan_delimited('`', true, "quoted identifier")?),
            '[' => Token::QuotedIdent(self.scan_delimited(']', false, "bracketed identifier")?),
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '.' => Token::Dot,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '&' => Token::Amp,
            '=' => {
                if self.eat('=') {
                    Token::EqEq
                } else {
                    Token::Eq
                }
            }
            '!' => {
                if self.eat('=') {
                    Token::NotEq
                } else {
                    return Err(MigrateError::lexical(
                        self.token_start,
                        "'!' must be followed by '='",
                    ));
                }
            }
            '<' => {
                if self.eat('=') {
                    Token::LtEq
                } else if self.eat('>') {
                    Token::LtGt
                } else if self.eat('<') {
                    Token::ShiftLeft
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::GtEq
                } else if self.eat('>') {
                    Token::ShiftRight
                } else {
                    Token::Gt
                }
            }
            '|' => {
                if self.eat('|') {
                    Token::Concat
                } else {
                    Token::Pipe
                }
            }
            other => {
                return Err(MigrateError::lexical(
                    self.token_start,
                    format!("unrecognized character '{}'", other),
                ))
            }
        };
        Ok(token)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, accept: F) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !accept(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.input[start..self.pos]
    }

    /// Skip whitespace and `--` line comments.
    fn skip_trivia(&mut self) {
        loop {
            self.take_while(char::is_whitespace);
            if self.input[self.pos..].starts_with("--") {
                self.take_while(|c| c != '\n');
            } else {
                break;
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        self.take_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                if signed {
                    self.bump();
                }
                self.take_while(|c| c.is_ascii_digit());
            }
        }
        Token::Number(self.input[start..self.pos].to_string())
    }

    fn scan_blob(&mut self) -> Result<Token> {
        let digits = self.scan_delimited('\'', false, "blob literal")?;
        if digits.len() % 2 != 0 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(MigrateError::lexical(
                self.token_start,
                "blob literal must contain an even number of hex digits",
            ));
        }
        Ok(Token::Blob(digits))
    }

    /// Scan up to `close`. When `doubled` is set, two closing characters in a
    /// row stand for one literal character.
    fn scan_delimited(&mut self, close: char, doubled: bool, what: &str) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == close => {
                    if doubled && self.eat(close) {
                        text.push(close);
                    } else {
                        return Ok(text);
                    }
                }
                Some(c) => text.push(c),
                None => {
                    return Err(MigrateError::lexical(
                        self.token_start,
                        format!("unterminated {}", what),
                    ))
                }
            }
        }
    }
}

/// Scan `input` to the end, returning every token except the final `Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut scanner = Scanner::new(input);
    let mut tokens = Vec::new();
    loop {
        match scanner.next_token()? {
            Token::Eof => return Ok(tokens),
            token => tokens.push(token),
        }
    }
}
