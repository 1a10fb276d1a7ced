//! This lexer tokenizes ln source text.
//!
//! It scans the input left to right with a byte cursor and produces a flat
//! `Vec<Token>`, each token tagged with the 1-based line it appears on.
//! Numeric and string payloads are kept as text; the parser interprets them.
//! Unrecognized characters are logged and skipped, never fatal.

use std::fmt;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    Name(String),
    Number(String),
    Str(String),

    Semi,
    OParen,
    CParen,
    OCurly,
    CCurly,
    Comma,
    Colon,

    Otawa,
    O,
    Li,
    La,
    Ante,
    Tenpo,
    Pini,
    Asen,
    Awen,

    Signed,
    Unsigned,
    Nanpa,
    Sitelen,
    Suli,
    Lili,
    Telotu,
    Linja,

    Eq,
    Deq,
    Lt,
    Gt,
    Plus,
    Minus,
    Star,
    Fslash,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenKind::*;
        match self {
            Name(s) => write!(f, "name '{}'", s),
            Number(s) => write!(f, "number '{}'", s),
            Str(s) => write!(f, "string \"{}\"", s),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    fn new(kind: TokenKind, line: usize) -> Self {
        Token { kind, line }
    }
}

fn keyword(word: &str) -> Option<TokenKind> {
    use TokenKind::*;
    match word {
        "otawa" => Some(Otawa),
        "o" => Some(O),
        "li" => Some(Li),
        "la" => Some(La),
        "ante" => Some(Ante),
        "tenpo" => Some(Tenpo),
        "pini" => Some(Pini),
        "asen" => Some(Asen),
        "awen" => Some(Awen),
        "signed" => Some(Signed),
        "unsigned" => Some(Unsigned),
        "nanpa" => Some(Nanpa),
        "sitelen" => Some(Sitelen),
        "suli" => Some(Suli),
        "lili" => Some(Lili),
        "telotu" => Some(Telotu),
        "linja" => Some(Linja),
        _ => None,
    }
}

/// Tokenize a whole source file.
///
/// Lexing never fails: words that are not keywords become `Name` tokens and
/// characters outside the language are skipped with a warning.
pub fn tokenize(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::with_capacity(256);
    let mut line = 1;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];

        if c == b'\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_alphabetic() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
                i += 1;
            }
            let word = &source[start..i];
            let kind = keyword(word).unwrap_or_else(|| TokenKind::Name(word.to_owned()));
            tokens.push(Token::new(kind, line));
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            tokens.push(Token::new(TokenKind::Number(source[start..i].to_owned()), line));
            continue;
        }

        if c == b'"' {
            i += 1;
            let start = i;
            let opening_line = line;
            while i < bytes.len() && bytes[i] != b'"' {
                if bytes[i] == b'\n' {
                    line += 1;
                }
                i += 1;
            }
            tokens.push(Token::new(
                TokenKind::Str(source[start..i].to_owned()),
                opening_line,
            ));
            // Step over the closing quote, if there was one.
            if i < bytes.len() {
                i += 1;
            }
            continue;
        }

        // Line comment.
        if c == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        if c == b'=' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'=' {
                tokens.push(Token::new(TokenKind::Deq, line));
                i += 2;
            } else {
                tokens.push(Token::new(TokenKind::Eq, line));
                i += 1;
            }
            continue;
        }

        let kind = match c {
            b';' => Some(TokenKind::Semi),
            b'(' => Some(TokenKind::OParen),
            b')' => Some(TokenKind::CParen),
            b'{' => Some(TokenKind::OCurly),
            b'}' => Some(TokenKind::CCurly),
            b',' => Some(TokenKind::Comma),
            b':' => Some(TokenKind::Colon),
            b'<' => Some(TokenKind::Lt),
            b'>' => Some(TokenKind::Gt),
            b'+' => Some(TokenKind::Plus),
            b'-' => Some(TokenKind::Minus),
            b'*' => Some(TokenKind::Star),
            b'/' => Some(TokenKind::Fslash),
            _ => None,
        };

        match kind {
            Some(kind) => tokens.push(Token::new(kind, line)),
            None => warn!(
                "skipping unexpected character '{}' on line {}",
                source[i..].chars().next().unwrap_or('?'),
                line
            ),
        }
        // Multi-byte characters only ever reach the skip branch.
        i += source[i..].chars().next().map(char::len_utf8).unwrap_or(1);
    }

    tokens
}
