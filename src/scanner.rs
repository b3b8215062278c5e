//! Lexical analyzer

use std::iter::Peekable;
use std::str::CharIndices;

use tracing::debug;

use crate::diag::{Location, ParseError, ParseErrorKind, Position};
use crate::token::{Token, TokenKind};

/// Output of [`scan`]: every token that could be produced, terminated by `Eof`, plus the
/// errors met on the way.
#[derive(Debug, PartialEq)]
pub struct Scanned {
    pub tokens: Vec<Token>,
    pub errors: Vec<ParseError>,
}

/// Scan the whole of `source`, skipping over bad characters.
pub fn scan(source: &str) -> Scanned {
    let mut scanner = Scanner::new(source);
    let mut tokens = vec![];
    let mut errors = vec![];
    loop {
        match scanner.get_token() {
            Ok(token) => {
                let at_end = token.kind == TokenKind::Eof;
                tokens.push(token);
                if at_end {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "scan error");
                errors.push(e);
            }
        }
    }
    Scanned { tokens, errors }
}

/// Turn source text into a sequence of tokens.
#[derive(Debug)]
pub struct Scanner<'a> {
    source: &'a str,
    input: Peekable<CharIndices<'a>>,
    line: Position,

    // Byte offset where the token being scanned starts.
    start: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            source,
            input: source.char_indices().peekable(),
            line: 1,
            start: 0,
        }
    }

    /// Scan next token and return it.  Returns `Eof` forever once input is exhausted.
    pub fn get_token(&mut self) -> Result<Token, ParseError> {
        loop {
            let (idx, ch) = match self.input.next() {
                None => return Ok(Token::eof(self.line)),
                Some(next) => next,
            };
            self.start = idx;
            let kind = match ch {
                '\n' => {
                    self.line += 1;
                    continue;
                }
                ' ' | '\t' | '\r' => continue,
                '(' => TokenKind::LeftParen,
                ')' => TokenKind::RightParen,
                '{' => TokenKind::LeftBrace,
                '}' => TokenKind::RightBrace,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                '-' => TokenKind::Minus,
                '+' => TokenKind::Plus,
                ';' => TokenKind::Semicolon,
                '*' => TokenKind::Star,
                '?' => TokenKind::Question,
                ':' => TokenKind::Colon,
                '/' => {
                    if self.next_is('/') {
                        self.skip_comment();
                        continue;
                    }
                    TokenKind::Slash
                }
                '!' => self.either('=', TokenKind::BangEqual, TokenKind::Bang),
                '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Equal),
                '<' => self.either('=', TokenKind::LessEqual, TokenKind::Less),
                '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::Greater),
                '"' => return self.scan_string(),
                '0'..='9' => return Ok(self.scan_number()),
                'a'..='z' | 'A'..='Z' | '_' => return Ok(self.scan_identifier()),
                _ => {
                    return Err(ParseError {
                        location: Location {
                            line: self.line,
                            lexeme: Some(ch.to_string()),
                        },
                        kind: ParseErrorKind::BadChar,
                    })
                }
            };
            return Ok(self.make_token(kind));
        }
    }

    fn scan_string(&mut self) -> Result<Token, ParseError> {
        loop {
            match self.input.next() {
                Some((_, '"')) => return Ok(self.make_token(TokenKind::String)),
                Some((_, '\n')) => self.line += 1,
                Some(_) => (),
                None => {
                    return Err(ParseError {
                        location: Location::end(self.line),
                        kind: ParseErrorKind::UnterminatedString,
                    })
                }
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        self.skip_digits();

        // A fractional part needs at least one digit after the dot.
        let mut ahead = self.input.clone();
        if let (Some((_, '.')), Some((_, d))) = (ahead.next(), ahead.next()) {
            if d.is_ascii_digit() {
                self.input.next();
                self.skip_digits();
            }
        }
        self.make_token(TokenKind::Number)
    }

    fn scan_identifier(&mut self) -> Token {
        while let Some((_, ch)) = self.input.peek() {
            if ch.is_ascii_alphanumeric() || *ch == '_' {
                self.input.next();
            } else {
                break;
            }
        }
        let end = self.offset();
        let kind = TokenKind::keyword(&self.source[self.start..end]).unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }

    fn skip_digits(&mut self) {
        while let Some((_, ch)) = self.input.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            self.input.next();
        }
    }

    fn skip_comment(&mut self) {
        while let Some((_, ch)) = self.input.peek() {
            if *ch == '\n' {
                break;
            }
            self.input.next();
        }
    }

    /// Consume the next character if it is `expected`.
    fn next_is(&mut self, expected: char) -> bool {
        self.input.next_if(|&(_, ch)| ch == expected).is_some()
    }

    fn either(&mut self, second: char, double: TokenKind, single: TokenKind) -> TokenKind {
        if self.next_is(second) {
            double
        } else {
            single
        }
    }

    /// Byte offset just past the last consumed character.
    fn offset(&mut self) -> usize {
        self.input
            .peek()
            .map_or(self.source.len(), |&(idx, _)| idx)
    }

    fn make_token(&mut self, kind: TokenKind) -> Token {
        let end = self.offset();
        Token::new(kind, self.line, &self.source[self.start..end])
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.get_token() {
            Ok(Token {
                kind: TokenKind::Eof,
                ..
            }) => None,
            r => Some(r),
        }
    }
}
