use crate::error::{Result, ScriptError};
use crate::token::{Token, TokenKind, TokenType};

pub struct Lexer {
    input: String,
    position: usize,
    read_position: usize,
    ch: u8,
    line: usize,
    done: bool,
}

/// Characters that always stand alone and therefore terminate a symbol.
fn is_reserved(c: u8) -> bool {
    matches!(
        c,
        b'(' | b')' | b'{' | b'}' | b':' | b'\'' | b',' | b'.' | b'"'
    )
}

impl Iterator for Lexer {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(token) => {
                if token.is(TokenType::Eof) {
                    self.done = true;
                    None
                } else {
                    Some(Ok(token))
                }
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let mut lexer = Self {
            input: input.to_owned(),
            position: 0,
            read_position: 0,
            ch: 0,
            line: 1,
            done: false,
        };
        lexer.read_char();
        lexer
    }

    fn read_char(&mut self) {
        self.ch = *self.input.as_bytes().get(self.read_position).unwrap_or(&0);
        self.position = self.read_position;
        self.read_position += 1;
    }

    fn peek_char(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        *self
            .input
            .as_bytes()
            .get(self.read_position + offset)
            .unwrap_or(&0)
    }

    // `ch` is only the first byte of the character under the cursor.
    fn current_char(&self) -> char {
        self.input[self.position..].chars().next().unwrap_or('\u{0}')
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();

        let line = self.line;
        let index = self.position;

        let kind = match self.ch {
            0 => TokenKind::Eof,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b':' => TokenKind::Colon,
            b'\'' => TokenKind::Quote,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'"' => return self.read_string(line, index),
            c if c.is_ascii_digit() => return self.read_number(line, index),
            b'-' if self.peek_char().is_ascii_digit() => return self.read_number(line, index),
            c if c < b' ' => {
                return Err(ScriptError::BadCharacter {
                    character: c as char,
                    line,
                })
            }
            _ => return Ok(self.read_symbol(line, index)),
        };
        self.read_char();
        Ok(Token::new(kind, line, index))
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.ch {
                b' ' | b'\t' | b'\r' => self.read_char(),
                b'\n' => {
                    self.line += 1;
                    self.read_char();
                }
                // Comments run from '#' to the end of the line, even
                // when the '#' touches the end of a symbol.
                b'#' => {
                    while self.ch != b'\n' && self.ch != 0 {
                        self.read_char();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_symbol(&mut self, line: usize, index: usize) -> Token {
        let start = self.position;
        while self.ch != 0
            && !self.ch.is_ascii_whitespace()
            && !is_reserved(self.ch)
            && self.ch != b'#'
        {
            self.read_char();
        }

        let kind = match &self.input[start..self.position] {
            "=" => TokenKind::Assign,
            "def" => TokenKind::Define,
            text => TokenKind::Symbol(text.to_owned()),
        };
        Token::new(kind, line, index)
    }

    fn read_number(&mut self, line: usize, index: usize) -> Result<Token> {
        let start = self.position;
        if self.ch == b'-' {
            self.read_char();
        }
        while self.ch.is_ascii_digit() {
            self.read_char();
        }

        let mut is_float = false;
        if self.ch == b'.' && self.peek_char().is_ascii_digit() {
            is_float = true;
            self.read_char();
            while self.ch.is_ascii_digit() {
                self.read_char();
            }
            // An exponent only belongs to the number when digits follow
            // it, otherwise the 'e' starts a fresh symbol.
            if self.ch == b'e'
                && (self.peek_char().is_ascii_digit()
                    || (self.peek_char() == b'-' && self.peek_at(1).is_ascii_digit()))
            {
                self.read_char();
                if self.ch == b'-' {
                    self.read_char();
                }
                while self.ch.is_ascii_digit() {
                    self.read_char();
                }
            }
        }

        let text = &self.input[start..self.position];
        let kind = if is_float {
            TokenKind::Float(text.parse().map_err(|_| ScriptError::BadNumber {
                text: text.to_owned(),
                line,
            })?)
        } else {
            TokenKind::Int(text.parse().map_err(|_| ScriptError::BadNumber {
                text: text.to_owned(),
                line,
            })?)
        };
        Ok(Token::new(kind, line, index))
    }

    fn read_string(&mut self, line: usize, index: usize) -> Result<Token> {
        self.read_char();

        let mut bytes = vec![];
        loop {
            match self.ch {
                0 => return Err(ScriptError::UnterminatedString { line }),
                b'"' => break,
                b'\\' => {
                    self.read_char();
                    match self.ch {
                        b'"' => bytes.push(b'"'),
                        b'\\' => bytes.push(b'\\'),
                        0 => return Err(ScriptError::UnterminatedString { line }),
                        _ => {
                            return Err(ScriptError::BadEscape {
                                character: self.current_char(),
                                line: self.line,
                            })
                        }
                    }
                    self.read_char();
                }
                b'\n' => {
                    self.line += 1;
                    bytes.push(b'\n');
                    self.read_char();
                }
                c => {
                    bytes.push(c);
                    self.read_char();
                }
            }
        }
        self.read_char();

        let value = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Token::new(TokenKind::Str(value), line, index))
    }
}

/// Scan a whole source text into tokens, without the trailing Eof.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).collect()
}
