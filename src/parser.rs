use crate::ast::{Access, Value};
use crate::error::{Result, ScriptError};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind, TokenType};
use std::collections::HashMap;

/// How deeply lists, dictionaries and quotes may nest. Scripts come
/// from untrusted world objects, so recursion is capped rather than
/// letting a pathological one exhaust the stack.
const MAX_NESTING: usize = 200;

pub struct Parser {
    lexer: Lexer,
    cur_token: Token,
    peek_token: Token,
    depth: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self> {
        let cur_token = lexer.next_token()?;
        let peek_token = lexer.next_token()?;

        Ok(Self {
            lexer,
            cur_token,
            peek_token,
            depth: 0,
        })
    }

    fn next_token(&mut self) -> Result<()> {
        self.cur_token = self.peek_token.clone();
        self.peek_token = self.lexer.next_token()?;
        Ok(())
    }

    /// A program is exactly one node followed by the end of input.
    pub fn parse_program(mut self) -> Result<Value> {
        let program = self.parse_node()?;
        if !self.cur_token.is(TokenType::Eof) {
            return Err(self.unexpected());
        }
        Ok(program)
    }

    fn parse_node(&mut self) -> Result<Value> {
        self.enter()?;
        let node = self.parse_value();
        self.leave();
        node
    }

    fn parse_value(&mut self) -> Result<Value> {
        match self.cur_token.kind.clone() {
            TokenKind::Int(n) => {
                self.next_token()?;
                Ok(Value::Int(n))
            }
            TokenKind::Float(x) => {
                self.next_token()?;
                Ok(Value::Float(x))
            }
            TokenKind::Str(s) => {
                self.next_token()?;
                Ok(Value::Str(s))
            }
            TokenKind::Symbol(name) => {
                self.next_token()?;
                Ok(Value::Symbol(name))
            }
            TokenKind::LParen => self.parse_list(),
            TokenKind::LBrace => self.parse_dict(),
            TokenKind::Quote => self.parse_quoted(),
            TokenKind::Comma => self.parse_unquoted(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_list(&mut self) -> Result<Value> {
        self.next_token()?;
        let items = self.parse_items()?;
        if !self.cur_token.is(TokenType::RParen) {
            return Err(self.unexpected());
        }
        self.next_token()?;
        Ok(Value::list(items))
    }

    fn parse_items(&mut self) -> Result<Vec<Value>> {
        let mut items = vec![];
        loop {
            match &self.cur_token.kind {
                TokenKind::RParen | TokenKind::Eof => break,
                TokenKind::Assign => {
                    items.push(Value::Assign);
                    self.next_token()?;
                }
                TokenKind::Define => {
                    items.push(Value::Define);
                    self.next_token()?;
                }
                // A symbol touching a dot starts an attribute access,
                // which swallows the rest of the enclosing list as its
                // path.
                TokenKind::Symbol(name) if self.peek_token.is(TokenType::Dot) => {
                    let object = name.clone();
                    self.next_token()?;
                    self.next_token()?;
                    self.enter()?;
                    let path = self.parse_items()?;
                    self.leave();
                    items.push(Value::Access(Box::new(Access { object, path })));
                    break;
                }
                _ => items.push(self.parse_node()?),
            }
        }
        Ok(items)
    }

    fn parse_dict(&mut self) -> Result<Value> {
        self.next_token()?;
        let mut entries = HashMap::new();
        while !self.cur_token.is(TokenType::RBrace) {
            let key = match &self.cur_token.kind {
                TokenKind::Symbol(name) => name.clone(),
                _ => return Err(self.unexpected()),
            };
            self.next_token()?;
            if !self.cur_token.is(TokenType::Colon) {
                return Err(self.unexpected());
            }
            self.next_token()?;
            let value = self.parse_node()?;
            // A repeated key keeps the value given last.
            entries.insert(key, value);
        }
        self.next_token()?;
        Ok(Value::dict(entries))
    }

    fn parse_quoted(&mut self) -> Result<Value> {
        self.next_token()?;
        let node = self.parse_node()?;
        Ok(Value::quoted(node))
    }

    fn parse_unquoted(&mut self) -> Result<Value> {
        self.next_token()?;
        let node = self.parse_node()?;
        match node {
            Value::Quoted(inner) => Ok(*inner),
            other => Err(ScriptError::CannotUnquote {
                value: other.repr(),
            }),
        }
    }

    fn unexpected(&self) -> ScriptError {
        if self.cur_token.is(TokenType::Eof) {
            ScriptError::UnexpectedEnd
        } else {
            ScriptError::UnexpectedToken {
                token_type: self.cur_token.token_type(),
                value: self.cur_token.kind.to_string(),
                line: self.cur_token.line,
                index: self.cur_token.index,
            }
        }
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING {
            return Err(ScriptError::NestingTooDeep {
                line: self.cur_token.line,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}

/// Parse a whole source text into a single value.
pub fn parse(source: &str) -> Result<Value> {
    Parser::new(Lexer::new(source))?.parse_program()
}
