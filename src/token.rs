use std::fmt::{self, Formatter};
use strum_macros::{Display, EnumDiscriminants};

#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(derive(Hash, Display))]
#[strum_discriminants(name(TokenType))]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    Symbol(String),

    // Symbols reclassified by exact spelling
    Assign,
    Define,

    // Single-character tokens
    LParen,
    RParen,
    LBrace,
    RBrace,
    Colon,
    Quote,
    Comma,
    Dot,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) => write!(f, "\"{}\"", s),
            Self::Symbol(name) => write!(f, "{}", name),
            Self::Assign => write!(f, "="),
            Self::Define => write!(f, "def"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::LBrace => write!(f, "{{"),
            Self::RBrace => write!(f, "}}"),
            Self::Colon => write!(f, ":"),
            Self::Quote => write!(f, "'"),
            Self::Comma => write!(f, ","),
            Self::Dot => write!(f, "."),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// A lexeme plus where it started: `line` counts from 1, `index` is the
/// byte offset into the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub index: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, index: usize) -> Self {
        Self { kind, line, index }
    }

    pub fn is(&self, token_type: TokenType) -> bool {
        TokenType::from(&self.kind) == token_type
    }

    pub fn token_type(&self) -> TokenType {
        TokenType::from(&self.kind)
    }
}
