//! A small, homoiconic expression language for scripting the objects
//! of a multi-user textual world. Scripts are stored as object
//! attributes and evaluated on demand against a context the host
//! assembles from live world state:
//!
//! ```
//! use mudlisp::{run, Context, Value};
//!
//! let mut ctx = Context::new();
//! assert_eq!(run("(+ 1 2 3)", &mut ctx), Ok(Value::Int(6)));
//! ```
//!
//! The interpreter never performs I/O of its own; hosts expose world
//! effects by registering extra [`Builtin`] values on the context.

mod ast;
mod builtins;
mod environment;
mod error;
mod evaluator;
mod lexer;
mod parser;
pub mod repl;
mod token;

pub use ast::{Access, Builtin, Function, Value};
pub use environment::{Budget, Context};
pub use error::{Result, ScriptError};
pub use evaluator::{evaluate, run};
pub use lexer::{tokenize, Lexer};
pub use parser::{parse, Parser};
pub use token::{Token, TokenKind, TokenType};

/// Marker at the start of an attribute value showing that the rest of
/// it is a script rather than plain text.
pub static SCRIPT_SIGIL: &str = "#!";

/// Whether an attribute value is marked as a script.
pub fn is_script(value: &str) -> bool {
    value.starts_with(SCRIPT_SIGIL)
}

/// The runnable body of a script attribute, with the marker stripped,
/// or None when the value is not marked as a script at all.
pub fn script_body(value: &str) -> Option<&str> {
    value.strip_prefix(SCRIPT_SIGIL)
}
