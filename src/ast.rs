use crate::environment::Context;
use crate::error::{Result, ScriptError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

/// Ceiling on nesting while rendering a value back to source. Anything
/// the parser accepts fits well inside it; only a self-referential
/// dictionary would otherwise recurse forever.
const MAX_RENDER_DEPTH: usize = 200;

/// Ceiling on nesting while comparing values structurally. Two
/// distinct self-referential dictionaries would otherwise recurse off
/// the native stack.
pub const MAX_EQ_DEPTH: usize = 200;

pub type NativeFn = Rc<dyn Fn(&mut Context, &[Value]) -> Result<Value>>;

/// A shared, mutable dictionary. Every binding that holds the same
/// dictionary sees the same entries, so attribute assignment through
/// one name is visible through all the others.
pub type DictRef = Rc<RefCell<HashMap<String, Value>>>;

/// A value in the script language. Source code parses into these and
/// evaluation produces these; there is no separate syntax tree.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Rc<Vec<Value>>),
    Dict(DictRef),
    Symbol(String),
    Quoted(Box<Value>),
    Access(Box<Access>),
    Assign,
    Define,
    Function(Rc<Function>),
    Builtin(Builtin),
}

/// A dotted attribute chain such as `foo.bar`: the named object plus
/// everything that followed the dot.
#[derive(Debug, Clone, PartialEq)]
pub struct Access {
    pub object: String,
    pub path: Vec<Value>,
}

impl Display for Access {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let parts: Vec<String> = self.path.iter().map(Value::repr).collect();
        write!(f, "{}.{}", self.object, parts.join(" "))
    }
}

/// A user-defined function created by `def`.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub doc: String,
    pub parameters: Vec<String>,
    pub body: Vec<Value>,
    pub source: Rc<str>,
}

/// A host-provided function. The table installed into every context is
/// built from these, and callers may register their own to expose
/// world effects to scripts.
#[derive(Clone)]
pub struct Builtin {
    pub name: Rc<str>,
    pub doc: Rc<str>,
    func: NativeFn,
}

impl Builtin {
    pub fn new<F>(name: &str, doc: &str, func: F) -> Self
    where
        F: Fn(&mut Context, &[Value]) -> Result<Value> + 'static,
    {
        Self {
            name: Rc::from(name),
            doc: Rc::from(doc),
            func: Rc::new(func),
        }
    }

    pub fn call(&self, ctx: &mut Context, args: &[Value]) -> Result<Value> {
        (self.func)(ctx, args)
    }
}

// Two builtins are the same builtin when they share a name.
impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.repr()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Nil
    }
}

impl Value {
    pub fn symbol(name: &str) -> Self {
        Self::Symbol(name.to_owned())
    }

    pub fn quoted(value: Value) -> Self {
        Self::Quoted(Box::new(value))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Rc::new(items))
    }

    pub fn dict(entries: HashMap<String, Value>) -> Self {
        Self::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Dict(_) => "dictionary",
            Self::Symbol(_) => "symbol",
            Self::Quoted(_) => "quoted value",
            Self::Access(_) => "attribute access",
            Self::Assign => "assignment marker",
            Self::Define => "definition marker",
            Self::Function(_) => "function",
            Self::Builtin(_) => "builtin",
        }
    }

    pub fn truth_value(&self) -> bool {
        match self {
            Self::Nil => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(x) => *x != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Dict(map) => !map.borrow().is_empty(),
            _ => true,
        }
    }

    /// Render the value as source text. For everything a script can
    /// write as a literal, feeding the result back through the lexer
    /// and parser reproduces the value.
    pub fn repr(&self) -> String {
        self.render(0)
    }

    fn render(&self, depth: usize) -> String {
        if depth > MAX_RENDER_DEPTH {
            return "...".to_owned();
        }
        match self {
            Self::Nil => "nil".to_owned(),
            Self::Int(n) => n.to_string(),
            Self::Float(x) => format_float(*x),
            Self::Bool(b) => b.to_string(),
            Self::Str(s) => format!("\"{}\"", escape_str(s)),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|item| item.render(depth + 1)).collect();
                format!("({})", parts.join(" "))
            }
            Self::Dict(map) => {
                let parts: Vec<String> = map
                    .borrow()
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value.render(depth + 1)))
                    .collect();
                format!("{{{}}}", parts.join(" "))
            }
            Self::Symbol(name) => name.clone(),
            Self::Quoted(inner) => format!("'{}", inner.render(depth + 1)),
            Self::Access(access) => access.to_string(),
            Self::Assign => "=".to_owned(),
            Self::Define => "def".to_owned(),
            Self::Function(function) => format!("<function {}>", function.name),
            Self::Builtin(builtin) => format!("<builtin {}>", builtin.name),
        }
    }

    /// Structural equality that stops at a depth ceiling instead of
    /// following self-referential dictionaries off the native stack.
    /// The comparison builtins go through this and report the ceiling
    /// as a recursion error, the same way a runaway script function
    /// would.
    pub fn try_eq(&self, other: &Value) -> Result<bool> {
        self.eq_at(other, 0)
    }

    fn eq_at(&self, other: &Value, depth: usize) -> Result<bool> {
        if depth > MAX_EQ_DEPTH {
            return Err(ScriptError::RecursionLimit {
                depth: MAX_EQ_DEPTH,
            });
        }
        match (self, other) {
            (Self::Nil, Self::Nil) => Ok(true),
            (Self::Int(a), Self::Int(b)) => Ok(a == b),
            (Self::Float(a), Self::Float(b)) => Ok(a == b),
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => {
                Ok(*a as f64 == *b)
            }
            (Self::Bool(a), Self::Bool(b)) => Ok(a == b),
            // Booleans join numeric equality as 0 and 1, the same way
            // they behave under arithmetic.
            (Self::Bool(a), Self::Int(b)) | (Self::Int(b), Self::Bool(a)) => {
                Ok(i64::from(*a) == *b)
            }
            (Self::Bool(a), Self::Float(b)) | (Self::Float(b), Self::Bool(a)) => {
                Ok(i64::from(*a) as f64 == *b)
            }
            (Self::Str(a), Self::Str(b)) => Ok(a == b),
            (Self::List(a), Self::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.eq_at(y, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Self::Dict(a), Self::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (key, x) in a.iter() {
                    let y = match b.get(key) {
                        Some(y) => y,
                        None => return Ok(false),
                    };
                    if !x.eq_at(y, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Self::Symbol(a), Self::Symbol(b)) => Ok(a == b),
            (Self::Quoted(a), Self::Quoted(b)) => a.eq_at(b, depth + 1),
            (Self::Access(a), Self::Access(b)) => Ok(a == b),
            (Self::Assign, Self::Assign) => Ok(true),
            (Self::Define, Self::Define) => Ok(true),
            (Self::Function(a), Self::Function(b)) => Ok(Rc::ptr_eq(a, b)),
            (Self::Builtin(a), Self::Builtin(b)) => Ok(a == b),
            _ => Ok(false),
        }
    }
}

// Host code and tests need an infallible comparison, so past the
// depth ceiling two values simply count as unequal here.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.eq_at(other, 0).unwrap_or(false)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        s.to_owned().into()
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::list(items)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(entries: HashMap<String, Value>) -> Self {
        Self::dict(entries)
    }
}

// Floats must come back out with a decimal point or they would re-lex
// as integers.
fn format_float(x: f64) -> String {
    let s = x.to_string();
    if x.is_finite() && !s.contains('.') {
        format!("{}.0", s)
    } else {
        s
    }
}

fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}
