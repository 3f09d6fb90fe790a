use crate::ast::{Builtin, Value};
use crate::environment::Context;
use crate::error::{Result, ScriptError};
use lazy_static::lazy_static;
use std::cmp::Ordering;
use std::collections::HashMap;

pub type BuiltinFn = fn(&mut Context, &[Value]) -> Result<Value>;

/// One row of the builtin table; a live `Builtin` value is minted from
/// it whenever the table is installed into a context.
pub struct Entry {
    pub name: &'static str,
    pub doc: &'static str,
    func: BuiltinFn,
}

static GENERAL_HELP: &str = "\
Scripts are lists in parentheses: the first element names a function
and the rest are its arguments, so (+ 1 2) gives 3.

(= name value)                 bind a name
(def name \"doc\" (args) ...)    define a function
(= obj.attr value)             set an attribute on a dictionary
(obj.attr)                     read an attribute back
'(1 2 3)                       quote data so it is not evaluated

(help fn) shows what a function does, for example (help len).";

fn check_args(name: &'static str, want: usize, args: &[Value]) -> Result<()> {
    if args.len() == want {
        Ok(())
    } else {
        Err(ScriptError::WrongArity {
            name: name.to_owned(),
            expected: want,
            got: args.len(),
        })
    }
}

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn value(self) -> Value {
        match self {
            Num::Int(n) => Value::Int(n),
            Num::Float(x) => Value::Float(x),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(x) => x,
        }
    }
}

fn number(operation: &'static str, value: &Value) -> Result<Num> {
    match value {
        Value::Int(n) => Ok(Num::Int(*n)),
        Value::Float(x) => Ok(Num::Float(*x)),
        other => Err(ScriptError::UnsupportedOperand {
            operation,
            type_name: other.type_name(),
        }),
    }
}

// Integer arithmetic promotes to float instead of overflowing.
fn num_add(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => x
            .checked_add(y)
            .map(Num::Int)
            .unwrap_or(Num::Float(x as f64 + y as f64)),
        _ => Num::Float(a.as_f64() + b.as_f64()),
    }
}

fn num_sub(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => x
            .checked_sub(y)
            .map(Num::Int)
            .unwrap_or(Num::Float(x as f64 - y as f64)),
        _ => Num::Float(a.as_f64() - b.as_f64()),
    }
}

fn num_mul(a: Num, b: Num) -> Num {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => x
            .checked_mul(y)
            .map(Num::Int)
            .unwrap_or(Num::Float(x as f64 * y as f64)),
        _ => Num::Float(a.as_f64() * b.as_f64()),
    }
}

fn fold(
    operation: &'static str,
    args: &[Value],
    f: impl Fn(Num, Num) -> Num,
) -> Result<Value> {
    let mut iter = args.iter();
    let mut acc = match iter.next() {
        Some(value) => number(operation, value)?,
        None => {
            return Err(ScriptError::WrongArity {
                name: operation.to_owned(),
                expected: 1,
                got: 0,
            })
        }
    };
    for value in iter {
        acc = f(acc, number(operation, value)?);
    }
    Ok(acc.value())
}

fn add(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    let mut acc = Num::Int(0);
    for value in args {
        acc = num_add(acc, number("+", value)?);
    }
    Ok(acc.value())
}

fn sub(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    fold("-", args, num_sub)
}

fn mul(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    fold("*", args, num_mul)
}

fn div(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("/", 2, args)?;
    let numerator = number("/", &args[0])?.as_f64();
    let denominator = number("/", &args[1])?.as_f64();
    if denominator == 0.0 {
        return Err(ScriptError::DivisionByZero);
    }
    Ok(Value::Float(numerator / denominator))
}

fn modulo(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("%", 2, args)?;
    let a = number("%", &args[0])?;
    let b = number("%", &args[1])?;
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => {
            if y == 0 {
                Err(ScriptError::DivisionByZero)
            } else if y == -1 {
                // i64::MIN % -1 would overflow.
                Ok(Value::Int(0))
            } else {
                // Remainder takes the sign of the divisor.
                let r = x % y;
                Ok(Value::Int(if r != 0 && (r < 0) != (y < 0) {
                    r + y
                } else {
                    r
                }))
            }
        }
        _ => {
            let x = a.as_f64();
            let y = b.as_f64();
            if y == 0.0 {
                Err(ScriptError::DivisionByZero)
            } else {
                Ok(Value::Float(x - y * (x / y).floor()))
            }
        }
    }
}

fn compare(
    operation: &'static str,
    args: &[Value],
    test: impl Fn(Ordering) -> bool,
) -> Result<Value> {
    check_args(operation, 2, args)?;
    let ordering = match (&args[0], &args[1]) {
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        _ => {
            let x = number(operation, &args[0])?.as_f64();
            let y = number(operation, &args[1])?.as_f64();
            match x.partial_cmp(&y) {
                Some(ordering) => ordering,
                // Comparisons against NaN are always false.
                None => return Ok(Value::Bool(false)),
            }
        }
    };
    Ok(Value::Bool(test(ordering)))
}

fn lt(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    compare("<", args, |ordering| ordering == Ordering::Less)
}

fn gt(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    compare(">", args, |ordering| ordering == Ordering::Greater)
}

fn ge(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    compare(">=", args, |ordering| ordering != Ordering::Less)
}

fn le(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    compare("<=", args, |ordering| ordering != Ordering::Greater)
}

fn eq(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("==", 2, args)?;
    args[0].try_eq(&args[1]).map(Value::Bool)
}

fn ne(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("!=", 2, args)?;
    args[0].try_eq(&args[1]).map(|equal| Value::Bool(!equal))
}

// With no arguments, (and) is true and (or) is false.
fn and(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(args.iter().all(Value::truth_value)))
}

fn or(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(args.iter().any(Value::truth_value)))
}

fn not(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("not", 1, args)?;
    Ok(Value::Bool(!args[0].truth_value()))
}

fn to_int(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("int", 1, args)?;
    let value = &args[0];
    let fail = || ScriptError::CannotConvert {
        value: value.repr(),
        target: "integer",
    };
    match value {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(x) => {
            let truncated = x.trunc();
            // i64::MAX as f64 rounds up to 2^63, which does not fit.
            if truncated.is_finite()
                && truncated >= i64::MIN as f64
                && truncated < i64::MAX as f64
            {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(fail())
            }
        }
        Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| fail()),
        _ => Err(fail()),
    }
}

fn to_float(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("float", 1, args)?;
    let value = &args[0];
    let fail = || ScriptError::CannotConvert {
        value: value.repr(),
        target: "float",
    };
    match value {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s.trim().parse().map(Value::Float).map_err(|_| fail()),
        _ => Err(fail()),
    }
}

fn to_str(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("str", 1, args)?;
    Ok(Value::Str(args[0].to_string()))
}

fn to_bool(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("bool", 1, args)?;
    Ok(Value::Bool(args[0].truth_value()))
}

fn len(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("len", 1, args)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        Value::Dict(map) => Ok(Value::Int(map.borrow().len() as i64)),
        other => Err(ScriptError::UnsupportedOperand {
            operation: "len",
            type_name: other.type_name(),
        }),
    }
}

fn first(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("first", 1, args)?;
    match &args[0] {
        Value::List(items) => items.first().cloned().ok_or(ScriptError::IndexOutOfRange {
            index: 0,
            length: 0,
        }),
        Value::Str(s) => s
            .chars()
            .next()
            .map(|c| Value::Str(c.to_string()))
            .ok_or(ScriptError::IndexOutOfRange {
                index: 0,
                length: 0,
            }),
        other => Err(ScriptError::UnsupportedOperand {
            operation: "first",
            type_name: other.type_name(),
        }),
    }
}

fn last(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("last", 1, args)?;
    match &args[0] {
        Value::List(items) => items.last().cloned().ok_or(ScriptError::IndexOutOfRange {
            index: -1,
            length: 0,
        }),
        Value::Str(s) => s
            .chars()
            .last()
            .map(|c| Value::Str(c.to_string()))
            .ok_or(ScriptError::IndexOutOfRange {
                index: -1,
                length: 0,
            }),
        other => Err(ScriptError::UnsupportedOperand {
            operation: "last",
            type_name: other.type_name(),
        }),
    }
}

fn body(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("body", 1, args)?;
    match &args[0] {
        Value::List(items) => Ok(Value::list(items.iter().skip(1).cloned().collect())),
        Value::Str(s) => Ok(Value::Str(s.chars().skip(1).collect())),
        other => Err(ScriptError::UnsupportedOperand {
            operation: "body",
            type_name: other.type_name(),
        }),
    }
}

// Negative positions count back from the end.
fn locate(index: i64, length: usize) -> Result<usize> {
    let span = length as i64;
    let position = if index < 0 { index + span } else { index };
    if position < 0 || position >= span {
        Err(ScriptError::IndexOutOfRange { index, length })
    } else {
        Ok(position as usize)
    }
}

fn item(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("item", 2, args)?;
    let index = match &args[0] {
        Value::Int(n) => *n,
        other => {
            return Err(ScriptError::UnsupportedOperand {
                operation: "item",
                type_name: other.type_name(),
            })
        }
    };
    match &args[1] {
        Value::List(items) => Ok(items[locate(index, items.len())?].clone()),
        Value::Str(s) => {
            let position = locate(index, s.chars().count())?;
            match s.chars().nth(position) {
                Some(c) => Ok(Value::Str(c.to_string())),
                None => Err(ScriptError::IndexOutOfRange {
                    index,
                    length: s.chars().count(),
                }),
            }
        }
        other => Err(ScriptError::UnsupportedOperand {
            operation: "item",
            type_name: other.type_name(),
        }),
    }
}

// Out-of-range endpoints clamp and a backwards range is empty, the
// way slicing usually behaves.
fn clamp(start: i64, end: i64, length: usize) -> (usize, usize) {
    let span = length as i64;
    let normalize = |i: i64| {
        let position = if i < 0 { i + span } else { i };
        position.max(0).min(span) as usize
    };
    let from = normalize(start);
    let to = normalize(end);
    if from > to {
        (from, from)
    } else {
        (from, to)
    }
}

fn slice(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("slice", 3, args)?;
    let mut bounds = [0i64; 2];
    for (i, value) in args[..2].iter().enumerate() {
        bounds[i] = match value {
            Value::Int(n) => *n,
            other => {
                return Err(ScriptError::UnsupportedOperand {
                    operation: "slice",
                    type_name: other.type_name(),
                })
            }
        };
    }
    match &args[2] {
        Value::List(items) => {
            let (from, to) = clamp(bounds[0], bounds[1], items.len());
            Ok(Value::list(items[from..to].to_vec()))
        }
        Value::Str(s) => {
            let (from, to) = clamp(bounds[0], bounds[1], s.chars().count());
            Ok(Value::Str(s.chars().skip(from).take(to - from).collect()))
        }
        other => Err(ScriptError::UnsupportedOperand {
            operation: "slice",
            type_name: other.type_name(),
        }),
    }
}

fn contains(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("in", 2, args)?;
    let needle = &args[0];
    match &args[1] {
        Value::List(items) => {
            for item in items.iter() {
                if needle.try_eq(item)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Value::Dict(map) => match needle {
            Value::Str(key) => Ok(Value::Bool(map.borrow().contains_key(key))),
            _ => Ok(Value::Bool(false)),
        },
        Value::Str(s) => match needle {
            Value::Str(sub) => Ok(Value::Bool(s.contains(sub.as_str()))),
            other => Err(ScriptError::UnsupportedOperand {
                operation: "in",
                type_name: other.type_name(),
            }),
        },
        other => Err(ScriptError::UnsupportedOperand {
            operation: "in",
            type_name: other.type_name(),
        }),
    }
}

fn del(ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("del", 1, args)?;
    let name = match &args[0] {
        Value::Str(s) => s.clone(),
        Value::Symbol(s) => s.clone(),
        other => {
            return Err(ScriptError::UnsupportedOperand {
                operation: "del",
                type_name: other.type_name(),
            })
        }
    };
    match ctx.remove(&name) {
        Some(_) => Ok(Value::Nil),
        None => Err(ScriptError::UnresolvedSymbol { name }),
    }
}

fn help(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    match args {
        [] => Ok(Value::Str(GENERAL_HELP.to_owned())),
        [Value::Function(function)] => Ok(Value::Str(function.doc.clone())),
        [Value::Builtin(builtin)] => Ok(Value::Str(builtin.doc.to_string())),
        [_] => Ok(Value::Nil),
        _ => Err(ScriptError::WrongArity {
            name: "help".to_owned(),
            expected: 1,
            got: args.len(),
        }),
    }
}

fn source(_ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("source", 1, args)?;
    match &args[0] {
        Value::Function(function) if !function.source.is_empty() => {
            Ok(Value::Str(function.source.to_string()))
        }
        _ => Ok(Value::Nil),
    }
}

fn context(ctx: &mut Context, args: &[Value]) -> Result<Value> {
    check_args("context", 0, args)?;
    let entries = ctx
        .bindings()
        .iter()
        .filter(|(name, _)| !is_builtin(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    Ok(Value::dict(entries))
}

lazy_static! {
    pub static ref BUILTINS: HashMap<&'static str, Entry> = vec![
        Entry {
            name: "+",
            doc: "Sum together all the arguments:\n\n(+ 1 2 3 4)\n10\n\n(All the arguments must be numeric.)",
            func: add,
        },
        Entry {
            name: "-",
            doc: "Starting from the initial value, subtract all subsequent arguments.\n\n(- 10 5 2)\n3\n\n(All the arguments must be numeric.)",
            func: sub,
        },
        Entry {
            name: "*",
            doc: "Multiply all the arguments:\n\n(* 2 3 4)\n24\n\n(All the arguments must be numeric.)",
            func: mul,
        },
        Entry {
            name: "/",
            doc: "Divide the first argument (numerator) by the second argument (denominator).\n\n(/ 10 2)\n5.0\n\n(All the arguments must be numeric. Always returns a float.)",
            func: div,
        },
        Entry {
            name: "%",
            doc: "Give the remainder from a division (modulo).\n\n(% 10 3)\n1\n\n(There must only be two numeric arguments.)",
            func: modulo,
        },
        Entry {
            name: "<",
            doc: "Indicate if the first argument is less than the second argument.\n\n(< 10 100)\ntrue",
            func: lt,
        },
        Entry {
            name: ">",
            doc: "Indicate if the first argument is greater than the second argument.\n\n(> 10 1)\ntrue",
            func: gt,
        },
        Entry {
            name: ">=",
            doc: "Indicate if the first argument is greater than or equal to the second argument.\n\n(>= 3 3)\ntrue",
            func: ge,
        },
        Entry {
            name: "<=",
            doc: "Indicate if the first argument is less than or equal to the second argument.\n\n(<= 2 3)\ntrue",
            func: le,
        },
        Entry {
            name: "==",
            doc: "Indicate if the two arguments are equal.\n\n(== 2 2)\ntrue",
            func: eq,
        },
        Entry {
            name: "!=",
            doc: "Indicate if the two arguments are not equal.\n\n(!= 2 3)\ntrue",
            func: ne,
        },
        Entry {
            name: "and",
            doc: "Indicate if every argument is truthy.\n\n(and true true)\ntrue",
            func: and,
        },
        Entry {
            name: "or",
            doc: "Indicate if any argument is truthy.\n\n(or false true)\ntrue",
            func: or,
        },
        Entry {
            name: "not",
            doc: "Invert the truthiness of the argument.\n\n(not false)\ntrue",
            func: not,
        },
        Entry {
            name: "int",
            doc: "Convert the argument to an integer.\n\n(int \"3\")\n3\n\n(Fractions are discarded, so (int 3.9) gives 3.)",
            func: to_int,
        },
        Entry {
            name: "float",
            doc: "Convert the argument to a float.\n\n(float \"1.5\")\n1.5",
            func: to_float,
        },
        Entry {
            name: "str",
            doc: "Convert the argument to a string.\n\n(str 3.5)\n\"3.5\"",
            func: to_str,
        },
        Entry {
            name: "bool",
            doc: "Convert the argument to a boolean using its truthiness.\n\n(bool ())\nfalse",
            func: to_bool,
        },
        Entry {
            name: "len",
            doc: "Return the length of a collection:\n\n(len '(1 2 3))\n3\n(len \"hello\")\n5",
            func: len,
        },
        Entry {
            name: "first",
            doc: "Return the first element of a list or string.\n\n(= mylist '(0 1 2 3 4))\n(first mylist)\n0\n\n(first \"hello\")\n\"h\"",
            func: first,
        },
        Entry {
            name: "last",
            doc: "Return the last element of a list or string.\n\n(= mylist '(0 1 2 3 4))\n(last mylist)\n4\n\n(last \"hello\")\n\"o\"",
            func: last,
        },
        Entry {
            name: "body",
            doc: "Return all the elements of a list or string after the first element.\n\n(= mylist '(0 1 2 3 4))\n(body mylist)\n(1 2 3 4)\n\n(body \"hello\")\n\"ello\"",
            func: body,
        },
        Entry {
            name: "item",
            doc: "Return the element at the specified position in a list or string.\nNOTE: position starts counting from 0 (zero), and a negative\nposition counts back from the end.\n\n(= mylist '(0 1 2 3 4))\n(item 0 mylist)\n0\n\n(item 0 \"hello\")\n\"h\"",
            func: item,
        },
        Entry {
            name: "slice",
            doc: "Return part of a list or string, from the start position up to but\nnot including the end position.\n\n(= mylist '(0 1 2 3 4))\n(slice 1 3 mylist)\n(1 2)\n\n(slice 1 3 \"hello\")\n\"el\"",
            func: slice,
        },
        Entry {
            name: "in",
            doc: "Indicate if the first argument is found inside the second.\n\n(in 2 '(1 2 3))\ntrue\n(in \"ell\" \"hello\")\ntrue",
            func: contains,
        },
        Entry {
            name: "del",
            doc: "Remove a binding from the context, by name.\n\n(del 'foo)\nnil",
            func: del,
        },
        Entry {
            name: "help",
            doc: "Show what a function does.\n\n(help len)\n\nWith no argument, show general help instead.",
            func: help,
        },
        Entry {
            name: "context",
            doc: "Return the current context as a dictionary, without the builtins.",
            func: context,
        },
        Entry {
            name: "source",
            doc: "Return a string representation of the source code of a user defined function.",
            func: source,
        },
    ]
    .into_iter()
    .map(|entry| (entry.name, entry))
    .collect();
}

/// Install the builtin table, plus the boolean constants, into a
/// binding store. Existing bindings with the same names are replaced.
pub(crate) fn install(store: &mut HashMap<String, Value>) {
    store.insert("true".to_owned(), Value::Bool(true));
    store.insert("false".to_owned(), Value::Bool(false));
    for entry in BUILTINS.values() {
        store.insert(
            entry.name.to_owned(),
            Value::Builtin(Builtin::new(entry.name, entry.doc, entry.func)),
        );
    }
}

/// Whether a name belongs to the builtin table (or a boolean constant)
/// and is therefore protected from `def`.
pub fn is_builtin(name: &str) -> bool {
    matches!(name, "true" | "false") || BUILTINS.contains_key(name)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::MAX_EQ_DEPTH;

    fn call(f: BuiltinFn, args: Vec<Value>) -> Result<Value> {
        let mut ctx = Context::new();
        f(&mut ctx, &args)
    }

    #[test]
    fn test_add() {
        let cases = vec![
            (vec![], Value::Int(0)),
            (vec![Value::Int(1), Value::Int(2), Value::Int(3)], Value::Int(6)),
            (vec![Value::Int(1), Value::Float(2.5)], Value::Float(3.5)),
            (vec![Value::Float(0.5), Value::Float(0.25)], Value::Float(0.75)),
        ];

        for (args, expected) in cases.into_iter() {
            assert_eq!(call(add, args).expect("add failed"), expected);
        }
    }

    #[test]
    fn test_sub_and_mul_fold_from_the_left() {
        assert_eq!(
            call(sub, vec![Value::Int(10), Value::Int(5), Value::Int(2)]).unwrap(),
            Value::Int(3)
        );
        assert_eq!(call(sub, vec![Value::Int(5)]).unwrap(), Value::Int(5));
        assert_eq!(
            call(mul, vec![Value::Int(2), Value::Int(3), Value::Int(4)]).unwrap(),
            Value::Int(24)
        );
        assert_eq!(
            call(sub, vec![]).unwrap_err(),
            ScriptError::WrongArity {
                name: "-".to_owned(),
                expected: 1,
                got: 0,
            }
        );
    }

    #[test]
    fn test_arithmetic_rejects_non_numbers() {
        assert_eq!(
            call(add, vec![Value::Int(1), Value::Str("x".to_owned())]).unwrap_err(),
            ScriptError::UnsupportedOperand {
                operation: "+",
                type_name: "string",
            }
        );
    }

    #[test]
    fn test_div_always_returns_float() {
        assert_eq!(
            call(div, vec![Value::Int(10), Value::Int(2)]).unwrap(),
            Value::Float(5.0)
        );
        assert_eq!(
            call(div, vec![Value::Int(1), Value::Int(0)]).unwrap_err(),
            ScriptError::DivisionByZero
        );
    }

    #[test]
    fn test_modulo_takes_sign_of_divisor() {
        let cases = vec![
            (Value::Int(10), Value::Int(3), Value::Int(1)),
            (Value::Int(-7), Value::Int(3), Value::Int(2)),
            (Value::Int(7), Value::Int(-3), Value::Int(-2)),
            (Value::Float(10.5), Value::Int(3), Value::Float(1.5)),
            (Value::Float(-7.0), Value::Float(3.0), Value::Float(2.0)),
        ];

        for (a, b, expected) in cases.into_iter() {
            assert_eq!(call(modulo, vec![a, b]).expect("modulo failed"), expected);
        }

        assert_eq!(
            call(modulo, vec![Value::Int(1), Value::Int(0)]).unwrap_err(),
            ScriptError::DivisionByZero
        );
    }

    #[test]
    fn test_comparisons() {
        let cases = vec![
            (lt as BuiltinFn, Value::Int(1), Value::Int(2), true),
            (lt, Value::Int(2), Value::Int(2), false),
            (lt, Value::Float(1.5), Value::Int(2), true),
            (lt, Value::Str("apple".to_owned()), Value::Str("pear".to_owned()), true),
            (gt, Value::Int(3), Value::Int(2), true),
            (ge, Value::Int(2), Value::Int(2), true),
            (ge, Value::Int(1), Value::Int(2), false),
            (le, Value::Int(2), Value::Int(2), true),
            (le, Value::Int(3), Value::Int(2), false),
        ];

        for (f, a, b, expected) in cases.into_iter() {
            assert_eq!(call(f, vec![a, b]).expect("comparison failed"), Value::Bool(expected));
        }

        assert_eq!(
            call(lt, vec![Value::Str("a".to_owned()), Value::Int(1)]).unwrap_err(),
            ScriptError::UnsupportedOperand {
                operation: "<",
                type_name: "string",
            }
        );
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            call(eq, vec![Value::Int(2), Value::Int(2)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call(eq, vec![Value::Int(1), Value::Float(1.0)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call(eq, vec![Value::Bool(true), Value::Int(1)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call(ne, vec![Value::Bool(false), Value::Int(0)]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            call(ne, vec![Value::Str("a".to_owned()), Value::Str("b".to_owned())]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call(eq, vec![Value::list(vec![Value::Int(1)]), Value::list(vec![Value::Int(1)])])
                .unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_equality_of_cyclic_dicts_is_an_error() {
        let a = Value::dict(HashMap::new());
        let b = Value::dict(HashMap::new());
        if let (Value::Dict(x), Value::Dict(y)) = (&a, &b) {
            x.borrow_mut().insert("me".to_owned(), a.clone());
            y.borrow_mut().insert("me".to_owned(), b.clone());
        }

        assert_eq!(
            call(eq, vec![a.clone(), b.clone()]).unwrap_err(),
            ScriptError::RecursionLimit { depth: MAX_EQ_DEPTH }
        );
        assert_eq!(
            call(contains, vec![a.clone(), Value::list(vec![b])]).unwrap_err(),
            ScriptError::RecursionLimit { depth: MAX_EQ_DEPTH }
        );
        // A dictionary is still found by identity.
        assert_eq!(
            call(contains, vec![a.clone(), Value::list(vec![a])]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_logic() {
        assert_eq!(
            call(and, vec![Value::Bool(true), Value::Int(1)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call(and, vec![Value::Bool(true), Value::Int(0)]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            call(or, vec![Value::Bool(false), Value::Str("x".to_owned())]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(call(not, vec![Value::Nil]).unwrap(), Value::Bool(true));
        assert_eq!(call(and, vec![]).unwrap(), Value::Bool(true));
        assert_eq!(call(or, vec![]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_conversions() {
        let cases = vec![
            (to_int as BuiltinFn, Value::Str("3".to_owned()), Value::Int(3)),
            (to_int, Value::Str(" 42 ".to_owned()), Value::Int(42)),
            (to_int, Value::Float(3.9), Value::Int(3)),
            (to_int, Value::Float(-3.9), Value::Int(-3)),
            (to_int, Value::Bool(true), Value::Int(1)),
            (to_float, Value::Int(2), Value::Float(2.0)),
            (to_float, Value::Str("1.5e3".to_owned()), Value::Float(1500.0)),
            (to_str, Value::Float(3.5), Value::Str("3.5".to_owned())),
            (to_str, Value::Str("x".to_owned()), Value::Str("x".to_owned())),
            (
                to_str,
                Value::list(vec![Value::Int(1), Value::Str("a".to_owned())]),
                Value::Str("(1 \"a\")".to_owned()),
            ),
            (to_bool, Value::Int(0), Value::Bool(false)),
            (to_bool, Value::Str("x".to_owned()), Value::Bool(true)),
        ];

        for (f, arg, expected) in cases.into_iter() {
            assert_eq!(call(f, vec![arg]).expect("conversion failed"), expected);
        }

        assert_eq!(
            call(to_int, vec![Value::Str("3.5".to_owned())]).unwrap_err(),
            ScriptError::CannotConvert {
                value: "\"3.5\"".to_owned(),
                target: "integer",
            }
        );
        assert!(call(to_int, vec![Value::Nil]).is_err());
        assert!(call(to_float, vec![Value::list(vec![])]).is_err());
    }

    #[test]
    fn test_len() {
        let mut entries = HashMap::new();
        entries.insert("a".to_owned(), Value::Int(1));

        let cases = vec![
            (Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]), 3),
            (Value::Str("hello".to_owned()), 5),
            (Value::Str("héllo".to_owned()), 5),
            (Value::dict(entries), 1),
        ];

        for (arg, expected) in cases.into_iter() {
            assert_eq!(call(len, vec![arg]).expect("len failed"), Value::Int(expected));
        }

        assert!(call(len, vec![Value::Int(5)]).is_err());
    }

    #[test]
    fn test_first_last_body() {
        let mylist = Value::list(vec![Value::Int(0), Value::Int(1), Value::Int(2)]);

        assert_eq!(call(first, vec![mylist.clone()]).unwrap(), Value::Int(0));
        assert_eq!(call(last, vec![mylist.clone()]).unwrap(), Value::Int(2));
        assert_eq!(
            call(body, vec![mylist]).unwrap(),
            Value::list(vec![Value::Int(1), Value::Int(2)])
        );

        assert_eq!(
            call(first, vec![Value::Str("hello".to_owned())]).unwrap(),
            Value::Str("h".to_owned())
        );
        assert_eq!(
            call(last, vec![Value::Str("hello".to_owned())]).unwrap(),
            Value::Str("o".to_owned())
        );
        assert_eq!(
            call(body, vec![Value::Str("hello".to_owned())]).unwrap(),
            Value::Str("ello".to_owned())
        );

        assert!(call(first, vec![Value::list(vec![])]).is_err());
        assert!(call(last, vec![Value::Str("".to_owned())]).is_err());
        assert_eq!(call(body, vec![Value::list(vec![])]).unwrap(), Value::list(vec![]));
        assert_eq!(
            call(body, vec![Value::Str("".to_owned())]).unwrap(),
            Value::Str("".to_owned())
        );
    }

    #[test]
    fn test_item() {
        let mylist = Value::list(vec![Value::Int(10), Value::Int(20), Value::Int(30)]);

        assert_eq!(
            call(item, vec![Value::Int(0), mylist.clone()]).unwrap(),
            Value::Int(10)
        );
        assert_eq!(
            call(item, vec![Value::Int(-1), mylist.clone()]).unwrap(),
            Value::Int(30)
        );
        assert_eq!(
            call(item, vec![Value::Int(1), Value::Str("hello".to_owned())]).unwrap(),
            Value::Str("e".to_owned())
        );
        assert_eq!(
            call(item, vec![Value::Int(3), mylist.clone()]).unwrap_err(),
            ScriptError::IndexOutOfRange {
                index: 3,
                length: 3,
            }
        );
        assert_eq!(
            call(item, vec![Value::Int(-4), mylist]).unwrap_err(),
            ScriptError::IndexOutOfRange {
                index: -4,
                length: 3,
            }
        );
        assert!(call(item, vec![Value::Str("x".to_owned()), Value::list(vec![])]).is_err());
    }

    #[test]
    fn test_slice() {
        let mylist = Value::list(vec![
            Value::Int(0),
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::Int(4),
        ]);

        let cases = vec![
            (1, 3, Value::list(vec![Value::Int(1), Value::Int(2)])),
            (0, 99, mylist.clone()),
            (-2, 99, Value::list(vec![Value::Int(3), Value::Int(4)])),
            (3, 1, Value::list(vec![])),
            (-99, 2, Value::list(vec![Value::Int(0), Value::Int(1)])),
        ];

        for (from, to, expected) in cases.into_iter() {
            assert_eq!(
                call(slice, vec![Value::Int(from), Value::Int(to), mylist.clone()])
                    .expect("slice failed"),
                expected,
                "({} {})",
                from,
                to
            );
        }

        assert_eq!(
            call(
                slice,
                vec![
                    Value::Int(1),
                    Value::Int(3),
                    Value::Str("hello".to_owned())
                ]
            )
            .unwrap(),
            Value::Str("el".to_owned())
        );
    }

    #[test]
    fn test_in() {
        let mut entries = HashMap::new();
        entries.insert("bar".to_owned(), Value::Int(1));

        assert_eq!(
            call(
                contains,
                vec![
                    Value::Int(2),
                    Value::list(vec![Value::Int(1), Value::Int(2)])
                ]
            )
            .unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call(
                contains,
                vec![Value::Bool(true), Value::list(vec![Value::Int(1)])]
            )
            .unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call(
                contains,
                vec![Value::Str("bar".to_owned()), Value::dict(entries.clone())]
            )
            .unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call(contains, vec![Value::Int(1), Value::dict(entries)]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            call(
                contains,
                vec![
                    Value::Str("ell".to_owned()),
                    Value::Str("hello".to_owned())
                ]
            )
            .unwrap(),
            Value::Bool(true)
        );
        assert!(call(contains, vec![Value::Int(1), Value::Int(2)]).is_err());
    }

    #[test]
    fn test_del() {
        let mut ctx = Context::new();
        ctx.set("foo", Value::Int(1));

        assert_eq!(del(&mut ctx, &[Value::symbol("foo")]).unwrap(), Value::Nil);
        assert_eq!(ctx.get("foo"), None);

        assert_eq!(
            del(&mut ctx, &[Value::Str("foo".to_owned())]).unwrap_err(),
            ScriptError::UnresolvedSymbol {
                name: "foo".to_owned(),
            }
        );
    }

    #[test]
    fn test_help() {
        let mut ctx = Context::new();

        let len_builtin = ctx.get("len").expect("len is installed");
        match help(&mut ctx, &[len_builtin]).unwrap() {
            Value::Str(text) => assert!(text.contains("length")),
            other => panic!("expected text, got {}", other.repr()),
        }

        match help(&mut ctx, &[]).unwrap() {
            Value::Str(text) => assert!(text.contains("(help")),
            other => panic!("expected text, got {}", other.repr()),
        }

        assert_eq!(help(&mut ctx, &[Value::Int(1)]).unwrap(), Value::Nil);
        assert!(help(&mut ctx, &[Value::Int(1), Value::Int(2)]).is_err());
    }

    #[test]
    fn test_source_of_a_builtin_is_nil() {
        let mut ctx = Context::new();
        let len_builtin = ctx.get("len").expect("len is installed");

        assert_eq!(source(&mut ctx, &[len_builtin]).unwrap(), Value::Nil);
        assert_eq!(source(&mut ctx, &[Value::Int(1)]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_context_filters_builtins() {
        let mut ctx = Context::new();
        ctx.set("score", Value::Int(42));
        ctx.set("emit", Value::Builtin(Builtin::new("emit", "send text", |_, _| Ok(Value::Nil))));

        let snapshot = context(&mut ctx, &[]).unwrap();
        match snapshot {
            Value::Dict(map) => {
                let map = map.borrow();
                assert_eq!(map.get("score"), Some(&Value::Int(42)));
                assert!(map.contains_key("emit"));
                assert!(!map.contains_key("+"));
                assert!(!map.contains_key("true"));
            }
            other => panic!("expected a dictionary, got {}", other.repr()),
        }
    }

    #[test]
    fn test_is_builtin() {
        assert!(is_builtin("+"));
        assert!(is_builtin("true"));
        assert!(is_builtin("context"));
        assert!(!is_builtin("emit"));
        assert!(!is_builtin("score"));
    }
}
