use crate::ast::{Access, DictRef, Function, Value};
use crate::builtins;
use crate::environment::Context;
use crate::error::{Result, ScriptError};
use crate::parser::parse;
use std::collections::HashMap;
use std::rc::Rc;

static DEFAULT_DOC: &str = "A user defined function without any documentation.";

/// Run a fragment of source code against the given context: refresh
/// the builtin table, tokenize, parse and evaluate. The context keeps
/// whatever bindings the program made, whether or not it succeeded.
pub fn run(source: &str, ctx: &mut Context) -> Result<Value> {
    ctx.merge_builtins();
    ctx.set_source(source);
    let program = parse(source)?;
    evaluate(&program, ctx)
}

/// Reduce a parsed value to its result, updating the context in place
/// for assignments and definitions. Every entry here spends one budget
/// step and holds one recursion frame until it returns.
pub fn evaluate(parsed: &Value, ctx: &mut Context) -> Result<Value> {
    ctx.budget().spend()?;
    let _frame = ctx.budget().enter()?;

    match parsed {
        Value::Nil
        | Value::Int(_)
        | Value::Float(_)
        | Value::Bool(_)
        | Value::Str(_)
        | Value::Function(_)
        | Value::Builtin(_) => Ok(parsed.clone()),
        Value::Quoted(inner) => Ok(inner.as_ref().clone()),
        Value::Symbol(name) => ctx.get(name).ok_or_else(|| ScriptError::UnresolvedSymbol {
            name: name.clone(),
        }),
        Value::Dict(map) => {
            // Snapshot the entries first; a value expression is free to
            // touch this same dictionary while it runs.
            let entries: Vec<(String, Value)> = map
                .borrow()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            let mut evaluated = HashMap::with_capacity(entries.len());
            for (key, value) in entries {
                evaluated.insert(key, evaluate(&value, ctx)?);
            }
            Ok(Value::dict(evaluated))
        }
        Value::List(items) => match items.first() {
            None => Ok(Value::Nil),
            Some(Value::Assign) => evaluate_assign(items, ctx),
            Some(Value::Define) => evaluate_define(items, ctx),
            Some(Value::Access(access)) => evaluate_access(access, ctx),
            Some(_) => evaluate_call(items, ctx),
        },
        // A marker or accessor on its own, outside any list, is inert;
        // quoted programs may carry them around as plain data.
        Value::Access(_) | Value::Assign | Value::Define => Ok(Value::Nil),
    }
}

/// (= foo 2) binds foo in the context; (= foo.bar 2) reaches into the
/// dictionary held by foo instead. Either way the value expression is
/// evaluated once, in the enclosing context, and the value returned.
fn evaluate_assign(items: &[Value], ctx: &mut Context) -> Result<Value> {
    match items {
        [_, Value::Access(access)] => {
            let dict = context_dict(&access.object, ctx)?;
            assign_attribute(&dict, &access.path, ctx)
        }
        [_, Value::Symbol(name), expr] => {
            if ctx.builtins_protected() && builtins::is_builtin(name) {
                return Err(ScriptError::RedefineBuiltin { name: name.clone() });
            }
            let value = evaluate(expr, ctx)?;
            ctx.set(name, value.clone());
            Ok(value)
        }
        [_, _, _] => Err(ScriptError::AssignToNonSymbol),
        _ => Err(ScriptError::MalformedAssignment),
    }
}

// The grammar folds the assigned expression into the access path, so
// a path always ends in either a nested accessor or a name/expression
// pair.
fn assign_attribute(dict: &DictRef, path: &[Value], ctx: &mut Context) -> Result<Value> {
    match path {
        [Value::Access(inner)] => {
            let sub = attribute_dict(dict, &inner.object)?;
            assign_attribute(&sub, &inner.path, ctx)
        }
        [Value::Symbol(name), expr] => {
            let value = evaluate(expr, ctx)?;
            dict.borrow_mut().insert(name.clone(), value.clone());
            Ok(value)
        }
        [_, _] => Err(ScriptError::AssignToNonSymbol),
        _ => Err(ScriptError::MalformedAssignment),
    }
}

/// (def name "doc" (parameters) statements...) builds a function value
/// and binds it in the current context. The body is shape-checked here
/// but only runs when the function is called.
fn evaluate_define(items: &[Value], ctx: &mut Context) -> Result<Value> {
    if items.len() < 4 {
        return Err(ScriptError::MalformedDefinition {
            reason: "not enough arguments",
        });
    }
    let name = match &items[1] {
        Value::Symbol(name) => name.clone(),
        _ => {
            return Err(ScriptError::MalformedDefinition {
                reason: "the name must be a symbol",
            })
        }
    };
    if builtins::is_builtin(&name) {
        return Err(ScriptError::RedefineBuiltin { name });
    }

    let (doc, parameters, statements) = match &items[2] {
        Value::Str(doc) => (doc.clone(), &items[3], &items[4..]),
        Value::List(_) => (DEFAULT_DOC.to_owned(), &items[2], &items[3..]),
        _ => {
            return Err(ScriptError::MalformedDefinition {
                reason: "expected a docstring or a parameter list",
            })
        }
    };

    let parameters = parameter_names(parameters)?;
    if statements.is_empty() {
        return Err(ScriptError::MalformedDefinition {
            reason: "a function needs at least one statement",
        });
    }
    if statements
        .iter()
        .any(|statement| !matches!(statement, Value::List(_)))
    {
        return Err(ScriptError::MalformedDefinition {
            reason: "statements must be executable lists",
        });
    }

    let function = Function {
        name: name.clone(),
        doc,
        parameters,
        body: statements.to_vec(),
        source: ctx.source(),
    };
    ctx.set(&name, Value::Function(Rc::new(function)));
    Ok(Value::Nil)
}

fn parameter_names(parameters: &Value) -> Result<Vec<String>> {
    let items = match parameters {
        Value::List(items) => items,
        _ => {
            return Err(ScriptError::MalformedDefinition {
                reason: "parameters must be a list",
            })
        }
    };
    items
        .iter()
        .map(|parameter| match parameter {
            Value::Symbol(name) => Ok(name.clone()),
            _ => Err(ScriptError::MalformedDefinition {
                reason: "parameters must be symbols",
            }),
        })
        .collect()
}

/// (foo.bar) reads attribute bar from the dictionary held by foo,
/// descending through nested accessors for forms like (a.b.c).
fn evaluate_access(access: &Access, ctx: &Context) -> Result<Value> {
    let dict = context_dict(&access.object, ctx)?;
    read_attribute(&dict, &access.path)
}

fn read_attribute(dict: &DictRef, path: &[Value]) -> Result<Value> {
    match path.first() {
        Some(Value::Access(inner)) => {
            let sub = attribute_dict(dict, &inner.object)?;
            read_attribute(&sub, &inner.path)
        }
        Some(Value::Symbol(name)) => {
            dict.borrow()
                .get(name)
                .cloned()
                .ok_or_else(|| ScriptError::UnknownAttribute { name: name.clone() })
        }
        _ => Err(ScriptError::AttributeNotSymbol),
    }
}

fn context_dict(name: &str, ctx: &Context) -> Result<DictRef> {
    match ctx.get(name) {
        Some(Value::Dict(map)) => Ok(map),
        Some(_) => Err(ScriptError::NotADict {
            name: name.to_owned(),
        }),
        None => Err(ScriptError::UnresolvedSymbol {
            name: name.to_owned(),
        }),
    }
}

fn attribute_dict(dict: &DictRef, name: &str) -> Result<DictRef> {
    match dict.borrow().get(name).cloned() {
        Some(Value::Dict(map)) => Ok(map),
        Some(_) => Err(ScriptError::NotADict {
            name: name.to_owned(),
        }),
        None => Err(ScriptError::UnknownAttribute {
            name: name.to_owned(),
        }),
    }
}

// The head must already be callable before any argument runs; builtins
// then get the live context so that the mutating ones work on it.
fn evaluate_call(items: &[Value], ctx: &mut Context) -> Result<Value> {
    let head = &items[0];
    match evaluate(head, ctx)? {
        Value::Function(function) => {
            let args = evaluate_arguments(&items[1..], ctx)?;
            apply_function(&function, args, ctx)
        }
        Value::Builtin(builtin) => {
            let args = evaluate_arguments(&items[1..], ctx)?;
            builtin.call(ctx, &args)
        }
        _ => Err(ScriptError::NotCallable {
            target: head.repr(),
        }),
    }
}

fn evaluate_arguments(items: &[Value], ctx: &mut Context) -> Result<Vec<Value>> {
    let mut args = Vec::with_capacity(items.len());
    for item in items {
        args.push(evaluate(item, ctx)?);
    }
    Ok(args)
}

/// Calling a user function checks the arity exactly, copies the scope
/// active at the call site, binds the parameters into the copy and
/// runs the body; the last statement's value is the result.
fn apply_function(function: &Function, args: Vec<Value>, ctx: &Context) -> Result<Value> {
    if args.len() != function.parameters.len() {
        return Err(ScriptError::WrongArity {
            name: function.name.clone(),
            expected: function.parameters.len(),
            got: args.len(),
        });
    }

    let mut scope = ctx.call_scope();
    for (parameter, arg) in function.parameters.iter().zip(args) {
        scope.set(parameter, arg);
    }

    let mut result = Value::Nil;
    for statement in &function.body {
        result = evaluate(statement, &mut scope)?;
    }
    Ok(result)
}
