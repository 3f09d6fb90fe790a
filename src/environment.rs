use crate::ast::Value;
use crate::builtins;
use crate::error::{Result, ScriptError};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Default ceiling on nested evaluation frames.
pub const MAX_DEPTH: usize = 256;

/// Shared resource meter for one evaluation. Cloning hands out another
/// handle to the same meter, so every call scope draws from the same
/// allowance.
#[derive(Debug, Clone)]
pub struct Budget {
    inner: Rc<Meter>,
}

#[derive(Debug)]
struct Meter {
    steps: Cell<Option<u64>>,
    allowance: u64,
    depth: Cell<usize>,
    max_depth: usize,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::build(None, MAX_DEPTH)
    }

    pub fn steps(allowance: u64) -> Self {
        Self::build(Some(allowance), MAX_DEPTH)
    }

    pub fn with_max_depth(self, max_depth: usize) -> Self {
        Self::build(self.inner.steps.get(), max_depth)
    }

    fn build(steps: Option<u64>, max_depth: usize) -> Self {
        Self {
            inner: Rc::new(Meter {
                steps: Cell::new(steps),
                allowance: steps.unwrap_or(0),
                depth: Cell::new(0),
                max_depth,
            }),
        }
    }

    pub(crate) fn spend(&self) -> Result<()> {
        if let Some(remaining) = self.inner.steps.get() {
            if remaining == 0 {
                return Err(ScriptError::BudgetExhausted {
                    steps: self.inner.allowance,
                });
            }
            self.inner.steps.set(Some(remaining - 1));
        }
        Ok(())
    }

    pub(crate) fn enter(&self) -> Result<Frame> {
        let depth = self.inner.depth.get() + 1;
        if depth > self.inner.max_depth {
            return Err(ScriptError::RecursionLimit {
                depth: self.inner.max_depth,
            });
        }
        self.inner.depth.set(depth);
        Ok(Frame {
            budget: self.clone(),
        })
    }
}

/// Live evaluation frame; dropping it releases the depth it claimed.
#[derive(Debug)]
pub(crate) struct Frame {
    budget: Budget,
}

impl Drop for Frame {
    fn drop(&mut self) {
        let depth = self.budget.inner.depth.get();
        self.budget.inner.depth.set(depth.saturating_sub(1));
    }
}

/// The bindings a script runs against, plus the budget it spends.
/// Hosts seed one with the objects a script may touch and any extra
/// natives they want to expose, then hand it to `run`.
#[derive(Debug, Clone)]
pub struct Context {
    store: HashMap<String, Value>,
    budget: Budget,
    source: Rc<str>,
    protect_builtins: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_budget(Budget::unlimited())
    }

    pub fn with_budget(budget: Budget) -> Self {
        let mut ctx = Self {
            store: HashMap::new(),
            budget,
            source: Rc::from(""),
            protect_builtins: false,
        };
        ctx.merge_builtins();
        ctx
    }

    /// The scope a function call runs in: a copy of the caller's
    /// bindings drawing on the same budget. Writes stay in the copy,
    /// while dictionary values keep aliasing the caller's.
    pub fn call_scope(&self) -> Self {
        Self {
            store: self.store.clone(),
            budget: self.budget.clone(),
            source: self.source.clone(),
            protect_builtins: self.protect_builtins,
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.store.get(name).cloned()
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.store.insert(name.to_owned(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.store.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.contains_key(name)
    }

    /// By default `=` may shadow a builtin name for the rest of the
    /// run, while `def` on one is always rejected. Turning protection
    /// on extends the rejection to `=` as well.
    pub fn protect_builtins(&mut self, protect: bool) {
        self.protect_builtins = protect;
    }

    pub(crate) fn builtins_protected(&self) -> bool {
        self.protect_builtins
    }

    /// Reinstall the builtin table. Runs before every program, so a
    /// shadowed builtin only stays shadowed for the rest of its run.
    pub(crate) fn merge_builtins(&mut self) {
        builtins::install(&mut self.store);
    }

    pub(crate) fn budget(&self) -> &Budget {
        &self.budget
    }

    pub(crate) fn set_source(&mut self, source: &str) {
        self.source = Rc::from(source);
    }

    pub(crate) fn source(&self) -> Rc<str> {
        self.source.clone()
    }

    pub(crate) fn bindings(&self) -> &HashMap<String, Value> {
        &self.store
    }
}
