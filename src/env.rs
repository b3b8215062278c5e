//! Chained variable scopes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::diag::{RuntimeError, RuntimeErrorKind};
use crate::token::Token;
use crate::value::Value;

/// One scope of bindings plus a link to its lexically enclosing scope.
///
/// Several children may share a parent; a parent never points at a child.
#[derive(Debug)]
pub struct Env {
    parent: Option<Rc<Env>>,
    bindings: RefCell<HashMap<String, Value>>,
}

impl Env {
    /// Creates a root (global) scope.
    pub fn new() -> Rc<Env> {
        Self::with_parent(None)
    }

    pub fn with_parent(parent: Option<Rc<Env>>) -> Rc<Env> {
        Rc::new(Env {
            parent,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Bind `name` in this scope, replacing any earlier binding of the same name here.
    pub fn define(&self, name: &str, val: Value) {
        self.bindings.borrow_mut().insert(name.to_owned(), val);
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(v) = self.bindings.borrow().get(&name.lexeme) {
            return Ok(v.clone());
        }
        match &self.parent {
            Some(parent) => parent.get(name),
            None => Err(RuntimeError::at(
                name,
                RuntimeErrorKind::UndefinedVar(name.lexeme.clone()),
            )),
        }
    }

    /// Update the nearest existing binding of `name`.  Never creates one.
    pub fn assign(&self, name: &Token, val: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.bindings.borrow_mut().get_mut(&name.lexeme) {
            *slot = val;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, val),
            None => Err(RuntimeError::at(
                name,
                RuntimeErrorKind::UnknownAssignTarget(name.lexeme.clone()),
            )),
        }
    }
}
