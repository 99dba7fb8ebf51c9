use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::{
    diagnostics::{Diagnostic, QuillError},
    value::Value,
};

pub type EnvironmentRef = Rc<RefCell<Environment>>;

/// One frame of the lexical scope chain.
#[derive(Default)]
pub struct Environment {
    parent: Option<EnvironmentRef>,
    bindings: IndexMap<String, Binding>,
}

impl Environment {
    pub fn new() -> EnvironmentRef {
        Rc::new(RefCell::new(Self {
            parent: None,
            bindings: IndexMap::new(),
        }))
    }

    pub fn with_parent(parent: EnvironmentRef) -> EnvironmentRef {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            bindings: IndexMap::new(),
        }))
    }

    /// Installs or overwrites `name` in this frame.
    pub fn define(&mut self, name: impl Into<String>, binding: Binding) {
        self.bindings.insert(name.into(), binding);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Overwrites the nearest existing binding of `name`; never creates one.
    pub fn assign(env: &EnvironmentRef, name: &str, value: Value) -> Result<(), QuillError> {
        if let Some(binding) = env.borrow_mut().bindings.get_mut(name) {
            *binding = Binding::Value(value);
            return Ok(());
        }
        let parent = env.borrow().parent.clone();
        match parent {
            Some(parent) => Environment::assign(&parent, name, value),
            None => Err(QuillError::from(Diagnostic::unbound(name))),
        }
    }

    /// Finds the nearest binding of `name`, returning it with the frame that holds it.
    pub fn lookup(env: &EnvironmentRef, name: &str) -> Result<(Binding, EnvironmentRef), QuillError> {
        if let Some(binding) = env.borrow().bindings.get(name) {
            return Ok((binding.clone(), Rc::clone(env)));
        }
        let parent = env.borrow().parent.clone();
        match parent {
            Some(parent) => Environment::lookup(&parent, name),
            None => Err(QuillError::from(Diagnostic::unbound(name))),
        }
    }

    /// Replaces a deferred binding in this exact frame with its evaluated result and
    /// returns what the binding now holds. A `set!` made while the expression was being
    /// evaluated is kept and returned instead of `value`.
    pub fn force(&mut self, name: &str, value: Value) -> Value {
        match self.bindings.get_mut(name) {
            Some(Binding::Value(current)) => current.clone(),
            Some(binding) => {
                *binding = Binding::Value(value.clone());
                value
            }
            None => value,
        }
    }
}

#[derive(Clone)]
pub enum Binding {
    /// An evaluated value, returned as-is on lookup.
    Value(Value),
    /// An expression from `define` or `let`, evaluated in its owning frame on first lookup.
    Deferred(Value),
}
