//! Namespace for variable bindings

use super::error::{InterpResult, RuntimeError};
use super::Value;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

/// Shared reference to a namespace
pub type NamespaceRef = Rc<RefCell<Namespace>>;

/// One scope of variable bindings, chained to its enclosing scope
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    /// Variable bindings in this scope
    bindings: HashMap<String, Value>,
    /// Enclosing scope
    parent: Option<NamespaceRef>,
}

impl Namespace {
    /// Create a new root namespace
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root namespace seeded with `bindings`
    pub fn with_bindings(bindings: HashMap<String, Value>) -> Self {
        Namespace {
            bindings,
            parent: None,
        }
    }

    /// Wrap in Rc<RefCell<>>
    pub fn into_ref(self) -> NamespaceRef {
        Rc::new(RefCell::new(self))
    }

    /// Bind `name` in this scope. Fails if this scope already has it.
    pub fn create(&mut self, name: &str, value: Value) -> InterpResult<()> {
        if self.bindings.contains_key(name) {
            return Err(RuntimeError::VariableAlreadyExists(name.to_string()));
        }
        self.bindings.insert(name.to_string(), value);
        Ok(())
    }

    /// Overwrite the nearest binding of `name`, or create it in this scope
    pub fn set(&mut self, name: &str, value: Value) {
        if let Err(value) = self.assign(name, value) {
            self.bindings.insert(name.to_string(), value);
        }
    }

    /// Overwrite an existing binding somewhere in the chain.
    /// Hands the value back if no scope binds `name`.
    fn assign(&mut self, name: &str, value: Value) -> Result<(), Value> {
        if let Some(slot) = self.bindings.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(parent) = &self.parent {
            parent.borrow_mut().assign(name, value)
        } else {
            Err(value)
        }
    }

    /// Look up a variable in the scope chain
    pub fn get(&self, name: &str) -> InterpResult<Value> {
        if let Some(value) = self.bindings.get(name) {
            Ok(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().get(name)
        } else {
            Err(RuntimeError::UndefinedVariable(name.to_string()))
        }
    }

    /// Bindings of this scope only
    pub fn bindings(&self) -> &HashMap<String, Value> {
        &self.bindings
    }

    /// Every name visible from this scope, sorted
    pub fn visible_names(&self) -> BTreeSet<String> {
        let mut names = match &self.parent {
            Some(parent) => parent.borrow().visible_names(),
            None => BTreeSet::new(),
        };
        names.extend(self.bindings.keys().cloned());
        names
    }
}

/// Create a child scope of `parent` seeded with `bindings`
pub fn child_scope(parent: &NamespaceRef, bindings: HashMap<String, Value>) -> NamespaceRef {
    Namespace {
        bindings,
        parent: Some(Rc::clone(parent)),
    }
    .into_ref()
}
