//! Lexical environments: a persistent, `Rc`-linked stack of local frames
//! sharing one mutable global frame.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use fxhash::FxBuildHasher;

use crate::error::{EvalError, EvalErrorKind, Result};
use crate::value::Value;

type GlobalFrame = Rc<RefCell<HashMap<Rc<str>, Value, FxBuildHasher>>>;

/// A single local binding, linked to its parent. Extending an `Env` never
/// mutates the parent: it allocates one new link and shares the rest of the
/// spine with whoever else holds it (closures captured earlier stay valid).
/// The slot itself is `RefCell`-backed so `set!` can mutate a binding that
/// multiple `Env` handles still see.
struct Local {
    name: Rc<str>,
    slot: RefCell<Value>,
    parent: Option<Rc<Local>>,
}

/// A lexical environment: an optional chain of local bindings, plus the one
/// global frame shared by every `Env` in the interpreter.
#[derive(Clone)]
pub struct Env {
    locals: Option<Rc<Local>>,
    globals: GlobalFrame,
}

impl Env {
    /// A fresh top-level environment: no locals, an empty global frame.
    pub fn new_root() -> Self {
        Self {
            locals: None,
            globals: Rc::new(RefCell::new(HashMap::default())),
        }
    }

    /// Pushes one new local binding in front of this environment's locals,
    /// leaving `self` untouched (O(1), shares the rest of the spine).
    pub fn extend(&self, name: Rc<str>, value: Value) -> Env {
        Env {
            locals: Some(Rc::new(Local {
                name,
                slot: RefCell::new(value),
                parent: self.locals.clone(),
            })),
            globals: self.globals.clone(),
        }
    }

    /// Pushes several bindings at once, in order, so that later names shadow
    /// earlier ones within the same call (matches `let`/`lambda` application
    /// binding all formals against one fresh frame).
    pub fn extend_many(&self, bindings: impl IntoIterator<Item = (Rc<str>, Value)>) -> Env {
        let mut env = self.clone();
        for (name, value) in bindings {
            env = env.extend(name, value);
        }
        env
    }

    /// Looks up `name` in the local chain first, falling back to globals.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut cur = self.locals.as_ref();
        while let Some(link) = cur {
            if &*link.name == name {
                return Some(link.slot.borrow().clone());
            }
            cur = link.parent.as_ref();
        }
        self.globals.borrow().get(name).cloned()
    }

    /// `set!` semantics: mutates an existing local slot in place if `name`
    /// is lexically bound; fails otherwise. Targets only the lexical stack
    /// and never falls through to (or creates) a global binding.
    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        let mut cur = self.locals.as_ref();
        while let Some(link) = cur {
            if &*link.name == name {
                *link.slot.borrow_mut() = value;
                return Ok(());
            }
            cur = link.parent.as_ref();
        }
        Err(EvalError::new(EvalErrorKind::LocalAssignmentToUnbound(
            name.to_string(),
        )))
    }

    /// `define` semantics: always writes the global frame, even when a
    /// lexical binding of the same name is currently visible. `define`
    /// never touches the local chain.
    pub fn define_global(&self, name: Rc<str>, value: Value) {
        self.globals.borrow_mut().insert(name, value);
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// True if `name` names a binding already present in the global frame.
    pub fn is_global(&self, name: &str) -> bool {
        self.globals.borrow().contains_key(name)
    }

    /// Every `(name, value)` pair currently in the global frame. Not used
    /// by the evaluator itself; it exists for a collaborator like
    /// tab-completion that needs to enumerate what's in scope.
    pub fn iter_globals(&self) -> Vec<(Rc<str>, Value)> {
        self.globals
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_prefers_innermost_binding() {
        let root = Env::new_root();
        let outer = root.extend(Rc::from("x"), Value::Int(1));
        let inner = outer.extend(Rc::from("x"), Value::Int(2));
        assert!(matches!(inner.lookup("x"), Some(Value::Int(2))));
        assert!(matches!(outer.lookup("x"), Some(Value::Int(1))));
    }

    #[test]
    fn extend_does_not_mutate_parent() {
        let root = Env::new_root();
        let outer = root.extend(Rc::from("x"), Value::Int(1));
        let _inner = outer.extend(Rc::from("y"), Value::Int(2));
        assert!(outer.lookup("y").is_none());
    }

    #[test]
    fn set_mutates_shared_local_slot() {
        let root = Env::new_root();
        let env = root.extend(Rc::from("x"), Value::Int(1));
        let alias = env.clone();
        env.set("x", Value::Int(42)).unwrap();
        assert!(matches!(alias.lookup("x"), Some(Value::Int(42))));
    }

    #[test]
    fn set_on_unbound_name_errors() {
        let root = Env::new_root();
        assert!(root.set("nope", Value::Nil).is_err());
    }

    #[test]
    fn define_writes_global_even_under_shadowing_local() {
        let root = Env::new_root();
        let shadowed = root.extend(Rc::from("x"), Value::Int(1));
        shadowed.define_global(Rc::from("x"), Value::Int(99));
        assert!(matches!(shadowed.lookup("x"), Some(Value::Int(1))));
        assert!(matches!(root.lookup("x"), Some(Value::Int(99))));
    }
}
