// ABOUTME: Lexical environment chain for variable bindings and scopes

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a new global environment with no parent.
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// Creates a new child environment with a parent.
    pub fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Defines a binding in THIS scope. Returns `false` (and leaves the
    /// existing binding untouched) if `name` is already bound here — the
    /// caller is responsible for turning that into an `IdentifierError`,
    /// since only it has the offending token.
    pub fn define(&self, name: &str, value: Value) -> bool {
        let mut bindings = self.bindings.borrow_mut();
        if bindings.contains_key(name) {
            return false;
        }
        bindings.insert(name.to_string(), value);
        true
    }

    /// Defines a native intrinsic into the global scope unconditionally,
    /// used once at interpreter construction time so a fixed startup name
    /// (`clock`) can never collide with a user redeclaration error.
    pub fn define_native(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Looks up a symbol in this scope and parent scopes recursively.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Assigns to an existing binding, walking the parent chain. Returns
    /// `false` if `name` is unbound anywhere in the chain.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    /// Walks exactly `distance` parent links, per the resolver's recorded
    /// lexical distance for a variable reference.
    pub fn ancestor(self: &Rc<Self>, distance: usize) -> Rc<Environment> {
        let mut env = Rc::clone(self);
        for _ in 0..distance {
            env = Rc::clone(env.parent.as_ref().expect("resolver distance exceeds environment depth"));
        }
        env
    }

    pub fn get_at(self: &Rc<Self>, distance: usize, name: &str) -> Option<Value> {
        self.ancestor(distance).bindings.borrow().get(name).cloned()
    }

    pub fn assign_at(self: &Rc<Self>, distance: usize, name: &str, value: Value) -> bool {
        let target = self.ancestor(distance);
        let mut bindings = target.bindings.borrow_mut();
        if bindings.contains_key(name) {
            bindings.insert(name.to_string(), value);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_get() {
        let env = Environment::new();
        assert!(env.define("x", Value::Number(42.0)));
        assert_eq!(env.get("x"), Some(Value::Number(42.0)));
    }

    #[test]
    fn redefining_in_same_scope_fails() {
        let env = Environment::new();
        assert!(env.define("x", Value::Number(1.0)));
        assert!(!env.define("x", Value::Number(2.0)));
        assert_eq!(env.get("x"), Some(Value::Number(1.0)));
    }

    #[test]
    fn child_scope_may_shadow_parent() {
        let parent = Environment::new();
        parent.define("x", Value::Number(42.0));
        let child = Environment::with_parent(Rc::clone(&parent));
        assert!(child.define("x", Value::Number(100.0)));
        assert_eq!(child.get("x"), Some(Value::Number(100.0)));
        assert_eq!(parent.get("x"), Some(Value::Number(42.0)));
    }

    #[test]
    fn assign_walks_up_to_declaring_scope() {
        let parent = Environment::new();
        parent.define("x", Value::Number(1.0));
        let child = Environment::with_parent(Rc::clone(&parent));
        assert!(child.assign("x", Value::Number(2.0)));
        assert_eq!(parent.get("x"), Some(Value::Number(2.0)));
    }

    #[test]
    fn assign_to_unbound_name_fails() {
        let env = Environment::new();
        assert!(!env.assign("never_defined", Value::Null));
    }

    #[test]
    fn ancestor_and_get_at_resolve_exact_distance() {
        let grandparent = Environment::new();
        grandparent.define("a", Value::Number(1.0));
        let parent = Environment::with_parent(Rc::clone(&grandparent));
        parent.define("a", Value::Number(2.0));
        let child = Environment::with_parent(Rc::clone(&parent));

        assert_eq!(child.get_at(0, "a"), None);
        assert_eq!(child.get_at(1, "a"), Some(Value::Number(2.0)));
        assert_eq!(child.get_at(2, "a"), Some(Value::Number(1.0)));
    }
}
