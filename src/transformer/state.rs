//! Binding environment threaded through one check/construct invocation.
//!
//! `State` is built on persistent `im` maps, so cloning is O(1) and a failed
//! check attempt simply drops its copy: partial bindings never escape.

use im::{HashMap, Vector};

use crate::diagnostics::UastError;
use crate::err_msg;
use crate::node::Node;

/// Variable bindings plus the per-element sub-states recorded by `Each`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    vars: HashMap<String, Node>,
    states: HashMap<String, Vector<State>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.states.is_empty()
    }

    pub fn get_var(&self, name: &str) -> Option<&Node> {
        self.vars.get(name)
    }

    /// Returns the bound value or an `UnboundVariable` error.
    pub fn var(&self, name: &str) -> Result<&Node, UastError> {
        self.vars
            .get(name)
            .ok_or_else(|| err_msg!(UnboundVariable, "variable '{}' is not bound", name))
    }

    /// Binds `name` to `value`. A name that is already bound acts as a
    /// co-reference: the bind succeeds only if the values are structurally equal.
    pub fn bind(&self, name: &str, value: Node) -> Option<State> {
        match self.vars.get(name) {
            Some(existing) if *existing == value => Some(self.clone()),
            Some(_) => None,
            None => {
                let mut next = self.clone();
                next.vars.insert(name.to_string(), value);
                Some(next)
            }
        }
    }

    /// Binds a list of sub-states under `name`, with the same co-reference rule.
    pub fn bind_states(&self, name: &str, subs: Vector<State>) -> Option<State> {
        match self.states.get(name) {
            Some(existing) if *existing == subs => Some(self.clone()),
            Some(_) => None,
            None => {
                let mut next = self.clone();
                next.states.insert(name.to_string(), subs);
                Some(next)
            }
        }
    }

    pub fn sub_states(&self, name: &str) -> Result<&Vector<State>, UastError> {
        self.states
            .get(name)
            .ok_or_else(|| err_msg!(UnboundVariable, "sequence variable '{}' is not bound", name))
    }

    /// Fills in every binding of `outer` that this state does not define itself.
    pub fn apply_from(&self, outer: &State) -> State {
        let mut vars = outer.vars.clone();
        for (k, v) in self.vars.iter() {
            vars.insert(k.clone(), v.clone());
        }
        let mut states = outer.states.clone();
        for (k, v) in self.states.iter() {
            states.insert(k.clone(), v.clone());
        }
        State { vars, states }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebinding_requires_equal_value() {
        let st = State::new().bind("x", Node::from("a")).unwrap();
        assert!(st.bind("x", Node::from("a")).is_some());
        assert!(st.bind("x", Node::from("b")).is_none());
    }

    #[test]
    fn test_bind_does_not_touch_original() {
        let st = State::new();
        let next = st.bind("x", Node::Null).unwrap();
        assert!(st.is_empty());
        assert_eq!(next.get_var("x"), Some(&Node::Null));
    }

    #[test]
    fn test_unbound_var_is_distinguishable() {
        let err = State::new().var("missing").unwrap_err();
        assert_eq!(err.error_type(), crate::diagnostics::ErrorType::UnboundVariable);
    }

    #[test]
    fn test_apply_from_prefers_inner_bindings() {
        let outer = State::new()
            .bind("a", Node::from(1i64))
            .and_then(|s| s.bind("b", Node::from(2i64)))
            .unwrap();
        let inner = State::new().bind("a", Node::from(10i64)).unwrap();
        let merged = inner.apply_from(&outer);
        assert_eq!(merged.get_var("a"), Some(&Node::from(10i64)));
        assert_eq!(merged.get_var("b"), Some(&Node::from(2i64)));
    }
}
