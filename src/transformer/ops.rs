//! Primitive ops: literals, wildcards, variables and the flag conditional.

use crate::diagnostics::UastError;
use crate::err_msg;
use crate::node::Node;
use crate::transformer::{check_soft, BoxOp, CheckResult, Op, State};

// ============================================================================
// LITERALS AND WILDCARDS
// ============================================================================

/// Matches exactly one value and constructs it back.
#[derive(Debug, Clone)]
pub struct Literal {
    value: Node,
    absent_ok: bool,
}

impl Op for Literal {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        Ok((*node == self.value).then(|| st.clone()))
    }

    fn construct(&self, _st: &State) -> Result<Node, UastError> {
        Ok(self.value.clone())
    }

    fn matches_absent(&self) -> bool {
        self.absent_ok
    }

    fn literal_value(&self) -> Option<&Node> {
        Some(&self.value)
    }
}

/// Matches any node and forgets it. Constructs a `null` placeholder.
#[derive(Debug, Clone)]
pub struct Any;

impl Op for Any {
    fn check(&self, st: &State, _node: &Node) -> CheckResult {
        Ok(Some(st.clone()))
    }

    fn construct(&self, _st: &State) -> Result<Node, UastError> {
        Ok(Node::Null)
    }

    fn discards(&self) -> bool {
        true
    }
}

/// Binds the matched node under a name and emits it on construct.
#[derive(Debug, Clone)]
pub struct Var {
    name: String,
}

impl Op for Var {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        Ok(st.bind(&self.name, node.clone()))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        st.var(&self.name).cloned()
    }
}

// ============================================================================
// CONDITIONAL
// ============================================================================

/// Chooses between two ops based on a boolean flag binding.
///
/// On check, `then` is tried first and the flag is bound to `true` if it
/// matches, otherwise `otherwise` is tried and the flag is bound to `false`.
#[derive(Debug)]
pub struct If {
    flag: String,
    then: BoxOp,
    otherwise: BoxOp,
}

impl Op for If {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        if let Some(next) = check_soft(self.then.as_ref(), st, node)? {
            if let Some(bound) = next.bind(&self.flag, Node::Bool(true)) {
                return Ok(Some(bound));
            }
        }
        match check_soft(self.otherwise.as_ref(), st, node)? {
            Some(next) => Ok(next.bind(&self.flag, Node::Bool(false))),
            None => Ok(None),
        }
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        match st.var(&self.flag)? {
            Node::Bool(true) => self.then.construct(st),
            Node::Bool(false) => self.otherwise.construct(st),
            other => Err(err_msg!(
                Internal,
                "flag '{}' must be a bool, found {}",
                self.flag,
                other.kind()
            )),
        }
    }

    fn matches_absent(&self) -> bool {
        self.then.matches_absent() || self.otherwise.matches_absent()
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

pub fn literal(value: impl Into<Node>) -> BoxOp {
    Box::new(Literal {
        value: value.into(),
        absent_ok: false,
    })
}

pub fn string(value: &str) -> BoxOp {
    literal(value)
}

pub fn bool_lit(value: bool) -> BoxOp {
    literal(value)
}

pub fn int_lit(value: i64) -> BoxOp {
    literal(value)
}

/// Matches `null` or a missing object field; constructs `null`.
pub fn is_null() -> BoxOp {
    Box::new(Literal {
        value: Node::Null,
        absent_ok: true,
    })
}

pub fn any() -> BoxOp {
    Box::new(Any)
}

pub fn var(name: &str) -> BoxOp {
    Box::new(Var {
        name: name.to_string(),
    })
}

pub fn if_flag(flag: &str, then: BoxOp, otherwise: BoxOp) -> BoxOp {
    Box::new(If {
        flag: flag.to_string(),
        then,
        otherwise,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_both_directions() {
        let op = string("void");
        let st = State::new();
        assert!(op.check(&st, &Node::from("void")).unwrap().is_some());
        assert!(op.check(&st, &Node::from("int")).unwrap().is_none());
        assert_eq!(op.construct(&st).unwrap(), Node::from("void"));
    }

    #[test]
    fn test_var_co_reference() {
        let op = var("x");
        let st = op.check(&State::new(), &Node::from("a")).unwrap().unwrap();
        assert!(op.check(&st, &Node::from("a")).unwrap().is_some());
        assert!(op.check(&st, &Node::from("b")).unwrap().is_none());
        assert_eq!(op.construct(&st).unwrap(), Node::from("a"));
    }

    #[test]
    fn test_any_discards_value() {
        let st = any().check(&State::new(), &Node::from(42i64)).unwrap().unwrap();
        assert!(st.is_empty());
        assert_eq!(any().construct(&st).unwrap(), Node::Null);
    }

    #[test]
    fn test_if_records_branch() {
        let op = if_flag("hasInit", var("init"), is_null());
        let st = op.check(&State::new(), &Node::from("1")).unwrap().unwrap();
        assert_eq!(st.get_var("hasInit"), Some(&Node::Bool(true)));

        let st = op.check(&State::new(), &Node::Null).unwrap().unwrap();
        // `var` matches null as well and is tried first.
        assert_eq!(st.get_var("hasInit"), Some(&Node::Bool(true)));

        let st = State::new().bind("hasInit", Node::Bool(false)).unwrap();
        assert_eq!(op.construct(&st).unwrap(), Node::Null);
    }

    #[test]
    fn test_if_without_flag_fails_construct() {
        let op = if_flag("flag", var("x"), is_null());
        let err = op.construct(&State::new()).unwrap_err();
        assert!(!err.is_recoverable());
    }
}
