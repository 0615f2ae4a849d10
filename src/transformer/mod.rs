//! # Tree Transformer Engine
//!
//! Declarative, bidirectional tree patterns. Every pattern is an [`Op`] with
//! two halves sharing one binding environment ([`State`]):
//!
//! - **check** matches a node and extends the state with new bindings.
//! - **construct** builds a node from the bindings of a state.
//!
//! A [`Mapping`] pairs a source op with a destination op; applying it forward
//! checks the source and constructs the destination. Swapping the two gives
//! the reverse mapping used for round-trip verification.
//!
//! ## Contract
//!
//! - `check` reports an ordinary non-match as `Ok(None)`. It never leaks
//!   partial bindings: a failed attempt leaves the caller's state untouched.
//! - Custom ops may also return `Err(UastError::ShapeMismatch)` when the node
//!   kind is wrong; callers treat that exactly like a non-match.
//! - `construct` only reads variables bound by the matching `check`, and fails
//!   with `UastError::UnboundVariable` otherwise.
//! - Ordering is significant everywhere: `Cases` alternatives and rule table
//!   entries resolve ambiguity by first match.

use std::collections::BTreeSet;
use std::fmt;

use crate::diagnostics::UastError;
use crate::node::Node;

pub mod mapping;
pub mod ops;
pub mod state;
pub mod strings;
pub mod structural;

pub use mapping::{
    strip_fields, Mapping, Pipeline, RoundTrip, RoundTripOutcome, RuleTable, Stage, Transformer,
};
pub use ops::{any, bool_lit, if_flag, int_lit, is_null, literal, string, var};
pub use state::State;
pub use strings::{comment_text, join_names, quote, trim_dot_slash};
pub use structural::{
    append, arr, cases, cases_obj, each, fields, obj, Field, FieldKind, Fields,
};

/// Result of a check: `Ok(Some(state))` on match, `Ok(None)` on no match.
pub type CheckResult = Result<Option<State>, UastError>;

/// A composable matcher/builder over [`Node`] trees.
pub trait Op: fmt::Debug + Send + Sync {
    fn check(&self, st: &State, node: &Node) -> CheckResult;

    fn construct(&self, st: &State) -> Result<Node, UastError>;

    /// Whether a missing object field may be matched by this op as `null`.
    fn matches_absent(&self) -> bool {
        false
    }

    /// The exact value this op accepts, if it accepts only one.
    fn literal_value(&self) -> Option<&Node> {
        None
    }

    /// The literal value this op requires for an object field, if any.
    /// Rule tables use it to index mappings by node type.
    fn field_literal(&self, _key: &str) -> Option<&Node> {
        None
    }

    /// Whether this op forgets the value it matches.
    fn discards(&self) -> bool {
        false
    }

    /// Collects the names of fields this op discards on check.
    fn dropped_fields(&self, _out: &mut BTreeSet<String>) {}
}

pub type BoxOp = Box<dyn Op>;

/// Runs `op.check`, folding a recoverable error into an ordinary non-match.
pub(crate) fn check_soft(op: &dyn Op, st: &State, node: &Node) -> CheckResult {
    match op.check(st, node) {
        Err(e) if e.is_recoverable() => {
            tracing::trace!(error = %e, "shape mismatch treated as no match");
            Ok(None)
        }
        other => other,
    }
}
