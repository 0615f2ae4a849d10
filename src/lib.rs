//! # uastify
//!
//! A declarative tree pattern-matching engine that turns the native tree of a
//! C++ parser into a Universal AST: language-agnostic node types where a
//! semantic rule exists, and role-annotated native nodes everywhere else.
//!
//! The engine lives in [`transformer`] (ops, mappings, rule tables) and
//! [`node`] (the tree and its walks). The C++ rule tables live in
//! [`normalizer`], which exposes [`Transforms`] as the entry point.

pub use crate::config::{DriverConfig, OffsetEncoding};
pub use crate::diagnostics::{to_error_source, ErrorContext, ErrorType, UastError};
pub use crate::node::{Node, Object, Order};
pub use crate::normalizer::{Mode, Transforms};
pub use crate::transformer::{Mapping, Pipeline, RoundTrip, RuleTable, Stage, Transformer};

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod node;
pub mod normalizer;
pub mod positioner;
pub mod test_harness;
pub mod transformer;
pub mod uast;
