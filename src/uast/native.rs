//! Structural normalization of raw parser output.
//!
//! [`ResponseMetadata`] unwraps the parser response envelope and
//! [`ObjectToNode`] turns every native object into a node with a `@type` tag
//! and a `@pos` position block built from the native offset fields.

use crate::diagnostics::UastError;
use crate::err_msg;
use crate::node::{Node, Object};
use crate::transformer::{CheckResult, Mapping, Op, State, Transformer};
use crate::uast::{KEY_POS, KEY_TYPE, TYPE_POSITION, TYPE_POSITIONS};

const VAR_TYPE: &str = "type";
const VAR_START: &str = "start";
const VAR_END: &str = "end";
const VAR_REST: &str = "rest";

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// Selects the tree root from a parser response.
///
/// Unless the top-level object is the root itself, the response must be an
/// object with a single field whose value is the root.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseMetadata {
    pub top_level_is_root: bool,
}

impl Transformer for ResponseMetadata {
    fn name(&self) -> &str {
        "response-metadata"
    }

    fn transform(&self, root: Node) -> Result<Node, UastError> {
        if self.top_level_is_root {
            return Ok(root);
        }
        match root {
            Node::Object(obj) if obj.len() == 1 => match obj.into_iter().next() {
                Some((_, inner)) => Ok(inner),
                None => Err(err_msg!(Internal, "single-field object yielded no field")),
            },
            Node::Object(obj) => Err(err_msg!(
                MalformedTree,
                "expected a response object with exactly one field, found {} fields",
                obj.len()
            )),
            other => Err(err_msg!(
                MalformedTree,
                "expected a response object, found {}",
                other.kind()
            )),
        }
    }
}

// ============================================================================
// OBJECT TO NODE
// ============================================================================

/// Names of the native fields holding a node's class and offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectToNode {
    pub internal_type_key: String,
    pub offset_key: String,
    pub end_offset_key: String,
}

impl Default for ObjectToNode {
    fn default() -> Self {
        Self {
            internal_type_key: "IASTClass".to_string(),
            offset_key: "LocOffsetStart".to_string(),
            end_offset_key: "LocOffsetEnd".to_string(),
        }
    }
}

impl ObjectToNode {
    pub fn mapping(&self) -> Mapping {
        Mapping::new(
            "ObjectToNode",
            Box::new(NativeObject { keys: self.clone() }),
            Box::new(TaggedNode),
        )
    }
}

/// A native object: class tag, optional offsets, and everything else.
#[derive(Debug)]
struct NativeObject {
    keys: ObjectToNode,
}

impl NativeObject {
    fn offset(&self, obj: &Object, key: &str) -> Result<Node, UastError> {
        match obj.get(key) {
            None | Some(Node::Null) => Ok(Node::Null),
            Some(Node::Int(n)) if *n >= 0 => Ok(Node::Int(*n)),
            Some(other) => Err(err_msg!(
                MalformedTree,
                "offset field '{}' must be a non-negative integer, found {}",
                key,
                other.kind()
            )),
        }
    }
}

impl Op for NativeObject {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let Node::Object(obj) = node else {
            return Ok(None);
        };
        let keys = &self.keys;
        let ty = match obj.get(&keys.internal_type_key) {
            Some(Node::String(ty)) => ty,
            Some(other) => {
                return Err(err_msg!(
                    MalformedTree,
                    "type field '{}' must be a string, found {}",
                    keys.internal_type_key,
                    other.kind()
                ))
            }
            None if obj.contains_key(&keys.offset_key) || obj.contains_key(&keys.end_offset_key) => {
                return Err(err_msg!(
                    MalformedTree,
                    "object carries offsets but no '{}' field",
                    keys.internal_type_key
                ))
            }
            None => return Ok(None),
        };
        let start = self.offset(obj, &keys.offset_key)?;
        let end = self.offset(obj, &keys.end_offset_key)?;
        let rest: Object = obj
            .iter()
            .filter(|(k, _)| {
                *k != keys.internal_type_key && *k != keys.offset_key && *k != keys.end_offset_key
            })
            .map(|(k, v)| (k, v.clone()))
            .collect();
        Ok(st
            .bind(VAR_TYPE, Node::from(ty.as_str()))
            .and_then(|s| s.bind(VAR_START, start))
            .and_then(|s| s.bind(VAR_END, end))
            .and_then(|s| s.bind(VAR_REST, Node::Object(rest))))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let mut out = Object::new();
        out.insert(self.keys.internal_type_key.as_str(), st.var(VAR_TYPE)?.clone());
        if let Node::Object(rest) = st.var(VAR_REST)? {
            for (k, v) in rest.iter() {
                out.insert(k, v.clone());
            }
        }
        for (key, var) in [(&self.keys.offset_key, VAR_START), (&self.keys.end_offset_key, VAR_END)] {
            let value = st.var(var)?;
            if !value.is_null() {
                out.insert(key.as_str(), value.clone());
            }
        }
        Ok(Node::Object(out))
    }
}

/// A tagged node: `@type`, an optional `@pos` block, and everything else.
#[derive(Debug)]
struct TaggedNode;

fn position(offset: &Node) -> Node {
    Node::Object(Object::from_iter([
        (KEY_TYPE, Node::from(TYPE_POSITION)),
        ("offset", offset.clone()),
    ]))
}

fn position_offset(positions: &Object, key: &str) -> Option<Node> {
    match positions.get(key) {
        None => Some(Node::Null),
        Some(p) => match p.as_object()?.get("offset")? {
            Node::Int(n) => Some(Node::Int(*n)),
            _ => None,
        },
    }
}

impl Op for TaggedNode {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let Node::Object(obj) = node else {
            return Ok(None);
        };
        let Some(ty) = obj.get(KEY_TYPE).and_then(Node::as_str) else {
            return Ok(None);
        };
        let (start, end) = match obj.get(KEY_POS) {
            None => (Node::Null, Node::Null),
            Some(pos) => {
                let Some(positions) = pos.as_object() else {
                    return Ok(None);
                };
                match (
                    position_offset(positions, VAR_START),
                    position_offset(positions, VAR_END),
                ) {
                    (Some(s), Some(e)) => (s, e),
                    _ => return Ok(None),
                }
            }
        };
        let rest: Object = obj
            .iter()
            .filter(|(k, _)| *k != KEY_TYPE && *k != KEY_POS)
            .map(|(k, v)| (k, v.clone()))
            .collect();
        Ok(st
            .bind(VAR_TYPE, Node::from(ty))
            .and_then(|s| s.bind(VAR_START, start))
            .and_then(|s| s.bind(VAR_END, end))
            .and_then(|s| s.bind(VAR_REST, Node::Object(rest))))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let mut out = Object::new();
        out.insert(KEY_TYPE, st.var(VAR_TYPE)?.clone());
        let start = st.var(VAR_START)?;
        let end = st.var(VAR_END)?;
        if !start.is_null() || !end.is_null() {
            let mut positions = Object::new();
            positions.insert(KEY_TYPE, Node::from(TYPE_POSITIONS));
            if !start.is_null() {
                positions.insert(VAR_START, position(start));
            }
            if !end.is_null() {
                positions.insert(VAR_END, position(end));
            }
            out.insert(KEY_POS, Node::Object(positions));
        }
        if let Node::Object(rest) = st.var(VAR_REST)? {
            for (k, v) in rest.iter() {
                out.insert(k, v.clone());
            }
        }
        Ok(Node::Object(out))
    }
}
