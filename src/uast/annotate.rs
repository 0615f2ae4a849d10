//! Role annotation rules.
//!
//! Annotation keeps a native node as it is and attaches role tags: to the
//! node itself, to child nodes held in given fields, or looked up from the
//! value of a field. These rules are one-way.

use std::collections::HashMap;
use std::sync::Arc;

use crate::diagnostics::UastError;
use crate::err_msg;
use crate::node::{transform, Node, Object, Order};
use crate::transformer::{string, var, BoxOp, CheckResult, Field, Fields, Mapping, Op, State, Transformer};
use crate::uast::role::{roles_node, Role};
use crate::uast::{KEY_ROLES, KEY_TOKEN, KEY_TYPE};

const VAR_ROLES: &str = "@roles";
const FLAG_ROLES: &str = "@hasRoles";
const VAR_LOOKUP: &str = "@lookupRoles";
const VAR_OTHER: &str = "@other";

/// What an annotation rule does with one native field.
#[derive(Debug, Clone)]
pub enum FieldRole {
    /// Moves the field value to `@token`.
    Token,
    /// Moves the field value to `@token` and derives the node's roles from it.
    TokenLookup(RoleLookup),
    /// Keeps the field and derives the node's roles from its value.
    Lookup(RoleLookup),
    /// Adds roles to the child node held in the field, when present.
    Child(Vec<Role>),
    /// Adds roles to every node of the array held in the field, when present.
    Children(Vec<Role>),
}

/// A fixed table from field value to roles.
#[derive(Debug, Clone)]
pub struct RoleLookup {
    name: &'static str,
    table: Arc<HashMap<String, Vec<Role>>>,
}

impl RoleLookup {
    pub fn new(name: &'static str, entries: &[(&str, &[Role])]) -> Self {
        Self {
            name,
            table: Arc::new(
                entries
                    .iter()
                    .map(|(k, roles)| (k.to_string(), roles.to_vec()))
                    .collect(),
            ),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn get(&self, key: &str) -> Option<&[Role]> {
        self.table.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

// ============================================================================
// OPS
// ============================================================================

/// Matches a string found in the lookup table, binding the string under
/// `var` and its roles under the lookup variable. Unknown values do not match.
#[derive(Debug)]
struct LookupRoles {
    var: String,
    lookup: RoleLookup,
}

impl Op for LookupRoles {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let Some(key) = node.as_str() else {
            return Ok(None);
        };
        let Some(roles) = self.lookup.get(key) else {
            tracing::debug!(lookup = self.lookup.name, value = key, "value has no roles");
            return Ok(None);
        };
        Ok(st
            .bind(&self.var, node.clone())
            .and_then(|s| s.bind(VAR_LOOKUP, roles_node(roles))))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        st.var(&self.var).cloned()
    }
}

/// Builds the `@role` array: roles the node already had, then the fixed
/// roles, then roles from a lookup.
#[derive(Debug)]
struct AddRoles {
    roles: Vec<Role>,
}

impl Op for AddRoles {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let Node::Array(_) = node else {
            return Ok(None);
        };
        Ok(st.bind(VAR_ROLES, node.clone()))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let mut out = match st.get_var(VAR_ROLES) {
            Some(Node::Array(existing)) => existing.clone(),
            _ => Vec::new(),
        };
        out.extend(self.roles.iter().copied().map(Node::from));
        if let Some(found) = st.get_var(VAR_LOOKUP) {
            let Node::Array(found) = found else {
                return Err(err_msg!(Internal, "looked up roles must be an array"));
            };
            out.extend(found.iter().cloned());
        }
        Ok(Node::Array(out))
    }
}

/// Passes a child node through, adding roles to it (or to each element).
#[derive(Debug)]
struct ChildRoles {
    var: String,
    roles: Vec<Role>,
    each: bool,
}

impl Op for ChildRoles {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        Ok(st.bind(&self.var, node.clone()))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let child = st.var(&self.var)?;
        Ok(match (child, self.each) {
            (Node::Array(items), true) => {
                Node::Array(items.iter().map(|n| with_roles(n, &self.roles)).collect())
            }
            (other, _) => with_roles(other, &self.roles),
        })
    }
}

/// Appends `roles` to the `@role` array of an object node. Other nodes are
/// returned unchanged.
pub fn with_roles(node: &Node, roles: &[Role]) -> Node {
    let Node::Object(obj) = node else {
        return node.clone();
    };
    let mut out = obj.clone();
    let mut list = match out.get(KEY_ROLES) {
        Some(Node::Array(existing)) => existing.clone(),
        _ => Vec::new(),
    };
    list.extend(roles.iter().copied().map(Node::from));
    out.insert(KEY_ROLES, Node::Array(list));
    Node::Object(out)
}

// ============================================================================
// BUILDERS
// ============================================================================

fn build(native: &str, fields: Vec<(&str, FieldRole)>, roles: Vec<Role>) -> Mapping {
    let mut src = vec![
        Field::required(KEY_TYPE, string(native)),
        Field::optional(KEY_ROLES, FLAG_ROLES, var(VAR_ROLES)),
    ];
    let mut dst = vec![
        Field::required(KEY_TYPE, string(native)),
        Field::required(KEY_ROLES, Box::new(AddRoles { roles })),
    ];
    for (name, role) in fields {
        let value = format!("{}@value", name);
        let lookup_op = |lookup: RoleLookup| -> BoxOp {
            Box::new(LookupRoles {
                var: value.clone(),
                lookup,
            })
        };
        match role {
            FieldRole::Token => {
                src.push(Field::required(name, var(&value)));
                dst.push(Field::required(KEY_TOKEN, var(&value)));
            }
            FieldRole::TokenLookup(lookup) => {
                src.push(Field::required(name, lookup_op(lookup)));
                dst.push(Field::required(KEY_TOKEN, var(&value)));
            }
            FieldRole::Lookup(lookup) => {
                src.push(Field::required(name, lookup_op(lookup)));
                dst.push(Field::required(name, var(&value)));
            }
            FieldRole::Child(roles) => {
                push_child(&mut src, &mut dst, name, &value, roles, false);
            }
            FieldRole::Children(roles) => {
                push_child(&mut src, &mut dst, name, &value, roles, true);
            }
        }
    }
    Mapping::new(
        native,
        Box::new(Fields::new(src).with_rest(VAR_OTHER)),
        Box::new(Fields::new(dst).with_rest(VAR_OTHER)),
    )
}

fn push_child(
    src: &mut Vec<Field>,
    dst: &mut Vec<Field>,
    name: &str,
    value: &str,
    roles: Vec<Role>,
    each: bool,
) {
    let flag = format!("{}@present", name);
    src.push(Field::optional(name, &flag, var(value)));
    dst.push(Field::optional(
        name,
        &flag,
        Box::new(ChildRoles {
            var: value.to_string(),
            roles,
            each,
        }),
    ));
}

/// Tags nodes of type `native` with `roles`, applying `fields` to their
/// fields. Every other field is kept.
pub fn annotate_type(native: &str, fields: Vec<(&str, FieldRole)>, roles: &[Role]) -> Mapping {
    build(native, fields, roles.to_vec())
}

/// Like [`annotate_type`] for rules whose node roles come only from a
/// [`FieldRole::Lookup`] or [`FieldRole::TokenLookup`].
pub fn annotate_type_custom(native: &str, fields: Vec<(&str, FieldRole)>) -> Mapping {
    build(native, fields, Vec::new())
}

// ============================================================================
// ROLE DEDUPLICATION
// ============================================================================

/// Removes repeated entries from every `@role` array, keeping first occurrences.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolesDedup;

impl RolesDedup {
    fn dedup(node: &Node) -> Option<Node> {
        let Node::Object(obj) = node else {
            return None;
        };
        let Some(Node::Array(roles)) = obj.get(KEY_ROLES) else {
            return None;
        };
        let mut unique: Vec<Node> = Vec::with_capacity(roles.len());
        for role in roles {
            if !unique.contains(role) {
                unique.push(role.clone());
            }
        }
        if unique.len() == roles.len() {
            return None;
        }
        let mut out: Object = obj.clone();
        out.insert(KEY_ROLES, Node::Array(unique));
        Some(Node::Object(out))
    }
}

impl Transformer for RolesDedup {
    fn name(&self) -> &str {
        "roles-dedup"
    }

    fn transform(&self, root: Node) -> Result<Node, UastError> {
        transform(root, Order::PostOrder, &mut |n: &Node| Ok(Self::dedup(n)))
    }
}
