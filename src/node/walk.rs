//! Generic tree walk.
//!
//! [`transform`] rebuilds a tree from the results of a per-node function in
//! either pre-order or post-order. The function returns `Ok(None)` to leave a
//! node unchanged; only the containers on the path from the root to a changed
//! node are rebuilt, everything else is returned as-is.

use crate::diagnostics::UastError;
use crate::node::{Node, Object};

/// Traversal order of a full-tree pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Parent before children: the replacement's children are visited.
    PreOrder,
    /// Children before parent: the parent sees already-rewritten children.
    PostOrder,
}

/// Rebuilds `root` by applying `f` to every node in the given order.
pub fn transform<F>(root: Node, order: Order, f: &mut F) -> Result<Node, UastError>
where
    F: FnMut(&Node) -> Result<Option<Node>, UastError>,
{
    Ok(visit_node(&root, order, f)?.unwrap_or(root))
}

// =============================
// Internal helpers
// =============================

fn visit_node<F>(node: &Node, order: Order, f: &mut F) -> Result<Option<Node>, UastError>
where
    F: FnMut(&Node) -> Result<Option<Node>, UastError>,
{
    match order {
        Order::PreOrder => {
            let Some(replaced) = f(node)? else {
                return visit_children(node, order, f);
            };
            Ok(Some(visit_children(&replaced, order, f)?.unwrap_or(replaced)))
        }
        Order::PostOrder => {
            let rebuilt = visit_children(node, order, f)?;
            let current = rebuilt.as_ref().unwrap_or(node);
            match f(current)? {
                Some(replaced) => Ok(Some(replaced)),
                None => Ok(rebuilt),
            }
        }
    }
}

fn visit_children<F>(node: &Node, order: Order, f: &mut F) -> Result<Option<Node>, UastError>
where
    F: FnMut(&Node) -> Result<Option<Node>, UastError>,
{
    match node {
        Node::Array(items) => {
            let mut changed: Option<Vec<Node>> = None;
            for (i, item) in items.iter().enumerate() {
                if let Some(new) = visit_node(item, order, f)? {
                    changed.get_or_insert_with(|| items[..i].to_vec()).push(new);
                } else if let Some(out) = changed.as_mut() {
                    out.push(item.clone());
                }
            }
            Ok(changed.map(Node::Array))
        }
        Node::Object(obj) => {
            let mut changed: Option<Object> = None;
            for (i, (key, value)) in obj.iter().enumerate() {
                if let Some(new) = visit_node(value, order, f)? {
                    changed
                        .get_or_insert_with(|| obj.iter().take(i).map(|(k, v)| (k, v.clone())).collect())
                        .insert(key, new);
                } else if let Some(out) = changed.as_mut() {
                    out.insert(key, value.clone());
                }
            }
            Ok(changed.map(Node::Object))
        }
        _ => Ok(None),
    }
}
