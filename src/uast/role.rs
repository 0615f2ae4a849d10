//! Role tags attached to annotated nodes under `@role`.

use std::fmt;
use std::str::FromStr;

use crate::diagnostics::UastError;
use crate::err_msg;
use crate::node::Node;

macro_rules! roles {
    ($($name:ident),* $(,)?) => {
        /// A syntactic or semantic role a node plays in its parent.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Role {
            $($name),*
        }

        impl Role {
            pub const ALL: &'static [Role] = &[$(Role::$name),*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Role::$name => stringify!($name)),*
                }
            }
        }

        impl FromStr for Role {
            type Err = UastError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($name) => Ok(Role::$name),)*
                    _ => Err(err_msg!(Config, "unknown role '{}'", s)),
                }
            }
        }
    };
}

roles! {
    Add,
    And,
    Argument,
    Arithmetic,
    Assignment,
    Binary,
    Bitwise,
    Body,
    Boolean,
    Character,
    Declaration,
    Divide,
    Equal,
    Expression,
    File,
    Function,
    Goto,
    GreaterThan,
    GreaterThanOrEqual,
    Identifier,
    Incomplete,
    Instance,
    Left,
    LeftShift,
    LessThan,
    LessThanOrEqual,
    Literal,
    Modulo,
    Module,
    Multiply,
    Name,
    Noop,
    Not,
    Null,
    Number,
    Or,
    Primitive,
    Relational,
    Return,
    Right,
    RightShift,
    Statement,
    String,
    Substract,
    Type,
    Value,
    Variable,
    Xor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Role> for Node {
    fn from(role: Role) -> Self {
        Node::from(role.as_str())
    }
}

/// Encodes roles as the array stored under `@role`.
pub fn roles_node(roles: &[Role]) -> Node {
    Node::Array(roles.iter().copied().map(Node::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_parse_back() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
        assert!("Unknown".parse::<Role>().is_err());
    }

    #[test]
    fn test_roles_node_keeps_order() {
        let node = roles_node(&[Role::Expression, Role::Literal]);
        assert_eq!(node, Node::Array(vec![Node::from("Expression"), Node::from("Literal")]));
    }
}
