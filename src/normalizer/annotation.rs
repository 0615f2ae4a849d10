//! Role annotation table.
//!
//! Runs after semantic normalization, so only native nodes that no semantic
//! rule rewrote are annotated here. Values missing from a lookup table leave
//! the node unannotated.

use crate::transformer::{Mapping, RuleTable};
use crate::uast::{annotate_type, annotate_type_custom, FieldRole, RoleLookup, KEY_TYPE};

use crate::uast::Role::*;

/// Roles of the built-in types named by a simple decl specifier.
pub fn type_roles() -> RoleLookup {
    RoleLookup::new(
        "type",
        &[
            ("int", &[Type, Number]),
            ("int128", &[Type, Number]),
            ("auto", &[Type, Incomplete]),
            ("bool", &[Type, Boolean]),
            ("char", &[Type, Character]),
            ("char16", &[Type, Character]),
            ("char32", &[Type, Character]),
            ("wchar_t", &[Type, Character]),
            ("decimal32", &[Type, Number]),
            ("decimal64", &[Type, Number]),
            ("decimal128", &[Type, Number]),
            ("decltype", &[Type, Incomplete]),
            ("decltype_auto", &[Type, Incomplete]),
            ("double", &[Type, Number]),
            ("float", &[Type, Number]),
            ("float128", &[Type, Number]),
            ("typeof", &[Type, Incomplete]),
            ("void", &[Type, Null]),
            ("unspecified", &[Type, Noop]),
        ],
    )
}

/// Roles of literal expressions by kind.
pub fn literal_roles() -> RoleLookup {
    RoleLookup::new(
        "literal kind",
        &[
            ("char_constant", &[Expression, Literal, Character]),
            ("float_constant", &[Expression, Literal, Number]),
            ("integer_constant", &[Expression, Literal, Number]),
            ("nullptr", &[Expression, Literal, Null]),
            ("string_literal", &[Expression, Literal, String]),
            ("this", &[Expression, Literal, Instance, Incomplete]),
            ("true", &[Expression, Literal, Boolean]),
            ("false", &[Expression, Literal, Boolean]),
        ],
    )
}

/// Roles of binary expressions by operator.
pub fn binary_roles() -> RoleLookup {
    RoleLookup::new(
        "binary operator",
        &[
            ("=", &[Binary, Expression, Assignment]),
            ("&", &[Binary, Expression, Bitwise, And]),
            ("&=", &[Binary, Expression, Bitwise, And, Assignment]),
            ("|", &[Binary, Expression, Bitwise, Or]),
            ("|=", &[Binary, Expression, Bitwise, Or, Assignment]),
            ("^", &[Binary, Expression, Bitwise, Xor]),
            ("^=", &[Binary, Expression, Bitwise, Xor, Assignment]),
            ("...", &[Binary, Expression, Incomplete]),
            ("==", &[Binary, Expression, Relational, Equal]),
            ("!=", &[Binary, Expression, Relational, Equal, Not]),
            (">", &[Binary, Expression, Relational, GreaterThan]),
            (">=", &[Binary, Expression, Relational, GreaterThanOrEqual]),
            ("<", &[Binary, Expression, Relational, LessThan]),
            ("<=", &[Binary, Expression, Relational, LessThanOrEqual]),
            ("&&", &[Binary, Expression, Boolean, And]),
            ("||", &[Binary, Expression, Boolean, Or]),
            ("max", &[Binary, Expression, Incomplete]),
            ("min", &[Binary, Expression, Incomplete]),
            ("-", &[Binary, Expression, Arithmetic, Substract]),
            ("-=", &[Binary, Expression, Arithmetic, Substract, Assignment]),
            ("+", &[Binary, Expression, Arithmetic, Add]),
            ("+=", &[Binary, Expression, Arithmetic, Add, Assignment]),
            ("%", &[Binary, Expression, Arithmetic, Modulo]),
            ("%=", &[Binary, Expression, Arithmetic, Modulo, Assignment]),
            ("*", &[Binary, Expression, Arithmetic, Multiply]),
            ("*=", &[Binary, Expression, Arithmetic, Multiply, Assignment]),
            ("/", &[Binary, Expression, Arithmetic, Divide]),
            ("/=", &[Binary, Expression, Arithmetic, Divide, Assignment]),
            ("->", &[Binary, Expression, Incomplete]),
            (".", &[Binary, Expression, Incomplete]),
            ("<<", &[Binary, Expression, Bitwise, LeftShift]),
            ("<<=", &[Binary, Expression, Bitwise, LeftShift, Assignment]),
            (">>", &[Binary, Expression, Bitwise, RightShift]),
            (">>=", &[Binary, Expression, Bitwise, RightShift, Assignment]),
            ("unknown_operator", &[Binary, Expression, Incomplete]),
        ],
    )
}

pub fn annotations() -> Vec<Mapping> {
    vec![
        annotate_type("internal-type", vec![], &[Incomplete]),
        annotate_type("CPPASTTranslationUnit", vec![], &[File, Module]),
        annotate_type("CPPASTName", vec![("Name", FieldRole::Token)], &[Identifier]),
        annotate_type("CPPASTIdExpression", vec![], &[Expression, Variable]),
        annotate_type(
            "CPPASTNullStatement",
            vec![],
            &[Literal, Null, Expression, Primitive],
        ),
        annotate_type("CPPASTGotoStatement", vec![], &[Goto, Statement]),
        annotate_type("CPPASTLabelStatement", vec![], &[Name, Incomplete]),
        annotate_type("CPPASTSimpleDeclaration", vec![], &[Declaration, Statement]),
        annotate_type("CPPASTDeclarationStatement", vec![], &[Declaration, Statement]),
        annotate_type_custom(
            "CPPASTSimpleDeclSpecifier",
            vec![("Type", FieldRole::TokenLookup(type_roles()))],
        ),
        annotate_type_custom(
            "CPPASTLiteralExpression",
            vec![
                ("LiteralValue", FieldRole::Token),
                ("kind", FieldRole::Lookup(literal_roles())),
            ],
        ),
        annotate_type("CPPASTCompoundStatement", vec![], &[Body]),
        annotate_type("CPPASTDeclarator", vec![], &[Declaration, Variable, Name]),
        annotate_type(
            "CPPASTFunctionDefinition",
            vec![
                ("Prop_Body", FieldRole::Child(vec![Function, Declaration, Body])),
                (
                    "Prop_DeclSpecifier",
                    FieldRole::Child(vec![Function, Declaration, Return, Type]),
                ),
            ],
            &[Function, Declaration],
        ),
        annotate_type(
            "CPPASTFunctionDeclarator",
            vec![
                ("Prop_Name", FieldRole::Child(vec![Function, Declaration, Name])),
                (
                    "Prop_Parameters",
                    FieldRole::Children(vec![Function, Declaration, Argument]),
                ),
            ],
            &[Function, Declaration],
        ),
        annotate_type(
            "CPPASTReturnStatement",
            vec![("Prop_ReturnArgument", FieldRole::Child(vec![Return, Value]))],
            &[Statement, Return],
        ),
        annotate_type_custom(
            "CPPASTBinaryExpression",
            vec![
                ("Operator", FieldRole::TokenLookup(binary_roles())),
                ("Prop_Operand1", FieldRole::Child(vec![Binary, Expression, Left])),
                ("Prop_Operand2", FieldRole::Child(vec![Binary, Expression, Right])),
            ],
        ),
        annotate_type(
            "CPPASTEqualsInitializer",
            vec![],
            &[Declaration, Assignment, Expression, Right],
        ),
    ]
}

pub fn table() -> RuleTable {
    RuleTable::new("annotations", KEY_TYPE, annotations())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use serde_json::json;

    fn roles(node: &Node) -> Vec<&str> {
        node.as_object()
            .and_then(|o| o.get("@role"))
            .and_then(Node::as_array)
            .map(|a| a.iter().filter_map(Node::as_str).collect())
            .unwrap_or_default()
    }

    fn apply(input: serde_json::Value) -> Option<Node> {
        table().apply_node(&Node::from(input)).unwrap()
    }

    #[test]
    fn test_simple_decl_specifier_type_lookup() {
        let out = apply(json!({"@type": "CPPASTSimpleDeclSpecifier", "Type": "int", "IsLong": false})).unwrap();
        assert_eq!(roles(&out), vec!["Type", "Number"]);
        assert_eq!(out.str_field("@token"), Some("int"));
        assert!(!out.as_object().unwrap().contains_key("Type"));

        let ctor = apply(json!({"@type": "CPPASTSimpleDeclSpecifier", "Type": "unspecified"})).unwrap();
        assert_eq!(roles(&ctor), vec!["Type", "Noop"]);
    }

    #[test]
    fn test_literal_kind_lookup() {
        let out = apply(json!({
            "@type": "CPPASTLiteralExpression",
            "LiteralValue": "42",
            "kind": "integer_constant"
        }))
        .unwrap();
        assert_eq!(roles(&out), vec!["Expression", "Literal", "Number"]);
        assert_eq!(out.str_field("@token"), Some("42"));
        assert_eq!(out.str_field("kind"), Some("integer_constant"));
    }

    #[test]
    fn test_binary_expression_operands() {
        let out = apply(json!({
            "@type": "CPPASTBinaryExpression",
            "Operator": "+=",
            "Prop_Operand1": {"@type": "CPPASTIdExpression"},
            "Prop_Operand2": {"@type": "CPPASTLiteralExpression"}
        }))
        .unwrap();
        assert_eq!(roles(&out), vec!["Binary", "Expression", "Arithmetic", "Add", "Assignment"]);
        let obj = out.as_object().unwrap();
        assert_eq!(roles(obj.get("Prop_Operand1").unwrap()), vec!["Binary", "Expression", "Left"]);
        assert_eq!(roles(obj.get("Prop_Operand2").unwrap()), vec!["Binary", "Expression", "Right"]);
    }

    #[test]
    fn test_unknown_operator_is_left_alone() {
        let node = json!({"@type": "CPPASTBinaryExpression", "Operator": "arrow ->"});
        assert!(apply(node).is_none());
    }

    #[test]
    fn test_lookup_tables_are_complete() {
        assert_eq!(type_roles().len(), 19);
        assert_eq!(literal_roles().len(), 8);
        assert_eq!(binary_roles().len(), 35);
        assert_eq!(annotations().len(), 18);
    }
}
