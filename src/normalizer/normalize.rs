//! Semantic normalization table: native C++ shapes to canonical nodes.
//!
//! Runs post-order, so every rule sees children that are already canonical.
//! Entry order matters: the first matching rule wins.
//!
//! The native parser attaches bookkeeping fields that have no canonical
//! counterpart (expression types, include resolution, name qualification
//! flags). Rules list them as dropped fields so real parser output matches.

use crate::transformer::{
    any, append, arr, bool_lit, cases, comment_text, each, fields, if_flag, is_null, join_names,
    obj, quote, string, trim_dot_slash, var, BoxOp, Field, Mapping, RuleTable,
};
use crate::uast::{
    comment_node, map_native, map_semantic, map_semantic_cases, uast_obj, uast_type, UastType,
    KEY_MACRO_ORIGIN, KEY_POS, KEY_TYPE,
};

/// Fields the parser writes on every expression.
const EXPRESSION_INFO: &[&str] = &["ExpressionType", "ExpressionValueCategory", "IsLValue"];

fn dropped(names: &[&str]) -> Vec<Field> {
    names.iter().map(|name| Field::drop(name)).collect()
}

/// Fields of a node the rule only needs to recognise by type.
fn native_head(ty: &str) -> Vec<Field> {
    vec![
        Field::required(KEY_TYPE, string(ty)),
        Field::drop(KEY_POS),
        Field::drop(KEY_MACRO_ORIGIN),
    ]
}

fn identifier(name: BoxOp) -> BoxOp {
    uast_obj(UastType::Identifier, vec![("Name", name)])
}

// ============================================================================
// RULES
// ============================================================================

fn include() -> Mapping {
    let alt = |name: BoxOp, system: bool| {
        let mut fields = vec![
            Field::required("Name", name),
            Field::required("IsSystem", bool_lit(system)),
        ];
        fields.extend(dropped(&["Path", "Resolved"]));
        fields
    };
    map_semantic_cases(
        "ASTInclusionStatement",
        UastType::InlineImport,
        "isSystemCase",
        vec![
            alt(var("path"), true),
            alt(trim_dot_slash("hadDotSlash", var("path")), false),
        ],
        vec![
            Field::required(
                "Path",
                uast_obj(
                    UastType::String,
                    vec![("Value", var("path")), ("Format", string(""))],
                ),
            ),
            Field::required("All", bool_lit(true)),
            Field::required("Names", is_null()),
        ],
    )
}

fn compound_statement() -> Mapping {
    map_semantic(
        "CPPASTCompoundStatement",
        UastType::Block,
        vec![Field::required("Prop_Statements", var("statements"))],
        vec![Field::required("Statements", var("statements"))],
    )
}

/// `{}`: the parser omits empty child arrays.
fn empty_compound_statement() -> Mapping {
    map_semantic(
        "CPPASTCompoundStatement",
        UastType::Block,
        vec![],
        vec![Field::required("Statements", arr(vec![]))],
    )
}

fn string_literal() -> Mapping {
    let mut src = vec![
        Field::required("LiteralValue", quote(var("val"))),
        Field::required("kind", string("string_literal")),
    ];
    src.extend(dropped(EXPRESSION_INFO));
    map_semantic(
        "CPPASTLiteralExpression",
        UastType::String,
        src,
        vec![
            Field::required("Value", var("val")),
            Field::required("Format", string("")),
        ],
    )
}

fn comment(block: bool) -> Mapping {
    let tokens = if block { ("/*", "*/") } else { ("//", "") };
    map_semantic(
        "Comment",
        UastType::Comment,
        vec![
            Field::required("Comment", comment_text(tokens, "comm")),
            Field::required("IsBlockComment", bool_lit(block)),
        ],
        comment_node(block, "comm"),
    )
}

/// Parameters may have a type and no name: `int main(int, char**)`.
fn empty_name() -> Mapping {
    let mut src = native_head("CPPASTName");
    src.push(Field::required("Name", string("")));
    src.push(Field::drop("IsQualified"));
    Mapping::new("CPPASTName (empty)", fields(src), is_null())
}

fn name(native: &str) -> Mapping {
    map_semantic(
        native,
        UastType::Identifier,
        vec![Field::required("Name", var("name")), Field::drop("IsQualified")],
        vec![Field::required("Name", var("name"))],
    )
}

/// Keeps the native node and turns its `Name` string into an identifier.
fn wrapped_name(native: &str) -> Mapping {
    map_native(
        native,
        vec![Field::required("Name", var("name"))],
        vec![Field::required("Name", identifier(var("name")))],
    )
}

fn qualified_name() -> Mapping {
    let segment_name = || obj(vec![(KEY_TYPE, string(UastType::Identifier.type_name())), ("Name", var("name"))]);
    let segments = cases(
        "caseQualParts",
        vec![
            fields(vec![
                Field::required(KEY_TYPE, string(UastType::Identifier.type_name())),
                Field::drop(KEY_POS),
                Field::required("Name", var("name")),
            ]),
            fields(
                native_head("CPPASTTemplateId")
                    .into_iter()
                    .chain([
                        Field::required("Name", segment_name()),
                        Field::optional("Prop_TemplateArguments", "optTemplateArgs", any()),
                        Field::required("Prop_TemplateName", any()),
                        Field::drop("IsQualified"),
                    ])
                    .collect(),
            ),
            fields(
                native_head("CPPASTConversionName")
                    .into_iter()
                    .chain([
                        Field::required("Name", segment_name()),
                        Field::optional("Prop_TypeId", "optConversionType", any()),
                        Field::drop("IsQualified"),
                    ])
                    .collect(),
            ),
            is_null(),
        ],
    );
    let names = cases(
        "caseQualParts",
        vec![
            identifier(var("name")),
            identifier(var("name")),
            identifier(var("name")),
            is_null(),
        ],
    );
    let mut src = vec![
        Field::required("Prop_AllSegments", each("qualParts", segments)),
        // The qualifier segments are repeated in Prop_AllSegments.
        Field::optional("Prop_Qualifier", "optPropQual", any()),
    ];
    // `Name` holds the segments joined with `::`.
    src.extend(dropped(&["Name", "IsQualified", "IsConversionOperator", "IsFullyQualified"]));
    map_semantic(
        "CPPASTQualifiedName",
        UastType::QualifiedIdentifier,
        src,
        vec![Field::required("Names", each("qualParts", names))],
    )
}

// ============================================================================
// FUNCTION DEFINITIONS
// ============================================================================

const SIMPLE_DECL_FLAGS: &[&str] = &[
    "IsComplex",
    "IsConst",
    "IsConstExpr",
    "IsExplicit",
    "IsFriend",
    "IsImaginary",
    "IsInline",
    "IsLong",
    "IsLongLong",
    "IsRestrict",
    "IsShort",
    "IsSigned",
    "IsThreadLocal",
    "IsUnsigned",
    "IsVirtual",
    "IsVolatile",
];

const NAMED_TYPE_FLAGS: &[&str] = &[
    "IsConst",
    "IsConstExpr",
    "IsExplicit",
    "IsFriend",
    "IsInline",
    "IsRestrict",
    "IsThreadLocal",
    "IsTypeName",
    "IsVirtual",
    "IsVolatile",
];

const DECLARATOR_FLAGS: &[&str] = &[
    "IsConst",
    "IsFinal",
    "IsMutable",
    "IsOverride",
    "IsPureVirtual",
    "IsVolatile",
];

/// Required fields whose values are ignored.
fn ignored(names: &[&str]) -> Vec<Field> {
    names.iter().map(|name| Field::required(name, any())).collect()
}

fn simple_decl_specifier(storage: BoxOp, ty: BoxOp) -> BoxOp {
    let mut f = native_head("CPPASTSimpleDeclSpecifier");
    f.extend(ignored(SIMPLE_DECL_FLAGS));
    f.push(Field::required("StorageClass", storage));
    f.push(Field::required("Type", ty));
    fields(f)
}

fn named_type_specifier() -> BoxOp {
    let mut f = native_head("CPPASTNamedTypeSpecifier");
    f.extend(ignored(NAMED_TYPE_FLAGS));
    f.push(Field::required("StorageClass", var("StorageClass")));
    f.push(Field::required("Prop_Name", var("retType")));
    fields(f)
}

fn return_type() -> BoxOp {
    cases(
        "retTypeCase",
        vec![
            simple_decl_specifier(any(), string("void")),
            // Constructors and destructors.
            simple_decl_specifier(any(), string("unspecified")),
            simple_decl_specifier(var("StorageClass"), var("retType")),
            named_type_specifier(),
        ],
    )
}

fn function_name() -> BoxOp {
    cases(
        "caseName",
        vec![
            is_null(),
            fields(vec![
                Field::required(KEY_TYPE, string(UastType::Identifier.type_name())),
                Field::drop(KEY_POS),
                Field::required("Name", var("name")),
            ]),
            fields(vec![
                Field::required(KEY_TYPE, string(UastType::QualifiedIdentifier.type_name())),
                Field::drop(KEY_POS),
                Field::required("Names", var("qualnames")),
            ]),
        ],
    )
}

fn parameter(native: &str, extra: Vec<Field>) -> BoxOp {
    let mut f = native_head(native);
    f.push(Field::required("Prop_Name", var("aname")));
    f.push(Field::required("Prop_TypeNode", var("atype")));
    f.push(Field::required("DeclaresParameterPack", any()));
    f.extend(extra);
    f.push(Field::optional("Prop_PointerOperators", "optPointerOps", any()));
    f.push(Field::optional("Prop_Initializer", "optInitializer", var("ainit")));
    fields(f)
}

fn parameters() -> BoxOp {
    each(
        "args",
        cases(
            "caseParams",
            vec![
                parameter("CPPASTDeclarator", vec![]),
                parameter(
                    "CPPASTArrayDeclarator",
                    vec![Field::required("Prop_ArrayModifiers", any())],
                ),
            ],
        ),
    )
}

fn function_declarator() -> BoxOp {
    let mut f = vec![
        Field::required(KEY_TYPE, string("CPPASTFunctionDeclarator")),
        Field::optional(KEY_POS, "optDeclPos", var("fdpos")),
        Field::drop(KEY_MACRO_ORIGIN),
    ];
    f.extend(ignored(DECLARATOR_FLAGS));
    f.extend([
        Field::optional("Prop_NoexceptExpression", "declNoExcept", any()),
        Field::optional("Prop_VirtSpecifiers", "declVirtSpecs", any()),
        Field::required("Prop_Name", function_name()),
        Field::required("TakesVarArgs", cases("takesVarArgs", vec![bool_lit(false), bool_lit(true)])),
        Field::optional("Prop_ConstructorChain", "optConsChain", any()),
        Field::optional("Prop_PointerOperators", "optPointerOps", any()),
        Field::optional("Prop_Parameters", "optArgs", parameters()),
    ]);
    fields(f)
}

fn argument() -> BoxOp {
    uast_obj(
        UastType::Argument,
        vec![
            ("Name", var("aname")),
            ("Type", var("atype")),
            ("Init", if_flag("optInitializer", var("ainit"), is_null())),
        ],
    )
}

fn function_type() -> BoxOp {
    let returns = cases(
        "retTypeCase",
        vec![
            is_null(),
            is_null(),
            arr(vec![uast_obj(UastType::Argument, vec![("Type", identifier(var("retType")))])]),
            arr(vec![uast_obj(UastType::Argument, vec![("Type", var("retType"))])]),
        ],
    );
    let arguments = cases(
        "takesVarArgs",
        vec![
            each("args", argument()),
            append(
                each("args", argument()),
                vec![uast_obj(UastType::Argument, vec![("Variadic", bool_lit(true))])],
            ),
        ],
    );
    uast_type(
        UastType::FunctionType,
        vec![
            Field::required("Returns", returns),
            Field::optional("Arguments", "optArgs", arguments),
        ],
    )
}

fn function_definition() -> Mapping {
    let alias_name = uast_type(
        UastType::Identifier,
        vec![Field::required(
            "Name",
            cases(
                "caseName",
                vec![is_null(), var("name"), join_names(var("qualnames"))],
            ),
        )],
    );
    let function = uast_type(
        UastType::Function,
        vec![
            Field::optional("Body", "optBody", var("body")),
            Field::required("Type", function_type()),
        ],
    );
    map_semantic(
        "CPPASTFunctionDefinition",
        UastType::FunctionGroup,
        vec![
            Field::required("IsDefaulted", any()),
            Field::required("IsDeleted", any()),
            Field::optional("Prop_Body", "optBody", var("body")),
            Field::required("Prop_DeclSpecifier", return_type()),
            Field::required("Prop_Declarator", function_declarator()),
        ],
        vec![Field::required(
            "Nodes",
            arr(vec![uast_obj(
                UastType::Alias,
                vec![("Name", alias_name), ("Node", function)],
            )]),
        )],
    )
}

// ============================================================================
// TABLE
// ============================================================================

pub fn normalizers() -> Vec<Mapping> {
    vec![
        include(),
        compound_statement(),
        empty_compound_statement(),
        string_literal(),
        comment(true),
        comment(false),
        empty_name(),
        name("CPPASTName"),
        name("CPPASTOperatorName"),
        wrapped_name("CPPASTTemplateId"),
        wrapped_name("CPPASTConversionName"),
        qualified_name(),
        function_definition(),
    ]
}

pub fn table() -> RuleTable {
    RuleTable::new("normalize", KEY_TYPE, normalizers())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use serde_json::json;

    fn apply(input: serde_json::Value) -> Option<Node> {
        table().apply_node(&Node::from(input)).unwrap()
    }

    #[test]
    fn test_table_order() {
        let labels: Vec<String> = table().labels().map(str::to_string).collect();
        assert_eq!(labels[0], "ASTInclusionStatement");
        assert_eq!(labels[6], "CPPASTName (empty)");
        assert_eq!(labels[7], "CPPASTName");
        assert_eq!(labels.last().map(String::as_str), Some("CPPASTFunctionDefinition"));
    }

    #[test]
    fn test_system_include_keeps_path() {
        let out = apply(json!({
            "@type": "ASTInclusionStatement",
            "Name": "stdio.h",
            "Path": "/usr/include/stdio.h",
            "Resolved": true,
            "IsSystem": true
        }))
        .unwrap();
        assert_eq!(
            out,
            Node::from(json!({
                "@type": "uast:InlineImport",
                "Path": {"@type": "uast:String", "Value": "stdio.h", "Format": ""},
                "All": true,
                "Names": null
            }))
        );
    }

    #[test]
    fn test_local_include_strips_dot_slash() {
        let out = apply(json!({"@type": "ASTInclusionStatement", "Name": "./util.h", "IsSystem": false}))
            .unwrap();
        let path = out.as_object().unwrap().get("Path").unwrap();
        assert_eq!(path.str_field("Value"), Some("util.h"));
    }

    #[test]
    fn test_compound_statements() {
        let out = apply(json!({"@type": "CPPASTCompoundStatement", "Prop_Statements": [1, 2]})).unwrap();
        assert_eq!(out, Node::from(json!({"@type": "uast:Block", "Statements": [1, 2]})));

        let out = apply(json!({"@type": "CPPASTCompoundStatement"})).unwrap();
        assert_eq!(out, Node::from(json!({"@type": "uast:Block", "Statements": []})));
    }

    #[test]
    fn test_non_string_literal_untouched() {
        let lit = json!({"@type": "CPPASTLiteralExpression", "LiteralValue": "1", "kind": "integer_constant"});
        assert!(apply(lit).is_none());
    }

    #[test]
    fn test_comments() {
        let out = apply(json!({"@type": "Comment", "Comment": "// hello", "IsBlockComment": false})).unwrap();
        assert_eq!(out.str_field("@type"), Some("uast:Comment"));
        assert_eq!(out.str_field("Text"), Some("hello"));
        assert_eq!(out.as_object().unwrap().get("Block"), Some(&Node::Bool(false)));

        let out = apply(json!({"@type": "Comment", "Comment": "/* note */", "IsBlockComment": true})).unwrap();
        assert_eq!(out.str_field("Text"), Some("note"));
        assert_eq!(out.as_object().unwrap().get("Block"), Some(&Node::Bool(true)));
    }

    #[test]
    fn test_names() {
        let empty = apply(json!({"@type": "CPPASTName", "Name": "", "IsQualified": false})).unwrap();
        assert_eq!(empty, Node::Null);

        let out = apply(json!({"@type": "CPPASTOperatorName", "Name": "operator+", "IsQualified": false}))
            .unwrap();
        assert_eq!(out, Node::from(json!({"@type": "uast:Identifier", "Name": "operator+"})));
    }

    #[test]
    fn test_qualified_name() {
        let out = apply(json!({
            "@type": "CPPASTQualifiedName",
            "Name": "std::vector",
            "IsQualified": true,
            "IsFullyQualified": false,
            "IsConversionOperator": false,
            "Prop_AllSegments": [
                {"@type": "uast:Identifier", "Name": "std"},
                {
                    "@type": "CPPASTTemplateId",
                    "Name": {"@type": "uast:Identifier", "Name": "vector"},
                    "Prop_TemplateName": {"@type": "uast:Identifier", "Name": "vector"},
                    "Prop_TemplateArguments": []
                }
            ],
            "Prop_Qualifier": [{"@type": "uast:Identifier", "Name": "std"}]
        }))
        .unwrap();
        assert_eq!(
            out,
            Node::from(json!({
                "@type": "uast:QualifiedIdentifier",
                "Names": [
                    {"@type": "uast:Identifier", "Name": "std"},
                    {"@type": "uast:Identifier", "Name": "vector"}
                ]
            }))
        );
    }
}
