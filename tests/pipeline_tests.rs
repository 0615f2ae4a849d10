//! Driver-level tests: the C++ rule tables run through [`Transforms`].

use serde_json::{json, Value};
use uastify::normalizer::{annotation, normalize};
use uastify::transformer::{RoundTripOutcome, Transformer};
use uastify::{DriverConfig, ErrorType, Mode, Node, Transforms};

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

const DECLARATOR_FLAGS: &[&str] = &[
    "IsConst",
    "IsFinal",
    "IsMutable",
    "IsOverride",
    "IsPureVirtual",
    "IsVolatile",
];

/// Transforms over bare root nodes, without the response envelope.
fn transforms() -> Transforms {
    Transforms::new(&DriverConfig {
        top_level_is_root: true,
        ..DriverConfig::default()
    })
}

fn run(input: Value) -> Value {
    let out = transforms().run(Node::from(input), None, Mode::Semantic).unwrap();
    Value::from(&out)
}

fn with_flags(mut base: Value, flags: &[&str]) -> Value {
    for flag in flags {
        base[*flag] = json!(false);
    }
    base
}

fn name(n: &str) -> Value {
    json!({"IASTClass": "CPPASTName", "Name": n, "IsQualified": false})
}

fn simple_decl(ty: &str) -> Value {
    with_flags(
        json!({"IASTClass": "CPPASTSimpleDeclSpecifier", "StorageClass": "unspecified", "Type": ty}),
        SIMPLE_DECL_FLAGS,
    )
}

fn param(n: &str, ty: &str) -> Value {
    json!({
        "IASTClass": "CPPASTDeclarator",
        "Prop_Name": name(n),
        "Prop_TypeNode": simple_decl(ty),
        "DeclaresParameterPack": false
    })
}

fn function(ret: &str, fname: &str, params: Vec<Value>, varargs: bool) -> Value {
    let mut declarator = with_flags(
        json!({
            "IASTClass": "CPPASTFunctionDeclarator",
            "Prop_Name": name(fname),
            "TakesVarArgs": varargs
        }),
        DECLARATOR_FLAGS,
    );
    if !params.is_empty() {
        declarator["Prop_Parameters"] = Value::Array(params);
    }
    json!({
        "IASTClass": "CPPASTFunctionDefinition",
        "IsDefaulted": false,
        "IsDeleted": false,
        "Prop_Body": {"IASTClass": "CPPASTCompoundStatement"},
        "Prop_DeclSpecifier": simple_decl(ret),
        "Prop_Declarator": declarator
    })
}

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[test]
    fn test_string_literal_scenario() {
        let out = run(json!({
            "IASTClass": "CPPASTLiteralExpression",
            "LiteralValue": "\"hi\"",
            "kind": "string_literal"
        }));
        assert_eq!(out, json!({"@type": "uast:String", "Value": "hi", "Format": ""}));
    }

    #[test]
    fn test_include_scenario() {
        let out = run(json!({"IASTClass": "ASTInclusionStatement", "Name": "foo.h", "IsSystem": false}));
        assert_eq!(out["@type"], "uast:InlineImport");
        assert_eq!(out["Path"]["Value"], "foo.h");
        assert_eq!(out["All"], true);
        assert_eq!(out["Names"], Value::Null);
    }

    #[test]
    fn test_outer_block_sees_canonical_inner_block() {
        let out = run(json!({
            "IASTClass": "CPPASTCompoundStatement",
            "Prop_Statements": [{
                "IASTClass": "CPPASTCompoundStatement",
                "Prop_Statements": [{"IASTClass": "CPPASTNullStatement"}]
            }]
        }));
        assert_eq!(out["@type"], "uast:Block");
        let inner = &out["Statements"][0];
        assert_eq!(inner["@type"], "uast:Block");
        assert_eq!(inner["Statements"][0]["@type"], "CPPASTNullStatement");
        assert_eq!(
            inner["Statements"][0]["@role"],
            json!(["Literal", "Null", "Expression", "Primitive"])
        );
    }

    #[test]
    fn test_native_mode_leaves_tree_alone() {
        let input = json!({"IASTClass": "CPPASTName", "Name": "x", "IsQualified": false});
        let out = transforms().run(Node::from(input.clone()), None, Mode::Native).unwrap();
        assert_eq!(Value::from(&out), input);
    }
}

#[cfg(test)]
mod function_tests {
    use super::*;

    #[test]
    fn test_void_function_with_one_parameter() {
        let out = run(function("void", "f", vec![param("a", "int")], false));
        assert_eq!(out["@type"], "uast:FunctionGroup");
        let alias = &out["Nodes"][0];
        assert_eq!(alias["@type"], "uast:Alias");
        assert_eq!(alias["Name"], json!({"@type": "uast:Identifier", "Name": "f"}));

        let func = &alias["Node"];
        assert_eq!(func["@type"], "uast:Function");
        assert_eq!(func["Body"], json!({"@type": "uast:Block", "Statements": []}));

        let ty = &func["Type"];
        assert_eq!(ty["@type"], "uast:FunctionType");
        assert_eq!(ty["Returns"], Value::Null);
        let args = ty["Arguments"].as_array().unwrap();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0]["@type"], "uast:Argument");
        assert_eq!(args[0]["Name"], json!({"@type": "uast:Identifier", "Name": "a"}));
        assert_eq!(args[0]["Init"], Value::Null);
        // The parameter type stays native and is annotated afterwards.
        assert_eq!(args[0]["Type"]["@token"], "int");
        assert_eq!(args[0]["Type"]["@role"], json!(["Type", "Number"]));
    }

    #[test]
    fn test_returned_simple_type_becomes_argument() {
        let out = run(function("int", "main", vec![], false));
        let ty = &out["Nodes"][0]["Node"]["Type"];
        assert_eq!(
            ty["Returns"],
            json!([{"@type": "uast:Argument", "Type": {"@type": "uast:Identifier", "Name": "int"}}])
        );
        assert!(ty.get("Arguments").is_none());
    }

    #[test]
    fn test_variadic_function_ends_with_variadic_argument() {
        let out = run(function("int", "sum", vec![param("n", "int")], true));
        let args = out["Nodes"][0]["Node"]["Type"]["Arguments"].as_array().unwrap().clone();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0]["Name"]["Name"], "n");
        assert_eq!(args[1], json!({"@type": "uast:Argument", "Variadic": true}));
    }

    #[test]
    fn test_qualified_function_name_is_joined() {
        let mut def = function("void", "ignored", vec![], false);
        def["Prop_Declarator"]["Prop_Name"] = json!({
            "IASTClass": "CPPASTQualifiedName",
            "Name": "Widget::draw",
            "IsQualified": true,
            "IsFullyQualified": false,
            "IsConversionOperator": false,
            "Prop_AllSegments": [name("Widget"), name("draw")]
        });
        let out = run(def);
        assert_eq!(out["Nodes"][0]["Name"]["Name"], "Widget::draw");
    }

    #[test]
    fn test_constructor_has_no_return_type() {
        let out = run(function("unspecified", "Widget", vec![], false));
        assert_eq!(out["Nodes"][0]["Node"]["Type"]["Returns"], Value::Null);
    }
}

#[cfg(test)]
mod round_trip_tests {
    use super::*;

    #[test]
    fn test_simple_rules_round_trip_exactly() {
        let response = Node::from(json!({
            "CPPASTTranslationUnit": {
                "IASTClass": "CPPASTTranslationUnit",
                "Prop_Declarations": [
                    {"IASTClass": "Comment", "Comment": "/* a\n   b */", "IsBlockComment": true},
                    {"IASTClass": "CPPASTLiteralExpression", "LiteralValue": "\"x\\ty\"", "kind": "string_literal"},
                    {
                        "IASTClass": "CPPASTCompoundStatement",
                        "LocOffsetStart": 10,
                        "LocOffsetEnd": 12,
                        "Prop_Statements": [{"IASTClass": "CPPASTCompoundStatement"}]
                    }
                ]
            }
        }));
        let (_, reports) = Transforms::default().round_trip(response).unwrap();
        assert_eq!(reports.len(), 4);
        for report in &reports {
            assert!(report.is_exact(), "{} did not round-trip: {:?}", report.label, report.outcome);
        }
    }

    #[test]
    fn test_include_is_not_reversible_from_its_output() {
        let response = Node::from(json!({
            "CPPASTTranslationUnit": {
                "IASTClass": "CPPASTTranslationUnit",
                "Prop_Declarations": [
                    {"IASTClass": "ASTInclusionStatement", "Name": "./local.h", "IsSystem": false},
                    {"IASTClass": "ASTInclusionStatement", "Name": "map", "IsSystem": true}
                ]
            }
        }));
        let (_, reports) = Transforms::default().round_trip(response).unwrap();
        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert_eq!(report.label, "ASTInclusionStatement");
            match &report.outcome {
                RoundTripOutcome::NotReversible { reason } => {
                    assert!(reason.contains("isSystemCase"), "{}", reason)
                }
                other => panic!("include should not round-trip: {:?}", other),
            }
        }
    }

    #[test]
    fn test_qualified_name_round_trips_exactly() {
        let response = Node::from(json!({
            "root": {
                "IASTClass": "CPPASTQualifiedName",
                "Name": "a::b",
                "IsQualified": true,
                "IsFullyQualified": false,
                "IsConversionOperator": false,
                "Prop_AllSegments": [name("a"), name("b")],
                "Prop_Qualifier": [name("a")]
            }
        }));
        let (_, reports) = Transforms::default().round_trip(response).unwrap();
        let qualified = reports.iter().find(|r| r.label == "CPPASTQualifiedName").unwrap();
        assert!(qualified.is_exact(), "{:?}", qualified.outcome);
    }
}

#[cfg(test)]
mod driver_tests {
    use super::*;

    #[test]
    fn test_response_envelope_must_have_one_field() {
        let err = Transforms::default()
            .run(Node::from(json!({"a": {}, "b": {}})), None, Mode::Semantic)
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::MalformedTree);
    }

    #[test]
    fn test_positions_need_fill_line_col() {
        let config = DriverConfig::from_yaml_str("fill_line_col: false\ntop_level_is_root: true\n").unwrap();
        let input = Node::from(json!({"IASTClass": "CPPASTName", "LocOffsetStart": 0, "Name": "x", "IsQualified": false}));
        let out = Transforms::new(&config).run(input, Some("x"), Mode::Semantic).unwrap();
        assert_eq!(
            Value::from(&out)["@pos"]["start"],
            json!({"@type": "uast:Position", "offset": 0})
        );
    }

    #[test]
    fn test_tables_are_shared_across_threads() {
        let t = transforms();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let t = t.clone();
                std::thread::spawn(move || {
                    let input = Node::from(json!({"IASTClass": "CPPASTName", "Name": format!("v{}", i), "IsQualified": false}));
                    t.run(input, None, Mode::Semantic).unwrap()
                })
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            let out = h.join().unwrap();
            assert_eq!(out.str_field("Name"), Some(format!("v{}", i).as_str()));
        }
    }

    #[test]
    fn test_table_sizes() {
        let t = transforms();
        let [pre, norm, ann] = t.tables();
        assert_eq!(pre.len(), 1);
        assert_eq!(norm.len(), normalize::normalizers().len());
        assert_eq!(ann.len(), annotation::annotations().len());
        assert_eq!(t.pipeline(Mode::Semantic).name(), "pipeline");
    }
}
