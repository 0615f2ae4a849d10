//! # Canonical Node Family
//!
//! Names of the canonical node types and reserved keys, plus the pattern
//! builders rule tables use to produce them. Canonical nodes are ordinary
//! [`Node`] objects tagged with `@type = "uast:<Kind>"`.

use crate::node::Node;
use crate::transformer::{
    bool_lit, cases_obj, string, var, BoxOp, Field, Fields, Mapping,
};

pub mod annotate;
pub mod native;
pub mod role;

pub use annotate::{annotate_type, annotate_type_custom, FieldRole, RoleLookup, RolesDedup};
pub use native::{ObjectToNode, ResponseMetadata};
pub use role::{roles_node, Role};

pub const KEY_TYPE: &str = "@type";
pub const KEY_POS: &str = "@pos";
pub const KEY_ROLES: &str = "@role";
pub const KEY_TOKEN: &str = "@token";

pub const TYPE_IDENTIFIER: &str = UastType::Identifier.type_name();
pub const TYPE_POSITIONS: &str = UastType::Positions.type_name();
pub const TYPE_POSITION: &str = UastType::Position.type_name();

/// Field dropped from every native node a semantic rule consumes.
pub const KEY_MACRO_ORIGIN: &str = "ExpandedFromMacro";

// Bindings shared by the semantic rule helpers.
const VAR_POS: &str = "@pos";
const FLAG_POS: &str = "@hasPos";

/// The closed family of canonical node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UastType {
    Identifier,
    QualifiedIdentifier,
    String,
    Comment,
    Block,
    InlineImport,
    Function,
    FunctionType,
    Argument,
    Alias,
    FunctionGroup,
    Positions,
    Position,
}

impl UastType {
    pub const ALL: &'static [UastType] = &[
        UastType::Identifier,
        UastType::QualifiedIdentifier,
        UastType::String,
        UastType::Comment,
        UastType::Block,
        UastType::InlineImport,
        UastType::Function,
        UastType::FunctionType,
        UastType::Argument,
        UastType::Alias,
        UastType::FunctionGroup,
        UastType::Positions,
        UastType::Position,
    ];

    pub const fn type_name(&self) -> &'static str {
        match self {
            UastType::Identifier => "uast:Identifier",
            UastType::QualifiedIdentifier => "uast:QualifiedIdentifier",
            UastType::String => "uast:String",
            UastType::Comment => "uast:Comment",
            UastType::Block => "uast:Block",
            UastType::InlineImport => "uast:InlineImport",
            UastType::Function => "uast:Function",
            UastType::FunctionType => "uast:FunctionType",
            UastType::Argument => "uast:Argument",
            UastType::Alias => "uast:Alias",
            UastType::FunctionGroup => "uast:FunctionGroup",
            UastType::Positions => "uast:Positions",
            UastType::Position => "uast:Position",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.type_name() == name)
    }
}

/// The `@type` of a node, if it has a string one.
pub fn type_of(node: &Node) -> Option<&str> {
    node.str_field(KEY_TYPE)
}

// ============================================================================
// PATTERN BUILDERS
// ============================================================================

/// A canonical object of type `ty` with the given fields.
pub fn uast_type(ty: UastType, fields: Vec<Field>) -> BoxOp {
    Box::new(Fields::new(fields).prepend(vec![Field::required(KEY_TYPE, string(ty.type_name()))]))
}

/// Like [`uast_type`] with every field required.
pub fn uast_obj(ty: UastType, fields: Vec<(&str, BoxOp)>) -> BoxOp {
    uast_type(
        ty,
        fields
            .into_iter()
            .map(|(name, op)| Field::required(name, op))
            .collect(),
    )
}

fn semantic_source(native: &str) -> Vec<Field> {
    vec![
        Field::required(KEY_TYPE, string(native)),
        Field::optional(KEY_POS, FLAG_POS, var(VAR_POS)),
        Field::drop(KEY_MACRO_ORIGIN),
    ]
}

fn semantic_destination(ty: UastType) -> Vec<Field> {
    vec![
        Field::required(KEY_TYPE, string(ty.type_name())),
        Field::optional(KEY_POS, FLAG_POS, var(VAR_POS)),
    ]
}

/// Rewrites native nodes tagged `native` into canonical nodes of type `ty`,
/// carrying the position across and dropping macro provenance.
pub fn map_semantic(native: &str, ty: UastType, src: Vec<Field>, dst: Vec<Field>) -> Mapping {
    Mapping::new(
        native,
        Box::new(Fields::new(src).prepend(semantic_source(native))),
        Box::new(Fields::new(dst).prepend(semantic_destination(ty))),
    )
}

/// [`map_semantic`] whose source is an ordered choice between field sets.
/// The chosen alternative is recorded under `tag`.
pub fn map_semantic_cases(
    native: &str,
    ty: UastType,
    tag: &str,
    alts: Vec<Vec<Field>>,
    dst: Vec<Field>,
) -> Mapping {
    let native_owned = native.to_string();
    Mapping::new(
        native,
        cases_obj(tag, move || semantic_source(&native_owned), alts),
        Box::new(Fields::new(dst).prepend(semantic_destination(ty))),
    )
}

/// Keeps a native node's type and every other field, rewriting only the
/// fields named in `src`/`dst`.
pub fn map_native(native: &str, src: Vec<Field>, dst: Vec<Field>) -> Mapping {
    let tag = || vec![Field::required(KEY_TYPE, string(native))];
    Mapping::new(
        native,
        Box::new(Fields::new(src).prepend(tag()).with_rest("@other")),
        Box::new(Fields::new(dst).prepend(tag()).with_rest("@other")),
    )
}

/// Destination fields of a `uast:Comment` built from the parts bound by
/// [`comment_text`](crate::transformer::comment_text) under `var`.
pub fn comment_node(block: bool, var_prefix: &str) -> Vec<Field> {
    let part = |p: &str| var(&format!("{}_{}", var_prefix, p));
    vec![
        Field::required("Block", bool_lit(block)),
        Field::required("Text", part("text")),
        Field::required("Prefix", part("pref")),
        Field::required("Suffix", part("suff")),
        Field::required("Tab", part("tab")),
    ]
}
