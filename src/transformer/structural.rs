//! Structural combinators: objects, fixed arrays, per-element sequences,
//! concatenation and ordered case alternation.

use std::collections::BTreeSet;

use im::Vector;

use crate::diagnostics::UastError;
use crate::err_msg;
use crate::node::{Node, Object};
use crate::transformer::{check_soft, BoxOp, CheckResult, Op, State};

// ============================================================================
// OBJECTS
// ============================================================================

/// How a field participates in matching and building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Must be present (or matched as `null` by an op that allows it).
    Required,
    /// May be absent; presence is recorded as a bool under the flag name.
    Optional(String),
    /// Discarded on check, never emitted on construct.
    Drop,
}

#[derive(Debug)]
pub struct Field {
    pub name: String,
    pub op: BoxOp,
    pub kind: FieldKind,
}

impl Field {
    pub fn required(name: &str, op: BoxOp) -> Self {
        Self {
            name: name.to_string(),
            op,
            kind: FieldKind::Required,
        }
    }

    pub fn optional(name: &str, flag: &str, op: BoxOp) -> Self {
        Self {
            name: name.to_string(),
            op,
            kind: FieldKind::Optional(flag.to_string()),
        }
    }

    pub fn drop(name: &str) -> Self {
        Self {
            name: name.to_string(),
            op: crate::transformer::any(),
            kind: FieldKind::Drop,
        }
    }
}

/// An ordered field list matched against an object.
///
/// Fields not named in the list make the match fail, unless a rest variable
/// is set, in which case they are bound as one object and re-emitted after
/// the declared fields on construct.
#[derive(Debug, Default)]
pub struct Fields {
    fields: Vec<Field>,
    rest: Option<String>,
}

impl Fields {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields, rest: None }
    }

    pub fn with_rest(mut self, var: &str) -> Self {
        self.rest = Some(var.to_string());
        self
    }

    /// Puts `common` in front of the existing fields.
    pub fn prepend(mut self, common: Vec<Field>) -> Self {
        let own = std::mem::take(&mut self.fields);
        self.fields = common;
        self.fields.extend(own);
        self
    }

    pub fn push(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    fn declares(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.name == key)
    }

    fn check_field(&self, field: &Field, st: State, obj: &Object) -> CheckResult {
        let value = obj.get(&field.name);
        match (&field.kind, value) {
            (FieldKind::Drop, _) => Ok(Some(st)),
            (FieldKind::Required, Some(v)) => check_soft(field.op.as_ref(), &st, v),
            (FieldKind::Required, None) if field.op.matches_absent() => {
                check_soft(field.op.as_ref(), &st, &Node::Null)
            }
            (FieldKind::Required, None) => Ok(None),
            (FieldKind::Optional(flag), Some(v)) => match check_soft(field.op.as_ref(), &st, v)? {
                Some(next) => Ok(next.bind(flag, Node::Bool(true))),
                None => Ok(None),
            },
            (FieldKind::Optional(flag), None) => Ok(st.bind(flag, Node::Bool(false))),
        }
    }

    fn construct_field(&self, field: &Field, st: &State) -> Result<Option<Node>, UastError> {
        match &field.kind {
            FieldKind::Drop => Ok(None),
            FieldKind::Required => field.op.construct(st).map(Some),
            FieldKind::Optional(flag) => match st.get_var(flag) {
                Some(Node::Bool(true)) => field.op.construct(st).map(Some),
                Some(Node::Bool(false)) => Ok(None),
                Some(other) => Err(err_msg!(
                    Internal,
                    "presence flag '{}' must be a bool, found {}",
                    flag,
                    other.kind()
                )),
                // Without a flag, emit the field only if its value can be built.
                None => match field.op.construct(st) {
                    Ok(node) => Ok(Some(node)),
                    Err(UastError::UnboundVariable { .. }) => Ok(None),
                    Err(e) => Err(e),
                },
            },
        }
    }
}

impl Op for Fields {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let Node::Object(obj) = node else {
            return Ok(None);
        };
        let mut rest = Object::new();
        for (key, value) in obj.iter() {
            if !self.declares(key) {
                if self.rest.is_none() {
                    return Ok(None);
                }
                rest.insert(key, value.clone());
            }
        }
        let mut cur = st.clone();
        for field in &self.fields {
            match self.check_field(field, cur, obj)? {
                Some(next) => cur = next,
                None => return Ok(None),
            }
        }
        match &self.rest {
            Some(name) => Ok(cur.bind(name, Node::Object(rest))),
            None => Ok(Some(cur)),
        }
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let mut out = Object::with_capacity(self.fields.len());
        for field in &self.fields {
            if let Some(value) = self.construct_field(field, st)? {
                out.insert(field.name.as_str(), value);
            }
        }
        if let Some(name) = &self.rest {
            match st.var(name)? {
                Node::Object(rest) => {
                    for (k, v) in rest.iter() {
                        if !out.contains_key(k) {
                            out.insert(k, v.clone());
                        }
                    }
                }
                Node::Null => {}
                other => {
                    return Err(err_msg!(
                        Internal,
                        "rest variable '{}' must hold an object, found {}",
                        name,
                        other.kind()
                    ))
                }
            }
        }
        Ok(Node::Object(out))
    }

    fn field_literal(&self, key: &str) -> Option<&Node> {
        self.fields
            .iter()
            .find(|f| f.name == key && f.kind == FieldKind::Required)
            .and_then(|f| f.op.literal_value())
    }

    fn dropped_fields(&self, out: &mut BTreeSet<String>) {
        for field in &self.fields {
            if field.kind == FieldKind::Drop || field.op.discards() {
                out.insert(field.name.clone());
            }
            field.op.dropped_fields(out);
        }
    }
}

// ============================================================================
// SEQUENCES
// ============================================================================

/// Matches an array of exactly this many elements, positionally.
#[derive(Debug)]
pub struct Arr {
    items: Vec<BoxOp>,
}

impl Op for Arr {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let Node::Array(items) = node else {
            return Ok(None);
        };
        check_positional(&self.items, st, items)
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        self.items
            .iter()
            .map(|op| op.construct(st))
            .collect::<Result<Vec<_>, _>>()
            .map(Node::Array)
    }

    fn dropped_fields(&self, out: &mut BTreeSet<String>) {
        self.items.iter().for_each(|op| op.dropped_fields(out));
    }
}

/// Applies one op to every element of an array of any length.
///
/// Each element is checked against a fresh state; the resulting sub-states
/// are bound as a sequence under the variable. On construct, each sub-state
/// is completed with the outer bindings and built in the same order.
#[derive(Debug)]
pub struct Each {
    var: String,
    op: BoxOp,
}

impl Op for Each {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let Node::Array(items) = node else {
            return Ok(None);
        };
        let mut subs = Vector::new();
        for item in items {
            match check_soft(self.op.as_ref(), &State::new(), item)? {
                Some(sub) => subs.push_back(sub),
                None => return Ok(None),
            }
        }
        Ok(st.bind_states(&self.var, subs))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let subs = st.sub_states(&self.var)?;
        let mut out = Vec::with_capacity(subs.len());
        for sub in subs.iter() {
            out.push(self.op.construct(&sub.apply_from(st))?);
        }
        Ok(Node::Array(out))
    }

    fn dropped_fields(&self, out: &mut BTreeSet<String>) {
        self.op.dropped_fields(out);
    }
}

/// Concatenates a sequence op with a fixed trailing tail.
///
/// On check, the last `tail.len()` elements are matched positionally by the
/// tail ops and the leading elements are handed to `seq` as an array.
#[derive(Debug)]
pub struct Append {
    seq: BoxOp,
    tail: Vec<BoxOp>,
}

impl Op for Append {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let Node::Array(items) = node else {
            return Ok(None);
        };
        if items.len() < self.tail.len() {
            return Ok(None);
        }
        let split = items.len() - self.tail.len();
        let Some(next) = check_positional(&self.tail, st, &items[split..])? else {
            return Ok(None);
        };
        check_soft(self.seq.as_ref(), &next, &Node::Array(items[..split].to_vec()))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let mut items = match self.seq.construct(st)? {
            Node::Array(items) => items,
            other => {
                return Err(err_msg!(
                    Internal,
                    "append expects its sequence op to build an array, found {}",
                    other.kind()
                ))
            }
        };
        for op in &self.tail {
            items.push(op.construct(st)?);
        }
        Ok(Node::Array(items))
    }

    fn dropped_fields(&self, out: &mut BTreeSet<String>) {
        self.seq.dropped_fields(out);
        self.tail.iter().for_each(|op| op.dropped_fields(out));
    }
}

fn check_positional(ops: &[BoxOp], st: &State, items: &[Node]) -> CheckResult {
    if ops.len() != items.len() {
        return Ok(None);
    }
    let mut cur = st.clone();
    for (op, item) in ops.iter().zip(items) {
        match check_soft(op.as_ref(), &cur, item)? {
            Some(next) => cur = next,
            None => return Ok(None),
        }
    }
    Ok(Some(cur))
}

// ============================================================================
// CASE ALTERNATION
// ============================================================================

/// Ordered choice. The first alternative that matches wins and its index is
/// recorded under the tag; construct replays the recorded alternative.
#[derive(Debug)]
pub struct Cases {
    tag: String,
    alts: Vec<BoxOp>,
}

impl Op for Cases {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        for (i, alt) in self.alts.iter().enumerate() {
            let Some(next) = check_soft(alt.as_ref(), st, node)? else {
                continue;
            };
            if let Some(bound) = next.bind(&self.tag, Node::Int(i as i64)) {
                return Ok(Some(bound));
            }
        }
        Ok(None)
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let index = match st.var(&self.tag)? {
            Node::Int(i) => *i,
            other => {
                return Err(err_msg!(
                    Internal,
                    "case tag '{}' must be an int, found {}",
                    self.tag,
                    other.kind()
                ))
            }
        };
        let alt = usize::try_from(index)
            .ok()
            .and_then(|i| self.alts.get(i))
            .ok_or_else(|| {
                err_msg!(
                    Internal,
                    "case tag '{}' selects alternative {} of {}",
                    self.tag,
                    index,
                    self.alts.len()
                )
            })?;
        alt.construct(st)
    }

    fn matches_absent(&self) -> bool {
        self.alts.iter().any(|alt| alt.matches_absent())
    }

    fn dropped_fields(&self, out: &mut BTreeSet<String>) {
        self.alts.iter().for_each(|alt| alt.dropped_fields(out));
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

/// An object whose fields are all required.
pub fn obj(fields: Vec<(&str, BoxOp)>) -> BoxOp {
    Box::new(Fields::new(
        fields
            .into_iter()
            .map(|(name, op)| Field::required(name, op))
            .collect(),
    ))
}

pub fn fields(fields: Vec<Field>) -> BoxOp {
    Box::new(Fields::new(fields))
}

pub fn arr(items: Vec<BoxOp>) -> BoxOp {
    Box::new(Arr { items })
}

pub fn each(var: &str, op: BoxOp) -> BoxOp {
    Box::new(Each {
        var: var.to_string(),
        op,
    })
}

pub fn append(seq: BoxOp, tail: Vec<BoxOp>) -> BoxOp {
    Box::new(Append { seq, tail })
}

pub fn cases(tag: &str, alts: Vec<BoxOp>) -> BoxOp {
    Box::new(Cases {
        tag: tag.to_string(),
        alts,
    })
}

/// Ordered choice between object shapes that share a common set of fields.
pub fn cases_obj(tag: &str, common: impl Fn() -> Vec<Field>, alts: Vec<Vec<Field>>) -> BoxOp {
    cases(
        tag,
        alts.into_iter()
            .map(|alt| Box::new(Fields::new(alt).prepend(common())) as BoxOp)
            .collect(),
    )
}
