//! Rewrite rules and the passes that apply them.
//!
//! A [`Mapping`] is one named rule. A [`RuleTable`] is an immutable, ordered
//! set of mappings tried first-match-wins against a single node. A [`Stage`]
//! walks a whole tree applying one table in a fixed [`Order`], and a
//! [`Pipeline`] runs any number of [`Transformer`]s strictly in sequence.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::diagnostics::UastError;
use crate::node::{transform, Node, Object, Order};
use crate::transformer::{check_soft, BoxOp, CheckResult, Op, State};

// ============================================================================
// TRANSFORMER SEAM
// ============================================================================

/// A whole-tree pass.
pub trait Transformer: Send + Sync {
    fn name(&self) -> &str;

    fn transform(&self, root: Node) -> Result<Node, UastError>;
}

// ============================================================================
// MAPPING
// ============================================================================

/// A named rule pairing a source pattern with a destination pattern.
#[derive(Debug, Clone)]
pub struct Mapping {
    label: String,
    src: Arc<dyn Op>,
    dst: Arc<dyn Op>,
}

impl Mapping {
    pub fn new(label: impl Into<String>, src: BoxOp, dst: BoxOp) -> Self {
        Self {
            label: label.into(),
            src: Arc::from(src),
            dst: Arc::from(dst),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &dyn Op {
        self.src.as_ref()
    }

    pub fn destination(&self) -> &dyn Op {
        self.dst.as_ref()
    }

    /// The same rule with source and destination swapped.
    pub fn reverse(&self) -> Mapping {
        Mapping {
            label: format!("{} (reverse)", self.label),
            src: Arc::clone(&self.dst),
            dst: Arc::clone(&self.src),
        }
    }

    /// Matches the source pattern against `node` with a fresh state.
    pub fn check(&self, node: &Node) -> CheckResult {
        check_soft(self.src.as_ref(), &State::new(), node)
    }

    /// Builds the destination from `st`. Errors are tagged with the rule label.
    pub fn construct(&self, st: &State) -> Result<Node, UastError> {
        self.dst
            .construct(st)
            .map_err(|e| e.context(format!("mapping '{}'", self.label)))
    }

    /// Forward application: `Ok(None)` when the source pattern does not match.
    pub fn apply(&self, node: &Node) -> Result<Option<Node>, UastError> {
        let Some(st) = self.check(node)? else {
            return Ok(None);
        };
        trace!(mapping = %self.label, "mapping matched");
        self.construct(&st).map(Some)
    }

    /// Names of the source fields this rule forgets.
    pub fn dropped_fields(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.src.dropped_fields(&mut out);
        out
    }
}

// ============================================================================
// RULE TABLE
// ============================================================================

/// An ordered, immutable collection of mappings.
///
/// Mappings whose source pattern pins the tag field to a literal string are
/// indexed by that string; the rest are tried against every node. Either
/// way candidates are tried in table order.
#[derive(Debug, Clone)]
pub struct RuleTable {
    name: String,
    mappings: Arc<[Mapping]>,
    by_tag: Arc<HashMap<String, Vec<usize>>>,
    untagged: Arc<[usize]>,
    tag_key: String,
}

impl RuleTable {
    pub fn new(name: impl Into<String>, tag_key: &str, mappings: Vec<Mapping>) -> Self {
        let mut by_tag: HashMap<String, Vec<usize>> = HashMap::new();
        let mut untagged = Vec::new();
        for (i, m) in mappings.iter().enumerate() {
            match m.src.field_literal(tag_key).and_then(Node::as_str) {
                Some(tag) => by_tag.entry(tag.to_string()).or_default().push(i),
                None => untagged.push(i),
            }
        }
        Self {
            name: name.into(),
            mappings: mappings.into(),
            by_tag: Arc::new(by_tag),
            untagged: untagged.into(),
            tag_key: tag_key.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(Mapping::label)
    }

    fn candidates(&self, node: &Node) -> Vec<usize> {
        let tagged = node
            .str_field(&self.tag_key)
            .and_then(|tag| self.by_tag.get(tag))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut out = Vec::with_capacity(tagged.len() + self.untagged.len());
        out.extend_from_slice(tagged);
        out.extend_from_slice(&self.untagged);
        out.sort_unstable();
        out
    }

    /// Replaces `node` with the result of the first matching mapping.
    pub fn apply_node(&self, node: &Node) -> Result<Option<Node>, UastError> {
        for i in self.candidates(node) {
            if let Some(out) = self.mappings[i].apply(node)? {
                return Ok(Some(out));
            }
        }
        Ok(None)
    }

    /// Like [`apply_node`](Self::apply_node), additionally running the chosen
    /// mapping in reverse on its own output.
    pub fn round_trip_node(&self, node: &Node) -> Result<Option<(Node, RoundTrip)>, UastError> {
        for i in self.candidates(node) {
            let mapping = &self.mappings[i];
            let Some(st) = mapping.check(node)? else {
                continue;
            };
            let out = mapping.construct(&st)?;
            let report = RoundTrip::verify(mapping, node, &out);
            return Ok(Some((out, report)));
        }
        Ok(None)
    }
}

// ============================================================================
// STAGE AND PIPELINE
// ============================================================================

/// One full-tree pass of a rule table.
#[derive(Debug, Clone)]
pub struct Stage {
    table: RuleTable,
    order: Order,
}

impl Stage {
    pub fn new(table: RuleTable, order: Order) -> Self {
        Self { table, order }
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn order(&self) -> Order {
        self.order
    }

    /// Runs the stage and records a round-trip report for every rewritten node.
    pub fn round_trip(&self, root: Node) -> Result<(Node, Vec<RoundTrip>), UastError> {
        let mut reports = Vec::new();
        let out = transform(root, self.order, &mut |n: &Node| {
            Ok(self.table.round_trip_node(n)?.map(|(out, report)| {
                reports.push(report);
                out
            }))
        })
        .map_err(|e| e.context(format!("stage '{}'", self.table.name)))?;
        Ok((out, reports))
    }
}

impl Transformer for Stage {
    fn name(&self) -> &str {
        self.table.name()
    }

    fn transform(&self, root: Node) -> Result<Node, UastError> {
        debug!(
            stage = %self.table.name,
            order = ?self.order,
            rules = self.table.len(),
            "running stage"
        );
        transform(root, self.order, &mut |n: &Node| self.table.apply_node(n))
            .map_err(|e| e.context(format!("stage '{}'", self.table.name)))
    }
}

/// Transformers run strictly in sequence; each sees the whole output of the previous one.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Transformer>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, stage: impl Transformer + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn then_shared(mut self, stage: Arc<dyn Transformer>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Transformer for Pipeline {
    fn name(&self) -> &str {
        "pipeline"
    }

    fn transform(&self, root: Node) -> Result<Node, UastError> {
        self.stages
            .iter()
            .try_fold(root, |tree, stage| stage.transform(tree))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

// ============================================================================
// ROUND TRIP
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RoundTripOutcome {
    /// The reverse rule rebuilt the original, ignoring forgotten fields.
    Exact,
    /// The reverse rule rebuilt something else.
    Differs { restored: Node },
    /// The reverse rule did not match or could not be built.
    NotReversible { reason: String },
}

/// Result of running one mapping forward and then in reverse.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub label: String,
    pub original: Node,
    pub forward: Node,
    pub outcome: RoundTripOutcome,
    /// Source fields excluded from the comparison.
    pub ignored: BTreeSet<String>,
}

impl RoundTrip {
    /// Checks `forward` with the reverse rule and builds the source shape from
    /// those bindings alone. Anything the forward result does not carry makes
    /// the rewrite irreversible.
    pub fn verify(mapping: &Mapping, original: &Node, forward: &Node) -> RoundTrip {
        let ignored = mapping.dropped_fields();
        let reverse = mapping.reverse();
        let outcome = match reverse.check(forward) {
            Ok(Some(back)) => match reverse.construct(&back) {
                Ok(restored) => {
                    if strip_fields(&restored, &ignored) == strip_fields(original, &ignored) {
                        RoundTripOutcome::Exact
                    } else {
                        RoundTripOutcome::Differs { restored }
                    }
                }
                Err(e) => RoundTripOutcome::NotReversible {
                    reason: e.to_string(),
                },
            },
            Ok(None) => RoundTripOutcome::NotReversible {
                reason: "reverse pattern does not match the forward result".to_string(),
            },
            Err(e) => RoundTripOutcome::NotReversible {
                reason: e.to_string(),
            },
        };
        RoundTrip {
            label: mapping.label().to_string(),
            original: original.clone(),
            forward: forward.clone(),
            outcome,
            ignored,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.outcome == RoundTripOutcome::Exact
    }
}

/// Removes every object field named in `keys`, at any depth.
pub fn strip_fields(node: &Node, keys: &BTreeSet<String>) -> Node {
    match node {
        Node::Array(items) => Node::Array(items.iter().map(|n| strip_fields(n, keys)).collect()),
        Node::Object(obj) => Node::Object(
            obj.iter()
                .filter(|(k, _)| !keys.contains(*k))
                .map(|(k, v)| (k, strip_fields(v, keys)))
                .collect::<Object>(),
        ),
        other => other.clone(),
    }
}
