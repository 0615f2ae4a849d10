//! Position resolution against the original source text.
//!
//! The native parser reports character offsets only. [`FillLineCol`] rewrites
//! every `uast:Position` block so that `offset` is a byte offset into the
//! UTF-8 source and adds 1-based `line` and `col` (in bytes). Blocks that
//! already carry a line are left alone, so running the pass twice is a no-op.

use std::sync::Arc;

use tracing::warn;

use crate::config::OffsetEncoding;
use crate::diagnostics::UastError;
use crate::node::{transform, Node, Order};
use crate::transformer::Transformer;
use crate::uast::{type_of, TYPE_POSITION};

/// Precomputed line starts and UTF-16 boundaries of one source file.
#[derive(Debug, Clone)]
pub struct PositionIndex {
    /// Byte offset of the start of each line.
    line_starts: Vec<usize>,
    /// UTF-16 offset and byte offset of every char boundary, in order.
    boundaries: Vec<(usize, usize)>,
    len: usize,
}

impl PositionIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        let mut boundaries = Vec::with_capacity(source.len() + 1);
        let mut units = 0;
        for (i, c) in source.char_indices() {
            boundaries.push((units, i));
            units += c.len_utf16();
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        boundaries.push((units, source.len()));
        Self {
            line_starts,
            boundaries,
            len: source.len(),
        }
    }

    /// Converts an offset in UTF-16 code units to a byte offset. Offsets past
    /// the end or inside a surrogate pair have no byte equivalent.
    pub fn utf16_to_byte(&self, units: usize) -> Option<usize> {
        let i = self.boundaries.partition_point(|&(u, _)| u < units);
        match self.boundaries.get(i) {
            Some(&(u, byte)) if u == units => Some(byte),
            _ => None,
        }
    }

    /// Converts a byte offset to a 1-based (line, column) pair.
    pub fn line_col(&self, offset: usize) -> Option<(usize, usize)> {
        if offset > self.len {
            return None;
        }
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        Some((line + 1, offset - self.line_starts[line] + 1))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// Fills `line`/`col` into position blocks and remaps their offsets to bytes.
#[derive(Debug, Clone)]
pub struct FillLineCol {
    index: Arc<PositionIndex>,
    encoding: OffsetEncoding,
}

impl FillLineCol {
    pub fn new(source: &str, encoding: OffsetEncoding) -> Self {
        Self {
            index: Arc::new(PositionIndex::new(source)),
            encoding,
        }
    }

    fn resolve(&self, node: &Node) -> Option<Node> {
        if type_of(node) != Some(TYPE_POSITION) {
            return None;
        }
        let obj = node.as_object()?;
        if obj.contains_key("line") {
            return None;
        }
        let raw = obj.get("offset")?.as_int()?;
        let raw = usize::try_from(raw).ok()?;
        let byte = match self.encoding {
            OffsetEncoding::Utf8 => Some(raw),
            OffsetEncoding::Utf16 => self.index.utf16_to_byte(raw),
        };
        let Some((byte, (line, col))) = byte.and_then(|b| Some((b, self.index.line_col(b)?))) else {
            warn!(offset = raw, encoding = ?self.encoding, "position outside the source text");
            return None;
        };
        let mut out = obj.clone();
        out.insert("offset", Node::from(byte));
        out.insert("line", Node::from(line));
        out.insert("col", Node::from(col));
        Some(Node::Object(out))
    }
}

impl Transformer for FillLineCol {
    fn name(&self) -> &str {
        "fill-line-col"
    }

    fn transform(&self, root: Node) -> Result<Node, UastError> {
        transform(root, Order::PostOrder, &mut |n: &Node| Ok(self.resolve(n)))
    }
}
