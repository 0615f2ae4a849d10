//! Custom bijective ops over string values.
//!
//! Each op here accepts a string node on check, converts it, and hands the
//! converted value to an inner op (or binds it directly). Construct runs the
//! inverse conversion, so `construct(check(x)) == x` on every accepted input.

use crate::diagnostics::UastError;
use crate::err_msg;
use crate::node::{Node, Object};
use crate::transformer::{check_soft, BoxOp, CheckResult, Op, State};
use crate::uast::{KEY_TYPE, TYPE_IDENTIFIER};

fn expect_string<'a>(node: &'a Node, what: &str) -> Result<&'a str, UastError> {
    node.as_str().ok_or_else(|| {
        err_msg!(ShapeMismatch, "{} expects a string, found {}", what, node.kind())
    })
}

// ============================================================================
// QUOTE
// ============================================================================

/// A quoted literal token on one side, its unquoted value on the other.
///
/// Any well-formed escape is accepted. Construct always emits the canonical
/// spelling, so `"\?"` or `"\x41"` come back as `"?"` and `"A"`.
#[derive(Debug)]
pub struct Quote {
    op: BoxOp,
}

impl Op for Quote {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let raw = expect_string(node, "quote")?;
        let Some(value) = unquote(raw) else {
            return Ok(None);
        };
        check_soft(self.op.as_ref(), st, &Node::String(value))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let value = self.op.construct(st)?;
        Ok(Node::String(quote_str(expect_string(&value, "quote")?)))
    }
}

/// Wraps `s` in double quotes, escaping quotes, backslashes and control characters.
///
/// Unnamed control characters use three-digit octal, except a NUL that is
/// not followed by an octal digit, which is written `\0`.
pub fn quote_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\0' if !chars.peek().is_some_and(|n| n.is_digit(8)) => out.push_str("\\0"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0b' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Decodes a double-quoted literal. Returns `None` on malformed input.
pub fn unquote(s: &str) -> Option<String> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => return None,
            '\\' => {}
            c => {
                out.push(c);
                continue;
            }
        }
        let decoded = match chars.next()? {
            'a' => '\x07',
            'b' => '\x08',
            'f' => '\x0c',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\x0b',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            '?' => '?',
            'x' => char::from_u32(take_hex(&mut chars, 2)?)?,
            'u' => char::from_u32(take_hex(&mut chars, 4)?)?,
            'U' => char::from_u32(take_hex(&mut chars, 8)?)?,
            d @ '0'..='7' => {
                let mut value = d.to_digit(8)?;
                for _ in 0..2 {
                    match chars.peek().and_then(|n| n.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                char::from_u32(value)?
            }
            _ => return None,
        };
        out.push(decoded);
    }
    Some(out)
}

fn take_hex(chars: &mut impl Iterator<Item = char>, n: usize) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..n {
        value = value.checked_mul(16)? + chars.next()?.to_digit(16)?;
    }
    Some(value)
}

// ============================================================================
// PATH PREFIX
// ============================================================================

/// Strips a leading `./` from an include path, recording whether it was there.
///
/// The flag lets construct restore the exact original path. When the flag is
/// unbound the path is emitted as-is.
#[derive(Debug)]
pub struct TrimDotSlash {
    flag: String,
    op: BoxOp,
}

impl Op for TrimDotSlash {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let path = expect_string(node, "include path")?;
        let (trimmed, had_prefix) = match path.strip_prefix("./") {
            Some(rest) => (rest, true),
            None => (path, false),
        };
        let Some(next) = st.bind(&self.flag, Node::Bool(had_prefix)) else {
            return Ok(None);
        };
        check_soft(self.op.as_ref(), &next, &Node::from(trimmed))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let value = self.op.construct(st)?;
        let path = expect_string(&value, "include path")?;
        match st.get_var(&self.flag) {
            Some(Node::Bool(true)) => Ok(Node::String(format!("./{}", path))),
            _ => Ok(value),
        }
    }
}

// ============================================================================
// COMMENTS
// ============================================================================

/// Splits a comment token into its delimiters, surrounding whitespace,
/// common indentation and text.
///
/// Binds `{var}_text`, `{var}_pref`, `{var}_suff` and `{var}_tab`.
#[derive(Debug)]
pub struct CommentText {
    start: String,
    end: String,
    var: String,
}

/// The parts of a comment body between its delimiters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentParts {
    pub text: String,
    pub prefix: String,
    pub suffix: String,
    pub tab: String,
}

impl CommentParts {
    /// Splits a comment body. Returns `None` when a continuation line does
    /// not start with the common indentation, which cannot be reproduced.
    pub fn split(body: &str) -> Option<Self> {
        let is_space = |c: char| c.is_whitespace();
        let trimmed_start = body.trim_start_matches(is_space);
        let prefix = &body[..body.len() - trimmed_start.len()];
        let text = trimmed_start.trim_end_matches(is_space);
        let suffix = &trimmed_start[text.len()..];

        let mut lines = text.split('\n');
        let first = lines.next().unwrap_or_default();
        let rest: Vec<&str> = lines.collect();
        if rest.is_empty() {
            return Some(Self {
                text: text.to_string(),
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
                tab: String::new(),
            });
        }

        let tab = common_indent(&rest);
        let mut out = first.to_string();
        for line in &rest {
            out.push('\n');
            out.push_str(line.strip_prefix(tab)?);
        }
        Some(Self {
            text: out,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            tab: tab.to_string(),
        })
    }

    pub fn join(&self) -> String {
        let mut out = self.prefix.clone();
        let mut lines = self.text.split('\n');
        out.push_str(lines.next().unwrap_or_default());
        for line in lines {
            out.push('\n');
            out.push_str(&self.tab);
            out.push_str(line);
        }
        out.push_str(&self.suffix);
        out
    }
}

fn common_indent<'a>(lines: &[&'a str]) -> &'a str {
    let indent = |l: &'a str| &l[..l.len() - l.trim_start_matches([' ', '\t']).len()];
    let mut tab = indent(lines[0]);
    for line in &lines[1..] {
        let other = indent(line);
        let shared = tab
            .char_indices()
            .zip(other.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((i, c), _)| i + c.len_utf8())
            .unwrap_or(0);
        tab = &tab[..shared];
    }
    tab
}

impl CommentText {
    fn key(&self, part: &str) -> String {
        format!("{}_{}", self.var, part)
    }
}

impl Op for CommentText {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let token = expect_string(node, "comment")?;
        let Some(body) = token
            .strip_prefix(self.start.as_str())
            .and_then(|rest| rest.strip_suffix(self.end.as_str()))
        else {
            return Ok(None);
        };
        let Some(parts) = CommentParts::split(body) else {
            return Ok(None);
        };
        Ok(st
            .bind(&self.key("text"), Node::String(parts.text))
            .and_then(|s| s.bind(&self.key("pref"), Node::String(parts.prefix)))
            .and_then(|s| s.bind(&self.key("suff"), Node::String(parts.suffix)))
            .and_then(|s| s.bind(&self.key("tab"), Node::String(parts.tab))))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let part = |name: &str| -> Result<String, UastError> {
            let key = self.key(name);
            Ok(expect_string(st.var(&key)?, "comment part")?.to_string())
        };
        let parts = CommentParts {
            text: part("text")?,
            prefix: part("pref")?,
            suffix: part("suff")?,
            tab: part("tab")?,
        };
        Ok(Node::String(format!("{}{}{}", self.start, parts.join(), self.end)))
    }
}

// ============================================================================
// QUALIFIED NAMES
// ============================================================================

/// A `::`-separated name on one side, an array of identifier nodes on the other.
#[derive(Debug)]
pub struct JoinNames {
    sep: String,
    op: BoxOp,
}

impl Op for JoinNames {
    fn check(&self, st: &State, node: &Node) -> CheckResult {
        let joined = expect_string(node, "qualified name")?;
        let names: Vec<Node> = joined
            .split(self.sep.as_str())
            .map(|seg| {
                Node::Object(Object::from_iter([
                    (KEY_TYPE, Node::from(TYPE_IDENTIFIER)),
                    ("Name", Node::from(seg)),
                ]))
            })
            .collect();
        check_soft(self.op.as_ref(), st, &Node::Array(names))
    }

    fn construct(&self, st: &State) -> Result<Node, UastError> {
        let names = self.op.construct(st)?;
        let Node::Array(items) = &names else {
            return Err(err_msg!(
                ShapeMismatch,
                "qualified name expects an array of identifiers, found {}",
                names.kind()
            ));
        };
        let segments = items
            .iter()
            .map(|item| match item {
                // An empty segment, as in a fully qualified `::a`.
                Node::Null => Ok(""),
                _ => item.str_field("Name").ok_or_else(|| {
                    err_msg!(ShapeMismatch, "qualified name segment has no string 'Name'")
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::String(segments.join(&self.sep)))
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

pub fn quote(op: BoxOp) -> BoxOp {
    Box::new(Quote { op })
}

pub fn trim_dot_slash(flag: &str, op: BoxOp) -> BoxOp {
    Box::new(TrimDotSlash {
        flag: flag.to_string(),
        op,
    })
}

/// A comment delimited by `tokens.0` and `tokens.1`; an empty end token
/// means the comment runs to the end of the string.
pub fn comment_text(tokens: (&str, &str), var: &str) -> BoxOp {
    Box::new(CommentText {
        start: tokens.0.to_string(),
        end: tokens.1.to_string(),
        var: var.to_string(),
    })
}

pub fn join_names(op: BoxOp) -> BoxOp {
    Box::new(JoinNames {
        sep: "::".to_string(),
        op,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformer::var;

    fn round_trip(op: &BoxOp, input: &str) -> Node {
        let st = op.check(&State::new(), &Node::from(input)).unwrap().unwrap();
        op.construct(&st).unwrap()
    }

    #[test]
    fn test_quote_unquotes_value() {
        let op = quote(var("val"));
        let st = op.check(&State::new(), &Node::from("\"hi\"")).unwrap().unwrap();
        assert_eq!(st.get_var("val"), Some(&Node::from("hi")));
        assert_eq!(op.construct(&st).unwrap(), Node::from("\"hi\""));
    }

    #[test]
    fn test_quote_escapes_round_trip() {
        let op = quote(var("val"));
        for input in [r#""""#, r#""a\"b""#, r#""tab\there""#, r#""line\n""#, r#""back\\slash""#] {
            assert_eq!(round_trip(&op, input), Node::from(input), "input {}", input);
        }
    }

    #[test]
    fn test_quote_accepts_any_escape_and_emits_canonical_form() {
        let op = quote(var("val"));
        for (input, value, canonical) in [
            (r#""\x41""#, "A", r#""A""#),
            (r#""\0""#, "\0", r#""\0""#),
            (r#""a\0b""#, "a\0b", r#""a\0b""#),
            (r#""\?\?=""#, "??=", r#""??=""#),
            (r#""\12x""#, "\nx", r#""\nx""#),
        ] {
            let st = op.check(&State::new(), &Node::from(input)).unwrap().unwrap();
            assert_eq!(st.get_var("val"), Some(&Node::from(value)), "input {}", input);
            assert_eq!(op.construct(&st).unwrap(), Node::from(canonical), "input {}", input);
        }
    }

    #[test]
    fn test_control_characters_round_trip_through_octal() {
        assert_eq!(quote_str("\0"), r#""\0""#);
        assert_eq!(quote_str("\x001"), r#""\0001""#);
        assert_eq!(quote_str("\x01z"), r#""\001z""#);
        for value in ["\x001", "\x01z", "\x7f7", "\0"] {
            assert_eq!(unquote(&quote_str(value)).as_deref(), Some(value));
        }
    }

    #[test]
    fn test_quote_rejects_unquoted() {
        let op = quote(var("val"));
        assert!(op.check(&State::new(), &Node::from("L\"wide\"")).unwrap().is_none());
        assert!(op.check(&State::new(), &Node::from("42")).unwrap().is_none());
        let err = op.check(&State::new(), &Node::from(42i64)).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""\x41\101é""#).as_deref(), Some("AAé"));
        assert_eq!(unquote(r#""bad\q""#), None);
        assert_eq!(unquote("\"unterminated"), None);
    }

    #[test]
    fn test_trim_dot_slash_records_prefix() {
        let op = trim_dot_slash("dotSlash", var("path"));
        let st = op.check(&State::new(), &Node::from("./foo.h")).unwrap().unwrap();
        assert_eq!(st.get_var("path"), Some(&Node::from("foo.h")));
        assert_eq!(op.construct(&st).unwrap(), Node::from("./foo.h"));

        let st = op.check(&State::new(), &Node::from("foo.h")).unwrap().unwrap();
        assert_eq!(st.get_var("path"), Some(&Node::from("foo.h")));
        assert_eq!(op.construct(&st).unwrap(), Node::from("foo.h"));
    }

    #[test]
    fn test_line_comment_parts() {
        let op = comment_text(("//", ""), "c");
        let st = op.check(&State::new(), &Node::from("// hello ")).unwrap().unwrap();
        assert_eq!(st.get_var("c_text"), Some(&Node::from("hello")));
        assert_eq!(st.get_var("c_pref"), Some(&Node::from(" ")));
        assert_eq!(st.get_var("c_suff"), Some(&Node::from(" ")));
        assert_eq!(op.construct(&st).unwrap(), Node::from("// hello "));
    }

    #[test]
    fn test_block_comment_common_indent() {
        let op = comment_text(("/*", "*/"), "c");
        let input = "/* first\n   * second\n   * third\n */";
        let st = op.check(&State::new(), &Node::from(input)).unwrap().unwrap();
        assert_eq!(st.get_var("c_tab"), Some(&Node::from("   ")));
        assert_eq!(st.get_var("c_text"), Some(&Node::from("first\n* second\n* third")));
        assert_eq!(op.construct(&st).unwrap(), Node::from(input));
    }

    #[test]
    fn test_empty_comment_body() {
        let op = comment_text(("/*", "*/"), "c");
        let st = op.check(&State::new(), &Node::from("/**/")).unwrap().unwrap();
        assert_eq!(st.get_var("c_text"), Some(&Node::from("")));
        assert_eq!(op.construct(&st).unwrap(), Node::from("/**/"));
        assert!(op.check(&State::new(), &Node::from("// line")).unwrap().is_none());
    }

    #[test]
    fn test_join_names_both_directions() {
        let op = join_names(var("names"));
        let st = op.check(&State::new(), &Node::from("a::b::c")).unwrap().unwrap();
        let names = st.get_var("names").unwrap().as_array().unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(names[1].str_field("Name"), Some("b"));
        assert_eq!(op.construct(&st).unwrap(), Node::from("a::b::c"));

        assert_eq!(round_trip(&op, "a"), Node::from("a"));
    }
}
