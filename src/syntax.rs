//! Owned parse trees and small tree-sitter helpers.
//!
//! A `tree_sitter::Tree` borrows nothing but is tied to the source it was
//! parsed from, so after extraction the tree is copied into a plain
//! `SyntaxNode` that can be stored, serialized and rendered on its own.

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

/// Leaf text longer than this is cut when the tree is copied.
const LEAF_TEXT_CAP: usize = 200;

/// Owned trees stop here; long operator chains nest one level per operand.
pub const MAX_TREE_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxNode {
    pub kind: String,
    /// 1-based, inclusive.
    pub start_line: usize,
    /// 1-based, inclusive.
    pub end_line: usize,
    /// Source text for leaves and single-line string literals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SyntaxNode>,
    /// Children were dropped because the node sits at `MAX_TREE_DEPTH`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl SyntaxNode {
    /// Copy the named nodes under `root` into an owned tree.
    ///
    /// Walks with an explicit stack; nodes deeper than `MAX_TREE_DEPTH`
    /// are kept as `truncated` stubs.
    pub fn from_tree(root: Node, source: &str) -> Self {
        let mut stack = vec![Frame::open(root, 0)];
        loop {
            let top = stack.len() - 1;
            if let Some(child) = stack[top].pending.next() {
                stack.push(Frame::open(child, top + 1));
                continue;
            }
            let built = stack.swap_remove(top).close(source);
            match stack.last_mut() {
                Some(parent) => parent.children.push(built),
                None => return built,
            }
        }
    }

    pub fn is_multiline(&self) -> bool {
        self.end_line > self.start_line
    }

    /// Total number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(SyntaxNode::count).sum::<usize>()
    }

    /// Nesting depth of this subtree (a lone node has depth 1).
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(SyntaxNode::depth).max().unwrap_or(0)
    }
}

struct Frame<'t> {
    node: Node<'t>,
    truncated: bool,
    pending: std::vec::IntoIter<Node<'t>>,
    children: Vec<SyntaxNode>,
}

impl<'t> Frame<'t> {
    fn open(node: Node<'t>, depth: usize) -> Self {
        let truncated = depth >= MAX_TREE_DEPTH && node.named_child_count() > 0;
        let pending = if truncated { Vec::new() } else { named_children(node) };
        Self {
            node,
            truncated,
            pending: pending.into_iter(),
            children: Vec::new(),
        }
    }

    fn close(self, source: &str) -> SyntaxNode {
        let (start_line, end_line) = line_span(self.node);
        let kind = self.node.kind();
        let keep_text = !self.truncated
            && (self.children.is_empty() || (is_string_kind(kind) && start_line == end_line));
        SyntaxNode {
            kind: kind.to_string(),
            start_line,
            end_line,
            text: keep_text.then(|| cap_chars(node_text(self.node, source), LEAF_TEXT_CAP)),
            children: self.children,
            truncated: self.truncated,
        }
    }
}

pub fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// 1-based inclusive line span of a node.
///
/// Nodes that swallow a trailing newline end at column 0 of the next row;
/// those are reported as ending on the previous line.
pub fn line_span(node: Node) -> (usize, usize) {
    let start = node.start_position();
    let end = node.end_position();
    let start_line = start.row + 1;
    let mut end_line = end.row + 1;
    if end.column == 0 && end.row > start.row {
        end_line -= 1;
    }
    (start_line, end_line.max(start_line))
}

pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

pub fn is_comment_kind(kind: &str) -> bool {
    matches!(kind, "comment" | "line_comment" | "block_comment" | "html_comment")
}

pub fn is_string_kind(kind: &str) -> bool {
    matches!(
        kind,
        "string"
            | "template_string"
            | "string_literal"
            | "raw_string_literal"
            | "text_block"
            | "concatenated_string"
    )
}

/// Location (1-based line, 1-based column) of the first syntax error, if any.
pub fn first_error_position(root: Node) -> Option<(usize, usize)> {
    let node = first_error(root)?;
    let pos = node.start_position();
    Some((pos.row + 1, pos.column + 1))
}

fn first_error(root: Node) -> Option<Node> {
    if !root.has_error() {
        return None;
    }
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let mut flagged: Vec<Node> = node.children(&mut cursor).filter(|c| c.has_error()).collect();
        flagged.reverse();
        stack.extend(flagged);
    }
    Some(root)
}

/// First `max` chars of `s`, never splitting a code point.
pub fn cap_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
