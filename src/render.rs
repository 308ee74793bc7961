//! Plain-text views of parsed files.
//!
//! Every line produced here is cut to `MAX_LINE_CHARS` characters, and
//! rendering never fails: missing trees and failed files are printed as
//! such.

use std::collections::HashSet;

use crate::model::{FileStructure, ParsedFile, ParsedRepo, Symbol};
use crate::syntax::{cap_chars, is_comment_kind, is_string_kind, SyntaxNode};

pub const MAX_LINE_CHARS: usize = 100;
pub const DEFAULT_MAX_DEPTH: usize = 25;

const INDENT: &str = "│ ";
const ELLIPSIS: &str = "...";
const LABEL_TEXT_CHARS: usize = 20;

fn indent(level: usize) -> String {
    INDENT.repeat(level)
}

/// Collapse runs of whitespace, newlines included, into single spaces.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn finish(lines: Vec<String>) -> String {
    let mut out = String::new();
    for line in lines.iter().flat_map(|l| l.split('\n')) {
        out.push_str(&cap_chars(line, MAX_LINE_CHARS));
        out.push('\n');
    }
    out
}

/// Render every file in `parsed` that is not in `exclude`, in path order.
pub fn render_tree(parsed: &ParsedRepo, exclude: &HashSet<String>, max_depth: usize) -> String {
    let mut lines = Vec::new();
    for (path, file) in parsed {
        if exclude.contains(path) {
            continue;
        }
        render_file(path, file, max_depth, &mut lines);
    }
    finish(lines)
}

fn render_file(path: &str, file: &ParsedFile, max_depth: usize, out: &mut Vec<String>) {
    out.push(String::new());
    out.push(format!("{path}:"));

    if max_depth == 0 {
        out.push(ELLIPSIS.to_string());
        return;
    }
    if let Some(err) = file.structure.symbols.error() {
        out.push(err.to_string());
        return;
    }

    render_structure(&file.structure, max_depth, out);

    out.push("AST:".to_string());
    match &file.ast {
        Some(root) => render_ast(root, 0, max_depth, out),
        None => out.push(ELLIPSIS.to_string()),
    }
}

fn render_structure(structure: &FileStructure, max_depth: usize, out: &mut Vec<String>) {
    out.push("structure:".to_string());
    for symbol in structure.symbols.as_slice() {
        render_symbol(symbol, 1, max_depth, out);
    }

    if structure.imports.is_empty() {
        return;
    }
    out.push("imports:".to_string());
    for (category, records) in structure.imports.iter() {
        out.push(format!("{}{category}:", indent(1)));
        for record in records {
            out.push(format!("{}{}", indent(2), one_line(&record.raw_text)));
        }
    }
}

fn symbol_label(symbol: &Symbol) -> String {
    let mut label = format!(
        "{} {} [{}-{}]",
        symbol.kind,
        one_line(&symbol.name),
        symbol.start_line,
        symbol.end_line
    );
    for decorator in &symbol.decorators {
        label.push_str(" @");
        label.push_str(&one_line(decorator));
    }
    label
}

fn render_symbol(symbol: &Symbol, level: usize, max_depth: usize, out: &mut Vec<String>) {
    out.push(format!("{}{}", indent(level), symbol_label(symbol)));
    if symbol.children.is_empty() {
        return;
    }
    if level >= max_depth {
        out.push(format!("{}{ELLIPSIS}", indent(level + 1)));
        return;
    }
    for child in &symbol.children {
        render_symbol(child, level + 1, max_depth, out);
    }
}

fn skip_node(node: &SyntaxNode) -> bool {
    is_comment_kind(&node.kind) || (is_string_kind(&node.kind) && node.is_multiline())
}

fn node_label(node: &SyntaxNode) -> String {
    let show_text = node.kind.ends_with("identifier") || is_string_kind(&node.kind);
    match node.text.as_deref() {
        Some(text) if show_text => {
            let capped = cap_chars(text, LABEL_TEXT_CHARS);
            let more = if text.chars().count() > LABEL_TEXT_CHARS { ELLIPSIS } else { "" };
            format!("{}: \"{capped}{more}\"", node.kind)
        }
        _ => node.kind.clone(),
    }
}

fn render_ast(node: &SyntaxNode, level: usize, max_depth: usize, out: &mut Vec<String>) {
    if skip_node(node) {
        return;
    }
    out.push(format!("{}{}", indent(level), node_label(node)));
    if node.children.is_empty() {
        if node.truncated {
            out.push(format!("{}{ELLIPSIS}", indent(level + 1)));
        }
        return;
    }
    if level + 1 >= max_depth {
        out.push(format!("{}{ELLIPSIS}", indent(level + 1)));
        return;
    }
    for child in &node.children {
        render_ast(child, level + 1, max_depth, out);
    }
}

/// `<kind> <name>:` per top-level symbol, followed by its non-blank source
/// lines (trimmed) and a closing `⋮...`.
pub fn render_outline(symbols: &[Symbol], source: &str) -> String {
    let source_lines: Vec<&str> = source.lines().collect();
    let mut lines = Vec::new();
    for symbol in symbols {
        lines.push(format!("{} {}:", symbol.kind, one_line(&symbol.name)));
        let start = symbol.start_line.saturating_sub(1);
        let end = symbol.end_line.min(source_lines.len());
        for line in source_lines.get(start..end).unwrap_or(&[]) {
            let line = line.trim();
            if !line.is_empty() {
                lines.push(format!("│{line}"));
            }
        }
        lines.push("⋮...".to_string());
    }
    finish(lines)
}

/// The given 1-based lines of `source`, trimmed and prefixed with `│`.
/// Out-of-range line numbers are ignored.
pub fn render_lines(source: &str, lines: &[usize]) -> String {
    let source_lines: Vec<&str> = source.lines().collect();
    let picked = lines
        .iter()
        .filter(|&&n| n > 0)
        .filter_map(|&n| source_lines.get(n - 1))
        .map(|line| format!("│{}", line.trim()))
        .collect();
    finish(picked)
}
