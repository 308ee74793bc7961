//! Symbol and import extraction over tree-sitter trees.
//!
//! Each language gets a `LanguageRules` entry: the node kinds that are
//! imports, and a `declare` function deciding whether a node declares a
//! symbol. The walk itself is shared and pure: every call returns a freshly
//! built vector that the caller merges.

use tree_sitter::Node;

use crate::language::LanguageTag;
use crate::model::{Symbol, SymbolKind};
use crate::syntax::{line_span, named_children, node_text};

const ANONYMOUS: &str = "anonymous";

/// Declarations nested deeper than this keep no children.
pub const MAX_SYMBOL_DEPTH: usize = 64;

/// Raw per-file extraction result, before import classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub symbols: Vec<Symbol>,
    /// Trimmed import statement text, in source order.
    pub imports: Vec<String>,
}

struct Declared<'t> {
    kind: SymbolKind,
    name: String,
    decorators: Vec<String>,
    /// Node whose position gives the symbol's line span.
    span: Node<'t>,
    /// Node whose children are searched for nested symbols.
    body: Node<'t>,
}

impl<'t> Declared<'t> {
    fn new(kind: SymbolKind, name: String, node: Node<'t>) -> Self {
        Self {
            kind,
            name,
            decorators: Vec::new(),
            span: node,
            body: node,
        }
    }
}

struct LanguageRules {
    import_kinds: &'static [&'static str],
    declare: for<'t> fn(Node<'t>, &str, Option<SymbolKind>) -> Option<Declared<'t>>,
}

static PYTHON: LanguageRules = LanguageRules {
    import_kinds: &["import_statement", "import_from_statement", "future_import_statement"],
    declare: declare_python,
};

static ECMASCRIPT: LanguageRules = LanguageRules {
    import_kinds: &["import_statement"],
    declare: declare_ecmascript,
};

static JAVA: LanguageRules = LanguageRules {
    import_kinds: &["import_declaration"],
    declare: declare_java,
};

static CPP: LanguageRules = LanguageRules {
    import_kinds: &["preproc_include"],
    declare: declare_cpp,
};

static BASH: LanguageRules = LanguageRules {
    import_kinds: &[],
    declare: declare_bash,
};

static HTML: LanguageRules = LanguageRules {
    import_kinds: &[],
    declare: declare_html,
};

static TOML: LanguageRules = LanguageRules {
    import_kinds: &[],
    declare: declare_toml,
};

static YAML: LanguageRules = LanguageRules {
    import_kinds: &[],
    declare: declare_yaml,
};

fn rules_for(language: LanguageTag) -> &'static LanguageRules {
    match language {
        LanguageTag::Python => &PYTHON,
        LanguageTag::Javascript | LanguageTag::Typescript => &ECMASCRIPT,
        LanguageTag::Java => &JAVA,
        LanguageTag::Cpp => &CPP,
        LanguageTag::Bash => &BASH,
        LanguageTag::Html => &HTML,
        LanguageTag::Toml => &TOML,
        LanguageTag::Yaml => &YAML,
    }
}

/// Extract symbols and raw imports from a parsed file.
pub fn extract(root: Node, source: &str, language: LanguageTag) -> Extraction {
    let rules = rules_for(language);
    Extraction {
        symbols: collect_symbols(root, source, rules, None, 0),
        imports: collect_imports(root, source, rules),
    }
}

/// Named children of `node`, last first, ready to be popped in source order.
fn pending_children(node: Node) -> Vec<Node> {
    let mut children = named_children(node);
    children.reverse();
    children
}

/// Pre-order walk below `node` with an explicit stack. Only declarations
/// recurse, and only up to `MAX_SYMBOL_DEPTH` levels.
fn collect_symbols(
    node: Node,
    source: &str,
    rules: &LanguageRules,
    parent: Option<SymbolKind>,
    depth: usize,
) -> Vec<Symbol> {
    let mut out = Vec::new();
    let mut stack = pending_children(node);
    while let Some(child) = stack.pop() {
        if rules.import_kinds.contains(&child.kind()) {
            continue;
        }
        match (rules.declare)(child, source, parent) {
            Some(decl) => {
                let (start_line, end_line) = line_span(decl.span);
                let mut symbol = Symbol::new(decl.kind, decl.name, start_line, end_line);
                symbol.decorators = decl.decorators;
                if depth < MAX_SYMBOL_DEPTH {
                    symbol.children = collect_symbols(decl.body, source, rules, Some(decl.kind), depth + 1);
                }
                out.push(symbol);
            }
            None => stack.extend(pending_children(child)),
        }
    }
    out
}

fn collect_imports(root: Node, source: &str, rules: &LanguageRules) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if rules.import_kinds.contains(&node.kind()) {
            let text = node_text(node, source).trim();
            if !text.is_empty() {
                out.push(text.to_string());
            }
            continue;
        }
        stack.extend(pending_children(node));
    }
    out
}

fn function_kind(parent: Option<SymbolKind>) -> SymbolKind {
    if parent.is_some_and(SymbolKind::is_container) {
        SymbolKind::Method
    } else {
        SymbolKind::Function
    }
}

fn field_text(node: Node, field: &str, source: &str) -> Option<String> {
    let child = node.child_by_field_name(field)?;
    let text = node_text(child, source).trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Pre-order search for the first `*identifier` node below `node`.
fn first_identifier(node: Node) -> Option<Node> {
    let mut stack = pending_children(node);
    while let Some(child) = stack.pop() {
        if child.kind().ends_with("identifier") {
            return Some(child);
        }
        stack.extend(pending_children(child));
    }
    None
}

/// `name` field, falling back to the first identifier descendant.
fn resolve_name(node: Node, source: &str) -> String {
    field_text(node, "name", source)
        .or_else(|| first_identifier(node).map(|n| node_text(n, source).trim().to_string()))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

fn strip_at(text: &str) -> String {
    text.trim().trim_start_matches('@').trim().to_string()
}

fn declare_python<'t>(node: Node<'t>, source: &str, parent: Option<SymbolKind>) -> Option<Declared<'t>> {
    match node.kind() {
        "decorated_definition" => {
            let definition = node.child_by_field_name("definition")?;
            let mut decl = declare_python(definition, source, parent)?;
            let mut cursor = node.walk();
            decl.decorators = node
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "decorator")
                .map(|c| strip_at(node_text(c, source)))
                .collect();
            Some(decl)
        }
        "class_definition" => Some(Declared::new(SymbolKind::Class, resolve_name(node, source), node)),
        "function_definition" => Some(Declared::new(function_kind(parent), resolve_name(node, source), node)),
        _ => None,
    }
}

fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

fn declare_ecmascript<'t>(node: Node<'t>, source: &str, _parent: Option<SymbolKind>) -> Option<Declared<'t>> {
    match node.kind() {
        "class_declaration" | "abstract_class_declaration" => {
            Some(Declared::new(SymbolKind::Class, resolve_name(node, source), node))
        }
        "function_declaration" | "generator_function_declaration" => {
            Some(Declared::new(SymbolKind::Function, resolve_name(node, source), node))
        }
        "method_definition" => Some(Declared::new(SymbolKind::Method, resolve_name(node, source), node)),
        // `const f = () => {}`, `var g = function () {}`; plain values are not symbols.
        "variable_declarator" => {
            let value = node.child_by_field_name("value")?;
            let kind = if is_function_value(value.kind()) {
                SymbolKind::Function
            } else if value.kind() == "class" {
                SymbolKind::Class
            } else {
                return None;
            };
            Some(Declared::new(kind, resolve_name(node, source), node))
        }
        // Class fields holding functions: `handle = () => {}`.
        "field_definition" | "public_field_definition" => {
            let value = node.child_by_field_name("value")?;
            if !is_function_value(value.kind()) {
                return None;
            }
            let name = field_text(node, "property", source).unwrap_or_else(|| resolve_name(node, source));
            Some(Declared::new(SymbolKind::Method, name, node))
        }
        _ => None,
    }
}

fn java_annotations(node: Node, source: &str) -> Vec<String> {
    let mut cursor = node.walk();
    let Some(modifiers) = node.named_children(&mut cursor).find(|c| c.kind() == "modifiers") else {
        return vec![];
    };
    let mut cursor = modifiers.walk();
    modifiers
        .named_children(&mut cursor)
        .filter(|c| matches!(c.kind(), "marker_annotation" | "annotation"))
        .map(|c| strip_at(node_text(c, source)))
        .collect()
}

fn declare_java<'t>(node: Node<'t>, source: &str, parent: Option<SymbolKind>) -> Option<Declared<'t>> {
    let kind = match node.kind() {
        "class_declaration" | "interface_declaration" | "enum_declaration" | "record_declaration" => {
            SymbolKind::Class
        }
        "method_declaration" | "constructor_declaration" => function_kind(parent),
        _ => return None,
    };
    let mut decl = Declared::new(kind, resolve_name(node, source), node);
    decl.decorators = java_annotations(node, source);
    Some(decl)
}

/// Follow `declarator` fields through pointer/reference/function declarators
/// down to the declared name (`draw`, `Widget::size`, `~Widget`).
fn cpp_declarator_name(node: Node, source: &str) -> Option<String> {
    let mut current = node.child_by_field_name("declarator")?;
    while current.kind().ends_with("_declarator") {
        let next = current
            .child_by_field_name("declarator")
            .or_else(|| current.named_child(0));
        match next {
            Some(n) => current = n,
            None => break,
        }
    }
    let text = node_text(current, source).trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn declare_cpp<'t>(node: Node<'t>, source: &str, parent: Option<SymbolKind>) -> Option<Declared<'t>> {
    match node.kind() {
        "class_specifier" | "struct_specifier" => {
            // `struct Foo x;` names a type without declaring one.
            node.child_by_field_name("body")?;
            Some(Declared::new(SymbolKind::Class, resolve_name(node, source), node))
        }
        "function_definition" => {
            let name = field_text(node, "name", source)
                .or_else(|| cpp_declarator_name(node, source))
                .unwrap_or_else(|| resolve_name(node, source));
            Some(Declared::new(function_kind(parent), name, node))
        }
        _ => None,
    }
}

fn declare_bash<'t>(node: Node<'t>, source: &str, _parent: Option<SymbolKind>) -> Option<Declared<'t>> {
    (node.kind() == "function_definition")
        .then(|| Declared::new(SymbolKind::Function, resolve_name(node, source), node))
}

fn html_tag_name(node: Node, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    let tag = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "start_tag" | "self_closing_tag"))?;
    let mut cursor = tag.walk();
    let name = tag.named_children(&mut cursor).find(|c| c.kind() == "tag_name")?;
    let text = node_text(name, source).trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn declare_html<'t>(node: Node<'t>, source: &str, _parent: Option<SymbolKind>) -> Option<Declared<'t>> {
    match node.kind() {
        "element" | "script_element" | "style_element" => {
            let name = html_tag_name(node, source).unwrap_or_else(|| ANONYMOUS.to_string());
            Some(Declared::new(SymbolKind::Element, name, node))
        }
        _ => None,
    }
}

fn toml_key(node: Node, source: &str) -> String {
    let mut cursor = node.walk();
    let key = node
        .named_children(&mut cursor)
        .find(|c| matches!(c.kind(), "bare_key" | "dotted_key" | "quoted_key"));
    key.map(|k| node_text(k, source).trim().to_string())
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

fn declare_toml<'t>(node: Node<'t>, source: &str, _parent: Option<SymbolKind>) -> Option<Declared<'t>> {
    let kind = match node.kind() {
        "table" | "table_array_element" => SymbolKind::Table,
        "pair" => SymbolKind::Pair,
        _ => return None,
    };
    Some(Declared::new(kind, toml_key(node, source), node))
}

fn declare_yaml<'t>(node: Node<'t>, source: &str, _parent: Option<SymbolKind>) -> Option<Declared<'t>> {
    match node.kind() {
        "block_mapping_pair" | "flow_pair" => {
            let name = field_text(node, "key", source).unwrap_or_else(|| ANONYMOUS.to_string());
            Some(Declared::new(SymbolKind::Pair, name, node))
        }
        _ => None,
    }
}
