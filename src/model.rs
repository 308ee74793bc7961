use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::language::LanguageTag;
use crate::syntax::SyntaxNode;

/// path -> source text for one repository snapshot.
pub type RepoMap = BTreeMap<String, String>;

/// path -> parse result, keyed like the `RepoMap` it came from.
pub type ParsedRepo = BTreeMap<String, ParsedFile>;

/// Prefix of the error string stored in place of a failed file's symbols.
pub const PARSE_ERROR_PREFIX: &str = "Error parsing file:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Method,
    /// HTML element.
    Element,
    /// TOML `[table]` / `[[array]]` header.
    Table,
    /// TOML or YAML key/value pair.
    Pair,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Element => "element",
            SymbolKind::Table => "table",
            SymbolKind::Pair => "pair",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, SymbolKind::Class)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,

    /// 1-based, inclusive.
    pub start_line: usize,

    /// 1-based, inclusive, never before `start_line`.
    pub end_line: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Symbol>,
}

impl Symbol {
    pub fn new(kind: SymbolKind, name: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            kind,
            name: name.into(),
            start_line,
            end_line: end_line.max(start_line),
            decorators: Vec::new(),
            children: Vec::new(),
        }
    }

    /// This symbol plus all nested symbols, pre-order.
    pub fn walk(&self) -> impl Iterator<Item = &Symbol> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportCategory {
    Standard,
    Internal,
    External,
    /// Internal and external collapsed together (two-way classification).
    Other,
}

impl ImportCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportCategory::Standard => "standard",
            ImportCategory::Internal => "internal",
            ImportCategory::External => "external",
            ImportCategory::Other => "other",
        }
    }

    /// Map onto the two-way standard/other scheme.
    pub fn collapse(self) -> ImportCategory {
        match self {
            ImportCategory::Standard => ImportCategory::Standard,
            _ => ImportCategory::Other,
        }
    }
}

impl fmt::Display for ImportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub category: ImportCategory,
}

impl ImportRecord {
    /// Graph node id for the imported module.
    pub fn module_id(&self) -> &str {
        self.module.as_deref().unwrap_or(&self.raw_text)
    }
}

/// Imports grouped by category, each group in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportTable(BTreeMap<ImportCategory, Vec<ImportRecord>>);

impl ImportTable {
    pub fn push(&mut self, record: ImportRecord) {
        self.0.entry(record.category).or_default().push(record);
    }

    pub fn get(&self, category: ImportCategory) -> &[ImportRecord] {
        self.0.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (ImportCategory, &[ImportRecord])> + '_ {
        self.0.iter().map(|(cat, records)| (*cat, records.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every import that is not from the standard library.
    pub fn non_standard(&self) -> impl Iterator<Item = &ImportRecord> + '_ {
        self.0
            .iter()
            .filter(|(cat, _)| **cat != ImportCategory::Standard)
            .flat_map(|(_, records)| records.iter())
    }
}

/// Either the extracted symbols or the error text that replaced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileSymbols {
    Extracted(Vec<Symbol>),
    Failed(String),
}

impl FileSymbols {
    pub fn failed(message: impl fmt::Display) -> Self {
        FileSymbols::Failed(format!("{PARSE_ERROR_PREFIX} {message}"))
    }

    pub fn as_slice(&self) -> &[Symbol] {
        match self {
            FileSymbols::Extracted(symbols) => symbols,
            FileSymbols::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FileSymbols::Extracted(_) => None,
            FileSymbols::Failed(msg) => Some(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStructure {
    pub path: String,
    pub language: LanguageTag,
    pub symbols: FileSymbols,
    pub imports: ImportTable,
}

impl FileStructure {
    pub fn is_failed(&self) -> bool {
        self.symbols.error().is_some()
    }
}

/// One entry of a `ParsedRepo`: the structure plus the owned parse tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    #[serde(flatten)]
    pub structure: FileStructure,
    /// `None` when parsing failed or tree retention is disabled.
    pub ast: Option<SyntaxNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_symbols_serialize_as_plain_string() {
        let structure = FileStructure {
            path: "bad.py".into(),
            language: LanguageTag::Python,
            symbols: FileSymbols::failed("syntax error at line 1, column 6"),
            imports: ImportTable::default(),
        };
        let v = serde_json::to_value(&structure).unwrap();
        assert_eq!(v["symbols"], "Error parsing file: syntax error at line 1, column 6");
        assert!(structure.is_failed());
    }

    #[test]
    fn import_table_groups_in_appearance_order() {
        let mut table = ImportTable::default();
        for (text, cat) in [
            ("import requests", ImportCategory::External),
            ("import os", ImportCategory::Standard),
            ("import numpy", ImportCategory::External),
        ] {
            table.push(ImportRecord {
                raw_text: text.into(),
                module: None,
                category: cat,
            });
        }
        let external: Vec<&str> = table
            .get(ImportCategory::External)
            .iter()
            .map(|r| r.raw_text.as_str())
            .collect();
        assert_eq!(external, ["import requests", "import numpy"]);
        assert_eq!(table.non_standard().count(), 2);
        assert_eq!(table.len(), 3);
        assert!(table.get(ImportCategory::Internal).is_empty());
    }

    #[test]
    fn symbol_walk_is_preorder() {
        let mut class = Symbol::new(SymbolKind::Class, "A", 1, 10);
        let mut method = Symbol::new(SymbolKind::Method, "m", 2, 5);
        method.children.push(Symbol::new(SymbolKind::Function, "inner", 3, 4));
        class.children.push(method);
        class.children.push(Symbol::new(SymbolKind::Method, "n", 6, 9));

        let names: Vec<&str> = class.walk().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "m", "inner", "n"]);
    }

    #[test]
    fn end_line_is_clamped_to_start() {
        let s = Symbol::new(SymbolKind::Function, "f", 4, 2);
        assert_eq!((s.start_line, s.end_line), (4, 4));
    }
}
