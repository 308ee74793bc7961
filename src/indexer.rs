//! RepoMap -> ParsedRepo -> Graph.
//!
//! Files are parsed in parallel, each with its own parser. A failure in one
//! file is stored in that file's entry and never stops the others.

use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::extract::extract;
use crate::graph::{Graph, GraphBuilder};
use crate::imports::ImportClassifier;
use crate::language::{GrammarRegistry, LanguageSelector, LanguageTag};
use crate::model::{FileStructure, FileSymbols, ImportTable, ParsedFile, ParsedRepo, RepoMap};
use crate::syntax::{first_error_position, SyntaxNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub keep_ast: bool,
    pub strict_syntax: bool,
    pub skip_files_without_symbols: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            keep_ast: true,
            strict_syntax: true,
            skip_files_without_symbols: false,
        }
    }
}

pub struct Indexer<'r> {
    registry: &'r GrammarRegistry,
    selector: LanguageSelector,
    classifier: ImportClassifier,
    options: IndexOptions,
}

impl<'r> Indexer<'r> {
    pub fn new(registry: &'r GrammarRegistry) -> Self {
        Self {
            registry,
            selector: LanguageSelector::default(),
            classifier: ImportClassifier::default(),
            options: IndexOptions::default(),
        }
    }

    pub fn from_config(registry: &'r GrammarRegistry, config: &Config) -> Self {
        let classifier = ImportClassifier::new(config.imports.mode)
            .with_extra_standard(config.imports.extra_standard.iter().cloned());
        Self {
            registry,
            selector: config.languages.selector(),
            classifier,
            options: IndexOptions {
                keep_ast: config.index.keep_ast,
                strict_syntax: config.index.strict_syntax,
                skip_files_without_symbols: config.index.skip_files_without_symbols,
            },
        }
    }

    pub fn with_selector(mut self, selector: LanguageSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_classifier(mut self, classifier: ImportClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> IndexOptions {
        self.options
    }

    /// Parse one file. `None` means the path is not a parse target.
    pub fn index_file(&self, path: &str, source: &str) -> Option<ParsedFile> {
        let language = self.selector.select(path)?;

        let parsed = self.parse(language, path, source).unwrap_or_else(|err| {
            tracing::warn!(path, %language, error = %err, "parse failed");
            ParsedFile {
                structure: FileStructure {
                    path: path.to_string(),
                    language,
                    symbols: FileSymbols::failed(&err),
                    imports: ImportTable::default(),
                },
                ast: None,
            }
        });

        let empty = !parsed.structure.is_failed() && parsed.structure.symbols.as_slice().is_empty();
        if self.options.skip_files_without_symbols && empty {
            tracing::debug!(path, "no symbols, skipped");
            return None;
        }
        Some(parsed)
    }

    fn parse(&self, language: LanguageTag, path: &str, source: &str) -> Result<ParsedFile> {
        let mut parser = self.registry.parser_for(language, path)?;
        let tree = parser.parse(source, None).ok_or(IndexError::NoTree)?;
        let root = tree.root_node();

        if self.options.strict_syntax {
            if let Some((line, column)) = first_error_position(root) {
                return Err(IndexError::Syntax { line, column });
            }
        }

        let extraction = extract(root, source, language);
        let mut imports = ImportTable::default();
        for text in &extraction.imports {
            imports.push(self.classifier.record(text));
        }

        Ok(ParsedFile {
            structure: FileStructure {
                path: path.to_string(),
                language,
                symbols: FileSymbols::Extracted(extraction.symbols),
                imports,
            },
            ast: self.options.keep_ast.then(|| SyntaxNode::from_tree(root, source)),
        })
    }

    pub fn index_repo(&self, repo: &RepoMap) -> ParsedRepo {
        self.index_repo_with(repo, &ProgressBar::hidden())
    }

    /// Like `index_repo`, ticking `progress` once per input file.
    pub fn index_repo_with(&self, repo: &RepoMap, progress: &ProgressBar) -> ParsedRepo {
        let parsed: ParsedRepo = repo
            .par_iter()
            .filter_map(|(path, source)| {
                let file = self.index_file(path, source);
                progress.inc(1);
                file.map(|f| (path.clone(), f))
            })
            .collect();

        let failed = parsed.values().filter(|f| f.structure.is_failed()).count();
        tracing::info!(input = repo.len(), parsed = parsed.len(), failed, "repo indexed");
        parsed
    }
}

/// Feed every parsed file into a fresh graph, in path order.
pub fn build_graph(parsed: &ParsedRepo) -> Graph {
    let mut builder = GraphBuilder::new();
    for file in parsed.values() {
        builder.add_file(&file.structure);
    }
    tracing::info!(nodes = builder.node_count(), edges = builder.edge_count(), "graph built");
    builder.into_graph()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::ClassificationMode;
    use crate::model::{ImportCategory, SymbolKind, PARSE_ERROR_PREFIX};

    fn repo(files: &[(&str, &str)]) -> RepoMap {
        files.iter().map(|(p, s)| (p.to_string(), s.to_string())).collect()
    }

    #[test]
    fn python_file_yields_symbols_and_standard_import() {
        let registry = GrammarRegistry::new().unwrap();
        let parsed = Indexer::new(&registry).index_repo(&repo(&[("a.py", "import os\ndef f():\n    pass\n")]));

        let file = &parsed["a.py"];
        assert_eq!(file.structure.language, LanguageTag::Python);
        let symbols = file.structure.symbols.as_slice();
        assert_eq!(symbols.len(), 1);
        assert_eq!((symbols[0].kind, symbols[0].name.as_str()), (SymbolKind::Function, "f"));
        assert_eq!((symbols[0].start_line, symbols[0].end_line), (2, 3));

        let standard = file.structure.imports.get(ImportCategory::Standard);
        assert_eq!(standard.len(), 1);
        assert_eq!(standard[0].raw_text, "import os");
        assert_eq!(file.structure.imports.len(), 1);
        assert_eq!(file.ast.as_ref().map(|a| a.kind.as_str()), Some("module"));
    }

    #[test]
    fn non_code_files_are_absent() {
        let registry = GrammarRegistry::new().unwrap();
        let parsed = Indexer::new(&registry).index_repo(&repo(&[("README.md", "# hi")]));
        assert!(parsed.is_empty());
    }

    #[test]
    fn external_import_shows_up_in_graph() {
        let registry = GrammarRegistry::new().unwrap();
        let parsed = Indexer::new(&registry).index_repo(&repo(&[("m.py", "import requests\ndef g(): pass\n")]));
        let graph = build_graph(&parsed);

        for id in ["m.py", "requests", "m.py:g"] {
            assert!(graph.node(id).is_some(), "missing node {id}");
        }
        assert!(graph.has_edge("requests", "m.py"));
        assert!(graph.has_edge("m.py", "m.py:g"));
    }

    #[test]
    fn broken_file_is_isolated() {
        let registry = GrammarRegistry::new().unwrap();
        let parsed = Indexer::new(&registry).index_repo(&repo(&[
            ("bad.py", "def f(:\n"),
            ("good.py", "def ok():\n    return 1\n"),
        ]));

        let bad = &parsed["bad.py"];
        let err = bad.structure.symbols.error().unwrap();
        assert!(err.starts_with(PARSE_ERROR_PREFIX), "{err}");
        assert!(bad.ast.is_none());
        assert!(bad.structure.imports.is_empty());

        assert_eq!(parsed["good.py"].structure.symbols.as_slice()[0].name, "ok");

        let graph = build_graph(&parsed);
        assert!(graph.node("bad.py").is_some());
        assert!(!graph.edges.iter().any(|e| e.source == "bad.py" || e.target == "bad.py"));
    }

    #[test]
    fn very_deep_tree_is_indexed_beside_normal_files() {
        let registry = GrammarRegistry::new().unwrap();
        let deep = format!("x = {}1\n", "1+".repeat(10_000));
        let parsed = Indexer::new(&registry).index_repo(&repo(&[
            ("deep.py", deep.as_str()),
            ("ok.py", "def ok():\n    pass\n"),
        ]));

        assert_eq!(parsed["ok.py"].structure.symbols.as_slice()[0].name, "ok");

        let deep = &parsed["deep.py"];
        assert!(!deep.structure.is_failed());
        let ast = deep.ast.as_ref().unwrap();
        assert!(ast.depth() <= crate::syntax::MAX_TREE_DEPTH + 1);

        let graph = build_graph(&parsed);
        assert!(graph.node("deep.py").is_some());
        let tree = crate::render::render_tree(&parsed, &Default::default(), 10_000);
        assert!(tree.contains("\ndeep.py:\n"));
        assert!(tree.contains("\nok.py:\n"));
    }

    #[test]
    fn lenient_mode_extracts_from_partial_trees() {
        let registry = GrammarRegistry::new().unwrap();
        let indexer = Indexer::new(&registry).with_options(IndexOptions {
            strict_syntax: false,
            ..IndexOptions::default()
        });
        let file = indexer.index_file("half.py", "def ok():\n    pass\n\ndef f(:\n").unwrap();
        assert!(!file.structure.is_failed());
        assert!(file.structure.symbols.as_slice().iter().any(|s| s.name == "ok"));
    }

    #[test]
    fn parsed_repo_is_subset_of_input_with_languages() {
        let registry = GrammarRegistry::new().unwrap();
        let input = repo(&[
            ("a.py", "x = 1\n"),
            ("b.ts", "export function b(): number { return 1; }\n"),
            ("c.yml", "k: v\n"),
            ("d.png", "not really"),
            ("e.zig", "const x = 1;"),
            ("f.toml", "[t]\na = 1\n"),
        ]);
        let parsed = Indexer::new(&registry).index_repo(&input);

        assert!(parsed.keys().all(|k| input.contains_key(k)));
        let keys: Vec<&str> = parsed.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a.py", "b.ts", "c.yml", "f.toml"]);
        for (path, file) in &parsed {
            assert_eq!(&file.structure.path, path);
        }
    }

    #[test]
    fn options_shape_the_output() {
        let registry = GrammarRegistry::new().unwrap();
        let indexer = Indexer::new(&registry)
            .with_classifier(ImportClassifier::new(ClassificationMode::TwoWay))
            .with_options(IndexOptions {
                keep_ast: false,
                strict_syntax: true,
                skip_files_without_symbols: true,
            });
        let parsed = indexer.index_repo(&repo(&[
            ("plain.py", "import requests\nx = 1\n"),
            ("lib.py", "import requests\ndef g():\n    pass\n"),
        ]));

        assert!(!parsed.contains_key("plain.py"));
        let lib = &parsed["lib.py"];
        assert!(lib.ast.is_none());
        assert_eq!(lib.structure.imports.get(ImportCategory::Other).len(), 1);
    }
}
