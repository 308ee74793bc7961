pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod imports;
pub mod indexer;
pub mod language;
pub mod logging;
pub mod model;
pub mod render;
pub mod scanner;
pub mod syntax;

pub use error::IndexError;
pub use graph::{Graph, GraphBuilder};
pub use imports::{classify, ImportClassifier};
pub use indexer::{build_graph, Indexer};
pub use language::{select_language, GrammarRegistry, LanguageTag};
pub use model::{FileStructure, ParsedRepo, RepoMap, Symbol};
pub use render::render_tree;
