use thiserror::Error;

use crate::language::LanguageTag;

/// Failures that can happen while turning one file into a parse tree.
///
/// These never escape the indexer: they are rendered into the file's
/// `symbols` slot as `Error parsing file: <message>`.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to load {language} grammar: {source}")]
    Grammar {
        language: LanguageTag,
        #[source]
        source: tree_sitter::LanguageError,
    },
    #[error("parser produced no tree")]
    NoTree,
    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
}

pub type Result<T> = std::result::Result<T, IndexError>;
