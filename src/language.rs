use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tree_sitter::{Language, Parser};

use crate::error::{IndexError, Result};

/// The closed set of languages repolens can parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageTag {
    Python,
    Javascript,
    Typescript,
    Java,
    Cpp,
    Bash,
    Html,
    Toml,
    Yaml,
}

impl LanguageTag {
    /// Every tag, in discriminant order (the registry indexes grammars by it).
    pub const ALL: [LanguageTag; 9] = [
        LanguageTag::Python,
        LanguageTag::Javascript,
        LanguageTag::Typescript,
        LanguageTag::Java,
        LanguageTag::Cpp,
        LanguageTag::Bash,
        LanguageTag::Html,
        LanguageTag::Toml,
        LanguageTag::Yaml,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LanguageTag::Python => "python",
            LanguageTag::Javascript => "javascript",
            LanguageTag::Typescript => "typescript",
            LanguageTag::Java => "java",
            LanguageTag::Cpp => "cpp",
            LanguageTag::Bash => "bash",
            LanguageTag::Html => "html",
            LanguageTag::Toml => "toml",
            LanguageTag::Yaml => "yaml",
        }
    }

    /// Lowercase extensions (without the dot) that map to this language.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            LanguageTag::Python => &["py", "pyi", "pyw"],
            LanguageTag::Javascript => &["js", "jsx", "mjs", "cjs"],
            LanguageTag::Typescript => &["ts", "tsx", "mts", "cts"],
            LanguageTag::Java => &["java"],
            LanguageTag::Cpp => &["cpp", "cc", "cxx", "c++", "hpp", "hh", "hxx", "h", "c"],
            LanguageTag::Bash => &["sh", "bash"],
            LanguageTag::Html => &["html", "htm"],
            LanguageTag::Toml => &["toml"],
            LanguageTag::Yaml => &["yaml", "yml"],
        }
    }

    pub fn from_extension(ext: &str) -> Option<LanguageTag> {
        LanguageTag::ALL
            .into_iter()
            .find(|tag| tag.extensions().contains(&ext))
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extensions that are never parse targets: docs, images, fonts, binaries,
/// lockfiles, logs and data/config formats without a grammar here.
const NON_CODE_EXTENSIONS: &[&str] = &[
    "md", "markdown", "rst", "txt", "png", "jpg", "jpeg", "gif", "svg", "ico", "bmp", "webp",
    "json", "css", "scss", "sass", "less", "gitignore", "gitattributes", "dockerignore",
    "npmignore", "flake8", "editorconfig", "env", "ini", "cfg", "config", "conf", "lock", "log",
    "sql", "db", "sqlite", "xml", "csv", "tsv", "woff", "woff2", "ttf", "otf", "eot", "pdf", "zip",
    "gz", "tgz", "tar", "bz2", "xz", "7z", "jar", "class", "exe", "dll", "so", "dylib", "o", "a",
    "bin", "wasm", "pyc", "map", "mp3", "mp4", "wav", "mov",
];

/// What to do with extensions that are neither code nor known non-code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy", content = "language")]
pub enum UnknownExtensionPolicy {
    /// Treat the file as "not a parse target".
    #[default]
    Skip,
    /// Route the file to a best-guess grammar.
    Fallback(LanguageTag),
}

/// Lowercased extension of the last path component.
///
/// Dotfiles use the text after the leading dot (`.gitignore` -> `gitignore`),
/// files without any dot have no extension.
pub fn extension_of(path: &str) -> Option<String> {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Extension -> language selection with configurable overrides.
#[derive(Debug, Clone, Default)]
pub struct LanguageSelector {
    extra: HashMap<String, LanguageTag>,
    unknown: UnknownExtensionPolicy,
}

impl LanguageSelector {
    pub fn new(unknown: UnknownExtensionPolicy) -> Self {
        Self {
            extra: HashMap::new(),
            unknown,
        }
    }

    /// Map an additional extension (case-insensitive, with or without dot).
    pub fn with_extension(mut self, ext: &str, tag: LanguageTag) -> Self {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.extra.insert(ext, tag);
        self
    }

    pub fn unknown_policy(&self) -> UnknownExtensionPolicy {
        self.unknown
    }

    pub fn select(&self, path: &str) -> Option<LanguageTag> {
        let Some(ext) = extension_of(path) else {
            return self.unknown_fallback();
        };

        if let Some(tag) = self.extra.get(&ext) {
            return Some(*tag);
        }
        if let Some(tag) = LanguageTag::from_extension(&ext) {
            return Some(tag);
        }
        if NON_CODE_EXTENSIONS.contains(&ext.as_str()) {
            return None;
        }
        self.unknown_fallback()
    }

    fn unknown_fallback(&self) -> Option<LanguageTag> {
        match self.unknown {
            UnknownExtensionPolicy::Skip => None,
            UnknownExtensionPolicy::Fallback(tag) => Some(tag),
        }
    }
}

/// Select a language with the default table and the `skip` policy.
pub fn select_language(path: &str) -> Option<LanguageTag> {
    LanguageSelector::default().select(path)
}

/// One loaded tree-sitter grammar per supported language.
///
/// Build it once during setup and pass it by reference; it is immutable and
/// `Send + Sync`. Parsers are handed out fresh per call because a
/// `tree_sitter::Parser` carries its current language as mutable state.
pub struct GrammarRegistry {
    // Indexed by `LanguageTag as usize`.
    grammars: Vec<Language>,
    tsx: Language,
}

impl GrammarRegistry {
    pub fn new() -> Result<Self> {
        let mut grammars = Vec::with_capacity(LanguageTag::ALL.len());
        for tag in LanguageTag::ALL {
            let language = load_grammar(tag);
            validate(tag, &language)?;
            grammars.push(language);
        }

        let tsx = Language::new(tree_sitter_typescript::LANGUAGE_TSX);
        validate(LanguageTag::Typescript, &tsx)?;

        tracing::debug!(languages = grammars.len(), "grammar registry ready");
        Ok(Self { grammars, tsx })
    }

    pub fn language(&self, tag: LanguageTag) -> &Language {
        &self.grammars[tag as usize]
    }

    /// The grammar to use for `path`; `.tsx` files get the TSX dialect.
    pub fn grammar_for(&self, tag: LanguageTag, path: &str) -> &Language {
        if tag == LanguageTag::Typescript && extension_of(path).as_deref() == Some("tsx") {
            return &self.tsx;
        }
        self.language(tag)
    }

    /// A fresh parser already set to the grammar for `path`.
    pub fn parser_for(&self, tag: LanguageTag, path: &str) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(self.grammar_for(tag, path))
            .map_err(|source| IndexError::Grammar {
                language: tag,
                source,
            })?;
        Ok(parser)
    }
}

fn load_grammar(tag: LanguageTag) -> Language {
    match tag {
        LanguageTag::Python => Language::new(tree_sitter_python::LANGUAGE),
        LanguageTag::Javascript => Language::new(tree_sitter_javascript::LANGUAGE),
        LanguageTag::Typescript => Language::new(tree_sitter_typescript::LANGUAGE_TYPESCRIPT),
        LanguageTag::Java => Language::new(tree_sitter_java::LANGUAGE),
        LanguageTag::Cpp => Language::new(tree_sitter_cpp::LANGUAGE),
        LanguageTag::Bash => Language::new(tree_sitter_bash::LANGUAGE),
        LanguageTag::Html => Language::new(tree_sitter_html::LANGUAGE),
        LanguageTag::Toml => Language::new(tree_sitter_toml_ng::LANGUAGE),
        LanguageTag::Yaml => Language::new(tree_sitter_yaml::LANGUAGE),
    }
}

fn validate(tag: LanguageTag, language: &Language) -> Result<()> {
    Parser::new()
        .set_language(language)
        .map_err(|source| IndexError::Grammar {
            language: tag,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_table_is_case_insensitive() {
        assert_eq!(select_language("src/app.PY"), Some(LanguageTag::Python));
        assert_eq!(select_language("web/index.Tsx"), Some(LanguageTag::Typescript));
        assert_eq!(select_language("include/vec.hpp"), Some(LanguageTag::Cpp));
        assert_eq!(select_language("deploy.yml"), Some(LanguageTag::Yaml));
        assert_eq!(select_language("Cargo.toml"), Some(LanguageTag::Toml));
        assert_eq!(select_language("scripts/run.sh"), Some(LanguageTag::Bash));
    }

    #[test]
    fn non_code_files_are_skipped() {
        for path in ["README.md", "logo.png", "package-lock.json", "Cargo.lock", ".gitignore", "app.log"] {
            assert_eq!(select_language(path), None, "{path} should be skipped");
        }
    }

    #[test]
    fn unknown_extension_follows_policy() {
        assert_eq!(select_language("main.zig"), None);
        assert_eq!(select_language("Makefile"), None);

        let fallback = LanguageSelector::new(UnknownExtensionPolicy::Fallback(LanguageTag::Javascript));
        assert_eq!(fallback.select("main.zig"), Some(LanguageTag::Javascript));
        assert_eq!(fallback.select("Makefile"), Some(LanguageTag::Javascript));
        // Known non-code stays skipped even with a fallback.
        assert_eq!(fallback.select("notes.txt"), None);
    }

    #[test]
    fn extra_extensions_take_priority() {
        let sel = LanguageSelector::default().with_extension(".JSONC", LanguageTag::Javascript);
        assert_eq!(sel.select("tsconfig.jsonc"), Some(LanguageTag::Javascript));
    }

    #[test]
    fn extension_of_handles_dotfiles_and_dirs() {
        assert_eq!(extension_of(".gitignore").as_deref(), Some("gitignore"));
        assert_eq!(extension_of("a.b/c").as_deref(), None);
        assert_eq!(extension_of("dir\\file.Rs").as_deref(), Some("rs"));
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn registry_hands_out_working_parsers() {
        let registry = GrammarRegistry::new().unwrap();
        for tag in LanguageTag::ALL {
            let path = format!("file.{}", tag.extensions()[0]);
            let mut parser = registry.parser_for(tag, &path).unwrap();
            assert!(parser.parse("", None).is_some(), "{tag} parser should accept empty input");
        }

        let mut tsx = registry.parser_for(LanguageTag::Typescript, "view.tsx").unwrap();
        let tree = tsx.parse("const a = <div />;\n", None).unwrap();
        assert!(!tree.root_node().has_error());
    }
}
