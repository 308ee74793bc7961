use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::imports::ClassificationMode;
use crate::language::{LanguageSelector, LanguageTag, UnknownExtensionPolicy};
use crate::render::DEFAULT_MAX_DEPTH;

pub const CONFIG_FILE_NAME: &str = ".repolens.json";

/// Hard safety ceiling: files larger than this are always skipped, regardless of config.
pub const ABSOLUTE_MAX_FILE_BYTES: u64 = 1_000_000;

/// Controls which files the directory loader picks up.
///
/// `.gitignore` is always respected; these are additional skips.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory *names* to skip anywhere in the tree (e.g. "generated", "tmp").
    pub exclude_dir_names: Vec<String>,
    pub max_file_bytes: u64,
    /// Maximum directory depth below the root; `None` walks everything.
    pub max_dir_depth: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_dir_names: vec![],
            // 512 KB: enough for any real source file, blocks minified bundles.
            max_file_bytes: 512 * 1024,
            max_dir_depth: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguagesConfig {
    pub unknown_extension: UnknownExtensionPolicy,
    /// Extra extension -> language entries, e.g. `{"jsonc": "javascript"}`.
    pub extra_extensions: BTreeMap<String, LanguageTag>,
}

impl LanguagesConfig {
    pub fn selector(&self) -> LanguageSelector {
        self.extra_extensions
            .iter()
            .fold(LanguageSelector::new(self.unknown_extension), |sel, (ext, tag)| {
                sel.with_extension(ext, *tag)
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportsConfig {
    pub mode: ClassificationMode,
    /// Module roots to treat as standard library on top of the built-in set.
    pub extra_standard: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Keep the owned syntax tree in the parsed output.
    pub keep_ast: bool,
    /// Treat trees containing syntax errors as parse failures.
    pub strict_syntax: bool,
    /// Drop files that parsed cleanly but declare nothing.
    pub skip_files_without_symbols: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            keep_ast: true,
            strict_syntax: true,
            skip_files_without_symbols: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    pub max_depth: usize,
    pub exclude_paths: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            exclude_paths: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub languages: LanguagesConfig,
    pub imports: ImportsConfig,
    pub index: IndexConfig,
    pub render: RenderConfig,
}

/// Read `.repolens.json` from `repo_root`.
///
/// A missing file yields the defaults; a malformed one is reported and also
/// yields the defaults.
pub fn load_config(repo_root: &Path) -> Config {
    let primary = repo_root.join(CONFIG_FILE_NAME);

    let Ok(text) = std::fs::read_to_string(&primary) else {
        return Config::default();
    };

    serde_json::from_str::<Config>(&text).unwrap_or_else(|err| {
        tracing::warn!(path = %primary.display(), error = %err, "ignoring malformed config");
        Config::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(dir.path());
        assert_eq!(cfg.render.max_depth, 25);
        assert!(cfg.index.keep_ast);
        assert!(cfg.index.strict_syntax);
        assert_eq!(cfg.languages.unknown_extension, UnknownExtensionPolicy::Skip);
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{
                "render": { "maxDepth": 4, "excludePaths": ["vendor/x.py"] },
                "languages": {
                    "unknown_extension": { "policy": "fallback", "language": "javascript" },
                    "extra_extensions": { "jsonc": "javascript" }
                },
                "imports": { "mode": "two_way", "extra_standard": ["numpy"] }
            }"#,
        )
        .unwrap();

        let cfg = load_config(dir.path());
        assert_eq!(cfg.render.max_depth, 4);
        assert_eq!(cfg.render.exclude_paths, ["vendor/x.py"]);
        assert_eq!(cfg.imports.mode, ClassificationMode::TwoWay);
        assert_eq!(cfg.imports.extra_standard, ["numpy"]);
        assert_eq!(cfg.scan.max_file_bytes, 512 * 1024);

        let selector = cfg.languages.selector();
        assert_eq!(selector.select("a.jsonc"), Some(LanguageTag::Javascript));
        assert_eq!(selector.select("a.zig"), Some(LanguageTag::Javascript));
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();
        let cfg = load_config(dir.path());
        assert_eq!(cfg.render.max_depth, DEFAULT_MAX_DEPTH);
    }
}
