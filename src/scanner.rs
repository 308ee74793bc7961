use anyhow::{Context, Result};
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::config::{ScanConfig, ABSOLUTE_MAX_FILE_BYTES};
use crate::model::RepoMap;

fn default_overrides(root: &Path, exclude_dir_names: &[String]) -> Result<Override> {
    let mut ob = OverrideBuilder::new(root);

    // Lockfiles, sourcemaps and minified bundles never carry structure worth indexing.
    for glob in [
        "**/*.lock",
        "**/package-lock.json",
        "**/pnpm-lock.yaml",
        "**/*.map",
        "**/*.min.js",
    ] {
        ob.add(&format!("!{glob}"))?;
    }

    // Directories need both the entry and its descendants, otherwise the walker still descends.
    let builtin = [
        ".git",
        "node_modules",
        "target",
        "dist",
        "build",
        "coverage",
        ".next",
        ".venv",
        "venv",
        "__pycache__",
    ];
    let configured = exclude_dir_names
        .iter()
        .map(|d| d.trim().trim_matches('/'))
        .filter(|d| !d.is_empty());
    for d in builtin.into_iter().chain(configured) {
        ob.add(&format!("!**/{d}"))?;
        ob.add(&format!("!**/{d}/**"))?;
    }

    Ok(ob.build()?)
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub root: PathBuf,
    pub max_file_bytes: u64,
    /// Directory levels below `root` to descend into; `Some(0)` reads only `root` itself.
    pub max_dir_depth: Option<usize>,
    pub exclude_dir_names: Vec<String>,
}

impl ScanOptions {
    pub fn new(root: impl Into<PathBuf>, config: &ScanConfig) -> Self {
        Self {
            root: root.into(),
            max_file_bytes: config.max_file_bytes,
            max_dir_depth: config.max_dir_depth,
            exclude_dir_names: config.exclude_dir_names.clone(),
        }
    }

    fn size_limit(&self) -> u64 {
        self.max_file_bytes.min(ABSOLUTE_MAX_FILE_BYTES)
    }
}

/// Build a RepoMap from the files under `opts.root`.
///
/// Keys are `/`-separated paths relative to the root. Empty, oversized and
/// non-UTF-8 files are left out; language selection happens later.
pub fn load_repo_map(opts: &ScanOptions) -> Result<RepoMap> {
    let meta = std::fs::metadata(&opts.root)
        .with_context(|| format!("Target does not exist: {}", opts.root.display()))?;

    let mut repo = RepoMap::new();
    if meta.is_file() {
        let name = opts
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(text) = read_source(&opts.root, opts.size_limit()) {
            repo.insert(name, text);
        }
        return Ok(repo);
    }

    let overrides = default_overrides(&opts.root, &opts.exclude_dir_names)?;
    let walker = WalkBuilder::new(&opts.root)
        .standard_filters(true)
        .overrides(overrides)
        .max_depth(opts.max_dir_depth.map(|d| d + 1))
        .build();

    for item in walker {
        let dent = match item {
            Ok(d) => d,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !dent.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let abs_path = dent.into_path();
        let Some(rel) = rel_key(&abs_path, &opts.root) else {
            continue;
        };
        if let Some(text) = read_source(&abs_path, opts.size_limit()) {
            repo.insert(rel, text);
        }
    }

    tracing::debug!(root = %opts.root.display(), files = repo.len(), "repo map loaded");
    Ok(repo)
}

fn read_source(path: &Path, max_bytes: u64) -> Option<String> {
    let bytes = std::fs::metadata(path).ok()?.len();
    if bytes == 0 || bytes > max_bytes {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "skipping non-text file");
            None
        }
    }
}

fn rel_key(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

/// Read a RepoMap serialized as a JSON object of `path -> source`.
pub fn load_repo_map_json(path: &Path) -> Result<RepoMap> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read repo map {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid repo map JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn walks_tree_with_relative_keys_and_skips_noise() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "a.py", "import os\n");
        write(root, "pkg/b.js", "export const x = 1;\n");
        write(root, "node_modules/dep/index.js", "module.exports = 1;\n");
        write(root, "generated/out.py", "x = 1\n");
        write(root, "Cargo.lock", "# lock\n");
        write(root, "empty.py", "");

        let opts = ScanOptions {
            root: root.to_path_buf(),
            max_file_bytes: 1024,
            max_dir_depth: None,
            exclude_dir_names: vec!["generated".into()],
        };
        let repo = load_repo_map(&opts).unwrap();
        let keys: Vec<&str> = repo.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a.py", "pkg/b.js"]);
        assert_eq!(repo["a.py"], "import os\n");
    }

    #[test]
    fn depth_and_size_limits_apply() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "top.py", "x = 1\n");
        write(root, "one/mid.py", "x = 1\n");
        write(root, "one/two/deep.py", "x = 1\n");
        write(root, "big.py", &"#".repeat(2048));

        let opts = ScanOptions {
            root: root.to_path_buf(),
            max_file_bytes: 1024,
            max_dir_depth: Some(1),
            exclude_dir_names: vec![],
        };
        let repo = load_repo_map(&opts).unwrap();
        let keys: Vec<&str> = repo.keys().map(String::as_str).collect();
        assert_eq!(keys, ["one/mid.py", "top.py"]);
    }

    #[test]
    fn single_file_root_uses_its_name() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "solo.py", "def f():\n    pass\n");
        let opts = ScanOptions::new(dir.path().join("solo.py"), &ScanConfig::default());
        let repo = load_repo_map(&opts).unwrap();
        assert!(repo.contains_key("solo.py"));
    }

    #[test]
    fn json_repo_map_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repo.json");
        fs::write(&path, r##"{"a.py": "import os\n", "b.md": "# hi"}"##).unwrap();
        let repo = load_repo_map_json(&path).unwrap();
        assert_eq!(repo.len(), 2);
        assert_eq!(repo["a.py"], "import os\n");

        fs::write(&path, "[1, 2]").unwrap();
        assert!(load_repo_map_json(&path).is_err());
    }
}
