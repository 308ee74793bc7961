use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::model::{ImportCategory, ImportRecord};

/// Whether imports are split three ways or only standard/other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    #[default]
    ThreeWay,
    TwoWay,
}

/// Module roots treated as standard library, across the supported languages.
const STANDARD_MODULES: &[&str] = &[
    // python
    "os", "sys", "datetime", "math", "random", "json", "re", "collections", "itertools",
    "abc", "argparse", "array", "ast", "asyncio", "base64", "bisect", "builtins", "calendar",
    "cmath", "concurrent", "configparser", "contextlib", "copy", "csv", "ctypes", "dataclasses",
    "decimal", "difflib", "enum", "errno", "fnmatch", "fractions", "functools", "gc", "getpass",
    "glob", "gzip", "hashlib", "heapq", "hmac", "html", "http", "importlib", "inspect", "io",
    "ipaddress", "logging", "lzma", "multiprocessing", "numbers", "operator", "pathlib",
    "pickle", "platform", "pprint", "queue", "secrets", "select", "shlex", "shutil", "signal",
    "socket", "sqlite3", "ssl", "stat", "statistics", "string", "struct", "subprocess",
    "tempfile", "textwrap", "threading", "time", "timeit", "traceback", "types", "typing",
    "unittest", "urllib", "uuid", "warnings", "weakref", "xml", "zipfile", "zlib", "__future__",
    // node built-ins
    "assert", "buffer", "child_process", "cluster", "crypto", "dgram", "dns", "events", "fs",
    "https", "net", "path", "process", "querystring", "readline", "stream", "timers", "tls",
    "tty", "url", "util", "v8", "vm", "worker_threads",
    // java
    "java", "javax",
    // C / C++ headers
    "algorithm", "array", "atomic", "bitset", "cassert", "cctype", "chrono", "cmath", "cstddef",
    "cstdint", "cstdio", "cstdlib", "cstring", "deque", "exception", "fstream", "functional",
    "iomanip", "iostream", "iterator", "limits", "list", "map", "memory", "mutex", "numeric",
    "optional", "queue", "set", "sstream", "stack", "stdexcept", "string", "string_view",
    "thread", "tuple", "type_traits", "unordered_map", "unordered_set", "utility", "variant",
    "vector", "assert.h", "ctype.h", "errno.h", "limits.h", "math.h", "stdarg.h", "stdbool.h",
    "stddef.h", "stdint.h", "stdio.h", "stdlib.h", "string.h", "time.h", "unistd.h",
];

fn standard_modules() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STANDARD_MODULES.iter().copied().collect())
}

fn quoted_specifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["'`]([^"'`]+)["'`]"#).unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportSyntax {
    /// `import a.b` / `from a.b import c`
    Python,
    /// `import x from "mod"`, `export * from "mod"`, `require("mod")`
    EcmaScript,
    /// `import [static] a.b.C;`
    Java,
    /// `#include <x>` / `#include "x"`
    Include,
    /// `source ./lib.sh`
    Shell,
    Unknown,
}

fn syntax_of(text: &str) -> ImportSyntax {
    let t = text.trim_start();
    let has_quote = t.contains(['"', '\'', '`']);

    if t.starts_with("#include") || t.starts_with("#import") {
        ImportSyntax::Include
    } else if t.starts_with("import ") || t.starts_with("from ") || t.starts_with("import{") {
        if has_quote {
            ImportSyntax::EcmaScript
        } else if t.trim_end().ends_with(';') {
            ImportSyntax::Java
        } else {
            ImportSyntax::Python
        }
    } else if has_quote && (t.starts_with("export ") || t.contains("require(")) {
        ImportSyntax::EcmaScript
    } else if t.starts_with("source ") || t.starts_with(". ") {
        ImportSyntax::Shell
    } else {
        ImportSyntax::Unknown
    }
}

fn second_token(text: &str) -> Option<&str> {
    let token = text.split_whitespace().nth(1)?;
    let token = token.trim_end_matches([',', ';', '(']);
    (!token.is_empty()).then_some(token)
}

fn module_of(syntax: ImportSyntax, text: &str) -> Option<String> {
    let t = text.trim();
    match syntax {
        ImportSyntax::Python | ImportSyntax::Shell => second_token(t).map(str::to_string),
        ImportSyntax::EcmaScript => quoted_specifier()
            .captures(t)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|m| !m.is_empty()),
        ImportSyntax::Java => t
            .split_whitespace()
            .skip(1)
            .find(|tok| *tok != "static")
            .map(|tok| tok.trim_end_matches(';').to_string())
            .filter(|m| !m.is_empty()),
        ImportSyntax::Include => {
            let rest = t
                .trim_start_matches("#include")
                .trim_start_matches("#import")
                .trim();
            let inner = rest
                .strip_prefix('<')
                .and_then(|r| r.split('>').next())
                .or_else(|| rest.strip_prefix('"').and_then(|r| r.split('"').next()))?;
            let inner = inner.trim();
            (!inner.is_empty()).then(|| inner.to_string())
        }
        ImportSyntax::Unknown => None,
    }
}

/// First segment of a module path, in the syntax's own separator.
fn module_root(syntax: ImportSyntax, module: &str) -> String {
    match syntax {
        ImportSyntax::Python | ImportSyntax::Java => {
            module.split('.').next().unwrap_or_default().to_string()
        }
        ImportSyntax::EcmaScript => {
            if module.starts_with('@') {
                module.splitn(3, '/').take(2).collect::<Vec<_>>().join("/")
            } else {
                module.split('/').next().unwrap_or_default().to_string()
            }
        }
        ImportSyntax::Include | ImportSyntax::Shell | ImportSyntax::Unknown => module.to_string(),
    }
}

fn is_relative(syntax: ImportSyntax, text: &str, module: Option<&str>) -> bool {
    let t = text.trim_start();
    match syntax {
        ImportSyntax::Python => t.starts_with("from .") || t.starts_with("from .."),
        ImportSyntax::EcmaScript | ImportSyntax::Shell => module.is_some_and(|m| {
            m == "." || m == ".." || m.starts_with("./") || m.starts_with("../") || m.starts_with('/')
        }),
        ImportSyntax::Include => t
            .trim_start_matches("#include")
            .trim_start_matches("#import")
            .trim_start()
            .starts_with('"'),
        ImportSyntax::Java | ImportSyntax::Unknown => false,
    }
}

/// Full module identifier named by an import statement.
///
/// `import a.b` -> `a.b`, `from .util import x` -> `.util`,
/// `import x from "./util"` -> `./util`, `#include <vector>` -> `vector`.
pub fn module_name(text: &str) -> Option<String> {
    module_of(syntax_of(text), text)
}

/// Classifies import statements; pure apart from its fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct ImportClassifier {
    mode: ClassificationMode,
    extra_standard: HashSet<String>,
}

impl ImportClassifier {
    pub fn new(mode: ClassificationMode) -> Self {
        Self {
            mode,
            extra_standard: HashSet::new(),
        }
    }

    /// Treat additional module roots as standard library.
    pub fn with_extra_standard<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_standard.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn mode(&self) -> ClassificationMode {
        self.mode
    }

    pub fn classify(&self, text: &str) -> ImportCategory {
        let syntax = syntax_of(text);
        let module = module_of(syntax, text);
        let category = self.classify_parts(syntax, text, module.as_deref());
        match self.mode {
            ClassificationMode::ThreeWay => category,
            ClassificationMode::TwoWay => category.collapse(),
        }
    }

    /// Classify `text` and keep the raw text and module name alongside.
    pub fn record(&self, text: &str) -> ImportRecord {
        let syntax = syntax_of(text);
        let module = module_of(syntax, text);
        let mut category = self.classify_parts(syntax, text, module.as_deref());
        if self.mode == ClassificationMode::TwoWay {
            category = category.collapse();
        }
        ImportRecord {
            raw_text: text.trim().to_string(),
            module,
            category,
        }
    }

    fn classify_parts(&self, syntax: ImportSyntax, text: &str, module: Option<&str>) -> ImportCategory {
        if let Some(module) = module {
            if self.is_standard(syntax, module) {
                return ImportCategory::Standard;
            }
        }
        if is_relative(syntax, text, module) {
            return ImportCategory::Internal;
        }
        ImportCategory::External
    }

    fn is_standard(&self, syntax: ImportSyntax, module: &str) -> bool {
        if syntax == ImportSyntax::EcmaScript && module.starts_with("node:") {
            return true;
        }
        let root = module_root(syntax, module);
        if root.is_empty() {
            return false;
        }
        standard_modules().contains(root.as_str()) || self.extra_standard.contains(&root)
    }
}

/// Three-way classification with the built-in standard library set.
pub fn classify(text: &str) -> ImportCategory {
    ImportClassifier::default().classify(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_imports() {
        assert_eq!(classify("import os"), ImportCategory::Standard);
        assert_eq!(classify("import os.path"), ImportCategory::Standard);
        assert_eq!(classify("from collections import OrderedDict"), ImportCategory::Standard);
        assert_eq!(classify("from .util import helper"), ImportCategory::Internal);
        assert_eq!(classify("from ..pkg.mod import thing"), ImportCategory::Internal);
        assert_eq!(classify("from . import sibling"), ImportCategory::Internal);
        assert_eq!(classify("import requests"), ImportCategory::External);
        assert_eq!(classify("from numpy.linalg import norm"), ImportCategory::External);
    }

    #[test]
    fn ecmascript_imports() {
        assert_eq!(classify("import fs from 'fs';"), ImportCategory::Standard);
        assert_eq!(classify("import { readFile } from \"node:fs/promises\";"), ImportCategory::Standard);
        assert_eq!(classify("import { helper } from './util';"), ImportCategory::Internal);
        assert_eq!(classify("import x from \"../x\""), ImportCategory::Internal);
        assert_eq!(classify("import React from 'react';"), ImportCategory::External);
        assert_eq!(classify("import type { Foo } from '@scope/pkg/deep';"), ImportCategory::External);
        assert_eq!(classify("import 'reflect-metadata';"), ImportCategory::External);
    }

    #[test]
    fn java_and_include_imports() {
        assert_eq!(classify("import java.util.List;"), ImportCategory::Standard);
        assert_eq!(classify("import static java.lang.Math.max;"), ImportCategory::Standard);
        assert_eq!(classify("import com.google.common.base.Strings;"), ImportCategory::External);
        assert_eq!(classify("#include <vector>"), ImportCategory::Standard);
        assert_eq!(classify("#include <stdio.h>"), ImportCategory::Standard);
        assert_eq!(classify("#include \"widget.h\""), ImportCategory::Internal);
        assert_eq!(classify("#include <boost/asio.hpp>"), ImportCategory::External);
    }

    #[test]
    fn malformed_text_defaults_to_external() {
        for text in ["import", "", "   ", "from", "#include", "garbage text here"] {
            assert_eq!(classify(text), ImportCategory::External, "{text:?}");
        }
        let two_way = ImportClassifier::new(ClassificationMode::TwoWay);
        assert_eq!(two_way.classify("import"), ImportCategory::Other);
    }

    #[test]
    fn two_way_mode_collapses_non_standard() {
        let c = ImportClassifier::new(ClassificationMode::TwoWay);
        assert_eq!(c.classify("import sys"), ImportCategory::Standard);
        assert_eq!(c.classify("from .a import b"), ImportCategory::Other);
        assert_eq!(c.classify("import flask"), ImportCategory::Other);
    }

    #[test]
    fn classification_is_idempotent() {
        let c = ImportClassifier::default();
        for text in ["import os", "from .x import y", "import requests", "#include \"a.h\""] {
            assert_eq!(c.classify(text), c.classify(text));
        }
    }

    #[test]
    fn extra_standard_names_are_honoured() {
        let c = ImportClassifier::default().with_extra_standard(["numpy"]);
        assert_eq!(c.classify("import numpy as np"), ImportCategory::Standard);
        assert_eq!(classify("import numpy as np"), ImportCategory::External);
    }

    #[test]
    fn module_names() {
        assert_eq!(module_name("import requests").as_deref(), Some("requests"));
        assert_eq!(module_name("import a.b as c, d").as_deref(), Some("a.b"));
        assert_eq!(module_name("from .util import helper").as_deref(), Some(".util"));
        assert_eq!(module_name("import x from './util';").as_deref(), Some("./util"));
        assert_eq!(module_name("import static java.lang.Math.max;").as_deref(), Some("java.lang.Math.max"));
        assert_eq!(module_name("#include <vector>").as_deref(), Some("vector"));
        assert_eq!(module_name("import"), None);

        let rec = ImportClassifier::default().record("  import requests\n");
        assert_eq!(rec.raw_text, "import requests");
        assert_eq!(rec.module_id(), "requests");
        assert_eq!(rec.category, ImportCategory::External);
    }
}
