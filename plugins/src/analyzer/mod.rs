//! Static analysis of a JavaScript/TypeScript codebase.
//!
//! Produces the [`CodebaseAnalysis`] the task graph builder consumes: one
//! descriptor per source file (role, imports, functions) and the required
//! packages missing from `package.json`.

mod patterns;

use std::collections::BTreeSet;
use std::path::{Component, Path};

use anyhow::Context;
use serde_json::Value;

use otelflow_core::api::{CodebaseAnalysis, FileDescriptor, FileRole};

const EXTENSIONS: &[&str] = &["js", "ts", "mjs", "cjs"];
const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "coverage",
    ".git",
    "test",
    "tests",
    "__tests__",
];
const ROUTE_DIRS: &[&str] = &["routes", "router", "routers", "controllers", "handlers"];
const SERVICE_DIRS: &[&str] = &["services"];
const UTILITY_DIRS: &[&str] = &[
    "utils",
    "lib",
    "helpers",
    "db",
    "cache",
    "clients",
    "repositories",
    "models",
];

pub struct CodebaseAnalyzer {
    required_packages: Vec<String>,
    /// Generated bootstrap file; never analyzed as a source file
    config_file: Option<String>,
}

impl CodebaseAnalyzer {
    pub fn new(required_packages: Vec<String>) -> Self {
        Self {
            required_packages,
            config_file: None,
        }
    }

    pub fn with_config_file(mut self, config_file: impl Into<String>) -> Self {
        self.config_file = Some(config_file.into());
        self
    }

    #[tracing::instrument(name = "analyzer.run", skip(self), fields(root = %root.display()))]
    pub fn analyze(&self, root: &Path) -> anyhow::Result<CodebaseAnalysis> {
        if !root.is_dir() {
            anyhow::bail!("codebase root is not a directory: {}", root.display());
        }
        // glob normalizes `./` and `..` out of what it yields, so the walk and
        // the prefix strip both use the resolved root.
        let base = root
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", root.display()))?;

        let mut paths = BTreeSet::new();
        let escaped_root = glob::Pattern::escape(&base.to_string_lossy());
        for ext in EXTENSIONS {
            let pattern = format!("{}/**/*.{}", escaped_root, ext);
            let entries = glob::glob(&pattern)
                .with_context(|| format!("invalid glob pattern '{}'", pattern))?;
            for entry in entries {
                match entry {
                    Ok(path) => {
                        if let Some(rel) = relative_source_path(&base, &path) {
                            paths.insert(rel);
                        }
                    }
                    Err(e) => tracing::warn!("Glob error: {}", e),
                }
            }
        }

        let mut files = Vec::with_capacity(paths.len());
        for rel in paths {
            if self.config_file.as_deref() == Some(rel.as_str()) {
                continue;
            }
            let source = match std::fs::read_to_string(base.join(&rel)) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(path = %rel, "skipping unreadable file: {}", e);
                    continue;
                }
            };
            files.push(describe_file(&rel, &source));
        }

        let declared = declared_packages(&base)?;
        let missing_dependencies = self
            .required_packages
            .iter()
            .filter(|p| !declared.contains(p.as_str()))
            .cloned()
            .collect();

        let analysis = CodebaseAnalysis {
            root: root.display().to_string(),
            files,
            missing_dependencies,
        };
        tracing::info!(
            files = analysis.files.len(),
            routes = analysis.count_by_role(FileRole::Route),
            services = analysis.count_by_role(FileRole::Service),
            utilities = analysis.count_by_role(FileRole::Utility),
            missing = analysis.missing_dependencies.len(),
            "analysis complete"
        );
        Ok(analysis)
    }
}

/// `/`-separated path relative to `root`, or `None` for excluded files.
fn relative_source_path(root: &Path, path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    let rel = path.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(s) => segments.push(s.to_string_lossy().to_string()),
            _ => return None,
        }
    }
    let (file_name, dirs) = segments.split_last()?;
    if dirs.iter().any(|d| EXCLUDED_DIRS.contains(&d.as_str())) {
        return None;
    }
    if file_name.contains(".test.") || file_name.contains(".spec.") || file_name.ends_with(".d.ts") {
        return None;
    }
    Some(segments.join("/"))
}

pub fn describe_file(path: &str, source: &str) -> FileDescriptor {
    let mut file = FileDescriptor::new(path, detect_role(path, source));
    file.imports = patterns::imports(source);
    file.functions = patterns::functions(source);
    file
}

/// Directory names decide first; file content is the fallback.
pub fn detect_role(path: &str, source: &str) -> FileRole {
    let lower = path.to_ascii_lowercase();
    let dirs: Vec<&str> = lower.split('/').rev().skip(1).collect();
    let in_dir = |names: &[&str]| dirs.iter().any(|d| names.contains(d));

    if in_dir(ROUTE_DIRS) {
        FileRole::Route
    } else if in_dir(SERVICE_DIRS) {
        FileRole::Service
    } else if in_dir(UTILITY_DIRS) {
        FileRole::Utility
    } else if patterns::has_route_calls(source) {
        FileRole::Route
    } else if patterns::has_service_class(source) {
        FileRole::Service
    } else {
        FileRole::Other
    }
}

/// Names in `dependencies` and `devDependencies`. A missing `package.json`
/// declares nothing.
fn declared_packages(root: &Path) -> anyhow::Result<BTreeSet<String>> {
    let path = root.join("package.json");
    let raw = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no package.json at {}", path.display());
            return Ok(BTreeSet::new());
        }
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };
    let manifest: Value = serde_json::from_str(&raw)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;

    Ok(["dependencies", "devDependencies"]
        .iter()
        .filter_map(|section| manifest.get(section).and_then(Value::as_object))
        .flat_map(|deps| deps.keys().cloned())
        .collect())
}
