//! Codebase analysis model consumed by the task graph builder.

use serde::{Deserialize, Serialize};

/// Role detected for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Route,
    Service,
    Utility,
    Other,
}

impl std::fmt::Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Route => "route",
            Self::Service => "service",
            Self::Utility => "utility",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Path relative to the analysis root, `/`-separated
    pub path: String,
    pub role: FileRole,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
}

impl FileDescriptor {
    pub fn new(path: impl Into<String>, role: FileRole) -> Self {
        Self {
            path: path.into(),
            role,
            imports: Vec::new(),
            functions: Vec::new(),
        }
    }
}

/// Structural analysis of a target codebase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseAnalysis {
    /// Root the file paths are relative to
    #[serde(default)]
    pub root: String,
    pub files: Vec<FileDescriptor>,
    /// External packages required for instrumentation but not yet declared
    pub missing_dependencies: Vec<String>,
}

impl CodebaseAnalysis {
    pub fn count_by_role(&self, role: FileRole) -> usize {
        self.files.iter().filter(|f| f.role == role).count()
    }
}
