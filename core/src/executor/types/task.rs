use serde::{Deserialize, Serialize};

/// Closed set of task categories. Dispatch on this enum is exhaustive, so a
/// new category has to be handled by every worker before it compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    DependencyUpdate,
    ConfigGeneration,
    HttpInstrumentation,
    ServiceInstrumentation,
    DatabaseInstrumentation,
    CacheInstrumentation,
    ExternalApiInstrumentation,
}

impl TaskKind {
    /// Short prefix used when minting task ids.
    pub fn slug(self) -> &'static str {
        match self {
            Self::DependencyUpdate => "dependency-update",
            Self::ConfigGeneration => "config-generation",
            Self::HttpInstrumentation => "http",
            Self::ServiceInstrumentation => "service",
            Self::DatabaseInstrumentation => "database",
            Self::CacheInstrumentation => "cache",
            Self::ExternalApiInstrumentation => "external-api",
        }
    }

    /// Informational priority; lower runs "earlier" in the mental model, but
    /// only the dependency graph decides execution order.
    pub fn default_priority(self) -> u32 {
        match self {
            Self::DependencyUpdate => 1,
            Self::ConfigGeneration => 2,
            _ => 3,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// A unit of instrumentation work targeting one file or generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    /// Target path, relative to the codebase root.
    pub target: String,
    pub instruction: String,
    pub priority: u32,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        kind: TaskKind,
        target: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            target: target.into(),
            instruction: instruction.into(),
            priority: kind.default_priority(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Common task interface for executor graph handling.
pub trait TaskLike: Clone + Send + Sync {
    fn id(&self) -> &str;
    fn dependencies(&self) -> &[String];
}

impl TaskLike for Task {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}
