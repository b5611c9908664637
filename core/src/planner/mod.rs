//! Task graph builder: codebase analysis → instrumentation tasks.
//!
//! The output always has the same shape: an optional dependency update, one
//! config generation task depending on it, and one file task per mappable
//! source file depending on the config task. Priorities are informational;
//! only `dependencies` decides execution order.

mod id_gen;

use serde::{Deserialize, Serialize};

use crate::analysis::{CodebaseAnalysis, FileDescriptor, FileRole};
use crate::executor::types::{Task, TaskKind};

pub use id_gen::TaskIdGen;

const DATABASE_HINTS: &[&str] = &["database", "db", "repository", "model"];
const CACHE_HINTS: &[&str] = &["cache", "redis"];
const EXTERNAL_API_HINTS: &[&str] = &["api", "client", "http", "fetch"];
const SHORT_HINT_LEN: usize = 3;

/// Tasks produced from one analysis, plus the files that were left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub tasks: Vec<Task>,
    /// Paths whose role did not map to any instrumentation category
    pub skipped: Vec<String>,
}

impl TaskPlan {
    pub fn count_kind(&self, kind: TaskKind) -> usize {
        self.tasks.iter().filter(|t| t.kind == kind).count()
    }

    pub fn find_kind(&self, kind: TaskKind) -> Option<&Task> {
        self.tasks.iter().find(|t| t.kind == kind)
    }
}

#[derive(Debug, Clone)]
pub struct TaskGraphBuilder {
    /// Path of the generated OpenTelemetry bootstrap file
    config_file: String,
    service_name: String,
}

impl Default for TaskGraphBuilder {
    fn default() -> Self {
        Self::new("tracing.js", "my-service")
    }
}

impl TaskGraphBuilder {
    pub fn new(config_file: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            config_file: config_file.into(),
            service_name: service_name.into(),
        }
    }

    /// Build the full task set. Pure: no I/O, no external calls.
    pub fn build(&self, analysis: &CodebaseAnalysis) -> TaskPlan {
        let mut ids = TaskIdGen::new();
        let mut tasks = Vec::with_capacity(analysis.files.len() + 2);
        let mut skipped = Vec::new();

        let mut dependency_ids = Vec::new();
        if !analysis.missing_dependencies.is_empty() {
            let id = ids.next_id(TaskKind::DependencyUpdate);
            let instruction = format!(
                "Add the missing OpenTelemetry packages to package.json: {}",
                analysis.missing_dependencies.join(", ")
            );
            tasks.push(Task::new(
                id.clone(),
                TaskKind::DependencyUpdate,
                "package.json",
                instruction,
            ));
            dependency_ids.push(id);
        }

        let config_id = ids.next_id(TaskKind::ConfigGeneration);
        tasks.push(
            Task::new(
                config_id.clone(),
                TaskKind::ConfigGeneration,
                self.config_file.clone(),
                format!(
                    "Generate the OpenTelemetry SDK bootstrap for service '{}' with trace and metric exporters",
                    self.service_name
                ),
            )
            .with_dependencies(dependency_ids),
        );

        for file in &analysis.files {
            let Some(kind) = classify(file) else {
                tracing::debug!(path = %file.path, role = %file.role, "no instrumentation category, skipping");
                skipped.push(file.path.clone());
                continue;
            };

            let id = ids.next_id(kind);
            tasks.push(
                Task::new(id, kind, file.path.clone(), instruction_for(kind, file))
                    .with_dependencies(vec![config_id.clone()]),
            );
        }

        if !skipped.is_empty() {
            tracing::info!(skipped = skipped.len(), "files without an instrumentation category");
        }

        TaskPlan { tasks, skipped }
    }
}

/// Map a file to its instrumentation category, or `None` to skip it.
pub fn classify(file: &FileDescriptor) -> Option<TaskKind> {
    match file.role {
        FileRole::Route => Some(TaskKind::HttpInstrumentation),
        FileRole::Service => Some(TaskKind::ServiceInstrumentation),
        FileRole::Utility => classify_utility(&file.path),
        FileRole::Other => None,
    }
}

fn classify_utility(path: &str) -> Option<TaskKind> {
    let lower = path.to_ascii_lowercase();
    let words = path_words(path);
    // Short hints ("db", "api") only count as whole words; they occur inside
    // too many unrelated names.
    let matches = |hints: &[&str]| {
        hints.iter().any(|h| {
            if h.len() <= SHORT_HINT_LEN {
                words.iter().any(|w| w == h)
            } else {
                lower.contains(h)
            }
        })
    };

    if matches(DATABASE_HINTS) {
        Some(TaskKind::DatabaseInstrumentation)
    } else if matches(CACHE_HINTS) {
        Some(TaskKind::CacheInstrumentation)
    } else if matches(EXTERNAL_API_HINTS) {
        Some(TaskKind::ExternalApiInstrumentation)
    } else {
        None
    }
}

/// Lowercased words of a path, split on separators and camelCase humps:
/// `src/DBPool/userApiClient.js` gives `src db pool user api client js`.
fn path_words(path: &str) -> Vec<String> {
    let chars: Vec<char> = path.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn instruction_for(kind: TaskKind, file: &FileDescriptor) -> String {
    let focus = match kind {
        TaskKind::HttpInstrumentation => {
            "Wrap each route handler in a span named after the HTTP method and route, record status codes and errors"
        }
        TaskKind::ServiceInstrumentation => {
            "Wrap each public service method in a span, record exceptions and set error status"
        }
        TaskKind::DatabaseInstrumentation => {
            "Wrap each database query in a client span with db.system and db.operation attributes"
        }
        TaskKind::CacheInstrumentation => {
            "Wrap cache reads and writes in spans and record hit/miss as an attribute"
        }
        TaskKind::ExternalApiInstrumentation => {
            "Wrap outbound HTTP calls in client spans and propagate trace context headers"
        }
        TaskKind::DependencyUpdate | TaskKind::ConfigGeneration => "Instrument this file",
    };

    if file.functions.is_empty() {
        format!("{focus} in {}.", file.path)
    } else {
        format!("{focus} in {} (functions: {}).", file.path, file.functions.join(", "))
    }
}
