//! LLM-backed task worker.
//!
//! Reads its inputs from the source codebase and only proposes changes; the
//! change writer materializes them under the output root.

mod prompts;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use otelflow_core::api::{
    extract_code_block, CodebaseAnalysis, CompletionRequest, CompletionService, ExtractError,
    FileChange, FileDescriptor, InstrumentationConfig, Task, TaskKind, TaskWorker, WorkerContext,
    WorkerError, WorkerResult,
};
use otelflow_core::apply::resolve_target;

const FALLBACK_VERSION: &str = "latest";

pub struct LlmTaskWorker {
    completion: Arc<dyn CompletionService>,
    source_root: PathBuf,
    instrumentation: InstrumentationConfig,
    files: HashMap<String, FileDescriptor>,
}

impl LlmTaskWorker {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        source_root: impl Into<PathBuf>,
        instrumentation: InstrumentationConfig,
    ) -> Self {
        Self {
            completion,
            source_root: source_root.into(),
            instrumentation,
            files: HashMap::new(),
        }
    }

    /// Attach per-file analysis so prompts can mention existing imports.
    pub fn with_analysis(mut self, analysis: &CodebaseAnalysis) -> Self {
        self.files = analysis
            .files
            .iter()
            .map(|f| (f.path.clone(), f.clone()))
            .collect();
        self
    }

    async fn read_source(&self, target: &str) -> Result<Option<String>, WorkerError> {
        let path = resolve_target(&self.source_root, target).map_err(WorkerError::InvalidInput)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorkerError::io(path.display().to_string(), e)),
        }
    }

    async fn update_dependencies(&self, task: &Task) -> Result<WorkerResult, WorkerError> {
        let existing = self.read_source(&task.target).await?;
        let mut manifest = match &existing {
            Some(raw) => serde_json::from_str::<Value>(raw).map_err(|e| {
                WorkerError::InvalidInput(format!("{} is not valid JSON: {}", task.target, e))
            })?,
            None => serde_json::json!({ "name": self.instrumentation.service_name }),
        };

        let added = add_required_packages(&mut manifest, &self.instrumentation)
            .map_err(|msg| WorkerError::InvalidInput(format!("{}: {}", task.target, msg)))?;

        if added.is_empty() {
            return Ok(WorkerResult::succeeded(
                task.id.clone(),
                vec![FileChange::unchanged(task.target.clone())],
                "all required packages already declared",
            ));
        }

        let mut content = serde_json::to_string_pretty(&manifest)
            .map_err(|e| WorkerError::Other(format!("failed to serialize manifest: {e}")))?;
        content.push('\n');

        let change = match existing {
            Some(_) => FileChange::modify(task.target.clone(), content),
            None => FileChange::create(task.target.clone(), content),
        };
        tracing::debug!(task_id = %task.id, added = ?added, "dependencies added");
        Ok(WorkerResult::succeeded(
            task.id.clone(),
            vec![change],
            format!("added {}", added.join(", ")),
        ))
    }

    async fn generate_config(&self, task: &Task) -> Result<WorkerResult, WorkerError> {
        let existing = self.read_source(&task.target).await?;
        let request = CompletionRequest::new(prompts::config_generation(task, &self.instrumentation))
            .with_system(prompts::SYSTEM_PROMPT);
        let reply = self.completion.complete(&request).await?;
        let code = extract_code_block(&reply, prompts::CODE_LANGS)?;

        let change = match existing {
            Some(_) => FileChange::modify(task.target.clone(), code),
            None => FileChange::create(task.target.clone(), code),
        };
        Ok(WorkerResult::succeeded(
            task.id.clone(),
            vec![change],
            format!("generated {}", task.target),
        ))
    }

    async fn instrument_file(&self, task: &Task) -> Result<WorkerResult, WorkerError> {
        let source = self
            .read_source(&task.target)
            .await?
            .ok_or_else(|| WorkerError::InvalidInput(format!("{} does not exist", task.target)))?;

        let prompt = prompts::file_instrumentation(task, &source, self.files.get(&task.target));
        let request = CompletionRequest::new(prompt).with_system(prompts::SYSTEM_PROMPT);
        let reply = self.completion.complete(&request).await?;

        let code = match extract_code_block(&reply, prompts::CODE_LANGS) {
            Ok(code) => code,
            Err(ExtractError::EmptyPayload) => {
                return Ok(unchanged(task, "model returned an empty file, left as is"));
            }
            Err(e) => return Err(e.into()),
        };

        if code.trim_end() == source.trim_end() {
            return Ok(unchanged(task, "no changes proposed"));
        }

        Ok(WorkerResult::succeeded(
            task.id.clone(),
            vec![FileChange::modify(task.target.clone(), code)],
            format!("instrumented {}", task.target),
        ))
    }
}

fn unchanged(task: &Task, message: &str) -> WorkerResult {
    WorkerResult::succeeded(
        task.id.clone(),
        vec![FileChange::unchanged(task.target.clone())],
        message,
    )
}

/// Insert every required package missing from both `dependencies` and
/// `devDependencies` into `dependencies`. Returns the names added.
fn add_required_packages(
    manifest: &mut Value,
    cfg: &InstrumentationConfig,
) -> Result<Vec<String>, String> {
    let root = manifest
        .as_object_mut()
        .ok_or_else(|| "manifest is not a JSON object".to_string())?;

    let declared_dev: Vec<String> = root
        .get("devDependencies")
        .and_then(Value::as_object)
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();

    let deps = root
        .entry("dependencies")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| "\"dependencies\" is not an object".to_string())?;

    let mut added = Vec::new();
    for package in &cfg.required_packages {
        if deps.contains_key(&package.name) || declared_dev.contains(&package.name) {
            continue;
        }
        let version = if package.version.trim().is_empty() {
            FALLBACK_VERSION
        } else {
            package.version.as_str()
        };
        deps.insert(package.name.clone(), Value::String(version.to_string()));
        added.push(package.name.clone());
    }
    Ok(added)
}

#[async_trait]
impl TaskWorker for LlmTaskWorker {
    fn name(&self) -> &str {
        "llm-worker"
    }

    async fn execute(&self, task: &Task, ctx: &WorkerContext) -> Result<WorkerResult, WorkerError> {
        tracing::debug!(
            task_id = %task.id,
            kind = %task.kind,
            target = %task.target,
            attempt = ctx.attempt,
            "worker start"
        );
        match task.kind {
            TaskKind::DependencyUpdate => self.update_dependencies(task).await,
            TaskKind::ConfigGeneration => self.generate_config(task).await,
            TaskKind::HttpInstrumentation
            | TaskKind::ServiceInstrumentation
            | TaskKind::DatabaseInstrumentation
            | TaskKind::CacheInstrumentation
            | TaskKind::ExternalApiInstrumentation => self.instrument_file(task).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otelflow_core::api::{ChangeOperation, CompletionError, RequiredPackage};
    use std::sync::Mutex;

    struct CannedCompletion {
        reply: Result<String, CompletionError>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedCompletion {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn err(err: CompletionError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionService for CannedCompletion {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.reply.clone()
        }
    }

    fn ctx() -> WorkerContext {
        WorkerContext {
            run_id: "run".into(),
            batch_index: 0,
            attempt: 0,
        }
    }

    fn cfg() -> InstrumentationConfig {
        InstrumentationConfig {
            service_name: "shop".into(),
            config_file: "tracing.js".into(),
            required_packages: vec![
                RequiredPackage {
                    name: "@opentelemetry/api".into(),
                    version: "^1.9.0".into(),
                },
                RequiredPackage {
                    name: "@opentelemetry/sdk-node".into(),
                    version: "".into(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_dependency_update_is_deterministic_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name":"shop","version":"1.0.0","dependencies":{"express":"^4.18.0"}}"#,
        )
        .unwrap();
        let completion = CannedCompletion::ok("unused");
        let worker = LlmTaskWorker::new(completion.clone(), dir.path(), cfg());
        let task = Task::new("dependency-update-1", TaskKind::DependencyUpdate, "package.json", "add");

        let result = worker.execute(&task, &ctx()).await.unwrap();

        assert!(result.success);
        assert!(completion.prompts.lock().unwrap().is_empty());
        let change = &result.changes[0];
        assert_eq!(change.operation, ChangeOperation::Modify);
        let content = change.new_content.as_deref().unwrap();
        let manifest: Value = serde_json::from_str(content).unwrap();
        assert_eq!(manifest["dependencies"]["@opentelemetry/api"], "^1.9.0");
        assert_eq!(manifest["dependencies"]["@opentelemetry/sdk-node"], "latest");
        assert!(content.find("\"name\"").unwrap() < content.find("\"dependencies\"").unwrap());
    }

    #[tokio::test]
    async fn test_dependency_update_noop_when_declared_as_dev_dependency() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies":{"@opentelemetry/api":"1"},"devDependencies":{"@opentelemetry/sdk-node":"0.52"}}"#,
        )
        .unwrap();
        let worker = LlmTaskWorker::new(CannedCompletion::ok(""), dir.path(), cfg());
        let task = Task::new("dependency-update-1", TaskKind::DependencyUpdate, "package.json", "add");

        let result = worker.execute(&task, &ctx()).await.unwrap();
        assert_eq!(result.changes[0].operation, ChangeOperation::None);
    }

    #[tokio::test]
    async fn test_broken_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "[1, 2]").unwrap();
        let worker = LlmTaskWorker::new(CannedCompletion::ok(""), dir.path(), cfg());
        let task = Task::new("dependency-update-1", TaskKind::DependencyUpdate, "package.json", "add");

        let err = worker.execute(&task, &ctx()).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_config_generation_creates_file_from_code_block() {
        let dir = tempfile::tempdir().unwrap();
        let completion = CannedCompletion::ok(
            "Here you go:\n```js\nconst { NodeSDK } = require('@opentelemetry/sdk-node');\n```\n",
        );
        let worker = LlmTaskWorker::new(completion.clone(), dir.path(), cfg());
        let task = Task::new("config-generation-1", TaskKind::ConfigGeneration, "tracing.js", "gen");

        let result = worker.execute(&task, &ctx()).await.unwrap();

        let change = &result.changes[0];
        assert_eq!(change.operation, ChangeOperation::Create);
        assert_eq!(
            change.new_content.as_deref(),
            Some("const { NodeSDK } = require('@opentelemetry/sdk-node');\n")
        );
        assert!(completion.prompts.lock().unwrap()[0].contains("\"shop\""));
    }

    #[tokio::test]
    async fn test_file_instrumentation_modifies_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("routes")).unwrap();
        std::fs::write(dir.path().join("routes/users.js"), "router.get('/', list);\n").unwrap();
        let completion = CannedCompletion::ok("```javascript\nconst tracer = 1;\nrouter.get('/', list);\n```");
        let worker = LlmTaskWorker::new(completion.clone(), dir.path(), cfg());
        let task = Task::new("http-3", TaskKind::HttpInstrumentation, "routes/users.js", "trace routes");

        let result = worker.execute(&task, &ctx()).await.unwrap();

        assert_eq!(result.changes[0].operation, ChangeOperation::Modify);
        let prompt = completion.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("trace routes"));
        assert!(prompt.contains("router.get('/', list);"));
    }

    #[tokio::test]
    async fn test_identical_output_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cache.js"), "get();\n").unwrap();
        let worker = LlmTaskWorker::new(CannedCompletion::ok("```js\nget();\n```"), dir.path(), cfg());
        let task = Task::new("cache-2", TaskKind::CacheInstrumentation, "cache.js", "trace");

        let result = worker.execute(&task, &ctx()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.changes[0].operation, ChangeOperation::None);
    }

    #[tokio::test]
    async fn test_failures_surface_as_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("svc.js"), "x();\n").unwrap();

        let no_block = LlmTaskWorker::new(CannedCompletion::ok("sorry, no code"), dir.path(), cfg());
        let task = Task::new("service-2", TaskKind::ServiceInstrumentation, "svc.js", "trace");
        assert!(matches!(
            no_block.execute(&task, &ctx()).await.unwrap_err(),
            WorkerError::Extract(ExtractError::NoCodeBlock)
        ));

        let http_err = LlmTaskWorker::new(
            CannedCompletion::err(CompletionError::Http {
                status: 529,
                body: "overloaded".into(),
            }),
            dir.path(),
            cfg(),
        );
        assert!(matches!(
            http_err.execute(&task, &ctx()).await.unwrap_err(),
            WorkerError::Completion(_)
        ));

        let missing = Task::new("service-3", TaskKind::ServiceInstrumentation, "gone.js", "trace");
        assert!(matches!(
            no_block.execute(&missing, &ctx()).await.unwrap_err(),
            WorkerError::InvalidInput(_)
        ));

        let escaping = Task::new("service-4", TaskKind::ServiceInstrumentation, "../etc/passwd", "x");
        assert!(matches!(
            no_block.execute(&escaping, &ctx()).await.unwrap_err(),
            WorkerError::InvalidInput(_)
        ));
    }
}
