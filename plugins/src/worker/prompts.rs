use otelflow_core::api::{FileDescriptor, InstrumentationConfig, Task, TaskKind};

pub const SYSTEM_PROMPT: &str = "You are an expert in OpenTelemetry instrumentation for Node.js services. \
Preserve existing behavior exactly. Reply with the complete resulting file in a single fenced code block and nothing else.";

pub const CODE_LANGS: &[&str] = &["javascript", "js", "typescript", "ts", "mjs", "cjs"];

pub fn config_generation(task: &Task, cfg: &InstrumentationConfig) -> String {
    let packages: Vec<String> = cfg
        .required_packages
        .iter()
        .map(|p| format!("- {}@{}", p.name, p.version))
        .collect();

    format!(
        "{instruction}\n\n\
Write `{target}`: the OpenTelemetry SDK bootstrap that must be loaded before any application code.\n\
Requirements:\n\
- service.name resource attribute is \"{service}\"\n\
- OTLP/HTTP trace exporter, endpoint taken from OTEL_EXPORTER_OTLP_ENDPOINT when set\n\
- Node auto-instrumentations enabled\n\
- graceful shutdown on SIGTERM\n\n\
Available packages:\n{packages}\n",
        instruction = task.instruction,
        target = task.target,
        service = cfg.service_name,
        packages = packages.join("\n"),
    )
}

/// Kind-specific guidance appended to every file instrumentation prompt.
fn guidance(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::HttpInstrumentation => {
            "Create one span per route handler named `<METHOD> <route>`. Set http.method, http.route \
and http.status_code. Record exceptions and set the span status to ERROR on failures."
        }
        TaskKind::ServiceInstrumentation => {
            "Wrap every exported or public method in an active span named `<Class>.<method>`. \
Record exceptions, set ERROR status, and always end the span."
        }
        TaskKind::DatabaseInstrumentation => {
            "Wrap every query in a CLIENT span. Set db.system, db.operation and db.name. \
Never record query parameters or credentials."
        }
        TaskKind::CacheInstrumentation => {
            "Wrap cache reads and writes in CLIENT spans. Set db.system to the cache engine \
and a boolean cache.hit attribute on reads."
        }
        TaskKind::ExternalApiInstrumentation => {
            "Wrap outbound calls in CLIENT spans, inject W3C trace context into request headers, \
and set http.method, http.url and http.status_code."
        }
        TaskKind::DependencyUpdate | TaskKind::ConfigGeneration => "",
    }
}

pub fn file_instrumentation(task: &Task, source: &str, file: Option<&FileDescriptor>) -> String {
    let mut prompt = format!(
        "{}\n\n{}\n\nUse the tracer from `@opentelemetry/api` (`trace.getTracer(...)`). \
Do not initialize the SDK in this file.\n",
        task.instruction,
        guidance(task.kind)
    );
    if let Some(file) = file.filter(|f| !f.imports.is_empty()) {
        prompt.push_str(&format!("Existing imports: {}\n", file.imports.join(", ")));
    }
    prompt.push_str(&format!("\nFile `{}`:\n```\n{}\n```\n", task.target, source));
    prompt
}
