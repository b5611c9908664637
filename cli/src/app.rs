//! CLI assembly: apply flag overrides, build plugins, and drive
//! analyze → plan → execute → write → summary.

use std::path::Path;

use otelflow_core::api::{
    copy_template, plan_batches, write_changes, AppConfig, BatchExecutor,
    CliError, CodebaseAnalysis, ExecutionOpts, RunSummary, TaskGraphBuilder, TaskPlan,
};
use otelflow_plugins::factory;

use crate::commands::cli::{AnalyzeArgs, OutputFormat, RunArgs};
use crate::report;

fn analyze_root(cfg: &AppConfig, root: &Path) -> Result<CodebaseAnalysis, CliError> {
    factory::build_analyzer(cfg)
        .analyze(root)
        .map_err(|e| CliError::Analysis(format!("{e:#}")))
}

fn build_plan(cfg: &AppConfig, analysis: &CodebaseAnalysis) -> TaskPlan {
    TaskGraphBuilder::new(
        cfg.instrumentation.config_file.clone(),
        cfg.instrumentation.service_name.clone(),
    )
    .build(analysis)
}

pub fn analyze(args: &AnalyzeArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let analysis = analyze_root(cfg, &args.root)?;
    println!("{}", report::render_analysis(&analysis, args.format));
    Ok(0)
}

pub fn plan(args: &AnalyzeArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let analysis = analyze_root(cfg, &args.root)?;
    let plan = build_plan(cfg, &analysis);
    let batches = plan_batches(&plan.tasks)?;
    println!("{}", report::render_plan(&plan, &batches, args.format));
    Ok(0)
}

/// Fold command line overrides into the loaded config.
pub fn apply_run_overrides(cfg: &mut AppConfig, args: &RunArgs) {
    if let Some(model) = args.model.as_ref().filter(|m| !m.trim().is_empty()) {
        cfg.llm.model = model.clone();
    }
    if let Some(n) = args.max_parallel {
        cfg.executor.max_parallel = Some(n);
    }
    if let Some(secs) = args.task_timeout_secs {
        cfg.executor.task_timeout_secs = secs;
    }
}

pub async fn run(args: &RunArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    apply_run_overrides(&mut cfg, args);
    let summary = execute_run(args, &cfg).await?;
    println!("{}", report::render_summary(&summary, args.format));
    Ok(if summary.overall_success { 0 } else { 1 })
}

#[tracing::instrument(name = "cli.run", skip(args, cfg), fields(root = %args.root.display()))]
pub async fn execute_run(args: &RunArgs, cfg: &AppConfig) -> Result<RunSummary, CliError> {
    let analysis = analyze_root(cfg, &args.root)?;
    let plan = build_plan(cfg, &analysis);
    // Scheduling errors must surface before anything is copied or executed.
    plan_batches(&plan.tasks)?;

    prepare_output(args)?;

    let completion = factory::build_completion(cfg)?;
    let worker = factory::build_worker(cfg, completion, &args.root, &analysis);
    let progress_bar = !args.no_progress
        && args.format == OutputFormat::Text
        && atty::is(atty::Stream::Stderr);

    let mut executor = BatchExecutor::new(worker, ExecutionOpts::from_config(&cfg.executor, progress_bar))
        .with_renderer(factory::build_renderer(args.format.as_str()));
    if let Some(strategy) = factory::build_retry(&cfg.executor.retry) {
        executor = executor.with_retry_strategy(strategy);
    }

    let report = executor.execute(&plan.tasks).await?;

    let written = write_changes(&args.output, &report.results);
    if written.is_clean() {
        tracing::info!(
            created = written.created,
            modified = written.modified,
            "changes written to {}",
            args.output.display()
        );
    } else {
        tracing::warn!(
            created = written.created,
            modified = written.modified,
            errors = written.errors.len(),
            "some changes could not be written to {}",
            args.output.display()
        );
    }

    Ok(RunSummary::build(&analysis, &plan, &report, &written.errors))
}

/// Seed the output directory with the template (or the codebase itself)
/// unless it is the same directory.
fn prepare_output(args: &RunArgs) -> Result<(), CliError> {
    let source = args.template.as_deref().unwrap_or(&args.root);
    std::fs::create_dir_all(&args.output)?;

    let same_dir = match (source.canonicalize(), args.output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if same_dir {
        tracing::debug!("output is the source tree, nothing to copy");
        return Ok(());
    }
    if args.output.canonicalize()?.starts_with(source.canonicalize()?) {
        return Err(CliError::Config(format!(
            "output directory {} must not be inside {}",
            args.output.display(),
            source.display()
        )));
    }

    let copied = copy_template(source, &args.output)?;
    tracing::debug!(copied, "seeded output from {}", source.display());
    Ok(())
}

pub fn exit_code_for_error(e: &CliError) -> i32 {
    // 0: success
    // 1: run finished with failures / uncategorized
    // 11: config error
    // 12: scheduling error
    // 20: IO error
    match e {
        CliError::Config(_) => 11,
        CliError::Scheduling(err) if err.is_graph_error() => 12,
        CliError::Scheduling(_) => 1,
        CliError::Io(_) => 20,
        CliError::Analysis(_) | CliError::Command(_) | CliError::Anyhow(_) => 1,
    }
}
