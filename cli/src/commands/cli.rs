use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Jsonl,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Jsonl => "jsonl",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "otelflow", version, about = "Instrument a Node.js codebase with OpenTelemetry")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.otelflow/config.toml or ./otelflow.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Root of the codebase to analyze
    pub root: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Root of the codebase to instrument
    pub root: PathBuf,

    /// Directory the instrumented codebase is written to
    #[arg(long)]
    pub output: PathBuf,

    /// Tree copied into the output directory before changes are written.
    /// Defaults to the codebase root.
    #[arg(long)]
    pub template: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Maximum tasks in flight inside one batch (0 = unbounded)
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Per-task deadline in seconds (0 = none)
    #[arg(long)]
    pub task_timeout_secs: Option<u64>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the structural analysis of a codebase
    Analyze(AnalyzeArgs),
    /// Print the instrumentation tasks and their execution batches
    Plan(AnalyzeArgs),
    /// Analyze, plan, execute and write the instrumented codebase
    Run(RunArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_overrides() {
        let args = Args::try_parse_from([
            "otelflow",
            "run",
            "./app",
            "--output",
            "./out",
            "--format",
            "jsonl",
            "--max-parallel",
            "4",
            "--task-timeout-secs",
            "0",
            "--no-progress",
        ])
        .unwrap();

        let Commands::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.root, PathBuf::from("./app"));
        assert_eq!(run.output, PathBuf::from("./out"));
        assert_eq!(run.format, OutputFormat::Jsonl);
        assert_eq!(run.max_parallel, Some(4));
        assert_eq!(run.task_timeout_secs, Some(0));
        assert!(run.no_progress);
        assert!(run.template.is_none());
    }

    #[test]
    fn test_run_requires_output() {
        assert!(Args::try_parse_from(["otelflow", "run", "./app"]).is_err());
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let args =
            Args::try_parse_from(["otelflow", "plan", "./app", "--config", "c.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(args.command, Commands::Plan(_)));
    }
}
