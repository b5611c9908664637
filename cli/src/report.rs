//! Human and machine readable renderings of analysis, plan and run summary.

use serde_json::json;

use otelflow_core::api::{CodebaseAnalysis, FileRole, RunSummary, TaskPlan};

use crate::commands::cli::OutputFormat;

pub fn render_analysis(analysis: &CodebaseAnalysis, format: OutputFormat) -> String {
    match format {
        OutputFormat::Jsonl => json!({ "event_type": "analysis", "analysis": analysis }).to_string(),
        OutputFormat::Text => {
            let mut out = format!(
                "Analyzed {} files in {} (routes {}, services {}, utilities {}, other {})",
                analysis.files.len(),
                analysis.root,
                analysis.count_by_role(FileRole::Route),
                analysis.count_by_role(FileRole::Service),
                analysis.count_by_role(FileRole::Utility),
                analysis.count_by_role(FileRole::Other),
            );
            for file in &analysis.files {
                out.push_str(&format!("\n  [{}] {}", file.role, file.path));
                if !file.functions.is_empty() {
                    out.push_str(&format!(" ({})", file.functions.join(", ")));
                }
            }
            if analysis.missing_dependencies.is_empty() {
                out.push_str("\nAll required packages are declared");
            } else {
                out.push_str(&format!(
                    "\nMissing packages: {}",
                    analysis.missing_dependencies.join(", ")
                ));
            }
            out
        }
    }
}

pub fn render_plan(plan: &TaskPlan, batches: &[Vec<String>], format: OutputFormat) -> String {
    match format {
        OutputFormat::Jsonl => json!({
            "event_type": "plan",
            "tasks": plan.tasks,
            "skipped": plan.skipped,
            "batches": batches,
        })
        .to_string(),
        OutputFormat::Text => {
            let mut out = format!("{} tasks in {} batches", plan.tasks.len(), batches.len());
            for (idx, batch) in batches.iter().enumerate() {
                out.push_str(&format!("\n  batch {}:", idx));
                for id in batch {
                    if let Some(task) = plan.tasks.iter().find(|t| &t.id == id) {
                        out.push_str(&format!("\n    {} -> {}", task.id, task.target));
                    }
                }
            }
            if !plan.skipped.is_empty() {
                out.push_str(&format!("\nSkipped {} files:", plan.skipped.len()));
                for path in &plan.skipped {
                    out.push_str(&format!("\n  {}", path));
                }
            }
            out
        }
    }
}

pub fn render_summary(summary: &RunSummary, format: OutputFormat) -> String {
    match format {
        OutputFormat::Jsonl => json!({ "event_type": "summary", "summary": summary }).to_string(),
        OutputFormat::Text => {
            let mut out = String::from("Run summary");
            out.push_str(&format!(
                "\n  files analyzed: {} (skipped {})",
                summary.files_analyzed, summary.files_skipped
            ));
            out.push_str(&format!(
                "\n  tasks: {} in {} batches",
                summary.total_tasks, summary.batch_count
            ));
            for (idx, batch) in summary.batches.iter().enumerate() {
                out.push_str(&format!("\n    batch {}: {}", idx, batch.join(", ")));
            }
            out.push_str(&format!(
                "\n  files modified: {}, created: {}",
                summary.files_modified, summary.files_created
            ));
            if !summary.dependencies_added.is_empty() {
                out.push_str(&format!(
                    "\n  dependencies added: {}",
                    summary.dependencies_added.join(", ")
                ));
            }
            out.push_str(&format!("\n  duration: {}ms", summary.duration_ms));
            out.push_str(&format!(
                "\n  status: {}",
                if summary.overall_success { "SUCCESS" } else { "FAILED" }
            ));
            if !summary.errors.is_empty() {
                out.push_str("\n  errors:");
                for err in &summary.errors {
                    out.push_str(&format!("\n    - {}", err));
                }
            }
            out
        }
    }
}
