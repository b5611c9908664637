//! Materialize worker results on disk.
//!
//! Writing never aborts half way: every failed write is recorded in the
//! [`WriteReport`] and the remaining changes are still applied.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::executor::types::{ChangeOperation, WorkerResult};

/// Directory names never copied from a template tree.
const SKIP_DIRS: &[&str] = &["node_modules", ".git"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteReport {
    /// Files written, relative to the output root
    pub written: Vec<String>,
    pub created: usize,
    pub modified: usize,
    pub errors: Vec<String>,
}

impl WriteReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Recursively copy `src` into `dst`, overwriting existing files. Returns the
/// number of files copied.
pub fn copy_template(src: &Path, dst: &Path) -> std::io::Result<usize> {
    std::fs::create_dir_all(dst)?;
    let mut copied = 0;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let name = entry.file_name();
        let target = dst.join(&name);

        if file_type.is_dir() {
            if SKIP_DIRS.iter().any(|d| name == *d) {
                continue;
            }
            copied += copy_template(&entry.path(), &target)?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Resolve a change target under `root`, rejecting absolute paths and any
/// `..` component.
pub fn resolve_target(root: &Path, target: &str) -> Result<PathBuf, String> {
    let rel = Path::new(target);
    if target.trim().is_empty() {
        return Err("empty target path".to_string());
    }
    if rel.is_absolute() {
        return Err(format!("absolute target path not allowed: {target}"));
    }
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(format!("target path escapes output root: {target}")),
        }
    }
    Ok(root.join(rel))
}

/// Write the `new_content` of every successful result under `output_root`.
pub fn write_changes(output_root: &Path, results: &[WorkerResult]) -> WriteReport {
    let mut report = WriteReport::default();

    for result in results.iter().filter(|r| r.success) {
        for change in &result.changes {
            if change.operation == ChangeOperation::None {
                continue;
            }
            let Some(content) = change.new_content.as_deref() else {
                report.errors.push(format!(
                    "{}: {} has no content",
                    result.task_id, change.target_file
                ));
                continue;
            };

            let path = match resolve_target(output_root, &change.target_file) {
                Ok(p) => p,
                Err(e) => {
                    report.errors.push(format!("{}: {}", result.task_id, e));
                    continue;
                }
            };

            let write = path
                .parent()
                .map(std::fs::create_dir_all)
                .unwrap_or(Ok(()))
                .and_then(|_| std::fs::write(&path, content));

            match write {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), op = ?change.operation, "file written");
                    match change.operation {
                        ChangeOperation::Create => report.created += 1,
                        ChangeOperation::Modify => report.modified += 1,
                        ChangeOperation::None => {}
                    }
                    report.written.push(change.target_file.clone());
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "write failed: {}", e);
                    report.errors.push(format!(
                        "{}: failed to write {}: {}",
                        result.task_id, change.target_file, e
                    ));
                }
            }
        }
    }

    report
}
