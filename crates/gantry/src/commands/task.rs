//! Single-task commands.

use std::path::Path;

use anyhow::Result;
use gantry_tasks::Task;

use super::config::Project;

/// Run one asset task.
pub async fn run(root: &Path, config: &Path, task: Task) -> Result<()> {
    let pipeline = Project::load(root, config)?.pipeline();

    let report = pipeline.run(task).await?;

    if report.skipped > 0 {
        tracing::warn!("'{}' skipped {} inputs, see warnings above", task, report.skipped);
    }

    Ok(())
}

/// Remove the output folder.
pub async fn clean(root: &Path, config: &Path) -> Result<()> {
    let pipeline = Project::load(root, config)?.pipeline();

    pipeline.clean().await?;

    Ok(())
}
