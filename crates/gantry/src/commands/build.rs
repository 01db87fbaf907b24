//! Build command: clean, then every asset task.

use std::path::Path;

use anyhow::Result;

use super::config::Project;

/// Run the build command.
pub async fn run(root: &Path, config: &Path) -> Result<()> {
    let project = Project::load(root, config)?;
    let pipeline = project.pipeline();

    tracing::info!("Building {}", project.root.display());

    let result = pipeline.build().await?;

    tracing::info!(
        "Built {} files with {} tasks in {}ms",
        result.files(),
        result.reports.len(),
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
