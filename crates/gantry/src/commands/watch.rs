//! Watch command: build, then serve with live reload and rebuild on change.

use std::path::Path;

use anyhow::Result;

use super::config::Project;

/// Run the watch command.
pub async fn run(root: &Path, config: &Path, open: bool) -> Result<()> {
    let project = Project::load(root, config)?;
    let pipeline = project.pipeline();

    let mut server = project.server_config(&pipeline);
    server.open &= open;

    tracing::info!(
        "Watching {} (Ctrl-C to stop)",
        pipeline.paths().src_dir().display()
    );

    tokio::select! {
        result = gantry_server::serve_and_watch(pipeline, server) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Stopping"),
    }

    Ok(())
}
