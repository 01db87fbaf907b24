//! Task runner and the composite `clean`/`build` tasks.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::images::DEFAULT_JPEG_QUALITY;
use crate::js::DEFAULT_TARGET;
use crate::paths::ProjectPaths;
use crate::task::{Task, TaskError, TaskReport};
use crate::{css, fonts, html, images, js, manifest, sprite};

/// Configuration for running tasks.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Resolved project layout
    pub paths: ProjectPaths,

    /// ECMAScript level for the js task
    pub js_target: String,

    /// Quality for re-encoded jpegs
    pub jpeg_quality: u8,
}

impl PipelineConfig {
    pub fn new(paths: ProjectPaths) -> Self {
        Self {
            paths,
            js_target: DEFAULT_TARGET.to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Result of a build.
#[derive(Debug)]
pub struct BuildResult {
    /// One report per task that ran
    pub reports: Vec<TaskReport>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

impl BuildResult {
    /// Number of files written by all tasks.
    pub fn files(&self) -> usize {
        self.reports.iter().map(|r| r.outputs.len()).sum()
    }
}

/// Runs tasks against one project. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.config.paths
    }

    /// Run a single task on the current thread.
    pub fn run_blocking(&self, task: Task) -> Result<TaskReport, TaskError> {
        let start = Instant::now();
        let paths = &self.config.paths;

        tracing::info!("Starting '{}'", task);

        let (outputs, skipped) = match task {
            Task::Html => (html::run(paths)?, 0),
            Task::Css => (css::run(paths)?, 0),
            Task::Js => (js::run(paths, &self.config.js_target)?, 0),
            Task::Images => {
                let batch = images::run(paths, self.config.jpeg_quality);
                (batch.outputs, batch.failed)
            }
            Task::Fonts => {
                let batch = fonts::run(paths);
                (batch.outputs, batch.failed)
            }
            Task::FontsStyle => (manifest::run(paths)?.into_iter().collect(), 0),
            Task::Otf2Ttf => {
                let batch = fonts::otf2ttf(paths);
                (batch.outputs, batch.failed)
            }
            Task::SvgSprite => (sprite::run(paths)?.into_iter().collect(), 0),
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        if skipped > 0 {
            tracing::warn!(
                "Finished '{}' after {} ms: {} files, {} skipped",
                task,
                duration_ms,
                outputs.len(),
                skipped
            );
        } else {
            tracing::info!(
                "Finished '{}' after {} ms: {} files",
                task,
                duration_ms,
                outputs.len()
            );
        }

        Ok(TaskReport {
            task,
            outputs,
            skipped,
            duration_ms,
        })
    }

    /// Run a single task on the blocking pool.
    pub async fn run(&self, task: Task) -> Result<TaskReport, TaskError> {
        let pipeline = self.clone();

        tokio::task::spawn_blocking(move || pipeline.run_blocking(task))
            .await
            .map_err(|e| TaskError::Aborted {
                task,
                message: e.to_string(),
            })?
    }

    /// Remove the output folder; an absent folder is not an error.
    pub async fn clean(&self) -> Result<(), TaskError> {
        let paths = &self.config.paths;
        let dist = paths.dist_dir();

        if dist == paths.root() || paths.src_dir().starts_with(dist) {
            return Err(TaskError::write(
                dist,
                "refusing to remove a folder containing the sources",
            ));
        }

        match tokio::fs::remove_dir_all(dist).await {
            Ok(()) => {
                tracing::info!("Cleaned {}", dist.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TaskError::write(dist, e)),
        }
    }

    /// Clean, then run every asset task concurrently.
    ///
    /// `fontsStyle` runs after `fonts` since it lists the fonts output.
    /// All tasks run to completion; any failure fails the build.
    pub async fn build(&self) -> Result<BuildResult, TaskError> {
        let start = Instant::now();

        self.clean().await?;

        let font_chain = async {
            let fonts = self.run(Task::Fonts).await;
            let style = self.run(Task::FontsStyle).await;
            [fonts, style]
        };

        let (html, css, js, images, fonts) = tokio::join!(
            self.run(Task::Html),
            self.run(Task::Css),
            self.run(Task::Js),
            self.run(Task::Images),
            font_chain,
        );

        let results: Vec<Result<TaskReport, TaskError>> =
            [html, css, js, images].into_iter().chain(fonts).collect();

        let total = results.len();
        let mut reports = Vec::with_capacity(total);
        let mut failed = 0;

        for result in results {
            match result {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!("{}", e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(TaskError::Failed { failed, total });
        }

        Ok(BuildResult {
            reports,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.paths.dist_dir().to_path_buf(),
        })
    }
}
