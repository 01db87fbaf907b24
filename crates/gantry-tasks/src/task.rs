//! Task identifiers, reports and errors.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use gantry_include::IncludeError;

/// A named pipeline task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Task {
    Html,
    Css,
    Js,
    Images,
    Fonts,
    FontsStyle,
    Otf2Ttf,
    SvgSprite,
}

impl Task {
    /// Task name as exposed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Js => "js",
            Self::Images => "images",
            Self::Fonts => "fonts",
            Self::FontsStyle => "fontsStyle",
            Self::Otf2Ttf => "otf2ttf",
            Self::SvgSprite => "svgSprite",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a single task run.
#[derive(Debug, Clone)]
pub struct TaskReport {
    /// Which task ran
    pub task: Task,

    /// Files written
    pub outputs: Vec<PathBuf>,

    /// Inputs skipped because their conversion failed
    pub skipped: usize,

    /// Wall time in milliseconds
    pub duration_ms: u64,
}

/// Outputs of a per-file task where each input is converted independently.
#[derive(Debug, Default)]
pub struct Batch {
    pub outputs: Vec<PathBuf>,
    pub failed: usize,
}

impl Batch {
    /// Collect per-file results, logging and counting the failures.
    pub(crate) fn collect(results: impl IntoIterator<Item = Result<PathBuf, TaskError>>) -> Self {
        let mut batch = Self::default();

        for result in results {
            match result {
                Ok(path) => batch.outputs.push(path),
                Err(e) => {
                    tracing::warn!("{}", e);
                    batch.failed += 1;
                }
            }
        }

        batch
    }
}

/// Errors that can occur while running tasks.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },

    #[error(transparent)]
    Include(#[from] IncludeError),

    #[error("Failed to compile {path}: {message}")]
    Compile { path: String, message: String },

    #[error("Failed to convert {path}: {message}")]
    Convert { path: String, message: String },

    #[error("Task {task} did not complete: {message}")]
    Aborted { task: Task, message: String },

    #[error("{failed} of {total} tasks failed")]
    Failed { failed: usize, total: usize },
}

impl TaskError {
    pub(crate) fn read(path: &Path, err: impl fmt::Display) -> Self {
        Self::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, err: impl fmt::Display) -> Self {
        Self::Write {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn compile(path: &Path, message: impl fmt::Display) -> Self {
        Self::Compile {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn convert(path: &Path, message: impl fmt::Display) -> Self {
        Self::Convert {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

/// Write `contents` to `path`, creating parent directories.
pub(crate) fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TaskError::write(parent, e))?;
    }

    fs::write(path, contents).map_err(|e| TaskError::write(path, e))
}
