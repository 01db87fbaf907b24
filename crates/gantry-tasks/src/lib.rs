//! Asset tasks for gantry.
//!
//! Compiles a conventional `src/` tree (HTML with includes, Sass, JavaScript,
//! images, fonts) into a distribution folder, one task per asset class.

pub mod css;
pub mod fonts;
pub mod html;
pub mod images;
pub mod js;
pub mod manifest;
pub mod paths;
pub mod pattern;
pub mod pipeline;
pub mod sprite;
pub mod task;

pub use paths::{PathsConfig, ProjectPaths};
pub use pattern::AssetGlob;
pub use pipeline::{BuildResult, Pipeline, PipelineConfig};
pub use task::{Batch, Task, TaskError, TaskReport};
