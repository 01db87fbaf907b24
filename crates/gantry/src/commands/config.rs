//! Project configuration (gantry.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gantry_server::DevServerConfig;
use gantry_tasks::{PathsConfig, Pipeline, PipelineConfig, ProjectPaths};
use serde::Deserialize;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub js: JsSettings,
    #[serde(default)]
    pub images: ImageSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_open")]
    pub open: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open: default_open(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JsSettings {
    #[serde(default = "default_target")]
    pub target: String,
}

impl Default for JsSettings {
    fn default() -> Self {
        Self {
            target: default_target(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageSettings {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_open() -> bool {
    true
}
fn default_target() -> String {
    gantry_tasks::js::DEFAULT_TARGET.to_string()
}
fn default_jpeg_quality() -> u8 {
    gantry_tasks::images::DEFAULT_JPEG_QUALITY
}

/// Load configuration if the file exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if !(1..=100).contains(&config.images.jpeg_quality) {
        anyhow::bail!(
            "{}: images.jpeg_quality must be between 1 and 100",
            path.display()
        );
    }

    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// A project root with its loaded configuration.
pub struct Project {
    pub root: PathBuf,
    pub config: ConfigFile,
}

impl Project {
    /// Resolve the root and load the config file; a relative config path
    /// is taken from the root.
    pub fn load(root: &Path, config: &Path) -> Result<Self> {
        let root = fs::canonicalize(root)
            .with_context(|| format!("Project root not found: {}", root.display()))?;

        let config_path = if config.is_absolute() {
            config.to_path_buf()
        } else {
            root.join(config)
        };

        Ok(Self {
            config: load_config(&config_path)?,
            root,
        })
    }

    pub fn pipeline(&self) -> Pipeline {
        let paths = ProjectPaths::new(&self.root, &self.config.paths);

        Pipeline::new(PipelineConfig {
            paths,
            js_target: self.config.js.target.clone(),
            jpeg_quality: self.config.images.jpeg_quality,
        })
    }

    pub fn server_config(&self, pipeline: &Pipeline) -> DevServerConfig {
        DevServerConfig {
            root: pipeline.paths().dist_dir().to_path_buf(),
            host: self.config.server.host.clone(),
            port: self.config.server.port,
            open: self.config.server.open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();

        let config = load_config(&temp.path().join("gantry.toml")).unwrap();

        assert_eq!(config.paths.src, "src");
        assert_eq!(config.paths.dist, None);
        assert_eq!(config.server.port, 3000);
        assert!(config.server.open);
        assert_eq!(config.js.target, "es2015");
        assert_eq!(config.images.jpeg_quality, 80);
    }

    #[test]
    fn reads_partial_config() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("gantry.toml");
        fs::write(&path, "[paths]\ndist = \"public\"\n\n[server]\nport = 8080\n").unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.paths.dist.as_deref(), Some("public"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("gantry.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("gantry.toml");
        fs::write(&path, "[images]\njpeg_quality = 0\n").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn project_derives_pipeline_and_server() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("my-site");
        fs::create_dir_all(&root).unwrap();

        let project = Project::load(&root, Path::new("gantry.toml")).unwrap();
        let pipeline = project.pipeline();
        let server = project.server_config(&pipeline);

        assert!(server.root.ends_with("my-site/my-site"));
        assert_eq!(pipeline.config().js_target, "es2015");
    }
}
