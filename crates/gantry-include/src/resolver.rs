//! Recursive include resolution.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};

use crate::context::{merge, substitute};
use crate::directive::scan;

/// Source of file contents for the resolver.
pub trait SourceLoader {
    /// Load the text of `path`.
    fn load(&self, path: &Path) -> io::Result<String>;
}

/// Loads sources from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Errors that can occur while resolving includes.
#[derive(Debug, thiserror::Error)]
pub enum IncludeError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("{file}:{line}: unresolved include '{target}': {message}")]
    Missing {
        file: String,
        line: usize,
        target: String,
        message: String,
    },

    #[error("{file}:{line}: malformed include directive: {message}")]
    Malformed {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Include cycle: {0}")]
    Cycle(String),
}

/// Expands `@@include` directives, relative to the including file.
#[derive(Debug, Default, Clone)]
pub struct Resolver<L = FsLoader> {
    loader: L,
}

impl Resolver<FsLoader> {
    /// Create a resolver reading from the filesystem.
    pub fn new() -> Self {
        Self { loader: FsLoader }
    }
}

impl<L: SourceLoader> Resolver<L> {
    /// Create a resolver with a custom loader.
    pub fn with_loader(loader: L) -> Self {
        Self { loader }
    }

    /// Load `path` and expand every include in it.
    pub fn resolve_file(&self, path: &Path) -> Result<String, IncludeError> {
        let source = self.loader.load(path).map_err(|e| IncludeError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        self.resolve_str(&source, path)
    }

    /// Expand includes in `source`, treating it as the content of `origin`.
    pub fn resolve_str(&self, source: &str, origin: &Path) -> Result<String, IncludeError> {
        let origin = normalize(origin);
        let mut stack = vec![origin.clone()];
        self.expand(source, &origin, &Value::Object(Map::new()), &mut stack)
    }

    fn expand(
        &self,
        source: &str,
        origin: &Path,
        context: &Value,
        stack: &mut Vec<PathBuf>,
    ) -> Result<String, IncludeError> {
        let directives = scan(source).map_err(|e| IncludeError::Malformed {
            file: origin.display().to_string(),
            line: e.line,
            message: e.message,
        })?;

        if directives.is_empty() {
            return Ok(substitute(source, context));
        }

        let base = origin.parent().unwrap_or(Path::new(""));
        let mut output = String::with_capacity(source.len());
        let mut cursor = 0;

        for directive in directives {
            output.push_str(&substitute(&source[cursor..directive.span.start], context));

            let target = normalize(&base.join(&directive.path));

            if stack.contains(&target) {
                let chain = stack
                    .iter()
                    .chain(std::iter::once(&target))
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(IncludeError::Cycle(chain));
            }

            let included = self
                .loader
                .load(&target)
                .map_err(|e| IncludeError::Missing {
                    file: origin.display().to_string(),
                    line: directive.line,
                    target: directive.path.clone(),
                    message: e.to_string(),
                })?;

            let child_context = match &directive.context {
                Some(ctx) => merge(context, ctx),
                None => context.clone(),
            };

            stack.push(target.clone());
            let expanded = self.expand(&included, &target, &child_context, stack)?;
            stack.pop();

            output.push_str(&expanded);
            cursor = directive.span.end;
        }

        output.push_str(&substitute(&source[cursor..], context));

        Ok(output)
    }
}

/// Lexically collapse `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}
