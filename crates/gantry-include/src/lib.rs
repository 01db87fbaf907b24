//! Include directive parser and resolver.
//!
//! Splices `@@include('path', { ...context })` directives in HTML templates
//! and scripts, substituting `@@key` context variables inside included files.

pub mod context;
pub mod directive;
pub mod resolver;

pub use context::{merge, substitute};
pub use directive::{scan, Directive, DirectiveError};
pub use resolver::{FsLoader, IncludeError, Resolver, SourceLoader};
