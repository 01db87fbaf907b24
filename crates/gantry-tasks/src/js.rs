//! JavaScript task: includes, syntax lowering and minification with oxc.

use std::path::{Path, PathBuf};

use gantry_include::Resolver;
use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

use crate::paths::ProjectPaths;
use crate::task::{write_output, TaskError};

/// Default ECMAScript level scripts are lowered to.
pub const DEFAULT_TARGET: &str = "es2015";

/// Bundle the script entry and write `script.js` and `script.min.js`.
pub fn run(paths: &ProjectPaths, target: &str) -> Result<Vec<PathBuf>, TaskError> {
    let entry = &paths.source.js;
    if !entry.is_file() {
        return Err(TaskError::read(entry, "script entry point not found"));
    }

    let bundled = Resolver::new().resolve_file(entry)?;
    let transpiled = transpile(&bundled, entry, target)?;
    let minified = minify(&transpiled, entry)?;

    let stem = entry
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("script");

    let plain_path = paths.build.js.join(format!("{}.js", stem));
    let minified_path = paths.build.js.join(format!("{}.min.js", stem));

    write_output(&plain_path, &transpiled)?;
    write_output(&minified_path, &minified)?;

    Ok(vec![plain_path, minified_path])
}

/// Lower syntax newer than `target` and print readable output.
pub fn transpile(source: &str, path: &Path, target: &str) -> Result<String, TaskError> {
    let options = TransformOptions::from_target(target)
        .map_err(|e| TaskError::compile(path, format!("invalid target '{}': {}", target, e)))?;

    let allocator = Allocator::default();
    let mut program = parse(&allocator, source, path)?;

    let semantic = SemanticBuilder::new().build(&program);
    if let Some(error) = semantic.errors.first() {
        return Err(TaskError::compile(path, error));
    }
    let scoping = semantic.semantic.into_scoping();

    let transformed =
        Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
    if let Some(error) = transformed.errors.first() {
        return Err(TaskError::compile(path, error));
    }

    Ok(Codegen::new().build(&program).code)
}

/// Compress and mangle into a single-line script.
pub fn minify(source: &str, path: &Path) -> Result<String, TaskError> {
    let allocator = Allocator::default();
    let mut program = parse(&allocator, source, path)?;

    let minified = Minifier::new(MinifierOptions::default()).build(&allocator, &mut program);

    Ok(Codegen::new()
        .with_options(CodegenOptions::minify())
        .with_scoping(minified.scoping)
        .build(&program)
        .code)
}

fn parse<'a>(allocator: &'a Allocator, source: &'a str, path: &Path) -> Result<Program<'a>, TaskError> {
    let parsed = Parser::new(allocator, source, SourceType::cjs()).parse();

    if let Some(error) = parsed.errors.first() {
        return Err(TaskError::compile(path, error));
    }
    if parsed.panicked {
        return Err(TaskError::compile(path, "parser aborted"));
    }

    Ok(parsed.program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathsConfig;
    use std::fs;
    use tempfile::tempdir;

    const SCRIPT: &str = r#"
@@include('modules/menu.js');

const greet = (name = "world") => `hello ${name}`;
console.log(greet());
"#;

    const MENU: &str = r#"
function toggleMenu(element) {
  const isOpen = element.classList.contains("open");
  element.classList.toggle("open", !isOpen);
  return !isOpen;
}
"#;

    fn project() -> (tempfile::TempDir, ProjectPaths) {
        let temp = tempdir().unwrap();
        let root = temp.path().join("site");
        let js = root.join("src/js");
        fs::create_dir_all(js.join("modules")).unwrap();
        fs::write(js.join("script.js"), SCRIPT).unwrap();
        fs::write(js.join("modules/menu.js"), MENU).unwrap();

        let paths = ProjectPaths::new(&root, &PathsConfig::default());
        (temp, paths)
    }

    #[test]
    fn writes_plain_and_minified_scripts() {
        let (_temp, paths) = project();

        let outputs = run(&paths, DEFAULT_TARGET).unwrap();

        assert_eq!(outputs.len(), 2);
        let plain = fs::read_to_string(paths.build.js.join("script.js")).unwrap();
        let minified = fs::read_to_string(paths.build.js.join("script.min.js")).unwrap();

        assert!(plain.contains("toggleMenu"));
        assert!(!plain.contains("@@include"));
        assert!(minified.len() <= plain.len());
    }

    #[test]
    fn minified_output_is_smaller() {
        let path = Path::new("menu.js");

        let minified = minify(MENU, path).unwrap();

        assert!(minified.len() < MENU.len());
    }

    #[test]
    fn reports_syntax_errors() {
        let err = transpile("const = ;", Path::new("bad.js"), DEFAULT_TARGET).unwrap_err();

        assert!(matches!(err, TaskError::Compile { ref path, .. } if path == "bad.js"));
    }

    #[test]
    fn rejects_unknown_target() {
        let err = transpile("let a = 1;", Path::new("a.js"), "es1999").unwrap_err();

        assert!(err.to_string().contains("es1999"));
    }
}
