//! Per-file transpilation without module resolution.
//!
//! Each test file is parsed and stripped of TypeScript/JSX syntax with oxc,
//! then wrapped in its own function scope. The results are concatenated in
//! test file order into one classic script. Files that import or export
//! are rejected since nothing here resolves modules.

use super::{
    render_harness, BuildArtifact, BuildStrategy, ScriptTag, HARNESS_PATH, TESTS_SCRIPT_PATH,
};
use crate::config::{HarnessOptions, TranspileConfig};
use crate::error::{BuildError, Result};
use crate::ledger::ResourceLedger;
use async_trait::async_trait;
use oxc_allocator::Allocator;
use oxc_ast::{ast::Statement, match_module_declaration};
use oxc_codegen::Codegen;
use oxc_parser::{Parser, ParserReturn};
use oxc_semantic::SemanticBuilder;
use oxc_span::{GetSpan, SourceType};
use oxc_transformer::{TransformOptions, Transformer};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BUNDLER_NAME: &str = "transpile";

/// Builds one classic script from all test files.
#[derive(Debug, Clone)]
pub struct TranspileStrategy {
    config: TranspileConfig,
    cwd: PathBuf,
}

impl TranspileStrategy {
    /// Creates the strategy. Relative paths resolve against `cwd`.
    #[must_use]
    pub fn new(config: TranspileConfig, cwd: PathBuf) -> Self {
        Self { config, cwd }
    }

    fn static_root(&self) -> PathBuf {
        match &self.config.cwd {
            Some(root) => self.cwd.join(root),
            None => self.cwd.clone(),
        }
    }
}

#[async_trait]
impl BuildStrategy for TranspileStrategy {
    fn name(&self) -> &'static str {
        BUNDLER_NAME
    }

    async fn build(
        &self,
        test_files: &[PathBuf],
        harness: &HarnessOptions,
        _ledger: &ResourceLedger,
    ) -> Result<BuildArtifact> {
        info!("Transpiling {} test files...", test_files.len());

        let mut script = String::new();
        if let Some(banner) = &self.config.banner {
            script.push_str(banner);
            script.push('\n');
        }

        let mut diagnostics = Vec::new();
        for path in test_files {
            let source = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| BuildError::Read {
                    path: path.clone(),
                    source,
                })?;

            match transpile_source(path, &source) {
                Ok(code) => {
                    let label = path.strip_prefix(&self.cwd).unwrap_or(path.as_path());
                    let _ = writeln!(script, "// {}", label.display());
                    let _ = writeln!(script, ";(function () {{\n{code}}})();");
                }
                Err(mut errors) => diagnostics.append(&mut errors),
            }
        }

        if !diagnostics.is_empty() {
            return Err(BuildError::Diagnostics {
                bundler: BUNDLER_NAME,
                diagnostics,
            }
            .into());
        }

        let html = render_harness(harness, &[ScriptTag::classic(TESTS_SCRIPT_PATH)])?;

        let mut artifact = BuildArtifact::new().with_static_root(self.static_root());
        artifact.insert(TESTS_SCRIPT_PATH, script);
        artifact.insert(HARNESS_PATH, html);
        debug!("transpiled artifact holds {} files", artifact.len());
        Ok(artifact)
    }
}

/// Strips types from one file. Returns every problem found in it on failure.
fn transpile_source(path: &Path, source: &str) -> std::result::Result<String, Vec<String>> {
    let source_type = SourceType::from_path(path).unwrap_or(SourceType::mjs());
    let allocator = Allocator::default();

    let ParserReturn {
        mut program,
        errors,
        panicked,
        ..
    } = Parser::new(&allocator, source, source_type).parse();

    let mut diagnostics: Vec<String> = errors
        .iter()
        .map(|error| format!("{}: {error}", path.display()))
        .collect();
    if panicked || !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    for statement in &program.body {
        if matches!(statement, match_module_declaration!(Statement)) {
            let (line, column) = line_column(source, statement.span().start);
            diagnostics.push(format!(
                "{}:{line}:{column}: import and export are not supported by the {BUNDLER_NAME} bundler",
                path.display()
            ));
        }
    }
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
    let transformed = Transformer::new(&allocator, path, &TransformOptions::default())
        .build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(transformed
            .errors
            .iter()
            .map(|error| format!("{}: {error}", path.display()))
            .collect());
    }

    Ok(Codegen::new().build(&program).code)
}

/// 1-based line and column of a byte offset.
fn line_column(source: &str, offset: u32) -> (usize, usize) {
    let offset = (offset as usize).min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |newline| before[newline + 1..].chars().count())
        + 1;
    (line, column)
}
