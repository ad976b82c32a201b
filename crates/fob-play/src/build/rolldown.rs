//! Full module bundling with rolldown.
//!
//! The test files become one generated entry named [`TESTS_ENTRY`] that
//! imports each of them in order. User entries from `bundlerConfig.entry`
//! are bundled alongside it; entries listing several imports get a
//! generated module of their own. Output is ESM with inline source maps,
//! and every entry chunk is loaded by the harness, user entries first.

use super::{render_harness, BuildArtifact, BuildStrategy, ScriptTag, HARNESS_PATH};
use crate::config::{HarnessOptions, RolldownConfig};
use crate::error::{BuildError, ConfigError, Result};
use crate::ledger::{Release, ResourceLedger};
use async_trait::async_trait;
use indexmap::IndexMap;
use rolldown::{
    BundleOutput, Bundler, BundlerBuilder, BundlerOptions, InputItem, IsExternal, OutputFormat,
    Platform, SourceMapType,
};
use rolldown_common::{ModuleType, Output, ResolvedExternal};
use rolldown_error::BuildDiagnostic;
use rolldown_plugin::{
    __inner::SharedPluginable, HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs,
    HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const BUNDLER_NAME: &str = "rolldown";

/// Entry name of the generated test bundle. User entries can't use it.
pub const TESTS_ENTRY: &str = "tests";

const VIRTUAL_PREFIX: &str = "fob-play:";

/// Bundles tests and their imports with rolldown.
#[derive(Debug, Clone)]
pub struct RolldownStrategy {
    config: RolldownConfig,
    cwd: PathBuf,
}

impl RolldownStrategy {
    /// Creates the strategy. Relative paths resolve against `cwd`.
    #[must_use]
    pub fn new(config: RolldownConfig, cwd: PathBuf) -> Self {
        Self { config, cwd }
    }

    /// Bundling context, also used as static root.
    fn context(&self) -> PathBuf {
        match &self.config.cwd {
            Some(root) => self.cwd.join(root),
            None => self.cwd.clone(),
        }
    }

    /// Rolldown inputs plus the generated modules they refer to.
    ///
    /// The caller's entries come first, in declaration order; the test
    /// entry is appended last.
    fn inputs(&self, test_files: &[PathBuf]) -> Result<(Vec<InputItem>, IndexMap<String, String>)> {
        let entries = self.config.entry.resolve()?;
        if entries.contains_key(TESTS_ENTRY) {
            return Err(ConfigError::ReservedEntry(TESTS_ENTRY.to_string()).into());
        }

        let context = self.context();
        let mut inputs = Vec::with_capacity(entries.len() + 1);
        let mut modules = IndexMap::new();

        for (name, imports) in entries {
            let import = match imports.as_slice() {
                [single] => single.clone(),
                _ => {
                    let id = format!("{VIRTUAL_PREFIX}{name}");
                    let code = import_module(imports.iter().map(|import| absolute_import(&context, import)));
                    modules.insert(id.clone(), code);
                    id
                }
            };
            inputs.push(InputItem {
                name: Some(name),
                import,
            });
        }

        let tests_id = format!("{VIRTUAL_PREFIX}{TESTS_ENTRY}");
        modules.insert(
            tests_id.clone(),
            import_module(test_files.iter().map(|file| file.to_string_lossy().into_owned())),
        );
        inputs.push(InputItem {
            name: Some(TESTS_ENTRY.to_string()),
            import: tests_id,
        });

        Ok((inputs, modules))
    }

    /// The caller's native options with the orchestrator-owned fields set.
    fn options(&self, input: Vec<InputItem>) -> Result<BundlerOptions> {
        let native = self.config.native_options()?;
        Ok(BundlerOptions {
            input: Some(input),
            cwd: Some(self.context()),
            format: Some(OutputFormat::Esm),
            platform: Some(Platform::Browser),
            sourcemap: Some(SourceMapType::Inline),
            external: (!self.config.external.is_empty())
                .then(|| IsExternal::from(self.config.external.clone())),
            ..native
        })
    }
}

#[async_trait]
impl BuildStrategy for RolldownStrategy {
    fn name(&self) -> &'static str {
        BUNDLER_NAME
    }

    async fn build(
        &self,
        test_files: &[PathBuf],
        harness: &HarnessOptions,
        ledger: &ResourceLedger,
    ) -> Result<BuildArtifact> {
        info!("Bundling {} test files with rolldown...", test_files.len());

        let (input, modules) = self.inputs(test_files)?;
        let entry_order: Vec<String> = input.iter().filter_map(|item| item.name.clone()).collect();

        let plugin: SharedPluginable = Arc::new(VirtualModulePlugin::new(modules));
        let bundler = BundlerBuilder::default()
            .with_options(self.options(input)?)
            .with_plugins(vec![plugin])
            .build()
            .map_err(|e| diagnostics(&e))?;

        let session = Arc::new(BundlerSession::new(bundler));
        ledger.register("rolldown bundler", session.clone());

        let bundle = session.generate().await?;
        for warning in &bundle.warnings {
            warn!("rolldown: {warning}");
        }

        let mut artifact = BuildArtifact::new().with_static_root(self.context());
        let mut entry_chunks = IndexMap::new();
        for output in &bundle.assets {
            match output {
                Output::Chunk(chunk) => {
                    if chunk.is_entry {
                        entry_chunks.insert(chunk.name.to_string(), format!("/{}", chunk.filename));
                    }
                    artifact.insert(chunk.filename.as_str(), chunk.code.clone());
                }
                Output::Asset(asset) => {
                    artifact.insert(asset.filename.as_str(), asset.source.as_bytes().to_vec());
                }
            }
        }

        if !entry_chunks.contains_key(TESTS_ENTRY) {
            return Err(BuildError::MissingOutput(TESTS_ENTRY.to_string()).into());
        }
        let scripts: Vec<ScriptTag> = entry_order
            .iter()
            .filter_map(|name| entry_chunks.get(name))
            .map(ScriptTag::module)
            .collect();

        artifact.insert(HARNESS_PATH, render_harness(harness, &scripts)?);
        debug!("rolldown artifact holds {} files", artifact.len());
        Ok(artifact)
    }
}

/// A rolldown bundler owned by the run's ledger.
struct BundlerSession {
    bundler: Mutex<Option<Bundler>>,
}

impl BundlerSession {
    fn new(bundler: Bundler) -> Self {
        Self {
            bundler: Mutex::new(Some(bundler)),
        }
    }

    async fn generate(&self) -> Result<BundleOutput> {
        let mut guard = self.bundler.lock().await;
        let Some(bundler) = guard.as_mut() else {
            return Err(BuildError::MissingOutput("released bundler".to_string()).into());
        };
        bundler
            .generate()
            .await
            .map_err(|e| diagnostics(&e).into())
    }
}

#[async_trait]
impl Release for BundlerSession {
    async fn release(&self) -> anyhow::Result<()> {
        if self.bundler.lock().await.take().is_some() {
            debug!("released rolldown bundler");
        }
        Ok(())
    }
}

/// Serves the generated entry modules.
#[derive(Debug, Clone)]
struct VirtualModulePlugin {
    modules: Arc<IndexMap<String, String>>,
}

impl VirtualModulePlugin {
    fn new(modules: IndexMap<String, String>) -> Self {
        Self {
            modules: Arc::new(modules),
        }
    }
}

impl Plugin for VirtualModulePlugin {
    fn name(&self) -> Cow<'static, str> {
        "fob-play-virtual-entries".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let modules = Arc::clone(&self.modules);

        async move {
            if !modules.contains_key(&specifier) {
                return Ok(None);
            }
            Ok(Some(HookResolveIdOutput {
                id: specifier.into(),
                external: Some(ResolvedExternal::Bool(false)),
                ..Default::default()
            }))
        }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let modules = Arc::clone(&self.modules);

        async move {
            let Some(code) = modules.get(&id) else {
                return Ok(None);
            };
            Ok(Some(HookLoadOutput {
                code: code.clone().into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }
}

/// A module that imports `imports` for their side effects, in order.
fn import_module(imports: impl IntoIterator<Item = String>) -> String {
    imports
        .into_iter()
        .map(|import| format!("import {};\n", serde_json::Value::String(import)))
        .collect()
}

/// Relative imports of generated modules are anchored at the bundling context.
fn absolute_import(context: &Path, import: &str) -> String {
    if import.starts_with("./") || import.starts_with("../") {
        context.join(import).to_string_lossy().into_owned()
    } else {
        import.to_string()
    }
}

/// One rendered report per diagnostic, without terminal colors.
fn diagnostics(errors: &[BuildDiagnostic]) -> BuildError {
    BuildError::Diagnostics {
        bundler: BUNDLER_NAME,
        diagnostics: errors
            .iter()
            .map(|error| error.to_diagnostic().to_string().trim_end().to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntrySpec;
    use crate::error::PlayError;
    use serde_json::json;
    use tempfile::TempDir;

    fn strategy(entry: serde_json::Value, cwd: &Path) -> RolldownStrategy {
        let config = RolldownConfig {
            entry: EntrySpec::from_value(&entry).unwrap(),
            ..RolldownConfig::default()
        };
        RolldownStrategy::new(config, cwd.to_path_buf())
    }

    #[test]
    fn test_tests_entry_is_last_and_imports_in_order() {
        let files = vec![PathBuf::from("/p/b.test.js"), PathBuf::from("/p/a.test.js")];
        let (inputs, modules) = strategy(json!({ "setup": "./setup.js" }), Path::new("/p"))
            .inputs(&files)
            .unwrap();

        let names: Vec<_> = inputs.iter().map(|i| i.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["setup", "tests"]);
        assert_eq!(inputs[0].import, "./setup.js");

        let tests = &modules["fob-play:tests"];
        assert_eq!(tests, "import \"/p/b.test.js\";\nimport \"/p/a.test.js\";\n");
    }

    #[test]
    fn test_multi_import_entry_gets_generated_module() {
        let (inputs, modules) = strategy(json!(["./a.js", "lodash"]), Path::new("/p"))
            .inputs(&[PathBuf::from("/p/x.test.js")])
            .unwrap();

        assert_eq!(inputs[0].name.as_deref(), Some("main"));
        assert_eq!(inputs[0].import, "fob-play:main");
        assert_eq!(
            modules["fob-play:main"],
            "import \"/p/./a.js\";\nimport \"lodash\";\n"
        );
    }

    #[test]
    fn test_reserved_entry_name_is_rejected() {
        let err = strategy(json!({ "tests": "./mine.js" }), Path::new("/p"))
            .inputs(&[PathBuf::from("/p/x.test.js")])
            .unwrap_err();
        assert!(matches!(
            err,
            PlayError::Config(ConfigError::ReservedEntry(ref name)) if name == "tests"
        ));
    }

    #[tokio::test]
    async fn test_bundles_tests_with_imports() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("helper.js"), "export const answer = 42;\n").unwrap();
        let test = dir.path().join("answer.test.js");
        std::fs::write(
            &test,
            "import { answer } from './helper.js';\nwindow.__answer = answer;\n",
        )
        .unwrap();

        let ledger = ResourceLedger::new();
        let artifact = strategy(serde_json::Value::Null, dir.path())
            .build(&[test], &HarnessOptions::default(), &ledger)
            .await
            .unwrap();

        let code = String::from_utf8(artifact.get("/tests.js").unwrap().content.clone()).unwrap();
        assert!(code.contains("42"));
        assert!(code.contains("sourceMappingURL=data:"));

        let html = String::from_utf8(artifact.get(HARNESS_PATH).unwrap().content.clone()).unwrap();
        assert!(html.contains(r#"<script type="module" src="/tests.js"></script>"#));

        assert_eq!(ledger.names(), vec!["rolldown bundler"]);
        assert!(ledger.drain_all().await.is_clean());
    }

    #[tokio::test]
    async fn test_native_options_reach_the_bundler() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/greeting.js"), "export const greeting = 'hello';\n").unwrap();
        let test = dir.path().join("native.test.js");
        std::fs::write(
            &test,
            "import { greeting } from '@lib/greeting.js';\nwindow.__out = [greeting, __BUILD_ID__];\n",
        )
        .unwrap();

        let config = RolldownConfig::from_value(json!({
            "define": { "__BUILD_ID__": "7319" },
            "resolve": { "alias": [["@lib", [dir.path().join("lib").to_string_lossy()]]] }
        }))
        .unwrap();
        let ledger = ResourceLedger::new();
        let artifact = RolldownStrategy::new(config, dir.path().to_path_buf())
            .build(&[test], &HarnessOptions::default(), &ledger)
            .await
            .unwrap();

        let code = String::from_utf8(artifact.get("/tests.js").unwrap().content.clone()).unwrap();
        assert!(code.contains("7319"), "{code}");
        assert!(!code.contains("__BUILD_ID__"), "{code}");
        assert!(code.contains("hello"), "{code}");
        assert!(ledger.drain_all().await.is_clean());
    }

    #[tokio::test]
    async fn test_unresolved_import_is_a_diagnostic() {
        let dir = TempDir::new().unwrap();
        let test = dir.path().join("broken.test.js");
        std::fs::write(&test, "import './does-not-exist.js';\n").unwrap();

        let ledger = ResourceLedger::new();
        let err = strategy(serde_json::Value::Null, dir.path())
            .build(&[test], &HarnessOptions::default(), &ledger)
            .await
            .unwrap_err();

        let PlayError::Build(BuildError::Diagnostics { bundler, diagnostics }) = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(bundler, "rolldown");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].contains("does-not-exist.js"), "{}", diagnostics[0]);
        assert!(!diagnostics[0].contains("BuildDiagnostic {"), "{}", diagnostics[0]);
        // The bundler is still registered so the run can release it.
        assert_eq!(ledger.len(), 1);
    }
}
