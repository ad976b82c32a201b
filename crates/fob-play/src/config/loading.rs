use crate::cli::Cli;
use crate::config::{BundlerKind, PlayConfig, CONFIG_FILE_NAME};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of environment overrides, e.g. `FOB_PLAY_PORT=4000`.
pub const ENV_PREFIX: &str = "FOB_PLAY_";

/// Top-level keys that may be set from the environment.
const ENV_KEYS: &[&str] = &[
    "bundler", "port", "timeout", "ui", "reporter", "color", "grep", "iterate",
];

impl PlayConfig {
    /// Load configuration from multiple sources.
    /// Priority: CLI args > environment variables > config file > defaults
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing `--config` file, `Load` when a source
    /// has the wrong shape and `InvalidValue` when validation fails.
    pub fn load(args: &Cli, cwd: &Path) -> Result<Self> {
        let config_file = match &args.config {
            Some(path) => {
                let path = cwd.join(path);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => find_config_file(cwd),
        };

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = config_file {
            debug!("Using config file {}", path.display());
            figment = figment.merge(Json::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).only(ENV_KEYS));
        figment = figment.merge(Serialized::defaults(CliOverrides::from(args)));

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Finds `fob-play.config.json` in `cwd` or the nearest ancestor.
#[must_use]
pub fn find_config_file(cwd: &Path) -> Option<PathBuf> {
    cwd.ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Settings given on the command line. Absent flags leave lower layers alone.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    bundler: Option<BundlerKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ui: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reporter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iterate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    browser: Option<BrowserOverrides>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrowserOverrides {
    chrome_path: PathBuf,
}

impl From<&Cli> for CliOverrides {
    fn from(args: &Cli) -> Self {
        Self {
            bundler: args.bundler,
            port: args.port,
            timeout: args.timeout,
            ui: args.ui.clone(),
            reporter: args.reporter.clone(),
            grep: args.grep.clone(),
            iterate: args.iterate,
            browser: args.chrome.clone().map(|chrome_path| BrowserOverrides { chrome_path }),
        }
    }
}
