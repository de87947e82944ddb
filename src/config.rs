//! Project configuration module.
//!
//! The input and output layout of a project is fixed (see
//! [`pipeline::Project`](crate::pipeline::Project)); the few things that do
//! vary between machines live in an optional `grafe.toml` at the project root.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [serve]
//! host = "127.0.0.1"        # Interface the preview server binds to
//! port = 8081               # Preview server port
//!
//! [scripts]
//! source_extension = ".ts"  # Files rewritten by the transpiler pass
//! compiled_extension = ".js"
//! command = ["esbuild", "--loader=ts", "--log-level=warning"]
//! ```
//!
//! The file is sparse: override just the values you want. Unknown keys are
//! rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the configuration file at the project root.
pub const CONFIG_FILENAME: &str = "grafe.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `grafe.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Preview server settings.
    pub serve: ServeConfig,
    /// Script transpiler pass settings.
    pub scripts: ScriptsConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serve.port == 0 {
            return Err(ConfigError::Validation(
                "serve.port must be non-zero".into(),
            ));
        }
        if self.serve.host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "serve.host must not be empty".into(),
            ));
        }
        for (key, ext) in [
            ("scripts.source_extension", &self.scripts.source_extension),
            ("scripts.compiled_extension", &self.scripts.compiled_extension),
        ] {
            if !ext.starts_with('.') || ext.len() < 2 || ext.contains('/') {
                return Err(ConfigError::Validation(format!(
                    "{key} must look like \".ext\", got {ext:?}"
                )));
            }
        }
        if self.scripts.source_extension == self.scripts.compiled_extension {
            return Err(ConfigError::Validation(
                "scripts.source_extension and scripts.compiled_extension must differ".into(),
            ));
        }
        if self.scripts.command.is_empty() {
            return Err(ConfigError::Validation(
                "scripts.command must name a program".into(),
            ));
        }
        Ok(())
    }
}

/// Preview server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    /// Interface to bind, e.g. `127.0.0.1` or `0.0.0.0`.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
        }
    }
}

/// Script transpiler pass settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsConfig {
    /// Extension (with dot) of script sources found in the output tree.
    pub source_extension: String,
    /// Extension (with dot) written in place of `source_extension`.
    pub compiled_extension: String,
    /// Program and arguments. Source is piped to stdin, output read from stdout.
    pub command: Vec<String>,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            source_extension: ".ts".to_string(),
            compiled_extension: ".js".to_string(),
            command: vec![
                "esbuild".to_string(),
                "--loader=ts".to_string(),
                "--log-level=warning".to_string(),
            ],
        }
    }
}

/// Load `grafe.toml` from the project root.
///
/// A missing file yields the defaults. A present file is parsed, unknown keys
/// are rejected, and the result is validated.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        log::debug!("no {} in {}, using defaults", CONFIG_FILENAME, root.display());
        return Ok(SiteConfig::default());
    }
    let content = fs::read_to_string(&config_path)?;
    let config: SiteConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `grafe.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# grafe configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The project layout is fixed and not configurable:
#   content/                  markdown pages and files copied verbatim
#   theme/templates/layouts/  page layouts, selected by front matter `Template`
#   theme/templates/includes/ fragments shared by every layout
#   theme/static/             theme assets
#   static/                   project assets (override theme assets)
#   public/                   build output, recreated on every build
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Preview server
# ---------------------------------------------------------------------------
[serve]
# Interface to bind. Use "0.0.0.0" to expose the preview on the network.
host = "127.0.0.1"

# TCP port.
port = 8081

# ---------------------------------------------------------------------------
# Script transpiler pass
# ---------------------------------------------------------------------------
[scripts]
# Files with this extension in public/ are transpiled and then removed.
source_extension = ".ts"

# Extension of the transpiled file written next to the source.
compiled_extension = ".js"

# Program and arguments. The script source is piped to stdin and the
# transpiled output is read from stdout.
command = ["esbuild", "--loader=ts", "--log-level=warning"]
"##
}
