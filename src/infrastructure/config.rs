use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::segment::Resolution;

/// Application configuration.
///
/// Layered, later wins:
/// 1. built-in defaults
/// 2. the TOML file (explicit path, or `<config dir>/unconflict/config.toml`
///    when present)
/// 3. `UNCONFLICT_<SECTION>__<KEY>` environment variables,
///    e.g. `UNCONFLICT_COMMIT__DRY_RUN=true`
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub commit: CommitConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub resolve: ResolveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommitConfig {
    /// Print what would be written instead of writing it.
    #[serde(default)]
    pub dry_run: bool,
    /// Refuse to overwrite a file whose content changed since it was opened.
    #[serde(default = "default_true")]
    pub verify_unchanged: bool,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            verify_unchanged: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Where session reports are written.
    #[serde(default = "default_output_dir")]
    pub dir: String,
    /// Report format: "json", "text" or "all".
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: default_format(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ResolveConfig {
    /// Strategy used by `resolve` when none is given on the command line.
    #[serde(default)]
    pub default_strategy: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// "error", "info" or "debug". `RUST_LOG` still wins when set.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> String {
    ".unconflict".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

/// `<platform config dir>/unconflict/config.toml`, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("unconflict").join("config.toml"))
}

impl AppConfig {
    /// Load from `path` (must exist) or from the default location (optional).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(p) => {
                builder = builder.add_source(File::with_name(p).required(true));
            }
            None => {
                if let Some(default) = default_config_path() {
                    builder = builder.add_source(File::from(default).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("UNCONFLICT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: AppConfig = builder
            .build()
            .with_context(|| format!("Failed to read config file: {}", path.unwrap_or("<default>")))?
            .try_deserialize()
            .with_context(|| "Failed to parse configuration")?;
        Ok(cfg)
    }

    /// The configured default strategy, if any.
    pub fn default_strategy(&self) -> Result<Option<Resolution>> {
        self.resolve
            .default_strategy
            .as_deref()
            .map(str::parse::<Resolution>)
            .transpose()
            .with_context(|| "Invalid resolve.default_strategy")
    }
}
