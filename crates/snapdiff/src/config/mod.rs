pub mod diff;
pub mod resolve;
pub mod template;

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub use self::diff::DiffConfig;
pub use self::resolve::{CliOverrides, EnvOverrides, ResolvedRunConfig};
pub use self::template::{config_file_exists, write_gitignore, write_template};

pub const CONFIG_DIR: &str = ".snapdiff";
const CONFIG_FILE: &str = "config.toml";

pub fn validate_threshold(v: f64) -> Result<f64, String> {
    if !(0.0..=100.0).contains(&v) {
        return Err(format!("threshold must be between 0.0 and 100.0, got {v}"));
    }
    Ok(v)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Network fetch timeout per image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Concurrent comparisons in `snapdiff run`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    /// Validate semantic constraints that serde cannot express.
    fn validate(&self) -> Result<()> {
        if let Some(t) = self.diff.threshold {
            validate_threshold(t).map_err(|e| anyhow::anyhow!("diff.{e}"))?;
        }
        if let Some(t) = self.diff.transparency {
            crate::compare::policy::validate_transparency(t)
                .map_err(|e| anyhow::anyhow!("diff.{e}"))?;
        }
        if self.load.timeout_ms == Some(0) {
            bail!("load.timeout_ms must be > 0");
        }
        if self.run.parallel == Some(0) {
            bail!("run.parallel must be > 0");
        }
        Ok(())
    }
}

pub fn parse(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Read `<dir>/config.toml`; a missing file yields the defaults.
pub fn load_from(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load() -> Result<Config> {
    load_from(Path::new(CONFIG_DIR))
}
