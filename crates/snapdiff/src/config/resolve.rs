use std::time::Duration;

use anyhow::{Context, Result, bail};

use super::diff::DiffConfig;
use super::{Config, load, validate_threshold};
use crate::compare::{ComparisonPolicy, DEFAULT_SIGNIFICANCE_THRESHOLD};
use crate::load::DEFAULT_TIMEOUT;

const DEFAULT_PARALLEL: usize = 4;

/// Values extracted from the CLI that participate in the merge.
#[derive(Default)]
pub struct CliOverrides {
    pub diff: DiffConfig,
    pub parallel: Option<usize>,
    pub timeout_ms: Option<u64>,
}

/// Values read from `SNAPDIFF_*` environment variables.
#[derive(Default)]
pub struct EnvOverrides {
    pub threshold: Option<f64>,
    pub timeout_ms: Option<u64>,
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self> {
        let threshold = std::env::var("SNAPDIFF_DIFF_THRESHOLD")
            .ok()
            .map(|v| v.parse::<f64>())
            .transpose()
            .context("SNAPDIFF_DIFF_THRESHOLD must be a valid float")?;
        let timeout_ms = std::env::var("SNAPDIFF_LOAD_TIMEOUT_MS")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("SNAPDIFF_LOAD_TIMEOUT_MS must be a whole number of milliseconds")?;
        Ok(Self {
            threshold,
            timeout_ms,
        })
    }
}

/// Fully resolved config after CLI > env > file > defaults merge.
pub struct ResolvedRunConfig {
    pub policy: ComparisonPolicy,
    /// Significance threshold in percent.
    pub threshold: f64,
    pub load_timeout: Duration,
    pub parallel: usize,
}

impl ResolvedRunConfig {
    pub fn new(cli: CliOverrides) -> Result<Self> {
        let file_config = load()?;
        let env = EnvOverrides::from_env()?;
        Self::resolve(file_config, env, cli)
    }

    pub fn resolve(file: Config, env: EnvOverrides, cli: CliOverrides) -> Result<Self> {
        let threshold = cli
            .diff
            .threshold
            .or(env.threshold)
            .or(file.diff.threshold)
            .unwrap_or(DEFAULT_SIGNIFICANCE_THRESHOLD);
        validate_threshold(threshold).map_err(|e| anyhow::anyhow!("{e}"))?;

        let timeout_ms = cli.timeout_ms.or(env.timeout_ms).or(file.load.timeout_ms);
        if timeout_ms == Some(0) {
            bail!("load timeout must be > 0 ms");
        }
        let load_timeout = timeout_ms.map(Duration::from_millis).unwrap_or(DEFAULT_TIMEOUT);

        // File base, then CLI overlay.
        let mut diff = file.diff;
        diff.merge(&cli.diff);

        let parallel = cli
            .parallel
            .or(file.run.parallel)
            .unwrap_or(DEFAULT_PARALLEL)
            .max(1);

        Ok(Self {
            policy: diff.policy(),
            threshold,
            load_timeout,
            parallel,
        })
    }
}
