use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record file or directory used when `--input` is not given.
    pub input: Option<PathBuf>,
    pub top_n: usize,
    /// Seconds between reloads; 0 runs once.
    pub refresh_secs: u64,
    pub as_of_year: Option<i32>,
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            top_n: DEFAULT_TOP_N,
            refresh_secs: 0,
            as_of_year: None,
            json: false,
        }
    }
}

impl Config {
    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("evscope").join("config.toml"))
    }

    /// Priority: `--config` > `$EVSCOPE_CONFIG` > `<config_dir>/evscope/config.toml`.
    /// Only the default location may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os("EVSCOPE_CONFIG").map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// EVSCOPE_REFRESH_SECS env var > config file.
    fn apply_env(&mut self) {
        if let Ok(env_val) = std::env::var("EVSCOPE_REFRESH_SECS") {
            self.refresh_secs = env_val.trim().parse::<u64>().unwrap_or(self.refresh_secs);
        }
    }
}
