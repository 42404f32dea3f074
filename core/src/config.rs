use crate::error::{Result, RowDeltaError};
use crate::hash::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the project-local config file
pub const LOCAL_CONFIG_FILE: &str = "rowdelta.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub reconcile: ReconcileOptions,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Options recognised by a reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Measured value column, excluded from the dimension key. Required to run.
    pub observation_column: Option<String>,
    pub hash_algorithm: HashAlgorithm,
    /// Lower-case field text before hashing
    pub case_normalization: bool,
    /// Hash rows on the rayon pool
    pub parallel_hashing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for reconciliation output files
    pub directory: PathBuf,
    /// Directory used instead of `directory` for test runs
    pub test_directory: PathBuf,
    /// Also write the unchanged rows
    pub write_unchanged: bool,
    /// Replace output files that already exist
    pub overwrite: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            observation_column: None,
            hash_algorithm: HashAlgorithm::default(),
            case_normalization: true,
            parallel_hashing: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("outputs"),
            test_directory: PathBuf::from("test-data/outputs"),
            write_unchanged: false,
            overwrite: true,
        }
    }
}

impl ReconcileOptions {
    /// Options for a given observation column, everything else default
    pub fn for_observation(column: impl Into<String>) -> Self {
        Self {
            observation_column: Some(column.into()),
            ..Self::default()
        }
    }

    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    pub fn with_case_normalization(mut self, enabled: bool) -> Self {
        self.case_normalization = enabled;
        self
    }

    pub fn with_parallel_hashing(mut self, enabled: bool) -> Self {
        self.parallel_hashing = enabled;
        self
    }

    /// The configured observation column, or an error if none was set
    pub fn require_observation_column(&self) -> Result<&str> {
        match self.observation_column.as_deref() {
            Some(col) if !col.is_empty() => Ok(col),
            _ => Err(RowDeltaError::invalid_input(concat!(
                "An observation column is required ",
                "(set reconcile.observation_column or pass --observation-column)"
            ))),
        }
    }

    /// Apply ROWDELTA_* environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(column) = env::var("ROWDELTA_OBSERVATION_COLUMN") {
            self.observation_column = Some(column);
        }
        if let Ok(algorithm) = env::var("ROWDELTA_HASH_ALGORITHM") {
            self.hash_algorithm = algorithm.parse()?;
        }
        if let Ok(flag) = env::var("ROWDELTA_CASE_NORMALIZATION") {
            self.case_normalization = parse_bool(&flag).ok_or_else(|| {
                RowDeltaError::config(format!(
                    "ROWDELTA_CASE_NORMALIZATION must be true or false, got '{flag}'"
                ))
            })?;
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Directory holding the global config
pub fn global_config_dir() -> PathBuf {
    if let Some(home_dir) = dirs::home_dir() {
        home_dir.join(".rowdelta")
    } else {
        PathBuf::from(".rowdelta")
    }
}

pub fn global_config_path() -> PathBuf {
    global_config_dir().join("global.toml")
}

/// Parse a config file; a file that exists but does not parse is an error
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| RowDeltaError::io(path, e))?;
    toml::from_str::<Config>(&content).map_err(|e| {
        RowDeltaError::config(format!("Failed to parse '{}': {e}", path.display()))
    })
}

pub fn get_config() -> Result<Config> {
    let current_dir = env::current_dir()?;
    get_config_in(&current_dir)
}

/// Resolve configuration relative to `dir`
///
/// Priority order (highest to lowest):
/// 1. Explicit config file via ROWDELTA_CONFIG env var
/// 2. Local config file (rowdelta.toml in `dir`)
/// 3. Global config file (~/.rowdelta/global.toml)
/// 4. Defaults
///
/// ROWDELTA_* option overrides are applied on top.
pub fn get_config_in(dir: &Path) -> Result<Config> {
    let mut config = if let Ok(config_path) = env::var("ROWDELTA_CONFIG") {
        load_config_file(Path::new(&config_path))?
    } else {
        let local_path = dir.join(LOCAL_CONFIG_FILE);
        let global_path = global_config_path();
        if local_path.exists() {
            load_config_file(&local_path)?
        } else if global_path.exists() {
            load_config_file(&global_path)?
        } else {
            Config::default()
        }
    };

    config.reconcile.apply_env_overrides()?;
    Ok(config)
}

/// Write `config` as pretty TOML to `path`, creating parent directories
pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| RowDeltaError::io(parent, e))?;
        }
    }
    let config_toml = toml::to_string_pretty(config)?;
    fs::write(path, config_toml).map_err(|e| RowDeltaError::io(path, e))?;
    Ok(())
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &global_config_path())
}

/// Describe where the active configuration came from
pub fn get_config_resolution_info(dir: &Path) -> String {
    if let Ok(config_path) = env::var("ROWDELTA_CONFIG") {
        return format!("ROWDELTA_CONFIG ({config_path})");
    }
    let local_path = dir.join(LOCAL_CONFIG_FILE);
    if local_path.exists() {
        return format!("local config ({})", local_path.display());
    }
    let global_path = global_config_path();
    if global_path.exists() {
        return format!("global config ({})", global_path.display());
    }
    "defaults".to_string()
}
