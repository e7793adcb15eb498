//! Config file location and loading.

use std::fs;
use std::path::{Path, PathBuf};

use crate::coi::scorer::MAX_SCORE;
use crate::error::EngineError;
use crate::types::Config;

/// `~/.leadqueue/config.json`
pub fn config_path() -> Result<PathBuf, EngineError> {
    let home = dirs::home_dir()
        .ok_or_else(|| EngineError::Configuration("Could not find home directory".to_string()))?;
    Ok(home.join(".leadqueue").join("config.json"))
}

/// Load the config from its default location.
pub fn load_config() -> Result<Config, EngineError> {
    load_config_from(&config_path()?)
}

/// A missing file is the default config. A malformed one is an error.
pub fn load_config_from(path: &Path) -> Result<Config, EngineError> {
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content).map_err(|e| {
        EngineError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    if config.coi_top_n == 0 {
        return Err(EngineError::Configuration(
            "coiTopN must be at least 1".to_string(),
        ));
    }
    if config.default_warmth > MAX_SCORE {
        return Err(EngineError::Configuration(format!(
            "defaultWarmth must be at most {}, got {}",
            MAX_SCORE, config.default_warmth
        )));
    }
    if !(0.0..=1.0).contains(&config.company_match_threshold) {
        return Err(EngineError::Configuration(format!(
            "companyMatchThreshold must be between 0 and 1, got {}",
            config.company_match_threshold
        )));
    }

    Ok(config)
}

/// Write `config` as pretty JSON, creating the parent directory if needed.
pub fn save_config(path: &Path, config: &Config) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(config).map_err(|e| {
        EngineError::Configuration(format!("Failed to serialize config: {}", e))
    })?;
    fs::write(path, content)?;
    Ok(())
}
