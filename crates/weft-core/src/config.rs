use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Global configuration, read from `$WEFT_HOME/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeftConfig {
    /// Directory holding stack files when WEFT_HOME is not set.
    pub data_dir: Option<String>,
    /// Fixed stack file name overriding the dated default.
    pub file_name: Option<String>,
    /// Pretty-print the stack file. Defaults to true.
    pub pretty: Option<bool>,
}

pub const STACK_FILE_EXTENSION: &str = "weft";

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

pub fn resolve_weft_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("WEFT_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(expand_tilde(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".weft"))
}

pub fn global_config_path() -> Option<PathBuf> {
    resolve_weft_home_dir().map(|home| home.join("config.toml"))
}

pub fn load_global_config() -> Option<WeftConfig> {
    let path = global_config_path()?;
    if !path.is_file() {
        return None;
    }
    let text = fs::read_to_string(path).ok()?;
    toml::from_str::<WeftConfig>(&text).ok()
}

pub fn write_global_config(config: &WeftConfig) -> Result<Option<PathBuf>, ConfigError> {
    let Some(path) = global_config_path() else {
        return Ok(None);
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(&path, body)?;
    Ok(Some(path))
}

fn expand_tilde(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix('~') {
        if let Some(home) = resolve_user_home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(raw)
}

/// Directory stack files live in: WEFT_HOME beats the global config's
/// `data_dir` beats the current directory.
pub fn resolve_data_dir_with_source(config: Option<&WeftConfig>) -> (PathBuf, &'static str) {
    if let Ok(value) = std::env::var("WEFT_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return (expand_tilde(trimmed), "env");
        }
    }
    if let Some(dir) = config.and_then(|config| config.data_dir.as_deref()) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return (expand_tilde(trimmed), "config");
        }
    }
    (PathBuf::from("."), "default")
}

pub fn resolve_data_dir(config: Option<&WeftConfig>) -> PathBuf {
    resolve_data_dir_with_source(config).0
}

/// Stack file name: WEFT_FILE beats the global config's `file_name` beats
/// today's date. The `.weft` extension is appended when missing.
pub fn resolve_file_name_with_source(config: Option<&WeftConfig>) -> (String, &'static str) {
    if let Ok(value) = std::env::var("WEFT_FILE") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return (with_stack_extension(trimmed), "env");
        }
    }
    if let Some(name) = config.and_then(|config| config.file_name.as_deref()) {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            return (with_stack_extension(trimmed), "config");
        }
    }
    (with_stack_extension(&default_file_name()), "default")
}

pub fn resolve_file_name(config: Option<&WeftConfig>) -> String {
    resolve_file_name_with_source(config).0
}

/// Today's date, the default per-day stack file.
pub fn default_file_name() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn with_stack_extension(name: &str) -> String {
    let suffix = format!(".{STACK_FILE_EXTENSION}");
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

/// Full path of the stack file for this invocation. An explicit override
/// (the CLI `--file` flag) wins over every resolution layer.
pub fn resolve_db_path(file_override: Option<&Path>, config: Option<&WeftConfig>) -> PathBuf {
    if let Some(path) = file_override {
        return path.to_path_buf();
    }
    resolve_data_dir(config).join(resolve_file_name(config))
}

pub fn resolve_pretty(config: Option<&WeftConfig>) -> bool {
    config.and_then(|config| config.pretty).unwrap_or(true)
}
