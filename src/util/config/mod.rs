//! TechLang configuration system
//!
//! Supports user-level and project-level configuration.
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Project-level (./techlang.toml)
//! 3. User-level (~/.config/techlang/config.toml)
//! 4. Default values
//! ```
//!
//! A project file replaces the user file wholesale; sections it leaves out
//! fall back to their defaults, not to the user file.
//!
//! # Usage
//!
//! ```rust
//! use techlang::util::config::load_config;
//!
//! let config = load_config().unwrap_or_default();
//! assert!(config.interpreter.max_call_depth > 0);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Project-level config file name
pub const PROJECT_CONFIG_FILE: &str = "techlang.toml";

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Engine limits and module lookup
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    /// REPL settings
    #[serde(default)]
    pub repl: ReplConfig,
}

/// Interpreter configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterpreterConfig {
    /// Ceiling for `while`/`while_else` iterations
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: usize,
    /// Nested call limit for functions, methods and closures
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
    /// Directories searched by `import`
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,
    /// Flags seeded into the variable table before preprocessing
    #[serde(default)]
    pub defines: BTreeMap<String, toml::Value>,
}

fn default_max_loop_iterations() -> usize {
    100_000
}

fn default_max_call_depth() -> usize {
    200
}

fn default_search_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: 100_000,
            max_call_depth: 200,
            search_paths: vec![PathBuf::from(".")],
            defines: BTreeMap::new(),
        }
    }
}

impl InterpreterConfig {
    /// Add a `NAME=VALUE` define. A bare `NAME` is set to 1.
    pub fn define(
        &mut self,
        spec: &str,
    ) {
        let (name, value) = match spec.split_once('=') {
            Some((name, raw)) => (name, parse_define_value(raw)),
            None => (spec, toml::Value::Integer(1)),
        };
        self.defines.insert(name.trim().to_string(), value);
    }
}

fn parse_define_value(raw: &str) -> toml::Value {
    if let Ok(n) = raw.parse::<i64>() {
        toml::Value::Integer(n)
    } else if let Ok(f) = raw.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        match raw {
            "true" => toml::Value::Boolean(true),
            "false" => toml::Value::Boolean(false),
            _ => toml::Value::String(raw.to_string()),
        }
    }
}

/// REPL configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplConfig {
    /// History size
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    /// History file path; `~/.techlang_history` when unset
    #[serde(default)]
    pub history_file: Option<PathBuf>,
    /// Prompt string
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Prompt while a block is still open
    #[serde(default = "default_continuation_prompt")]
    pub continuation_prompt: String,
    /// Color error lines
    #[serde(default = "default_colors")]
    pub colors: bool,
}

fn default_history_size() -> usize {
    1000
}

fn default_prompt() -> String {
    "tl> ".to_string()
}

fn default_continuation_prompt() -> String {
    "... ".to_string()
}

fn default_colors() -> bool {
    true
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            history_size: 1000,
            history_file: None,
            prompt: "tl> ".to_string(),
            continuation_prompt: "... ".to_string(),
            colors: true,
        }
    }
}

impl ReplConfig {
    /// Configured history file, or `~/.techlang_history`
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file.clone().or_else(|| {
            std::env::var("HOME")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()
                .map(|home| PathBuf::from(home).join(".techlang_history"))
        })
    }
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    // Try XDG config directory on Unix
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("techlang"));
    }

    // Fallback to ~/.config/techlang
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("techlang"));
    }

    // On Windows, try %APPDATA%
    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join("techlang"));
    }

    None
}

/// Get the user config file path (~/.config/techlang/config.toml)
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Read one config file. A missing file yields `None`.
pub fn load_config_file(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(ConfigError::IoError)?;
    toml::from_str(&content)
        .map(Some)
        .map_err(ConfigError::ParseError)
}

/// Load user-level configuration.
/// Returns default config if file doesn't exist
pub fn load_user_config() -> Result<Config, ConfigError> {
    match get_config_path() {
        Some(path) => Ok(load_config_file(&path)?.unwrap_or_default()),
        None => Ok(Config::default()),
    }
}

/// Load the effective configuration for a session started in `dir`.
pub fn load_config_from(dir: &Path) -> Result<Config, ConfigError> {
    match load_config_file(&dir.join(PROJECT_CONFIG_FILE))? {
        Some(project) => Ok(project),
        None => load_user_config(),
    }
}

/// Load the effective configuration for the current directory
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(ConfigError::IoError)?;
    load_config_from(&cwd)
}

/// Save user-level configuration
pub fn save_user_config(config: &Config) -> Result<(), ConfigError> {
    let dir = get_config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    // Create directory if not exists
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(ConfigError::IoError)?;
    }

    let content = toml::to_string_pretty(config).map_err(ConfigError::SerializeError)?;
    fs::write(&path, content).map_err(ConfigError::IoError)?;

    Ok(())
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(toml::de::Error),
    SerializeError(toml::ser::Error),
    NoConfigDir,
}

impl std::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Config parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Config serialize error: {}", e),
            ConfigError::NoConfigDir => write!(f, "Cannot determine config directory"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.interpreter.max_loop_iterations, 100_000);
        assert_eq!(config.interpreter.max_call_depth, 200);
        assert_eq!(config.interpreter.search_paths, vec![PathBuf::from(".")]);
        assert_eq!(config.repl.prompt, "tl> ");
        assert_eq!(config.repl.continuation_prompt, "... ");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            "[interpreter]\nmax_call_depth = 16\n\n[interpreter.defines]\nDEBUG = 1\n",
        )
        .unwrap();
        assert_eq!(config.interpreter.max_call_depth, 16);
        assert_eq!(config.interpreter.max_loop_iterations, 100_000);
        assert_eq!(
            config.interpreter.defines.get("DEBUG"),
            Some(&toml::Value::Integer(1))
        );
        assert_eq!(config.repl, ReplConfig::default());
    }

    #[test]
    fn test_project_file_overrides_user_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[repl]\nprompt = \">> \"\n",
        )
        .unwrap();
        let config = load_config_from(dir.path()).unwrap();
        assert_eq!(config.repl.prompt, ">> ");
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_CONFIG_FILE);
        fs::write(&path, "[interpreter\nmax_call_depth = ").unwrap();
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_define_parsing() {
        let mut config = InterpreterConfig::default();
        config.define("DEBUG");
        config.define("LEVEL=3");
        config.define("NAME=ada");
        assert_eq!(config.defines["DEBUG"], toml::Value::Integer(1));
        assert_eq!(config.defines["LEVEL"], toml::Value::Integer(3));
        assert_eq!(config.defines["NAME"], toml::Value::String("ada".into()));
    }
}
