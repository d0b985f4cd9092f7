//! TOML-based configuration for AgentOS turn orchestration
//!
//! This module provides declarative configuration for the orchestrator loop,
//! logging, and tool execution via a TOML file (`agentos.toml`). Every section
//! is optional; missing keys fall back to the documented defaults.
//!
//! ```toml
//! [orchestrator]
//! max_tool_call_iterations = 5
//! default_agent_turn_timeout_ms = 60000
//! error_handling_agent_id = "explainer"
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [tools.web_fetch]
//! timeout_secs = 20
//! exclusive = false
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Root configuration structure loaded from agentos.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentOsConfig {
    /// Turn limits and error handling
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Tracing subscriber settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-tool execution settings keyed by tool name
    #[serde(default)]
    pub tools: HashMap<String, ToolConfig>,
}

// ============= Orchestrator Configuration =============

/// Limits applied to every turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorConfig {
    /// Upper bound on tool execution rounds within one turn
    #[serde(default = "default_max_tool_call_iterations")]
    pub max_tool_call_iterations: usize,

    /// Timeout applied to each agent call and each tool batch
    #[serde(default = "default_agent_turn_timeout_ms")]
    pub default_agent_turn_timeout_ms: u64,

    /// Agent asked to explain failures when the failing agent cannot
    #[serde(default)]
    pub error_handling_agent_id: Option<String>,
}

fn default_max_tool_call_iterations() -> usize {
    5
}

fn default_agent_turn_timeout_ms() -> u64 {
    60_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_call_iterations: default_max_tool_call_iterations(),
            default_agent_turn_timeout_ms: default_agent_turn_timeout_ms(),
            error_handling_agent_id: None,
        }
    }
}

impl OrchestratorConfig {
    /// Timeout for one agent call or tool batch
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.default_agent_turn_timeout_ms)
    }
}

// ============= Logging Configuration =============

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Tracing subscriber settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Pretty or JSON output
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ============= Tool Configuration =============

/// Settings for one registered tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolConfig {
    /// Disabled tools answer every call with an error result
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Overrides the tool's own description in definitions
    #[serde(default)]
    pub description: Option<String>,

    /// Per-call timeout
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,

    /// Run this tool one call at a time, never alongside another exclusive tool
    #[serde(default)]
    pub exclusive: bool,
}

fn default_true() -> bool {
    true
}

fn default_tool_timeout() -> u64 {
    30
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            description: None,
            timeout_secs: default_tool_timeout(),
            exclusive: false,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Environment variables that override file values
pub const ENV_MAX_TOOL_CALL_ITERATIONS: &str = "AGENTOS_MAX_TOOL_CALL_ITERATIONS";
/// Overrides `default_agent_turn_timeout_ms`
pub const ENV_AGENT_TURN_TIMEOUT_MS: &str = "AGENTOS_AGENT_TURN_TIMEOUT_MS";
/// Overrides `error_handling_agent_id`
pub const ENV_ERROR_AGENT_ID: &str = "AGENTOS_ERROR_AGENT_ID";
/// Overrides `logging.level`
pub const ENV_LOG_LEVEL: &str = "AGENTOS_LOG_LEVEL";

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The given path does not exist
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file could not be read
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The file is not valid TOML for this schema
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// An override variable could not be parsed
    #[error("Environment variable '{0}' has an invalid value: {1}")]
    InvalidEnvVar(String, String),
}

impl AgentOsConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AgentOsConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file (when given), then apply `.env` and process environment overrides
    pub fn load_with_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides looked up through `lookup`, then re-validate
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_TOOL_CALL_ITERATIONS) {
            self.orchestrator.max_tool_call_iterations = raw.trim().parse().map_err(|_| {
                ConfigError::InvalidEnvVar(ENV_MAX_TOOL_CALL_ITERATIONS.to_string(), raw.clone())
            })?;
        }

        if let Some(raw) = lookup(ENV_AGENT_TURN_TIMEOUT_MS) {
            self.orchestrator.default_agent_turn_timeout_ms = raw.trim().parse().map_err(|_| {
                ConfigError::InvalidEnvVar(ENV_AGENT_TURN_TIMEOUT_MS.to_string(), raw.clone())
            })?;
        }

        if let Some(raw) = lookup(ENV_ERROR_AGENT_ID) {
            let trimmed = raw.trim();
            self.orchestrator.error_handling_agent_id = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }

        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = raw.trim().to_string();
        }

        self.validate()
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestrator.max_tool_call_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.max_tool_call_iterations must be at least 1".to_string(),
            ));
        }

        if self.orchestrator.default_agent_turn_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.default_agent_turn_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if let Some(id) = &self.orchestrator.error_handling_agent_id {
            if id.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "orchestrator.error_handling_agent_id must not be blank".to_string(),
                ));
            }
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.level must not be empty".to_string(),
            ));
        }

        for (name, tool) in &self.tools {
            if tool.timeout_secs == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "tools.{}.timeout_secs must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Get tool settings by name
    pub fn get_tool(&self, name: &str) -> Option<&ToolConfig> {
        self.tools.get(name)
    }

    /// Get a list of enabled tool names
    pub fn enabled_tools(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|(_, config)| config.enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn create_test_config() -> String {
        r#"
[orchestrator]
max_tool_call_iterations = 3
default_agent_turn_timeout_ms = 1500
error_handling_agent_id = "explainer"

[logging]
level = "debug"
format = "json"

[tools.calculator]
enabled = true
description = "Basic calculator"
timeout_secs = 10

[tools.shell]
enabled = false
exclusive = true
"#
        .to_string()
    }

    #[test]
    fn test_parse_config() {
        let config = AgentOsConfig::from_toml_str(&create_test_config()).unwrap();

        assert_eq!(config.orchestrator.max_tool_call_iterations, 3);
        assert_eq!(config.orchestrator.step_timeout(), Duration::from_millis(1500));
        assert_eq!(
            config.orchestrator.error_handling_agent_id.as_deref(),
            Some("explainer")
        );
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.get_tool("calculator").unwrap().timeout_secs, 10);
        assert!(config.get_tool("shell").unwrap().exclusive);
    }

    #[test]
    fn test_defaults() {
        let config = AgentOsConfig::from_toml_str("").unwrap();

        assert_eq!(config.orchestrator.max_tool_call_iterations, 5);
        assert_eq!(config.orchestrator.default_agent_turn_timeout_ms, 60_000);
        assert!(config.orchestrator.error_handling_agent_id.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.tools.is_empty());

        let tool: ToolConfig = toml::from_str("").unwrap();
        assert!(tool.enabled);
        assert_eq!(tool.timeout_secs, 30);
        assert!(!tool.exclusive);
    }

    #[test]
    fn test_enabled_tools() {
        let config = AgentOsConfig::from_toml_str(&create_test_config()).unwrap();
        let enabled = config.enabled_tools();
        assert!(enabled.contains(&"calculator"));
        assert!(!enabled.contains(&"shell"));
    }

    #[test]
    fn test_validation_zero_iterations() {
        let result = AgentOsConfig::from_toml_str(
            r#"
[orchestrator]
max_tool_call_iterations = 0
"#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_zero_tool_timeout() {
        let result = AgentOsConfig::from_toml_str(
            r#"
[tools.slow]
timeout_secs = 0
"#,
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_unknown_log_format_is_parse_error() {
        let result = AgentOsConfig::from_toml_str(
            r#"
[logging]
format = "xml"
"#,
        );
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AgentOsConfig::default();
        config
            .apply_env_overrides(|key| match key {
                ENV_MAX_TOOL_CALL_ITERATIONS => Some("7".to_string()),
                ENV_AGENT_TURN_TIMEOUT_MS => Some(" 250 ".to_string()),
                ENV_ERROR_AGENT_ID => Some("fallback".to_string()),
                ENV_LOG_LEVEL => Some("warn".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.orchestrator.max_tool_call_iterations, 7);
        assert_eq!(config.orchestrator.default_agent_turn_timeout_ms, 250);
        assert_eq!(
            config.orchestrator.error_handling_agent_id.as_deref(),
            Some("fallback")
        );
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_invalid_env_override() {
        let mut config = AgentOsConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == ENV_MAX_TOOL_CALL_ITERATIONS).then(|| "many".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(create_test_config().as_bytes()).unwrap();

        let config = AgentOsConfig::load(file.path()).unwrap();
        assert_eq!(config.orchestrator.max_tool_call_iterations, 3);
    }

    #[test]
    fn test_load_missing_file() {
        let result = AgentOsConfig::load("/definitely/not/here/agentos.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
