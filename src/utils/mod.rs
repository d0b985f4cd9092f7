/// Tracing subscriber initialization.
pub mod logging;
/// TOML-based configuration (agentos.toml).
pub mod toml_config;

pub use logging::init_tracing;
pub use toml_config::{AgentOsConfig, ConfigError, LoggingConfig, OrchestratorConfig, ToolConfig};

use std::any::Any;

/// Readable text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
