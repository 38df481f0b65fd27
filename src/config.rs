//! Configuration read from the environment

use crate::state_machine::SendPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown send policy {0:?} (expected \"overlap\" or \"serialize\")")]
    UnknownSendPolicy(String),
}

impl FromStr for SendPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overlap" | "allow_overlap" => Ok(SendPolicy::AllowOverlap),
            "serialize" => Ok(SendPolicy::Serialize),
            other => Err(ConfigError::UnknownSendPolicy(other.to_string())),
        }
    }
}

/// Settings for one run of the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub send_policy: SendPolicy,
    pub export_dir: PathBuf,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let send_policy = match lookup("CHATLINE_SEND_POLICY") {
            Some(value) => value.parse()?,
            None => SendPolicy::default(),
        };

        let export_dir = lookup("CHATLINE_EXPORT_DIR").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".chatline").join("exports")
            },
            PathBuf::from,
        );

        let log_json = lookup("CHATLINE_LOG_JSON").is_some_and(|v| v == "1" || v == "true");

        Ok(Self {
            send_policy,
            export_dir,
            log_json,
        })
    }
}
