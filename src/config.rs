//! Configuration store.
//!
//! Settings are looked up by `(section, key)` and returned as strings. The
//! file form is a YAML document of sections:
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 8080
//!   name: inventory
//!   version: 1.4.0
//! email:
//!   smtp_host: mail.internal
//! custom:
//!   greeting: hello
//! ```
//!
//! `ACTIONSERVER_<SECTION>_<KEY>` environment variables override file values
//! (for example `ACTIONSERVER_SERVER_PORT=9090`).

use serde_yaml::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

pub const SERVER_SECTION: &str = "server";
pub const EMAIL_SECTION: &str = "email";
pub const CUSTOM_SECTION: &str = "custom";

const ENV_PREFIX: &str = "ACTIONSERVER";

/// Read-only key lookup by `(section, key)`.
pub trait ConfigStore: Send + Sync {
    fn setting(&self, section: &str, key: &str) -> Option<String>;
}

/// Error raised while loading or interpreting configuration
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    Io(std::io::Error),
    /// The configuration file is not valid YAML
    Parse(serde_yaml::Error),
    /// A setting exists but does not have the expected shape
    Invalid {
        section: String,
        key: String,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read configuration: {e}"),
            ConfigError::Parse(e) => write!(f, "failed to parse configuration: {e}"),
            ConfigError::Invalid {
                section,
                key,
                value,
            } => write!(f, "invalid value '{value}' for setting {section}.{key}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid { .. } => None,
        }
    }
}

/// YAML-backed store with environment overrides.
#[derive(Debug, Clone, Default)]
pub struct YamlConfig {
    sections: HashMap<String, HashMap<String, String>>,
    read_env: bool,
}

impl YamlConfig {
    /// Empty store that still honours environment overrides.
    pub fn from_env_only() -> Self {
        Self {
            sections: HashMap::new(),
            read_env: true,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let mut config = Self::from_yaml_str(&content)?;
        config.read_env = true;
        Ok(config)
    }

    /// Parse a YAML document without consulting the environment.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_yaml::from_str(content).map_err(ConfigError::Parse)?;
        let mut sections = HashMap::new();
        if let Value::Mapping(map) = root {
            for (section, entries) in map {
                let (Some(section), Value::Mapping(entries)) = (scalar(&section), entries) else {
                    continue;
                };
                let values = entries
                    .iter()
                    .filter_map(|(k, v)| Some((scalar(k)?.to_lowercase(), scalar(v)?)))
                    .collect();
                sections.insert(section.to_lowercase(), values);
            }
        }
        Ok(Self {
            sections,
            read_env: false,
        })
    }

    fn env_override(section: &str, key: &str) -> Option<String> {
        let name = format!("{ENV_PREFIX}_{section}_{key}").to_uppercase();
        std::env::var(name).ok()
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl ConfigStore for YamlConfig {
    fn setting(&self, section: &str, key: &str) -> Option<String> {
        if self.read_env {
            if let Some(value) = Self::env_override(section, key) {
                return Some(value);
            }
        }
        self.sections
            .get(&section.to_lowercase())
            .and_then(|entries| entries.get(&key.to_lowercase()))
            .cloned()
    }
}

/// Free-form application setting from the `custom` section.
pub fn custom_setting(store: &dyn ConfigStore, key: &str) -> Option<String> {
    store.setting(CUSTOM_SECTION, key)
}

/// Listener identity and address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub version: String,
}

impl ServerSettings {
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self, ConfigError> {
        let port = match store.setting(SERVER_SECTION, "port") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                section: SERVER_SECTION.to_string(),
                key: "port".to_string(),
                value: raw.clone(),
            })?,
            None => 8080,
        };
        Ok(Self {
            host: store
                .setting(SERVER_SECTION, "host")
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            name: store
                .setting(SERVER_SECTION, "name")
                .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
            version: store
                .setting(SERVER_SECTION, "version")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        })
    }

    /// `host:port` form accepted by the listener.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Outbound mail transport settings. No host means mail is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
}

impl EmailSettings {
    pub fn from_store(store: &dyn ConfigStore) -> Result<Self, ConfigError> {
        let smtp_port = match store.setting(EMAIL_SECTION, "smtp_port") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                section: EMAIL_SECTION.to_string(),
                key: "smtp_port".to_string(),
                value: raw.clone(),
            })?,
            None => 25,
        };
        Ok(Self {
            smtp_host: store
                .setting(EMAIL_SECTION, "smtp_host")
                .filter(|h| !h.trim().is_empty()),
            smtp_port,
        })
    }
}
