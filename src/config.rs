//! Collector configuration.

use crate::error::ConfigError;
use crate::resources::{account_id, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Names of every collector the orchestrator knows about.
pub const KNOWN_COLLECTORS: &[&str] = &["prism_elements", "virtual_machines"];

#[derive(Clone, Serialize, Deserialize)]
pub struct PrismCentralCredentials {
    /// A nickname for Prism Central, also used to derive the account id.
    pub name: String,
    /// Prism Central endpoint, without scheme or port.
    pub endpoint: String,
    pub username: String,
    pub password: String,
    /// Whether to ignore SSL certificate errors.
    #[serde(default)]
    pub insecure: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl fmt::Debug for PrismCentralCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrismCentralCredentials")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure", &self.insecure)
            .field("port", &self.port)
            .finish()
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_collectors() -> Vec<String> {
    KNOWN_COLLECTORS.iter().map(|s| s.to_string()).collect()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Prism Central credentials for the resources to be collected.
    #[serde(default)]
    pub credentials: Vec<PrismCentralCredentials>,
    /// Collectors to run. The mandatory cluster collector always runs.
    #[serde(default = "default_collectors")]
    pub collectors: Vec<String>,
    /// Per-request timeout against Prism Central.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            credentials: Vec::new(),
            collectors: default_collectors(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl CollectorConfig {
    /// A filled-in configuration used for `config example`.
    pub fn example() -> Self {
        CollectorConfig {
            credentials: vec![PrismCentralCredentials {
                name: "my pc".to_string(),
                endpoint: "mypc.example.com".to_string(),
                username: "my_pc_username".to_string(),
                password: "my_pc_password".to_string(),
                insecure: true,
                port: DEFAULT_PORT,
            }],
            ..Default::default()
        }
    }

    pub fn from_yaml(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        if !path.exists() {
            return Err(ConfigError::NotFound { path: display });
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config = Self::from_yaml(&contents, &display)?;
        config.validate()?;
        Ok(config)
    }

    /// Location used when no `--config` is given.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("nutanix-collector").join("config.yaml"))
    }

    pub fn disable(&mut self, names: &[String]) {
        self.collectors.retain(|c| !names.contains(c));
    }

    pub fn enabled_collectors(&self) -> HashSet<String> {
        self.collectors.iter().cloned().collect()
    }

    /// Reject configurations that could never produce a working client.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for creds in &self.credentials {
            creds.validate()?;
            let id = account_id(&creds.name);
            if !seen.insert(id.clone()) {
                return Err(ConfigError::DuplicateAccount { id });
            }
        }
        Ok(())
    }
}

impl PrismCentralCredentials {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("name", &self.name),
            ("endpoint", &self.endpoint),
            ("username", &self.username),
            ("password", &self.password),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    name: self.name.clone(),
                    field,
                });
            }
        }

        let invalid = |reason| ConfigError::InvalidEndpoint {
            name: self.name.clone(),
            endpoint: self.endpoint.clone(),
            reason,
        };
        if self.endpoint.contains("://") {
            return Err(invalid("endpoint must not include a scheme"));
        }
        if self.endpoint.contains('/') {
            return Err(invalid("endpoint must not include a path"));
        }
        // Bracketed IPv6 literals carry colons of their own.
        if !self.endpoint.starts_with('[') && self.endpoint.contains(':') {
            return Err(invalid("endpoint must not include a port, use the port field"));
        }
        if self.endpoint.chars().any(char::is_whitespace) {
            return Err(invalid("endpoint must not contain whitespace"));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort {
                name: self.name.clone(),
                port: self.port,
            });
        }
        Ok(())
    }
}
