//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::retrieval::RetrievalConfig;
use crate::storage::{DEFAULT_MAX_CONNECTIONS, default_database_uri};

/// Logical database name used when none is configured
pub const DEFAULT_DATABASE: &str = "loregraph";

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "LOREGRAPH_CONFIG_DIR";
/// Environment variable providing the default connection URI
pub const GRAPH_URI_ENV: &str = "LOREGRAPH_GRAPH_URI";
/// Environment variable providing the default principal
pub const GRAPH_USER_ENV: &str = "LOREGRAPH_GRAPH_USER";
/// Environment variable providing the credential (never stored on disk)
pub const GRAPH_PASSWORD_ENV: &str = "LOREGRAPH_GRAPH_PASSWORD";
/// Environment variable providing the default logical database name
pub const GRAPH_DATABASE_ENV: &str = "LOREGRAPH_GRAPH_DATABASE";

/// Loregraph configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Which engine serves the graph port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackend {
    /// In-process, nothing persisted
    Memory,
    /// Persistent SQL store
    #[default]
    Sql,
}

impl GraphBackend {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sql => "sql",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Some(Self::Memory),
            "sql" | "sqlite" | "persistent" => Some(Self::Sql),
            _ => None,
        }
    }
}

impl std::fmt::Display for GraphBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graph store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub backend: GraphBackend,
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_user")]
    pub user: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_uri() -> String {
    env::var(GRAPH_URI_ENV).unwrap_or_else(|_| default_database_uri())
}

fn default_user() -> Option<String> {
    env::var(GRAPH_USER_ENV).ok().filter(|u| !u.is_empty())
}

fn default_database() -> String {
    env::var(GRAPH_DATABASE_ENV).unwrap_or_else(|_| DEFAULT_DATABASE.to_string())
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: GraphBackend::default(),
            uri: default_uri(),
            user: default_user(),
            password: None,
            database: default_database(),
            max_connections: default_max_connections(),
        }
    }
}

impl GraphConfig {
    /// Credential from the environment
    pub fn resolved_password(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;
        Ok(env::var(GRAPH_PASSWORD_ENV).ok().filter(|p| !p.is_empty()))
    }

    /// Credential masked for display
    pub fn redacted_password(&self) -> anyhow::Result<Option<String>> {
        self.resolved_password()
            .map(|opt| opt.map(|_| "***".to_string()))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.password.is_some() {
            return Err(anyhow!(
                "Graph credentials must be provided via {}, not stored in configuration",
                GRAPH_PASSWORD_ENV
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("loregraph")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            // Return default config without creating file
            Ok(Config::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.graph.enforce_env_only()?;

        if self.graph.uri.trim().is_empty() {
            return Err(anyhow!("graph.uri must not be empty"));
        }
        if self.graph.database.trim().is_empty() {
            return Err(anyhow!("graph.database must not be empty"));
        }
        if self.graph.max_connections == 0 {
            return Err(anyhow!("graph.max_connections must be at least 1"));
        }
        if self.retrieval.max_entities_per_chunk == 0 {
            return Err(anyhow!("retrieval.max_entities_per_chunk must be at least 1"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // Graph settings
            "graph.backend" => Ok(self.graph.backend.to_string()),
            "graph.uri" => Ok(self.graph.uri.clone()),
            "graph.user" => Ok(self.graph.user.clone().unwrap_or_default()),
            "graph.database" => Ok(self.graph.database.clone()),
            "graph.max_connections" => Ok(self.graph.max_connections.to_string()),

            // Credential (special handling - show redacted)
            "graph.password" => match self.graph.redacted_password()? {
                Some(redacted) => Ok(redacted),
                None => Ok(format!("(not set - use {} env var)", GRAPH_PASSWORD_ENV)),
            },

            // Retrieval settings
            "retrieval.max_entities_per_chunk" => {
                Ok(self.retrieval.max_entities_per_chunk.to_string())
            }
            "retrieval.expansion_depth" => Ok(self.retrieval.expansion_depth.to_string()),
            "retrieval.max_relationships_per_entity" => {
                Ok(self.retrieval.max_relationships_per_entity.to_string())
            }
            "retrieval.explain" => Ok(self.retrieval.explain.to_string()),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `loregraph config show` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "graph.backend" => {
                self.graph.backend = GraphBackend::parse(value).ok_or_else(|| {
                    anyhow!("Invalid backend: {}. Valid options: memory, sql", value)
                })?;
            }
            "graph.uri" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("graph.uri must not be empty"));
                }
                self.graph.uri = value.to_string();
            }
            "graph.user" => {
                self.graph.user = Some(value.to_string()).filter(|u| !u.is_empty());
            }
            "graph.database" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("graph.database must not be empty"));
                }
                self.graph.database = value.to_string();
            }
            "graph.max_connections" => {
                let max: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid max_connections value: {}", value))?;
                if max == 0 {
                    return Err(anyhow!("graph.max_connections must be at least 1"));
                }
                self.graph.max_connections = max;
            }

            // Credentials cannot be set via config
            "graph.password" => {
                return Err(anyhow!(
                    "Graph credentials cannot be stored in configuration. \
                     Set the {} environment variable instead.",
                    GRAPH_PASSWORD_ENV
                ));
            }

            "retrieval.max_entities_per_chunk" => {
                let max: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_entities_per_chunk value: {}", value))?;
                if max == 0 {
                    return Err(anyhow!("retrieval.max_entities_per_chunk must be at least 1"));
                }
                self.retrieval.max_entities_per_chunk = max;
            }
            "retrieval.expansion_depth" => {
                self.retrieval.expansion_depth = value
                    .parse()
                    .with_context(|| format!("Invalid expansion_depth value: {}", value))?;
            }
            "retrieval.max_relationships_per_entity" => {
                self.retrieval.max_relationships_per_entity = value
                    .parse()
                    .with_context(|| format!("Invalid max_relationships_per_entity value: {}", value))?;
            }
            "retrieval.explain" => {
                self.retrieval.explain = value
                    .parse()
                    .with_context(|| format!("Invalid explain value: {} (expected true or false)", value))?;
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `loregraph config show` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "graph.backend",
            "graph.uri",
            "graph.user",
            "graph.password",
            "graph.database",
            "graph.max_connections",
            "retrieval.max_entities_per_chunk",
            "retrieval.expansion_depth",
            "retrieval.max_relationships_per_entity",
            "retrieval.explain",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }
}
