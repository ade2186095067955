//! Configuration for Vizzy, read from `.vizzy/vizzy.toml`.
//!
//! Layered file → environment (`VIZZY_*`, including a project `.env`) → CLI.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3141
//! db_path = ".vizzy/gallery.db"
//! allowed_origin = "*"
//!
//! [storage]
//! limit_bytes = 21474836480
//!
//! [client]
//! server_url = "http://127.0.0.1:3141"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::gallery::ServerConfig;

pub const CONFIG_DIR: &str = ".vizzy";
pub const CONFIG_FILE: &str = "vizzy.toml";
pub const DEFAULT_PORT: u16 = 3141;
/// 20 GB.
pub const DEFAULT_STORAGE_LIMIT: u64 = 20 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Relative paths resolve against the project directory.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Origin allowed to call the API cross-origin; `*` for any.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("gallery.db")
}

fn default_allowed_origin() -> String {
    "*".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_limit_bytes")]
    pub limit_bytes: u64,
}

fn default_limit_bytes() -> u64 {
    DEFAULT_STORAGE_LIMIT
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            limit_bytes: default_limit_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_server_url")]
    pub server_url: String,
}

fn default_server_url() -> String {
    format!("http://127.0.0.1:{}", DEFAULT_PORT)
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
        }
    }
}

/// Parsed `vizzy.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VizzyToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub client: ClientSection,
}

impl VizzyToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse vizzy.toml")
    }

    /// Load `vizzy.toml` from `vizzy_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(vizzy_dir: &Path) -> Result<Self> {
        let config_path = vizzy_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize vizzy.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Overlay `VIZZY_*` variables from `lookup` onto the file values.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("VIZZY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("VIZZY_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid VIZZY_PORT '{}'", port))?;
        }
        if let Some(path) = lookup("VIZZY_DB_PATH") {
            self.server.db_path = PathBuf::from(path);
        }
        if let Some(origin) = lookup("VIZZY_ALLOWED_ORIGIN") {
            self.server.allowed_origin = origin;
        }
        if let Some(limit) = lookup("VIZZY_STORAGE_LIMIT") {
            self.storage.limit_bytes = limit
                .trim()
                .parse()
                .with_context(|| format!("Invalid VIZZY_STORAGE_LIMIT '{}'", limit))?;
        }
        if let Some(url) = lookup("VIZZY_SERVER_URL") {
            self.client.server_url = url;
        }
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.storage.limit_bytes == 0 {
            warnings.push("storage.limit_bytes is 0; usage will always read 0%".to_string());
        }
        if !self.client.server_url.starts_with("http://")
            && !self.client.server_url.starts_with("https://")
        {
            warnings.push(format!(
                "client.server_url '{}' should start with http:// or https://",
                self.client.server_url
            ));
        }
        if self.server.allowed_origin.trim().is_empty() {
            warnings.push("server.allowed_origin is empty; use \"*\" to allow any".to_string());
        }
        warnings
    }
}

/// CLI flags that override the file and environment.
#[derive(Debug, Clone, Default)]
pub struct ServerOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
}

/// Resolved configuration for one project directory.
#[derive(Debug, Clone)]
pub struct VizzyConfig {
    pub project_dir: PathBuf,
    pub vizzy_dir: PathBuf,
    pub toml: VizzyToml,
}

impl VizzyConfig {
    /// Load `.env`, `vizzy.toml` and the process environment for `project_dir`.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let dotenv = project_dir.join(".env");
        if dotenv.exists() {
            dotenvy::from_path(&dotenv)
                .with_context(|| format!("Failed to load {}", dotenv.display()))?;
            debug!(path = %dotenv.display(), "loaded environment file");
        }
        let mut config = Self::from_file(project_dir)?;
        config.toml.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// File layer only, without the environment.
    pub fn from_file(project_dir: PathBuf) -> Result<Self> {
        let vizzy_dir = project_dir.join(CONFIG_DIR);
        let toml = VizzyToml::load_or_default(&vizzy_dir)?;
        Ok(Self {
            project_dir,
            vizzy_dir,
            toml,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.vizzy_dir.join(CONFIG_FILE)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    /// Database path (CLI → env/file), resolved against the project directory.
    pub fn db_path(&self, cli: Option<&Path>) -> PathBuf {
        self.resolve(cli.unwrap_or(&self.toml.server.db_path))
    }

    pub fn server_config(&self, overrides: ServerOverrides) -> ServerConfig {
        ServerConfig {
            db_path: self.db_path(overrides.db_path.as_deref()),
            host: overrides
                .host
                .unwrap_or_else(|| self.toml.server.host.clone()),
            port: overrides.port.unwrap_or(self.toml.server.port),
            allowed_origin: self.toml.server.allowed_origin.clone(),
            storage_limit: self.toml.storage.limit_bytes,
        }
    }

    /// Server URL for client commands (CLI → env/file → default).
    pub fn server_url(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .unwrap_or_else(|| self.toml.client.server_url.clone())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

/// Per-user fallback directory when no project directory is given.
pub fn user_project_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("vizzy"))
        .unwrap_or_else(|| PathBuf::from("."))
}
