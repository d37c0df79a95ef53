//! Configuration loading and root folder resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CREATORHUB_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "creatorhub.db";

/// Default listen address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5810";

/// Default transactional email endpoint
pub const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";

/// Upper bound on failed emails examined per retry run
pub const MAX_RETRY_BATCH: u32 = 50;

/// Contents of `config.toml`
///
/// Every field is optional; missing fields fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<String>,
    pub bind_address: Option<String>,
    pub public_base_url: Option<String>,
    pub allow_test_data: Option<bool>,
    pub logging: LoggingConfig,
    pub email: EmailConfig,
    pub scheduler: SchedulerConfig,
    pub auth: AuthConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing directive (overridden by RUST_LOG)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[email]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub api_url: String,
    /// Without a key, messages are logged instead of delivered
    pub api_key: Option<String>,
    pub from_address: String,
    pub max_retries: u32,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_EMAIL_API_URL.to_string(),
            api_key: None,
            from_address: "Creator Hub <no-reply@creatorhub.local>".to_string(),
            max_retries: 3,
        }
    }
}

/// `[scheduler]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between email retry runs (0 disables the scheduler)
    pub retry_interval_secs: u64,
    /// Maximum failed rows examined per run, clamped to 1..=50
    pub batch_size: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retry_interval_secs: 300,
            batch_size: MAX_RETRY_BATCH,
        }
    }
}

/// `[auth]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
    pub invitation_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24 * 7,
            invitation_ttl_hours: 72,
        }
    }
}

/// Command-line overrides collected by the binary
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<String>,
    pub config_path: Option<PathBuf>,
    pub bind_address: Option<String>,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub public_base_url: String,
    pub allow_test_data: bool,
    pub log_level: String,
    pub email: EmailConfig,
    pub scheduler: SchedulerConfig,
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Merge CLI, environment and TOML sources
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let toml_config = match &cli.config_path {
            Some(path) => load_toml_config(path)?,
            None => match default_config_path() {
                Some(path) => load_toml_config(&path)?,
                None => TomlConfig::default(),
            },
        };
        Ok(Self::from_sources(cli, &toml_config, |key| std::env::var(key).ok()))
    }

    /// Merge sources with an injectable environment lookup
    pub fn from_sources<F>(cli: &CliOverrides, toml_config: &TomlConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let root_folder = cli
            .root_folder
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| env(ROOT_FOLDER_ENV).map(PathBuf::from))
            .or_else(|| toml_config.root_folder.as_ref().map(PathBuf::from))
            .unwrap_or_else(default_root_folder);

        let bind_address = cli
            .bind_address
            .clone()
            .or_else(|| env("CREATORHUB_BIND"))
            .or_else(|| toml_config.bind_address.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let public_base_url = env("CREATORHUB_PUBLIC_URL")
            .or_else(|| toml_config.public_base_url.clone())
            .unwrap_or_else(|| format!("http://{}", bind_address));

        let mut email = toml_config.email.clone();
        if let Some(key) = env("CREATORHUB_EMAIL_API_KEY") {
            email.api_key = Some(key);
        }
        if let Some(url) = env("CREATORHUB_EMAIL_API_URL") {
            email.api_url = url;
        }
        if let Some(from) = env("CREATORHUB_EMAIL_FROM") {
            email.from_address = from;
        }
        email.api_key = email.api_key.filter(|k| !k.trim().is_empty());

        Self {
            root_folder,
            bind_address,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            allow_test_data: toml_config.allow_test_data.unwrap_or(false),
            log_level: toml_config.logging.level.clone(),
            email,
            scheduler: SchedulerConfig {
                batch_size: clamp_batch_size(toml_config.scheduler.batch_size),
                ..toml_config.scheduler.clone()
            },
            auth: toml_config.auth.clone(),
        }
    }

    /// Root folder helper for the resolved configuration
    pub fn root(&self) -> RootFolder {
        RootFolder::new(self.root_folder.clone())
    }
}

fn clamp_batch_size(requested: u32) -> u32 {
    let batch_size = requested.clamp(1, MAX_RETRY_BATCH);
    if batch_size != requested {
        tracing::warn!(
            requested,
            batch_size,
            "scheduler.batch_size out of range, clamped"
        );
    }
    batch_size
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// First existing config file: user config dir, then /etc
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("creatorhub").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/creatorhub/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("creatorhub"))
        .unwrap_or_else(|| PathBuf::from("./creatorhub_data"))
}

/// Paths derived from the root folder
#[derive(Debug, Clone)]
pub struct RootFolder {
    path: PathBuf,
}

impl RootFolder {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the root folder and the storage folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.path)?;
        std::fs::create_dir_all(self.storage_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.path.join(DATABASE_FILE)
    }

    /// Base folder for storage buckets
    pub fn storage_path(&self) -> PathBuf {
        self.path.join("storage")
    }
}
