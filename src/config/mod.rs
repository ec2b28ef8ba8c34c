use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection string, e.g. `sqlite:./data/cinedex.db?mode=rwc`
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite:./data/cinedex.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for session tokens. Generated at startup when empty.
    #[serde(default)]
    pub jwt_secret: String,
    /// Session token lifetime in seconds
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Account created on first start when the users table is empty
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    #[serde(default = "default_admin_name")]
    pub admin_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl_secs(),
            admin_email: None,
            admin_password: None,
            admin_name: default_admin_name(),
        }
    }
}

// Keep secrets out of debug output.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<redacted>"))
            .field("admin_name", &self.admin_name)
            .finish()
    }
}

fn default_token_ttl_secs() -> u64 {
    24 * 60 * 60
}

/// Ten years
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

impl AuthConfig {
    /// Session token lifetime, rejecting zero and anything past
    /// [`MAX_TOKEN_TTL_SECS`].
    pub fn token_ttl(&self) -> Result<Duration> {
        let secs = self.token_ttl_secs;
        if secs == 0 || secs > MAX_TOKEN_TTL_SECS {
            bail!(
                "token_ttl_secs must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_SECS,
                secs
            );
        }
        i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .with_context(|| format!("token_ttl_secs out of range: {}", secs))
    }
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding uploaded posters
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    /// Maximum accepted multipart body size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("./data/images")
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.auth
            .token_ttl()
            .context("Invalid [auth] configuration")?;
        Ok(())
    }

    /// Fill in a random signing secret when none was configured.
    ///
    /// Returns `true` if a secret had to be generated; tokens issued with it
    /// stop validating after a restart.
    pub fn ensure_jwt_secret(&mut self) -> bool {
        if !self.auth.jwt_secret.trim().is_empty() {
            return false;
        }
        self.auth.jwt_secret = format!(
            "{}{}",
            uuid::Uuid::new_v4().simple(),
            uuid::Uuid::new_v4().simple()
        );
        true
    }
}
