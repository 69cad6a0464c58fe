//! Shared configuration for the wisply CLI.
//!
//! TOML file + `WISPLY_` environment overrides, translated into
//! `wisply_core::CoreConfig` plus the database location and the router
//! seed list. The CLI adds flag-aware overrides on top -- core never
//! reads files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wisply_core::{CoreConfig, NewRouter};
use wisply_ros::ConnectOptions;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// SQLite database path (or a full `sqlite:` URL).
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub connection: ConnectionSection,

    #[serde(default)]
    pub enforcement: EnforcementSection,

    #[serde(default)]
    pub profiles: ProfilesSection,

    /// Routers to upsert into the database on `routers seed`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routers: Vec<RouterSeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            connection: ConnectionSection::default(),
            enforcement: EnforcementSection::default(),
            profiles: ProfilesSection::default(),
            routers: Vec::new(),
        }
    }
}

fn default_database() -> String {
    "wisply.db".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionSection {
    /// Per-operation device timeout. Small by default: batch flows walk
    /// routers sequentially and one dead device must not stall the rest.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_attempts")]
    pub attempts: u32,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            attempts: default_attempts(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    3
}

fn default_attempts() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnforcementSection {
    /// Restore target when a customer has no captured previous profile.
    #[serde(default = "default_restore_profile")]
    pub restore_profile: String,
    /// Retry backoff (seconds) for queued enforcement jobs.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: Vec<u64>,
}

impl Default for EnforcementSection {
    fn default() -> Self {
        Self {
            restore_profile: default_restore_profile(),
            retry_backoff_secs: default_retry_backoff(),
        }
    }
}

fn default_restore_profile() -> String {
    "default".into()
}

fn default_retry_backoff() -> Vec<u64> {
    vec![60, 180, 600]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfilesSection {
    /// Device-managed profiles ProfileSync never mirrors.
    #[serde(default = "default_system_profiles")]
    pub system: Vec<String>,
    /// Case-insensitive substrings identifying policy profiles to skip.
    #[serde(default = "default_policy_patterns")]
    pub policy_patterns: Vec<String>,
}

impl Default for ProfilesSection {
    fn default() -> Self {
        Self {
            system: default_system_profiles(),
            policy_patterns: default_policy_patterns(),
        }
    }
}

fn default_system_profiles() -> Vec<String> {
    vec!["default".into(), "default-encryption".into()]
}

fn default_policy_patterns() -> Vec<String> {
    vec!["isolir".into(), "speedtest".into()]
}

/// One router entry from the config file, applied with `routers seed`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouterSeed {
    pub name: String,
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub isolation_profile: Option<String>,
}

fn default_port() -> u16 {
    8728
}

// ── Loading ─────────────────────────────────────────────────────────

/// Default config file path (`~/.config/wisply/config.toml` on Linux).
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "wisply")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("wisply.toml"))
}

/// Load configuration from an explicit path, falling back to defaults
/// for anything unset. `WISPLY_*` environment variables override the
/// file, with `__` separating nesting levels (`WISPLY_DATABASE`,
/// `WISPLY_CONNECTION__TIMEOUT_SECS`, ...).
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WISPLY_").split("__"))
        .extract()?;
    Ok(config)
}

/// Write a starter config file with the default values.
pub fn write_default(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, rendered)?;
    Ok(())
}

impl Config {
    /// Translate into the core crate's runtime configuration.
    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            connect: ConnectOptions {
                timeout: Duration::from_secs(self.connection.timeout_secs),
                attempts: self.connection.attempts,
            },
            restore_profile: self.enforcement.restore_profile.clone(),
            system_profiles: self.profiles.system.clone(),
            policy_patterns: self.profiles.policy_patterns.clone(),
            retry_backoff: self
                .enforcement
                .retry_backoff_secs
                .iter()
                .map(|&secs| Duration::from_secs(secs))
                .collect(),
        }
    }

    /// The database location as a sqlite URL.
    pub fn database_url(&self) -> String {
        if self.database.starts_with("sqlite:") {
            self.database.clone()
        } else {
            format!("sqlite://{}", self.database)
        }
    }

    /// Seed entries as insertable router records.
    pub fn seed_routers(&self) -> Vec<NewRouter> {
        self.routers
            .iter()
            .map(|seed| NewRouter {
                name: seed.name.clone(),
                address: seed.address.clone(),
                port: seed.port,
                username: seed.username.clone(),
                password: SecretString::from(seed.password.clone()),
                isolation_profile: seed.isolation_profile.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_file_is_missing() {
        let config = load(Path::new("/nonexistent/wisply.toml")).unwrap();
        assert_eq!(config.database, "wisply.db");
        assert_eq!(config.connection.timeout_secs, 3);
        assert_eq!(config.enforcement.restore_profile, "default");
        assert!(config.routers.is_empty());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database = "/var/lib/wisply/wisply.db"

[connection]
timeout_secs = 5
attempts = 1

[enforcement]
restore_profile = "Paket-10M"

[profiles]
policy_patterns = ["isolir", "speedtest", "trial"]

[[routers]]
name = "core-01"
address = "10.0.0.1"
username = "api"
password = "hunter2"
isolation_profile = "ISOLIR"
"#
        )
        .unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.database, "/var/lib/wisply/wisply.db");
        assert_eq!(config.database_url(), "sqlite:///var/lib/wisply/wisply.db");
        assert_eq!(config.connection.timeout_secs, 5);
        assert_eq!(config.connection.attempts, 1);

        let core = config.core_config();
        assert_eq!(core.restore_profile, "Paket-10M");
        assert_eq!(core.connect.timeout, Duration::from_secs(5));
        assert!(core.is_policy_profile("Trial-7d"));

        let seeds = config.seed_routers();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].name, "core-01");
        assert_eq!(seeds[0].port, 8728);
        assert_eq!(seeds[0].isolation_profile.as_deref(), Some("ISOLIR"));
    }

    #[test]
    fn starter_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_default(&path).unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.connection.attempts, 2);
    }
}
