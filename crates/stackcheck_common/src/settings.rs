//! Stackcheck Settings
//!
//! Configuration lives in `stackcheck.toml` next to the project (optional).
//! Every section has defaults, so an absent file is equivalent to an empty one.
//!
//! Connection fields left unset in the TOML are filled from the project's env
//! file during [`Settings::resolve`]. The result is a frozen [`VerifyConfig`]
//! that the verification run receives at construction time. Nothing in the
//! run reads process-wide environment variables.

use crate::env_file::EnvRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default settings file name, relative to the working directory
pub const SETTINGS_FILE: &str = "stackcheck.toml";

/// Fixed port for the native Redis client
pub const REDIS_NATIVE_PORT: u16 = 6379;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// File locations used by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub env_file: PathBuf,
    pub init_script: PathBuf,
    pub audit_log: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(".env"),
            init_script: PathBuf::from("scripts/init-db.sql"),
            audit_log: PathBuf::from("error-logs/agent1-error.txt"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// psql executable (name on PATH or absolute path)
    pub psql_bin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    /// REST endpoint base URL, e.g. `https://example.upstash.io`
    pub url: Option<String>,
    pub token: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub psql_secs: u64,
    pub script_secs: u64,
    pub rest_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            psql_secs: 30,
            script_secs: 60,
            rest_secs: 10,
        }
    }
}

/// Contents of `stackcheck.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub postgres: PostgresSettings,
    pub redis: RedisSettings,
    pub timeouts: TimeoutSettings,
}

impl Settings {
    /// Load settings from `path`. A missing file yields defaults; an unreadable
    /// or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(path, &content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Freeze these settings into a run configuration, filling unset
    /// connection fields from `env` (which may be empty if the env file is
    /// missing).
    pub fn resolve(&self, env: &EnvRecord) -> VerifyConfig {
        let pg = &self.postgres;
        let postgres = PostgresTarget {
            host: pick(&pg.host, env, &["POSTGRES_HOST"]).unwrap_or_default(),
            port: pg
                .port
                .or_else(|| env.get_usable("POSTGRES_PORT").and_then(|p| p.parse().ok()))
                .unwrap_or(5432),
            database: pick(&pg.database, env, &["POSTGRES_DB", "POSTGRES_DATABASE"])
                .unwrap_or_else(|| "postgres".to_string()),
            user: pick(&pg.user, env, &["POSTGRES_USER"])
                .unwrap_or_else(|| "postgres".to_string()),
            password: Secret::new(
                pick(&pg.password, env, &["POSTGRES_PASSWORD"]).unwrap_or_default(),
            ),
            psql_bin: pg.psql_bin.clone().unwrap_or_else(|| "psql".to_string()),
        };

        let rd = &self.redis;
        let redis = RedisTarget {
            rest_url: pick(&rd.url, env, &["REDIS_URL", "UPSTASH_REDIS_REST_URL"])
                .unwrap_or_default(),
            token: Secret::new(
                pick(&rd.token, env, &["REDIS_TOKEN", "UPSTASH_REDIS_REST_TOKEN"])
                    .unwrap_or_default(),
            ),
            port: rd.port.unwrap_or(REDIS_NATIVE_PORT),
        };

        VerifyConfig {
            env_file: self.paths.env_file.clone(),
            init_script: self.paths.init_script.clone(),
            audit_log: self.paths.audit_log.clone(),
            postgres,
            redis,
            psql_timeout: Duration::from_secs(self.timeouts.psql_secs),
            script_timeout: Duration::from_secs(self.timeouts.script_secs),
            rest_timeout: Duration::from_secs(self.timeouts.rest_secs),
        }
    }
}

fn pick(explicit: &Option<String>, env: &EnvRecord, keys: &[&str]) -> Option<String> {
    explicit
        .clone()
        .or_else(|| keys.iter().find_map(|k| env.get_usable(k)).map(str::to_string))
}

/// A credential that never prints its value
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Where and how to reach PostgreSQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Secret,
    pub psql_bin: String,
}

/// Where and how to reach Redis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisTarget {
    pub rest_url: String,
    pub token: Secret,
    pub port: u16,
}

/// Everything a verification run needs, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyConfig {
    pub env_file: PathBuf,
    pub init_script: PathBuf,
    pub audit_log: PathBuf,
    pub postgres: PostgresTarget,
    pub redis: RedisTarget,
    pub psql_timeout: Duration,
    pub script_timeout: Duration,
    pub rest_timeout: Duration,
}
