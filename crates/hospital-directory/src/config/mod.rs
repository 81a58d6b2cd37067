use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::directory::{DirectoryPolicy, EmailUniqueness, RejectPolicy};

const DEFAULT_DATABASE_PATH: &str = "hospital_directory.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub directory: DirectoryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(value) => LogFormat::parse(&value).ok_or(ConfigError::InvalidLogFormat { value })?,
            Err(_) => LogFormat::Compact,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            store: StoreConfig::from_env()?,
            directory: DirectoryConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing output controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Which directory store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "memory" | "in-memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
    pub busy_timeout: Duration,
}

impl StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = match env::var("DIRECTORY_STORE") {
            Ok(value) => {
                StoreBackend::parse(&value).ok_or(ConfigError::InvalidStoreBackend { value })?
            }
            Err(_) => StoreBackend::Sqlite,
        };

        let path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATABASE_PATH));

        let busy_timeout = match env::var("DATABASE_BUSY_TIMEOUT_MS") {
            Ok(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidBusyTimeout { value })?,
            Err(_) => Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        };

        Ok(Self {
            backend,
            path,
            busy_timeout,
        })
    }
}

/// Moderation policy and administrator access.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub reject_policy: RejectPolicy,
    pub email: EmailUniqueness,
    pub seed_sample_data: bool,
    pub admin_api_key: Option<String>,
}

impl DirectoryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let reject_policy = match env::var("DIRECTORY_REJECT_POLICY") {
            Ok(value) => {
                RejectPolicy::parse(&value).ok_or(ConfigError::InvalidRejectPolicy { value })?
            }
            Err(_) => RejectPolicy::default(),
        };

        let email = if flag("DIRECTORY_UNIQUE_EMAIL", true)? {
            EmailUniqueness::Enforced
        } else {
            EmailUniqueness::Relaxed
        };

        let admin_api_key = env::var("ADMIN_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(Self {
            reject_policy,
            email,
            seed_sample_data: flag("DIRECTORY_SEED_SAMPLE_DATA", true)?,
            admin_api_key,
        })
    }

    pub fn policy(&self) -> DirectoryPolicy {
        DirectoryPolicy {
            reject: self.reject_policy,
            email: self.email,
        }
    }
}

fn flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Ok(value) = env::var(name) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { name, value }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat { value: String },
    InvalidStoreBackend { value: String },
    InvalidBusyTimeout { value: String },
    InvalidRejectPolicy { value: String },
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat { value } => {
                write!(f, "APP_LOG_FORMAT '{value}' must be compact or pretty")
            }
            ConfigError::InvalidStoreBackend { value } => {
                write!(f, "DIRECTORY_STORE '{value}' must be sqlite or memory")
            }
            ConfigError::InvalidBusyTimeout { value } => write!(
                f,
                "DATABASE_BUSY_TIMEOUT_MS '{value}' must be a whole number of milliseconds"
            ),
            ConfigError::InvalidRejectPolicy { value } => {
                write!(f, "DIRECTORY_REJECT_POLICY '{value}' must be retain or delete")
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} '{value}' must be true or false")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "DIRECTORY_STORE",
            "DATABASE_PATH",
            "DATABASE_BUSY_TIMEOUT_MS",
            "DIRECTORY_REJECT_POLICY",
            "DIRECTORY_UNIQUE_EMAIL",
            "DIRECTORY_SEED_SAMPLE_DATA",
            "ADMIN_API_KEY",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.path, PathBuf::from("hospital_directory.db"));
        assert_eq!(config.store.busy_timeout, Duration::from_secs(5));
        assert_eq!(config.directory.reject_policy, RejectPolicy::Retain);
        assert_eq!(config.directory.email, EmailUniqueness::Enforced);
        assert!(config.directory.seed_sample_data);
        assert_eq!(config.directory.admin_api_key, None);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_directory_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DIRECTORY_STORE", "memory");
        env::set_var("DIRECTORY_REJECT_POLICY", "delete");
        env::set_var("DIRECTORY_UNIQUE_EMAIL", "false");
        env::set_var("DIRECTORY_SEED_SAMPLE_DATA", "no");
        env::set_var("ADMIN_API_KEY", "  s3cret ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(
            config.directory.policy(),
            DirectoryPolicy {
                reject: RejectPolicy::Delete,
                email: EmailUniqueness::Relaxed,
            }
        );
        assert!(!config.directory.seed_sample_data);
        assert_eq!(config.directory.admin_api_key.as_deref(), Some("s3cret"));
        reset_env();
    }

    #[test]
    fn blank_admin_key_is_treated_as_unset() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("ADMIN_API_KEY", "   ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.directory.admin_api_key, None);
        reset_env();
    }

    #[test]
    fn rejects_unknown_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("DIRECTORY_REJECT_POLICY", "archive");
        let err = AppConfig::load().expect_err("unknown policy");
        assert!(matches!(err, ConfigError::InvalidRejectPolicy { .. }));

        reset_env();
        env::set_var("DIRECTORY_UNIQUE_EMAIL", "maybe");
        let err = AppConfig::load().expect_err("unknown flag");
        assert_eq!(
            err.to_string(),
            "DIRECTORY_UNIQUE_EMAIL 'maybe' must be true or false"
        );

        reset_env();
        env::set_var("DATABASE_BUSY_TIMEOUT_MS", "-1");
        let err = AppConfig::load().expect_err("negative timeout");
        assert!(matches!(err, ConfigError::InvalidBusyTimeout { .. }));
        reset_env();
    }
}
