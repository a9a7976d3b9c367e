//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, AuditConfig, ConfigError, DatabaseConfig, Environment,
    SnowflakeConfig, TelemetryConfig, DEFAULT_CONFIG_PATH,
};
