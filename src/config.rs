use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub supabase: SupabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Which data store backend to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Direct PostgreSQL connection
    #[default]
    Postgres,
    /// Hosted backend's REST data API
    Rest,
    /// In-process, not persisted
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

/// Hosted account & data service
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub service_key: String,
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for SupabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: String::new(),
            jwt_secret: String::new(),
            jwt_audience: default_jwt_audience(),
            timeout_secs: None,
        }
    }
}

fn default_jwt_audience() -> Option<String> { Some("authenticated".to_string()) }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with TUTOR_MATCH)
    /// 5. Well-known variables such as DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., TUTOR_MATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("TUTOR_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        apply_well_known_env(settings)?.try_deserialize()
    }
}

/// Override keys from the variables hosting platforms conventionally set
fn apply_well_known_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    const OVERRIDES: &[(&str, &str)] = &[
        ("DATABASE_URL", "database.url"),
        ("SUPABASE_URL", "supabase.url"),
        ("SUPABASE_SERVICE_KEY", "supabase.service_key"),
        ("SUPABASE_JWT_SECRET", "supabase.jwt_secret"),
        ("REDIS_URL", "cache.redis_url"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in OVERRIDES {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(*key, value)?;
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                "[server]\nhost = \"127.0.0.1\"\nport = 8080\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.store.backend, StoreBackend::Postgres);
        assert_eq!(settings.supabase.jwt_audience.as_deref(), Some("authenticated"));
        assert!(settings.cache.redis_url.is_none());
    }

    #[test]
    fn test_backend_names() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                "[server]\nhost = \"0.0.0.0\"\nport = 80\n[store]\nbackend = \"memory\"\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.store.backend, StoreBackend::Memory);
    }
}
