use chrono::Duration as ChronoDuration;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub scan: ScanConfig,
    pub render: RenderConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Thumbnail size requested with every variant detail call.
    pub image_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Cooldown after every deep scan before the next one may start.
    pub scan_delay_ms: u64,
    /// Minimum gap between successive variant detail requests.
    pub inner_scan_delay_ms: u64,
    pub rescan_interval_hours: u64,
    pub max_variants_scanned: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub new_period_minutes: u64,
    pub hidden_opacity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://vineyard.db".to_string(),
                max_connections: 5,
            },
            api: ApiConfig {
                base_url: "https://www.amazon.com".to_string(),
                user_agent: "Vineyard/0.1".to_string(),
                image_size: 180,
            },
            scan: ScanConfig {
                scan_delay_ms: 1000,
                inner_scan_delay_ms: 0,
                rescan_interval_hours: 24 * 14,
                max_variants_scanned: 1,
            },
            render: RenderConfig {
                new_period_minutes: 30,
                hidden_opacity: 0.3,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: None,
            },
        }
    }
}

impl ScanConfig {
    pub fn scan_delay(&self) -> Duration {
        Duration::from_millis(self.scan_delay_ms)
    }

    pub fn inner_scan_delay(&self) -> Duration {
        Duration::from_millis(self.inner_scan_delay_ms)
    }

    pub fn rescan_interval(&self) -> ChronoDuration {
        ChronoDuration::hours(self.rescan_interval_hours as i64)
    }
}

impl RenderConfig {
    pub fn new_period(&self) -> ChronoDuration {
        ChronoDuration::minutes(self.new_period_minutes as i64)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let defaults = AppConfig::default();

        let s = Config::builder()
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections)?
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.user_agent", defaults.api.user_agent)?
            .set_default("api.image_size", defaults.api.image_size)?
            .set_default("scan.scan_delay_ms", defaults.scan.scan_delay_ms)?
            .set_default("scan.inner_scan_delay_ms", defaults.scan.inner_scan_delay_ms)?
            .set_default("scan.rescan_interval_hours", defaults.scan.rescan_interval_hours)?
            .set_default("scan.max_variants_scanned", defaults.scan.max_variants_scanned as u64)?
            .set_default("render.new_period_minutes", defaults.render.new_period_minutes)?
            .set_default("render.hidden_opacity", defaults.render.hidden_opacity as f64)?
            .set_default("logging.level", defaults.logging.level)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, ignored by git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("VINEYARD").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("Database max_connections must be greater than 0".into()));
        }

        if Url::parse(&self.api.base_url).is_err() {
            return Err(ConfigError::Message("Invalid API base URL format".into()));
        }

        if self.api.image_size == 0 {
            return Err(ConfigError::Message("API image_size must be greater than 0".into()));
        }

        if self.scan.rescan_interval_hours == 0 {
            return Err(ConfigError::Message("Scan rescan_interval_hours must be greater than 0".into()));
        }

        if !(self.render.hidden_opacity > 0.0 && self.render.hidden_opacity <= 1.0) {
            return Err(ConfigError::Message("Render hidden_opacity must be in (0, 1]".into()));
        }

        Ok(())
    }
}
