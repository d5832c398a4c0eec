use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Order book depth requested for slippage estimation
    #[serde(default = "default_order_book_depth")]
    pub order_book_depth: u32,
    /// Warn when a manual limit price deviates from market by more than this (percent)
    #[serde(default = "default_price_deviation_warning_pct")]
    pub price_deviation_warning_pct: Decimal,
    /// Warn when estimated slippage exceeds this (percent)
    #[serde(default = "default_slippage_warning_pct")]
    pub slippage_warning_pct: Decimal,
}

fn default_order_book_depth() -> u32 {
    20
}

fn default_price_deviation_warning_pct() -> Decimal {
    dec!(5)
}

fn default_slippage_warning_pct() -> Decimal {
    dec!(1)
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            order_book_depth: default_order_book_depth(),
            price_deviation_warning_pct: default_price_deviation_warning_pct(),
            slippage_warning_pct: default_slippage_warning_pct(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for rolling file logs (disabled when unset)
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.max_connections", 5)?
            .set_default("execution.order_book_depth", 20)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("TRADEDESK_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (TRADEDESK_DATABASE__URL, etc.)
            .add_source(
                Environment::with_prefix("TRADEDESK")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.url.is_empty() {
            errors.push("database.url must be set".to_string());
        }

        if self.execution.order_book_depth == 0 {
            errors.push("execution.order_book_depth must be positive".to_string());
        }

        if self.execution.price_deviation_warning_pct < Decimal::ZERO {
            errors.push("execution.price_deviation_warning_pct must not be negative".to_string());
        }

        if self.execution.slippage_warning_pct < Decimal::ZERO {
            errors.push("execution.slippage_warning_pct must not be negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
