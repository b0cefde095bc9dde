//! Configuration module for the engine.
//!
//! Loads YAML, interpolates environment references and validates every
//! section before anything is constructed from it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use apex_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! let risk = config.risk.risk_config();
//! let tick = config.monitor.tick_interval();
//! ```

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::services::RouterSettings;
use crate::backtest::BacktestConfig;
use crate::domain::advanced_orders::IcebergParams;
use crate::domain::execution_tactics::{PovParams, TwapParams, VwapParams};
use crate::domain::order_execution::OrderSide;
use crate::domain::risk_management::{RiskConfig, RiskLevel};
use crate::domain::shared::Symbol;
use crate::infrastructure::JsonSnapshotStore;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// Referenced environment variable is unset and has no default.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Risk limits.
    #[serde(default)]
    pub risk: RiskSettings,
    /// Smart order router tuning.
    #[serde(default)]
    pub routing: RouterSettings,
    /// Execution algorithm defaults.
    #[serde(default)]
    pub execution: ExecutionSettings,
    /// Market monitor cadence.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Backtest capital and costs.
    #[serde(default)]
    pub backtest: BacktestConfig,
    /// Snapshot persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Logging.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Risk preset plus optional per-field overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    /// Preset the limits start from.
    pub level: RiskLevel,
    /// Portfolio value the absolute daily loss limit is derived from.
    pub reference_portfolio_value: Decimal,
    /// Override for the per-position size cap.
    pub max_position_size: Option<Decimal>,
    /// Override for the absolute daily loss limit.
    pub max_daily_loss: Option<Decimal>,
    /// Override for the total risk cap.
    pub max_total_risk: Option<Decimal>,
    /// Override for the stop distance.
    pub stop_loss_percent: Option<Decimal>,
    /// Override for the target distance.
    pub take_profit_percent: Option<Decimal>,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            level: RiskLevel::Moderate,
            reference_portfolio_value: Decimal::from(10_000),
            max_position_size: None,
            max_daily_loss: None,
            max_total_risk: None,
            stop_loss_percent: None,
            take_profit_percent: None,
        }
    }
}

impl RiskSettings {
    /// Resolve the preset and apply overrides.
    #[must_use]
    pub fn risk_config(&self) -> RiskConfig {
        let mut config = RiskConfig::preset(self.level, self.reference_portfolio_value);
        if let Some(v) = self.max_position_size {
            config.max_position_size = v;
        }
        if let Some(v) = self.max_daily_loss {
            config.max_daily_loss = v;
        }
        if let Some(v) = self.max_total_risk {
            config.max_total_risk = v;
        }
        if let Some(v) = self.stop_loss_percent {
            config.stop_loss_percent = v;
        }
        if let Some(v) = self.take_profit_percent {
            config.take_profit_percent = v;
        }
        config
    }
}

/// Defaults applied when building execution and iceberg parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Seconds between TWAP slices.
    pub twap_interval_seconds: u32,
    /// VWAP bucket width in minutes.
    pub vwap_bucket_minutes: u32,
    /// VWAP participation rate.
    pub vwap_participation: Decimal,
    /// POV participation target.
    pub pov_participation: Decimal,
    /// Minimum seconds between POV slices.
    pub pov_min_interval_seconds: u32,
    /// POV window in minutes.
    pub pov_max_duration_minutes: u32,
    /// Iceberg visible-size variance.
    pub iceberg_variance: Decimal,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            twap_interval_seconds: 60,
            vwap_bucket_minutes: VwapParams::DEFAULT_BUCKET_MINUTES,
            vwap_participation: Decimal::new(1, 1),
            pov_participation: Decimal::new(5, 2),
            pov_min_interval_seconds: 60,
            pov_max_duration_minutes: 480,
            iceberg_variance: Decimal::new(1, 1),
        }
    }
}

impl ExecutionSettings {
    /// TWAP parameters with the configured interval.
    #[must_use]
    pub fn twap(
        &self,
        symbol: impl Into<Symbol>,
        side: OrderSide,
        total_amount: Decimal,
        duration_minutes: u32,
    ) -> TwapParams {
        TwapParams::new(
            symbol,
            side,
            total_amount,
            duration_minutes,
            self.twap_interval_seconds,
        )
    }

    /// VWAP parameters with the configured bucket width and participation.
    #[must_use]
    pub fn vwap(
        &self,
        symbol: impl Into<Symbol>,
        side: OrderSide,
        total_amount: Decimal,
        duration_minutes: u32,
    ) -> VwapParams {
        let mut params = VwapParams::new(symbol, side, total_amount, duration_minutes)
            .with_participation(self.vwap_participation);
        params.bucket_minutes = self.vwap_bucket_minutes;
        params
    }

    /// POV parameters with the configured target, spacing and window.
    #[must_use]
    pub fn pov(&self, symbol: impl Into<Symbol>, side: OrderSide, total_amount: Decimal) -> PovParams {
        let mut params = PovParams::new(symbol, side, total_amount)
            .with_participation(self.pov_participation)
            .with_min_interval(self.pov_min_interval_seconds);
        params.max_duration_minutes = self.pov_max_duration_minutes;
        params
    }

    /// Iceberg parameters with the configured variance.
    #[must_use]
    pub fn iceberg(
        &self,
        symbol: impl Into<Symbol>,
        side: OrderSide,
        total_amount: Decimal,
        display_size: Decimal,
    ) -> IcebergParams {
        IcebergParams::new(symbol, side, total_amount, display_size)
            .with_variance(self.iceberg_variance)
    }
}

/// Market monitor cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between ticks, 1 to 10.
    pub tick_interval_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: 5,
        }
    }
}

impl MonitorConfig {
    /// Tick interval as a duration.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }
}

/// Snapshot persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Write snapshots at all.
    pub enabled: bool,
    /// Directory snapshot files live in.
    pub snapshot_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            snapshot_dir: PathBuf::from("data/snapshots"),
        }
    }
}

impl PersistenceConfig {
    /// Snapshot store when persistence is enabled.
    #[must_use]
    pub fn store(&self) -> Option<JsonSnapshotStore> {
        self.enabled
            .then(|| JsonSnapshotStore::new(self.snapshot_dir.clone()))
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `json` or `pretty`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

/// Load configuration from a YAML file.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, an environment
/// reference cannot be resolved, or the result fails to parse or validate.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be interpolated, parsed, or
/// validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml)?;
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Replace `${VAR}` and `${VAR:-default}` with environment values.
///
/// An empty or unset variable takes its default; an unset variable without
/// one is an error.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    static ENV_VAR_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

    let Some(re) = ENV_VAR_REGEX
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").ok())
    else {
        return Err(ConfigError::ValidationError(
            "environment reference pattern failed to compile".to_string(),
        ));
    };

    let mut result = String::with_capacity(input.len());
    let mut last = 0;
    for cap in re.captures_iter(input) {
        let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match (std::env::var(var_name), default_value) {
            (Ok(v), _) if !v.is_empty() => v,
            (_, Some(default)) => default.to_string(),
            (Ok(v), None) => v,
            (Err(_), None) => return Err(ConfigError::MissingEnvVar(var_name.to_string())),
        };

        result.push_str(&input[last..full_match.start()]);
        result.push_str(&value);
        last = full_match.end();
    }
    result.push_str(&input[last..]);

    Ok(result)
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.risk.reference_portfolio_value <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "risk.reference_portfolio_value must be positive".to_string(),
        ));
    }
    config
        .risk
        .risk_config()
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("risk: {e}")))?;

    let routing = &config.routing;
    if routing.latency_window == 0 {
        return Err(ConfigError::ValidationError(
            "routing.latency_window must be positive".to_string(),
        ));
    }
    if routing.liquidity_reference <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "routing.liquidity_reference must be positive".to_string(),
        ));
    }
    if routing.reliability_decay <= Decimal::ZERO || routing.reliability_decay > Decimal::ONE {
        return Err(ConfigError::ValidationError(
            "routing.reliability_decay must be in (0, 1]".to_string(),
        ));
    }
    if routing.reliability_boost < Decimal::ONE {
        return Err(ConfigError::ValidationError(
            "routing.reliability_boost must be at least 1".to_string(),
        ));
    }
    if routing.reliability_floor < Decimal::ZERO || routing.reliability_floor > Decimal::ONE {
        return Err(ConfigError::ValidationError(
            "routing.reliability_floor must be between 0 and 1".to_string(),
        ));
    }

    let execution = &config.execution;
    if execution.twap_interval_seconds == 0 || execution.vwap_bucket_minutes == 0 {
        return Err(ConfigError::ValidationError(
            "execution intervals must be positive".to_string(),
        ));
    }
    for (field, rate) in [
        ("vwap_participation", execution.vwap_participation),
        ("pov_participation", execution.pov_participation),
    ] {
        if rate <= Decimal::ZERO || rate > Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "execution.{field} must be in (0, 1]"
            )));
        }
    }
    if execution.pov_max_duration_minutes == 0 {
        return Err(ConfigError::ValidationError(
            "execution.pov_max_duration_minutes must be positive".to_string(),
        ));
    }
    if execution.iceberg_variance < Decimal::ZERO || execution.iceberg_variance >= Decimal::ONE {
        return Err(ConfigError::ValidationError(
            "execution.iceberg_variance must be in [0, 1)".to_string(),
        ));
    }

    if !(1..=10).contains(&config.monitor.tick_interval_seconds) {
        return Err(ConfigError::ValidationError(
            "monitor.tick_interval_seconds must be between 1 and 10".to_string(),
        ));
    }

    config
        .backtest
        .validate()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    if config.persistence.enabled && config.persistence.snapshot_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "persistence.snapshot_dir must be set when persistence is enabled".to_string(),
        ));
    }

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    Ok(())
}
