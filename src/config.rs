use crate::analyzer::AnalyzerConfig;
use crate::model::{Area, ConfigError};
use serde::Deserialize;
use std::fs;

/// When the dual-day consecutive window is re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowPolicy {
    /// Only on the 07:00 tick.
    #[default]
    FixedHour,
    /// On any tick once the previous window has rolled out.
    Opportunistic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub area: Area,
    #[serde(default = "default_decimal_precision")]
    pub decimal_precision: u32,
    #[serde(default = "default_excessive_price_margin")]
    pub excessive_price_margin: u32,
    #[serde(default)]
    pub dynamic_cheapest_consecutive_hours: bool,
    #[serde(default = "default_priciest_top_multiplier")]
    pub priciest_top_multiplier: f64,
    #[serde(default)]
    pub consecutive_window_policy: WindowPolicy,
    #[serde(default = "default_consecutive_window_hours")]
    pub consecutive_window_hours: usize,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_price_api_url")]
    pub price_api_url: String,
    #[serde(default = "default_ticker_pulse_millis")]
    pub ticker_pulse_millis: u64,
}

/// The configuration dimensions that give cached prices their meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub decimal_precision: u32,
    pub area: Area,
}

fn default_decimal_precision() -> u32 {
    1
}

fn default_excessive_price_margin() -> u32 {
    200
}

fn default_priciest_top_multiplier() -> f64 {
    0.9
}

fn default_consecutive_window_hours() -> usize {
    5
}

fn default_db_path() -> String {
    "prices.db".into()
}

fn default_price_api_url() -> String {
    "https://dashboard.elering.ee".into()
}

fn default_ticker_pulse_millis() -> u64 {
    1000
}

impl AppConfig {
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            decimal_precision: self.decimal_precision,
            area: self.area,
        }
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            decimal_precision: self.decimal_precision,
            excessive_price_margin: self.excessive_price_margin,
            priciest_top_multiplier: self.priciest_top_multiplier,
            window_hours: self.consecutive_window_hours,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.decimal_precision > 6 {
            return Err(ConfigError::Invalid(format!(
                "decimalPrecision must be between 0 and 6, got {}",
                self.decimal_precision
            )));
        }
        if !self.priciest_top_multiplier.is_finite() || self.priciest_top_multiplier <= 0.0 {
            return Err(ConfigError::Invalid(
                "priciestTopMultiplier must be positive".into(),
            ));
        }
        if self.consecutive_window_hours == 0 || self.consecutive_window_hours > 24 {
            return Err(ConfigError::Invalid(format!(
                "consecutiveWindowHours must be between 1 and 24, got {}",
                self.consecutive_window_hours
            )));
        }
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
