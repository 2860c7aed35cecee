// Core structs: PricePoint, PriceLevel, ClassificationResult, cache values and errors
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A usable day series always has exactly this many points.
pub const HOURS_PER_DAY: usize = 24;

/// One hourly price sample as delivered by the price provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub day: NaiveDate,
    pub hour: u32,
    pub price: f64,
}

impl PricePoint {
    pub fn slot(&self) -> HourSlot {
        HourSlot {
            day: self.day,
            hour: self.hour,
        }
    }
}

/// Ordered hourly samples of a single calendar day.
pub type PriceSeries = Vec<PricePoint>;

/// Identifies an hour across day boundaries. Ordered by day, then hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HourSlot {
    pub day: NaiveDate,
    pub hour: u32,
}

impl fmt::Display for HourSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:00", self.day.format("%Y-%m-%d"), self.hour)
    }
}

/// Every price level published as a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceLevel {
    CheapestHour,
    Cheapest4Hours,
    Cheapest5Hours,
    Cheapest6Hours,
    Cheapest7Hours,
    Cheapest8Hours,
    #[serde(rename = "cheapest5HoursConsec")]
    Cheapest5HoursConsec,
    PriciestHour,
}

impl PriceLevel {
    pub const ALL: [PriceLevel; 8] = [
        PriceLevel::CheapestHour,
        PriceLevel::Cheapest4Hours,
        PriceLevel::Cheapest5Hours,
        PriceLevel::Cheapest6Hours,
        PriceLevel::Cheapest7Hours,
        PriceLevel::Cheapest8Hours,
        PriceLevel::Cheapest5HoursConsec,
        PriceLevel::PriciestHour,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PriceLevel::CheapestHour => "cheapestHour",
            PriceLevel::Cheapest4Hours => "cheapest4Hours",
            PriceLevel::Cheapest5Hours => "cheapest5Hours",
            PriceLevel::Cheapest6Hours => "cheapest6Hours",
            PriceLevel::Cheapest7Hours => "cheapest7Hours",
            PriceLevel::Cheapest8Hours => "cheapest8Hours",
            PriceLevel::Cheapest5HoursConsec => "cheapest5HoursConsec",
            PriceLevel::PriciestHour => "priciestHour",
        }
    }

    /// Index into the ascending-sorted day prices that bounds a threshold level.
    /// `None` for levels that are not simple thresholds.
    pub fn threshold_rank(self) -> Option<usize> {
        match self {
            PriceLevel::CheapestHour => Some(0),
            PriceLevel::Cheapest4Hours => Some(3),
            PriceLevel::Cheapest5Hours => Some(4),
            PriceLevel::Cheapest6Hours => Some(5),
            PriceLevel::Cheapest7Hours => Some(6),
            PriceLevel::Cheapest8Hours => Some(7),
            PriceLevel::Cheapest5HoursConsec | PriceLevel::PriciestHour => None,
        }
    }
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Level memberships of one day plus its median price.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub day: NaiveDate,
    pub levels: BTreeMap<PriceLevel, BTreeSet<u32>>,
    pub median: f64,
}

impl ClassificationResult {
    pub fn hours(&self, level: PriceLevel) -> Vec<u32> {
        self.levels
            .get(&level)
            .map(|hours| hours.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, level: PriceLevel, hour: u32) -> bool {
        self.levels
            .get(&level)
            .is_some_and(|hours| hours.contains(&hour))
    }
}

/// Price zones served by the Elering NPS API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Area {
    Ee,
    Lv,
    Lt,
    Fi,
}

impl Area {
    pub fn code(self) -> &'static str {
        match self {
            Area::Ee => "ee",
            Area::Lv => "lv",
            Area::Lt => "lt",
            Area::Fi => "fi",
        }
    }

    pub fn timezone(self) -> Tz {
        match self {
            Area::Ee => chrono_tz::Europe::Tallinn,
            Area::Lv => chrono_tz::Europe::Riga,
            Area::Lt => chrono_tz::Europe::Vilnius,
            Area::Fi => chrono_tz::Europe::Helsinki,
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Area {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ee" => Ok(Area::Ee),
            "lv" => Ok(Area::Lv),
            "lt" => Ok(Area::Lt),
            "fi" => Ok(Area::Fi),
            other => Err(format!("invalid area code '{}'", other)),
        }
    }
}

impl TryFrom<String> for Area {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Value stored under a cache key: a day series or a control value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CacheValue {
    Series(PriceSeries),
    Precision(u32),
    Area(Area),
    Flag(bool),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalyzerError {
    #[error("insufficient price data: expected {expected} points, got {actual}")]
    InsufficientData { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("corrupt cache value: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("no prices for area '{0}' in response")]
    MissingArea(Area),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Http(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
