use crate::model::{Area, PricePoint, ProviderError};
use crate::provider::PriceProvider;
use crate::utils::round_to;
use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, TimeZone, Timelike, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct NpsResponse {
    data: HashMap<String, Vec<NpsPrice>>,
}

#[derive(Debug, Deserialize)]
struct NpsPrice {
    timestamp: i64,
    price: f64,
}

/// Nord Pool spot prices through the Elering dashboard API.
pub struct EleringProvider {
    client: Client,
    base_url: String,
    decimal_precision: u32,
}

impl EleringProvider {
    pub fn new(base_url: impl Into<String>, decimal_precision: u32) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent("nordpool-levels/0.1")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| ProviderError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            decimal_precision,
        })
    }

    /// Query window: from 4 hours before the UTC day start, so the local
    /// midnight of eastern zones is covered, to the end of tomorrow (UTC).
    fn query_range(now: DateTime<Utc>) -> (String, String) {
        let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let start = day_start - Duration::hours(4);
        let end = day_start + Duration::days(2) - Duration::milliseconds(1);
        (
            start.to_rfc3339_opts(SecondsFormat::Millis, true),
            end.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }

    /// Converts raw EUR/MWh samples to area-local hourly points in cents/kWh.
    fn convert(&self, area: Area, raw: Vec<NpsPrice>) -> Vec<PricePoint> {
        let tz = area.timezone();
        raw.into_iter()
            .filter_map(|item| {
                let Some(utc) = Utc.timestamp_opt(item.timestamp, 0).single() else {
                    warn!("Skipping price with invalid timestamp {}", item.timestamp);
                    return None;
                };
                let local = utc.with_timezone(&tz);
                let price = if item.price < 0.0 {
                    0.0
                } else {
                    round_to(item.price / 10.0, self.decimal_precision)
                };
                Some(PricePoint {
                    day: local.date_naive(),
                    hour: local.hour(),
                    price,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl PriceProvider for EleringProvider {
    async fn fetch(&self, area: Area, now: DateTime<Utc>) -> Result<Vec<PricePoint>, ProviderError> {
        let url = format!("{}/api/nps/price", self.base_url.trim_end_matches('/'));
        let (start, end) = Self::query_range(now);
        info!("Fetching {} prices from {} ({} .. {})", area, url, start, end);

        let response = self
            .client
            .get(&url)
            .query(&[("start", start.as_str()), ("end", end.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Price API responded [{}]", status);
            return Err(ProviderError::Http(format!("HTTP {}", status)));
        }

        let mut body: NpsResponse = response.json().await?;
        let raw = body
            .data
            .remove(area.code())
            .ok_or(ProviderError::MissingArea(area))?;
        debug!("Received {} raw price samples", raw.len());

        Ok(self.convert(area, raw))
    }
}
