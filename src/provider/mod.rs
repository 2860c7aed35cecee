// Provider module: remote day-ahead price sources.

pub mod elering;

use crate::model::{Area, PricePoint, ProviderError};
use chrono::{DateTime, Utc};

pub use elering::EleringProvider;

#[async_trait::async_trait]
pub trait PriceProvider: Send + Sync {
    /// Hourly prices for today and, once published, tomorrow, in area-local time.
    async fn fetch(&self, area: Area, now: DateTime<Utc>) -> Result<Vec<PricePoint>, ProviderError>;
}
