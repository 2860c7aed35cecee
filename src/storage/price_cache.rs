use crate::config::ConfigSnapshot;
use crate::model::{CacheValue, PriceSeries, StorageError, HOURS_PER_DAY};
use crate::storage::sqlite::SqliteCache;
use crate::utils::until_next_local_hour;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

pub const DECIMAL_PRECISION_KEY: &str = "decimalPrecision";
pub const AREA_KEY: &str = "area";
pub const CONSECUTIVE_UPDATED_KEY: &str = "5consecutiveUpdated";

/// Local hour at which the dual-day window flag expires.
pub const DUAL_DAY_REFRESH_HOUR: u32 = 7;

/// Day series outlive two calendar days so that today's prices fetched as
/// "tomorrow" yesterday are still around.
pub fn default_day_ttl() -> Duration {
    Duration::hours(48)
}

pub fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// A configuration dimension that invalidates cached prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigDimension {
    DecimalPrecision,
    Area,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changed: Vec<ConfigDimension>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn contains(&self, dimension: ConfigDimension) -> bool {
        self.changed.contains(&dimension)
    }
}

/// Day price series and control keys on top of the TTL store, plus the
/// invalidation rules tying them to the configuration.
pub struct PriceCache {
    store: SqliteCache,
    day_ttl: Duration,
}

impl PriceCache {
    pub fn new(store: SqliteCache) -> Self {
        Self {
            store,
            day_ttl: default_day_ttl(),
        }
    }

    #[cfg(test)]
    pub fn with_day_ttl(mut self, ttl: Duration) -> Self {
        self.day_ttl = ttl;
        self
    }

    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheValue>, StorageError> {
        self.store.get(key, now)
    }

    /// Stores `value`; without an explicit TTL the day TTL applies. Rewriting
    /// a key always restarts its TTL.
    pub fn set(
        &self,
        key: &str,
        value: &CacheValue,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.store
            .set(key, value, Some(ttl.unwrap_or(self.day_ttl)), now)
    }

    pub fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.store.remove(key)
    }

    pub fn series(
        &self,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<PriceSeries>, StorageError> {
        match self.get(&day_key(day), now)? {
            Some(CacheValue::Series(series)) => Ok(Some(series)),
            _ => Ok(None),
        }
    }

    pub fn store_series(
        &self,
        day: NaiveDate,
        series: PriceSeries,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        debug!("Caching {} prices for {}", series.len(), day);
        self.set(&day_key(day), &CacheValue::Series(series), None, now)
    }

    /// True unless a complete day series is cached for `day`.
    pub fn is_stale_for_day(&self, day: NaiveDate, now: DateTime<Utc>) -> Result<bool, StorageError> {
        Ok(!self
            .series(day, now)?
            .is_some_and(|series| series.len() == HOURS_PER_DAY))
    }

    /// Compares the persisted control values with `snapshot`. A missing
    /// control value counts as changed.
    pub fn config_changed(
        &self,
        snapshot: &ConfigSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ChangeSet, StorageError> {
        let mut changes = ChangeSet::default();
        if self.get(DECIMAL_PRECISION_KEY, now)?
            != Some(CacheValue::Precision(snapshot.decimal_precision))
        {
            changes.changed.push(ConfigDimension::DecimalPrecision);
        }
        if self.get(AREA_KEY, now)? != Some(CacheValue::Area(snapshot.area)) {
            changes.changed.push(ConfigDimension::Area);
        }
        Ok(changes)
    }

    /// Evicts today, tomorrow and the window flag, then records `snapshot`.
    pub fn apply_config_change(
        &self,
        changes: &ChangeSet,
        today: NaiveDate,
        snapshot: &ConfigSnapshot,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        info!("Configuration changed ({:?}), evicting cached prices", changes.changed);
        self.remove(&day_key(today))?;
        if let Some(tomorrow) = today.succ_opt() {
            self.remove(&day_key(tomorrow))?;
        }
        self.remove(CONSECUTIVE_UPDATED_KEY)?;
        self.persist_controls(snapshot, now)
    }

    /// Re-sets the control keys, restarting their TTL alongside fresh data.
    pub fn persist_controls(
        &self,
        snapshot: &ConfigSnapshot,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.set(
            DECIMAL_PRECISION_KEY,
            &CacheValue::Precision(snapshot.decimal_precision),
            None,
            now,
        )?;
        self.set(AREA_KEY, &CacheValue::Area(snapshot.area), None, now)
    }

    pub fn consecutive_updated(&self, now: DateTime<Utc>) -> Result<bool, StorageError> {
        Ok(matches!(
            self.get(CONSECUTIVE_UPDATED_KEY, now)?,
            Some(CacheValue::Flag(true))
        ))
    }

    /// Marks the dual-day window as chosen until the next 07:00 local time.
    pub fn mark_consecutive_updated(&self, local_now: &DateTime<Tz>) -> Result<(), StorageError> {
        let ttl = until_next_local_hour(local_now, DUAL_DAY_REFRESH_HOUR);
        self.set(
            CONSECUTIVE_UPDATED_KEY,
            &CacheValue::Flag(true),
            Some(ttl),
            local_now.with_timezone(&Utc),
        )
    }
}
