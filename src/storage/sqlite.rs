use crate::model::{CacheValue, StorageError};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// Key/value cache with per-entry TTL, persisted in SQLite.
///
/// Expiry is lazy: nothing sweeps the table, an entry read at or after its
/// deadline is deleted and reported as absent.
pub struct SqliteCache {
    conn: Connection,
}

impl SqliteCache {
    /// Opens the cache file, creating the table if needed.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        Self::init(Connection::open(db_path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT
            );
            ",
        )?;
        Ok(Self { conn })
    }

    /// Reads `key` as of `now`; expired entries are removed and read as absent.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CacheValue>, StorageError> {
        let row: Option<(String, Option<DateTime<Utc>>)> = self
            .conn
            .query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((raw, expires_at)) = row else {
            return Ok(None);
        };

        if let Some(deadline) = expires_at {
            if now >= deadline {
                self.remove(key)?;
                return Ok(None);
            }
        }

        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Inserts or replaces an entry; the TTL runs from `now`.
    pub fn set(
        &self,
        key: &str,
        value: &CacheValue,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(value)?;
        let expires_at = ttl.map(|ttl| now + ttl);
        self.conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, encoded, now, expires_at],
        )?;
        Ok(())
    }

    /// Returns whether an entry was deleted.
    pub fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let deleted = self
            .conn
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(deleted > 0)
    }

    /// Number of stored rows, expired ones included.
    #[cfg(test)]
    pub fn entry_count(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn entry_expires_lazily_on_read() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .set("2025-01-15", &CacheValue::Flag(true), Some(Duration::seconds(1)), t0())
            .unwrap();

        assert_eq!(cache.get("2025-01-15", t0()).unwrap(), Some(CacheValue::Flag(true)));
        // Still stored until someone reads it.
        assert_eq!(cache.entry_count().unwrap(), 1);

        let later = t0() + Duration::seconds(2);
        assert_eq!(cache.get("2025-01-15", later).unwrap(), None);
        assert_eq!(cache.entry_count().unwrap(), 0);
    }

    #[test]
    fn entry_without_ttl_never_expires() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.set("decimalPrecision", &CacheValue::Precision(2), None, t0()).unwrap();
        let much_later = t0() + Duration::days(365);
        assert_eq!(
            cache.get("decimalPrecision", much_later).unwrap(),
            Some(CacheValue::Precision(2))
        );
    }

    #[test]
    fn set_replaces_value_and_deadline() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .set("k", &CacheValue::Precision(1), Some(Duration::hours(1)), t0())
            .unwrap();
        let refreshed_at = t0() + Duration::minutes(50);
        cache
            .set("k", &CacheValue::Precision(2), Some(Duration::hours(1)), refreshed_at)
            .unwrap();

        let after_first_deadline = t0() + Duration::minutes(90);
        assert_eq!(
            cache.get("k", after_first_deadline).unwrap(),
            Some(CacheValue::Precision(2))
        );
    }

    #[test]
    fn remove_reports_deletion() {
        let cache = SqliteCache::in_memory().unwrap();
        assert!(!cache.remove("missing").unwrap());
        cache.set("k", &CacheValue::Flag(false), None, t0()).unwrap();
        assert!(cache.remove("k").unwrap());
        assert_eq!(cache.get("k", t0()).unwrap(), None);
    }
}
