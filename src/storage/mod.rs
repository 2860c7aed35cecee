// Storage module: TTL key/value store and the price cache built on it.

pub mod price_cache;
pub mod sqlite;

pub use price_cache::PriceCache;
pub use sqlite::SqliteCache;
