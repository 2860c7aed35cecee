// Tick module: one hourly pass of cache check, optional fetch and classification.

pub mod policy;

use crate::analyzer::Analyzer;
use crate::config::AppConfig;
use crate::model::{
    ClassificationResult, HourSlot, PriceLevel, PricePoint, PriceSeries, HOURS_PER_DAY,
};
use crate::provider::PriceProvider;
use crate::storage::price_cache::{ConfigDimension, DUAL_DAY_REFRESH_HOUR};
use crate::storage::PriceCache;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use policy::{WindowAction, WindowContext};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Everything derived from the price data between ticks.
#[derive(Debug, Clone, Default)]
pub struct PricingState {
    pub day: Option<NaiveDate>,
    pub today: PriceSeries,
    pub classification: Option<ClassificationResult>,
    /// Cheapest contiguous window; may reach into tomorrow.
    pub window: Vec<HourSlot>,
    pub current_price: Option<f64>,
}

impl PricingState {
    fn classified_for(&self, day: NaiveDate) -> bool {
        self.classification.as_ref().is_some_and(|c| c.day == day)
    }

    fn window_ahead(&self, slot: HourSlot) -> bool {
        self.window.last().is_some_and(|last| *last >= slot)
    }

    /// Whether `level` applies to the hour identified by `slot`.
    pub fn is_active(&self, level: PriceLevel, slot: HourSlot) -> bool {
        match level {
            PriceLevel::Cheapest5HoursConsec => self.window.contains(&slot),
            _ => self
                .classification
                .as_ref()
                .is_some_and(|c| c.day == slot.day && c.contains(level, slot.hour)),
        }
    }
}

fn cached_series(cache: &PriceCache, day: NaiveDate, now: DateTime<Utc>) -> Option<PriceSeries> {
    match cache.series(day, now) {
        Ok(Some(series)) if series.len() == HOURS_PER_DAY => Some(series),
        Ok(Some(series)) => {
            warn!("Cached prices for {} have {} points, ignoring", day, series.len());
            None
        }
        Ok(None) => None,
        Err(e) => {
            warn!("Cache read for {} failed: {}", day, e);
            None
        }
    }
}

fn log_classification(result: &ClassificationResult) {
    for level in PriceLevel::ALL {
        let hours: Vec<String> = result.hours(level).iter().map(u32::to_string).collect();
        info!("{}: {}", level, hours.join(", "));
    }
    info!("Median price {}: {} cents", result.day, result.median);
}

/// Runs one tick against `state` and returns the updated state.
///
/// Failures never abort the tick: they are logged and the previous
/// classification stays in place for the next attempt.
pub async fn run_tick<A, P>(
    mut state: PricingState,
    cache: &Mutex<PriceCache>,
    provider: &P,
    analyzer: &A,
    config: &AppConfig,
    now: DateTime<Tz>,
) -> PricingState
where
    A: Analyzer,
    P: PriceProvider + ?Sized,
{
    let today = now.date_naive();
    let tomorrow = today.succ_opt();
    let hour = now.hour();
    let now_utc = now.with_timezone(&Utc);
    let snapshot = config.snapshot();

    // Held for the whole tick so overlapping ticks never see a half-written day.
    let cache = cache.lock().await;

    match cache.config_changed(&snapshot, now_utc) {
        Ok(changes) if !changes.is_empty() => {
            if changes.contains(ConfigDimension::Area) {
                info!("Price area is now {}", config.area);
            }
            if let Err(e) = cache.apply_config_change(&changes, today, &snapshot, now_utc) {
                warn!("Cache invalidation failed: {}", e);
            }
            state = PricingState::default();
        }
        Ok(_) => {}
        Err(e) => warn!("Config drift check failed: {}", e),
    }

    if state.day != Some(today) {
        state.day = Some(today);
        state.today.clear();
        state.current_price = None;
        // A window that ended before today belongs to a missed midnight.
        if !state.window.last().is_some_and(|last| last.day >= today) {
            state.window.clear();
        }
    }

    let cached_today = cached_series(&cache, today, now_utc);
    let has_today = cached_today.is_some();
    if let Some(series) = cached_today {
        state.today = series;
    }
    let has_tomorrow = match tomorrow.map(|day| cache.is_stale_for_day(day, now_utc)) {
        Some(Ok(stale)) => !stale,
        Some(Err(e)) => {
            warn!("Cache read for tomorrow failed: {}", e);
            false
        }
        None => false,
    };

    if policy::needs_fetch(hour, has_today, has_tomorrow) {
        match provider.fetch(config.area, now_utc).await {
            Ok(points) => {
                let (today_points, tomorrow_points): (Vec<PricePoint>, Vec<PricePoint>) = points
                    .into_iter()
                    .filter(|p| p.day == today || Some(p.day) == tomorrow)
                    .partition(|p| p.day == today);

                if today_points.len() == HOURS_PER_DAY {
                    info!("Pulled prices in {} area for today ({})", config.area, today);
                    if let Err(e) = cache.store_series(today, today_points.clone(), now_utc) {
                        warn!("Failed to cache today's prices: {}", e);
                    }
                    if let Err(e) = cache.persist_controls(&snapshot, now_utc) {
                        warn!("Failed to persist control keys: {}", e);
                    }
                    state.today = today_points;
                } else if !has_today {
                    warn!(
                        "Price data for today ({}) has {} points, expected {}",
                        today,
                        today_points.len(),
                        HOURS_PER_DAY
                    );
                }

                if let Some(day) = tomorrow {
                    if tomorrow_points.len() == HOURS_PER_DAY {
                        info!("Pulled prices in {} area for tomorrow ({})", config.area, day);
                        if let Err(e) = cache.store_series(day, tomorrow_points, now_utc) {
                            warn!("Failed to cache tomorrow's prices: {}", e);
                        }
                    } else {
                        debug!("Tomorrow's prices not published yet ({} points)", tomorrow_points.len());
                    }
                }
            }
            Err(e) => warn!("Failed to fetch prices, will retry next tick: {}", e),
        }
    }

    if state.today.len() != HOURS_PER_DAY {
        warn!(
            "Cannot classify {}: {} price points available (must be {})",
            today,
            state.today.len(),
            HOURS_PER_DAY
        );
        return state;
    }

    if policy::should_classify_day(hour, state.classified_for(today)) {
        match analyzer.classify_day(&state.today) {
            Ok(result) => {
                log_classification(&result);
                state.classification = Some(result);
            }
            Err(e) => warn!("Classification skipped: {}", e),
        }
    }

    let slot = HourSlot { day: today, hour };
    let already_updated = cache.consecutive_updated(now_utc).unwrap_or_else(|e| {
        warn!("Cannot read window flag: {}", e);
        false
    });
    let ctx = WindowContext {
        hour,
        has_window: !state.window.is_empty(),
        window_ahead: state.window_ahead(slot),
        dynamic: config.dynamic_cheapest_consecutive_hours,
        already_updated,
        policy: config.consecutive_window_policy,
    };

    match policy::window_action(&ctx) {
        WindowAction::Keep => {}
        WindowAction::TodayOnly => match analyzer.cheapest_window(&state.today) {
            Ok(window) => {
                info!("Cheapest consecutive hours: {}", format_window(&window));
                state.window = window;
            }
            Err(e) => warn!("Cheapest window skipped: {}", e),
        },
        WindowAction::DualDay => {
            let next = tomorrow.and_then(|day| cached_series(&cache, day, now_utc));
            let remaining = state.today.iter().filter(|p| p.hour >= hour).cloned();
            let span: Vec<PricePoint> = match &next {
                Some(next) => remaining
                    .chain(next.iter().filter(|p| p.hour < DUAL_DAY_REFRESH_HOUR).cloned())
                    .collect(),
                None => {
                    warn!("Tomorrow's prices not available, choosing from the rest of today");
                    remaining.collect()
                }
            };
            match analyzer.cheapest_window(&span) {
                Ok(window) => {
                    info!("Cheapest consecutive hours until {:02}:00 tomorrow: {}", DUAL_DAY_REFRESH_HOUR, format_window(&window));
                    state.window = window;
                    // Without tomorrow the flag stays unset so a later pass can reach past midnight.
                    if next.is_some() {
                        if let Err(e) = cache.mark_consecutive_updated(&now) {
                            warn!("Cannot persist window flag: {}", e);
                        }
                    }
                }
                Err(e) => warn!("Cheapest window skipped: {}", e),
            }
        }
    }

    state.current_price = state.today.iter().find(|p| p.hour == hour).map(|p| p.price);
    match state.current_price {
        Some(price) => info!("Current hour: {}; Price: {} cents", hour, price),
        None => warn!("Unable to determine current hour price"),
    }

    state
}

fn format_window(window: &[HourSlot]) -> String {
    window
        .iter()
        .map(HourSlot::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
