mod analyzer;
mod config;
mod model;
mod provider;
mod publisher;
mod storage;
mod tick;
mod utils;

use analyzer::WindowAnalyzer;
use chrono::{Timelike, Utc};
use config::{load_config, AppConfig};
use model::HourSlot;
use provider::EleringProvider;
use publisher::{LogPublisher, SensorPublisher, SensorSnapshot, TickerPulse};
use std::sync::Arc;
use storage::{PriceCache, SqliteCache};
use tick::{run_tick, PricingState};
use tokio::sync::{Mutex, Notify};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic occurred: {}", panic_info);
    }));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".into());
    let config: Arc<AppConfig> = match load_config(&config_path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error ({}): {}", config_path, e);
            return;
        }
    };

    let cache = match SqliteCache::new(&config.db_path) {
        Ok(store) => Arc::new(Mutex::new(PriceCache::new(store))),
        Err(e) => {
            error!("Failed to open price cache {}: {}", config.db_path, e);
            return;
        }
    };

    let provider = match EleringProvider::new(&config.price_api_url, config.decimal_precision) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to initialize price provider: {}", e);
            return;
        }
    };
    let analyzer = WindowAnalyzer::new(config.analyzer_config());
    let publisher = LogPublisher;
    let ticker = TickerPulse::new(Duration::from_millis(config.ticker_pulse_millis));

    let tz = config.area.timezone();
    let (system_offset, zone_offset) = utils::utc_offsets(tz, Utc::now());
    if system_offset != zone_offset {
        warn!(
            "Host clock is UTC{:+}h but {} prices use {} (UTC{:+}h); hours follow the price area",
            system_offset / 3600,
            config.area,
            tz,
            zone_offset / 3600
        );
    }

    let refresh_notify = Arc::new(Notify::new());
    spawn_refresh_listener(refresh_notify.clone());

    info!(
        "Started for {} area (precision {}, dynamic window {})",
        config.area, config.decimal_precision, config.dynamic_cheapest_consecutive_hours
    );

    let mut state = PricingState::default();
    loop {
        let now = Utc::now().with_timezone(&tz);
        state = run_tick(state, &cache, &provider, &analyzer, &config, now).await;

        let slot = HourSlot {
            day: now.date_naive(),
            hour: now.hour(),
        };
        publisher.publish(&SensorSnapshot::from_state(&state, slot));
        ticker.pulse().await;

        let wait = utils::until_next_hour(&Utc::now().with_timezone(&tz));
        info!("Next tick in {}s", wait.as_secs());
        tokio::select! {
            _ = sleep(wait) => {
                info!("Hourly timer triggered.");
            }
            _ = refresh_notify.notified() => {
                info!("Manual refresh triggered.");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down.");
                break;
            }
        }
    }
}

/// SIGHUP forces an immediate tick.
#[cfg(unix)]
fn spawn_refresh_listener(notify: Arc<Notify>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                warn!("Cannot listen for SIGHUP: {}", e);
                return;
            }
        };
        while hangup.recv().await.is_some() {
            notify.notify_one();
        }
    });
}

#[cfg(not(unix))]
fn spawn_refresh_listener(_notify: Arc<Notify>) {}
