// Publisher module: hands the current hour's levels to the sensor side.

pub mod pulse;

use crate::model::{HourSlot, PriceLevel};
use crate::tick::PricingState;
use tracing::info;

pub use pulse::TickerPulse;

/// State of every sensor for one hour.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    pub slot: HourSlot,
    pub current_price: Option<f64>,
    pub median: Option<f64>,
    pub levels: Vec<(PriceLevel, bool)>,
}

impl SensorSnapshot {
    pub fn from_state(state: &PricingState, slot: HourSlot) -> Self {
        let levels = PriceLevel::ALL
            .iter()
            .map(|level| (*level, state.is_active(*level, slot)))
            .collect();
        Self {
            slot,
            current_price: state.current_price,
            median: state
                .classification
                .as_ref()
                .filter(|c| c.day == slot.day)
                .map(|c| c.median),
            levels,
        }
    }

    #[cfg(test)]
    pub fn is_active(&self, level: PriceLevel) -> bool {
        self.levels
            .iter()
            .any(|(candidate, active)| *candidate == level && *active)
    }
}

pub trait SensorPublisher {
    fn publish(&self, snapshot: &SensorSnapshot);
}

/// Writes sensor states to the log.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl SensorPublisher for LogPublisher {
    fn publish(&self, snapshot: &SensorSnapshot) {
        match snapshot.current_price {
            Some(price) => info!("[{}] currentPrice = {}", snapshot.slot, price),
            None => info!("[{}] currentPrice unavailable", snapshot.slot),
        }
        for (level, active) in &snapshot.levels {
            info!(
                "[{}] {} = {}",
                snapshot.slot,
                level,
                if *active { "detected" } else { "not detected" }
            );
        }
    }
}
