// Analyzer module: price level classification and cheapest-window selection.

pub mod consecutive;
pub mod price_levels;

use crate::model::{AnalyzerError, ClassificationResult, HourSlot, PricePoint};

pub use consecutive::cheapest_consecutive_window;
pub use price_levels::classify_day;

/// Tunables for the level classification.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Decimal places prices and the median are rounded to before comparing.
    pub decimal_precision: u32,
    /// Percent of the median above which an hour counts as priciest.
    pub excessive_price_margin: u32,
    /// Share of the day's maximum above which an hour counts as priciest.
    pub priciest_top_multiplier: f64,
    /// Length of the contiguous cheapest window.
    pub window_hours: usize,
}

/// Trait defining the interface for a price window analyzer.
pub trait Analyzer {
    fn classify_day(&self, series: &[PricePoint]) -> Result<ClassificationResult, AnalyzerError>;
    fn cheapest_window(&self, span: &[PricePoint]) -> Result<Vec<HourSlot>, AnalyzerError>;
}

/// Stateless analyzer bound to one configuration.
#[derive(Debug, Clone)]
pub struct WindowAnalyzer {
    config: AnalyzerConfig,
}

impl WindowAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }
}

impl Analyzer for WindowAnalyzer {
    fn classify_day(&self, series: &[PricePoint]) -> Result<ClassificationResult, AnalyzerError> {
        classify_day(series, &self.config)
    }

    fn cheapest_window(&self, span: &[PricePoint]) -> Result<Vec<HourSlot>, AnalyzerError> {
        cheapest_consecutive_window(span, self.config.window_hours)
    }
}
