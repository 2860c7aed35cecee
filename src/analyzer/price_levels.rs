use crate::analyzer::consecutive::cheapest_window_start;
use crate::analyzer::AnalyzerConfig;
use crate::model::{AnalyzerError, ClassificationResult, PriceLevel, PricePoint, HOURS_PER_DAY};
use crate::utils::round_to;
use std::collections::{BTreeMap, BTreeSet};

/// Classifies every hour of a 24-point day series into the price levels.
///
/// All comparisons run on prices rounded to `decimal_precision`. Threshold
/// levels include every hour tied with the ranked price, so they may hold more
/// hours than their name says. Priciest hours never overlap the 8 cheapest.
pub fn classify_day(
    series: &[PricePoint],
    config: &AnalyzerConfig,
) -> Result<ClassificationResult, AnalyzerError> {
    if series.len() != HOURS_PER_DAY {
        return Err(AnalyzerError::InsufficientData {
            expected: HOURS_PER_DAY,
            actual: series.len(),
        });
    }
    let precision = config.decimal_precision;

    let prices: Vec<f64> = series.iter().map(|p| round_to(p.price, precision)).collect();
    let mut sorted = prices.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));

    // The median is rounded once, from the unrounded middle ranks.
    let mut raw: Vec<f64> = series.iter().map(|p| p.price).collect();
    raw.sort_by(|a, b| a.total_cmp(b));
    let median = round_to(
        (raw[HOURS_PER_DAY / 2 - 1] + raw[HOURS_PER_DAY / 2]) / 2.0,
        precision,
    );
    let top_floor = round_to(
        sorted[HOURS_PER_DAY - 1] * config.priciest_top_multiplier,
        precision,
    );
    let excessive_floor = round_to(
        median * f64::from(config.excessive_price_margin) / 100.0,
        precision,
    );

    let mut levels: BTreeMap<PriceLevel, BTreeSet<u32>> = PriceLevel::ALL
        .iter()
        .map(|level| (*level, BTreeSet::new()))
        .collect();

    // Hours are positions in the day, which keeps every set within 0..23.
    for (hour, &value) in (0u32..).zip(prices.iter()) {
        for level in PriceLevel::ALL {
            if let Some(rank) = level.threshold_rank() {
                if value <= sorted[rank] {
                    levels.entry(level).or_default().insert(hour);
                }
            }
        }

        let in_cheapest8 = value <= sorted[7];
        if !in_cheapest8 && (value >= top_floor || value >= excessive_floor) {
            levels.entry(PriceLevel::PriciestHour).or_default().insert(hour);
        }
    }

    let window_len = config.window_hours;
    let start = cheapest_window_start(&prices, window_len).ok_or(
        AnalyzerError::InsufficientData {
            expected: window_len,
            actual: prices.len(),
        },
    )?;
    levels
        .entry(PriceLevel::Cheapest5HoursConsec)
        .or_default()
        .extend((start..start + window_len).map(|h| h as u32));

    Ok(ClassificationResult {
        day: series[0].day,
        levels,
        median,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn series(prices: &[f64]) -> Vec<PricePoint> {
        (0u32..)
            .zip(prices.iter())
            .map(|(hour, &price)| PricePoint {
                day: day(),
                hour,
                price,
            })
            .collect()
    }

    fn config() -> AnalyzerConfig {
        AnalyzerConfig {
            decimal_precision: 1,
            excessive_price_margin: 200,
            priciest_top_multiplier: 0.9,
            window_hours: 5,
        }
    }

    fn fixture() -> Vec<f64> {
        let mut prices = vec![10.0; 4];
        prices.extend([1.0; 5]);
        prices.extend([20.0; 15]);
        prices
    }

    fn assert_nested(result: &ClassificationResult) {
        let chain = [
            PriceLevel::CheapestHour,
            PriceLevel::Cheapest4Hours,
            PriceLevel::Cheapest5Hours,
            PriceLevel::Cheapest6Hours,
            PriceLevel::Cheapest7Hours,
            PriceLevel::Cheapest8Hours,
        ];
        for pair in chain.windows(2) {
            let inner = &result.levels[&pair[0]];
            let outer = &result.levels[&pair[1]];
            assert!(inner.is_subset(outer), "{} not within {}", pair[0], pair[1]);
        }
        let cheap8 = &result.levels[&PriceLevel::Cheapest8Hours];
        let priciest = &result.levels[&PriceLevel::PriciestHour];
        assert!(cheap8.is_disjoint(priciest));
        for hours in result.levels.values() {
            assert!(hours.iter().all(|h| *h < 24));
        }
    }

    #[test]
    fn tied_cheapest_hours_are_all_included() {
        let result = classify_day(&series(&fixture()), &config()).unwrap();
        let cheap_block: Vec<u32> = (4..9).collect();

        assert_eq!(result.hours(PriceLevel::CheapestHour), cheap_block);
        assert_eq!(result.hours(PriceLevel::Cheapest4Hours), cheap_block);
        assert_eq!(result.hours(PriceLevel::Cheapest5Hours), cheap_block);
        assert_eq!(
            result.hours(PriceLevel::Cheapest6Hours),
            (0..9).collect::<Vec<u32>>()
        );
        assert_eq!(
            result.hours(PriceLevel::Cheapest8Hours),
            (0..9).collect::<Vec<u32>>()
        );
        assert_eq!(result.hours(PriceLevel::Cheapest5HoursConsec), cheap_block);
        assert_eq!(
            result.hours(PriceLevel::PriciestHour),
            (9..24).collect::<Vec<u32>>()
        );
        assert_eq!(result.median, 20.0);
        assert_nested(&result);
    }

    #[test]
    fn median_is_mean_of_middle_ranks() {
        let prices: Vec<f64> = (0..24).map(|i| f64::from(i) * 1.5).collect();
        // ranks 11 and 12: 16.5 and 18.0
        let result = classify_day(&series(&prices), &config()).unwrap();
        assert_eq!(result.median, 17.3);

        let mut whole = config();
        whole.decimal_precision = 0;
        let result = classify_day(&series(&prices), &whole).unwrap();
        assert_eq!(result.median, 17.0);
    }

    #[test]
    fn all_equal_prices_qualify_for_every_cheap_level() {
        let result = classify_day(&series(&[7.5; 24]), &config()).unwrap();
        let all: Vec<u32> = (0..24).collect();
        for level in PriceLevel::ALL {
            match level {
                PriceLevel::Cheapest5HoursConsec => {
                    assert_eq!(result.hours(level), vec![0, 1, 2, 3, 4])
                }
                PriceLevel::PriciestHour => assert!(result.hours(level).is_empty()),
                _ => assert_eq!(result.hours(level), all),
            }
        }
        assert_nested(&result);
    }

    #[test]
    fn excessive_margin_flags_hours_above_median() {
        // median 4.0, margin 150% -> 6.0; max 30 * 0.9 = 27
        let mut prices = vec![2.0; 10];
        prices.extend([4.0; 6]);
        prices.extend([6.0, 6.5, 5.0, 5.0, 5.0, 5.0, 5.0, 30.0]);
        let mut cfg = config();
        cfg.excessive_price_margin = 150;

        let result = classify_day(&series(&prices), &cfg).unwrap();
        assert_eq!(result.median, 4.0);
        assert_eq!(result.hours(PriceLevel::PriciestHour), vec![16, 17, 23]);
        assert_nested(&result);
    }

    #[test]
    fn top_multiplier_is_tunable() {
        let mut prices = vec![1.0; 20];
        prices.extend([9.0, 9.5, 9.2, 10.0]);
        let mut cfg = config();
        cfg.excessive_price_margin = 10_000;

        let relaxed = classify_day(&series(&prices), &cfg).unwrap();
        assert_eq!(relaxed.hours(PriceLevel::PriciestHour), vec![20, 21, 22, 23]);

        cfg.priciest_top_multiplier = 1.0;
        let strict = classify_day(&series(&prices), &cfg).unwrap();
        assert_eq!(strict.hours(PriceLevel::PriciestHour), vec![23]);
    }

    #[test]
    fn priciest_never_overlaps_cheapest_eight() {
        // 9.0 reaches the 0.9 * max floor but those hours are among the 8 cheapest.
        let mut prices = vec![9.0; 8];
        prices.extend([10.0; 16]);
        let result = classify_day(&series(&prices), &config()).unwrap();
        assert_eq!(
            result.hours(PriceLevel::Cheapest8Hours),
            (0..8).collect::<Vec<u32>>()
        );
        assert_eq!(
            result.hours(PriceLevel::PriciestHour),
            (8..24).collect::<Vec<u32>>()
        );
        assert_nested(&result);
    }

    #[test]
    fn comparisons_use_rounded_prices() {
        let mut prices = vec![5.0; 24];
        prices[3] = 1.04;
        prices[10] = 1.01;
        let result = classify_day(&series(&prices), &config()).unwrap();
        assert_eq!(result.hours(PriceLevel::CheapestHour), vec![3, 10]);
    }

    #[test]
    fn wrong_length_is_insufficient_data() {
        for len in [0usize, 23, 25, 48] {
            let prices = vec![3.0; len];
            assert_eq!(
                classify_day(&series(&prices), &config()),
                Err(AnalyzerError::InsufficientData {
                    expected: 24,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn classification_is_idempotent() {
        let prices: Vec<f64> = (0..24).map(|i| f64::from((i * 7) % 13) + 0.25).collect();
        let first = classify_day(&series(&prices), &config()).unwrap();
        let second = classify_day(&series(&prices), &config()).unwrap();
        assert_eq!(first, second);
        assert_nested(&first);
    }

    #[test]
    fn nesting_holds_for_rotations() {
        let base: Vec<f64> = (0..24).map(|i| f64::from((i * 5) % 24) / 3.0).collect();
        for shift in 0..24 {
            let mut prices = base.clone();
            prices.rotate_left(shift);
            let result = classify_day(&series(&prices), &config()).unwrap();
            assert_nested(&result);
            assert_eq!(result.hours(PriceLevel::Cheapest5HoursConsec).len(), 5);
        }
    }
}
