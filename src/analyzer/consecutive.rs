use crate::model::{AnalyzerError, HourSlot, PricePoint};

/// Offset of the `window_len` run of prices with the smallest sum.
/// Ties resolve to the earliest run. `None` when the input is shorter than the window.
pub fn cheapest_window_start(prices: &[f64], window_len: usize) -> Option<usize> {
    if window_len == 0 || prices.len() < window_len {
        return None;
    }

    // Each window is summed on its own so equal runs compare exactly equal.
    let mut best: Option<(usize, f64)> = None;
    for (offset, window) in prices.windows(window_len).enumerate() {
        let total: f64 = window.iter().sum();
        match best {
            Some((_, best_total)) if total >= best_total => {}
            _ => best = Some((offset, total)),
        }
    }
    best.map(|(offset, _)| offset)
}

/// The cheapest contiguous run of `window_len` samples in `span`, as the slots
/// of the underlying points in span order.
///
/// `span` does not need to be a single day: the remainder of today followed by
/// the first hours of tomorrow yields a window that may cross midnight.
pub fn cheapest_consecutive_window(
    span: &[PricePoint],
    window_len: usize,
) -> Result<Vec<HourSlot>, AnalyzerError> {
    let prices: Vec<f64> = span.iter().map(|p| p.price).collect();
    let start = cheapest_window_start(&prices, window_len).ok_or(
        AnalyzerError::InsufficientData {
            expected: window_len,
            actual: span.len(),
        },
    )?;

    Ok(span[start..start + window_len]
        .iter()
        .map(PricePoint::slot)
        .collect())
}
