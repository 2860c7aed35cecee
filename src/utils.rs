// Utility functions
use chrono::{DateTime, Duration, Local, Offset, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Rounds to `precision` decimal places, half away from zero.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Time left until the next full hour, never zero.
pub fn until_next_hour(now: &DateTime<Tz>) -> std::time::Duration {
    let into_hour_ms = u64::from(now.minute() * 60 + now.second()) * 1000
        + u64::from(now.timestamp_subsec_millis().min(999));
    std::time::Duration::from_millis(3_600_000 - into_hour_ms)
}

/// Time left until the next local `hour`:00 strictly after `now`.
pub fn until_next_local_hour(now: &DateTime<Tz>, hour: u32) -> Duration {
    let tz = now.timezone();
    let mut date = now.date_naive();
    for _ in 0..3 {
        let candidate = date
            .and_hms_opt(hour, 0, 0)
            .and_then(|naive| tz.from_local_datetime(&naive).earliest());
        if let Some(candidate) = candidate {
            if candidate > *now {
                return candidate.signed_duration_since(now);
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    Duration::hours(24)
}

/// UTC offsets (seconds) of the host clock and of `tz` at `now`.
pub fn utc_offsets(tz: Tz, now: DateTime<Utc>) -> (i32, i32) {
    let system = now.with_timezone(&Local).offset().fix().local_minus_utc();
    let zone = now.with_timezone(&tz).offset().fix().local_minus_utc();
    (system, zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Tallinn;

    #[test]
    fn rounds_to_precision() {
        assert_eq!(round_to(12.345, 0), 12.0);
        assert_eq!(round_to(12.36, 1), 12.4);
        assert_eq!(round_to(-1.25, 1), -1.3);
    }

    #[test]
    fn next_hour_wait_is_within_an_hour() {
        let now = Tallinn.with_ymd_and_hms(2025, 1, 15, 10, 59, 30).unwrap();
        assert_eq!(until_next_hour(&now), std::time::Duration::from_secs(30));
        let top = Tallinn.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(until_next_hour(&top), std::time::Duration::from_secs(3600));
    }

    #[test]
    fn next_seven_am_rolls_over_midnight() {
        let evening = Tallinn.with_ymd_and_hms(2025, 1, 15, 20, 0, 0).unwrap();
        assert_eq!(until_next_local_hour(&evening, 7), Duration::hours(11));
        let morning = Tallinn.with_ymd_and_hms(2025, 1, 15, 7, 0, 0).unwrap();
        assert_eq!(until_next_local_hour(&morning, 7), Duration::hours(24));
        let early = Tallinn.with_ymd_and_hms(2025, 1, 15, 6, 30, 0).unwrap();
        assert_eq!(until_next_local_hour(&early, 7), Duration::minutes(30));
    }
}
