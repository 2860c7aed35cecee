use crate::config::WindowPolicy;
use crate::storage::price_cache::DUAL_DAY_REFRESH_HOUR;

/// Prices for tomorrow are usually published in the afternoon; from this
/// hour on a missing tomorrow entry triggers a fetch.
pub const TOMORROW_FETCH_HOUR: u32 = 18;

/// What to do with the contiguous cheapest window on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    Keep,
    /// Recompute over today's 24 hours.
    TodayOnly,
    /// Recompute over the rest of today plus tomorrow until 07:00.
    DualDay,
}

/// Inputs of the window decision for one tick.
#[derive(Debug, Clone, Copy)]
pub struct WindowContext {
    pub hour: u32,
    pub has_window: bool,
    /// The previous window still has a slot at or after the current hour.
    pub window_ahead: bool,
    pub dynamic: bool,
    pub already_updated: bool,
    pub policy: WindowPolicy,
}

/// Re-run the day classification at midnight or when today has none yet.
pub fn should_classify_day(hour: u32, classified_today: bool) -> bool {
    hour == 0 || !classified_today
}

pub fn window_action(ctx: &WindowContext) -> WindowAction {
    if !ctx.has_window {
        return WindowAction::TodayOnly;
    }
    if ctx.hour == 0 && (!ctx.dynamic || !ctx.already_updated) {
        return WindowAction::TodayOnly;
    }
    if !ctx.dynamic || ctx.window_ahead {
        return WindowAction::Keep;
    }

    let due = match ctx.policy {
        WindowPolicy::FixedHour => ctx.hour == DUAL_DAY_REFRESH_HOUR,
        WindowPolicy::Opportunistic => !ctx.already_updated,
    };
    if due {
        WindowAction::DualDay
    } else {
        WindowAction::Keep
    }
}

/// Fetch when today is missing, or tomorrow is missing late enough in the day.
pub fn needs_fetch(hour: u32, has_today: bool, has_tomorrow: bool) -> bool {
    !has_today || (hour >= TOMORROW_FETCH_HOUR && !has_tomorrow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(hour: u32) -> WindowContext {
        WindowContext {
            hour,
            has_window: true,
            window_ahead: false,
            dynamic: false,
            already_updated: false,
            policy: WindowPolicy::FixedHour,
        }
    }

    #[test]
    fn classification_runs_at_midnight_or_when_missing() {
        assert!(should_classify_day(0, true));
        assert!(should_classify_day(13, false));
        assert!(!should_classify_day(13, true));
    }

    #[test]
    fn missing_window_is_computed_for_today() {
        let c = WindowContext {
            has_window: false,
            dynamic: true,
            ..ctx(15)
        };
        assert_eq!(window_action(&c), WindowAction::TodayOnly);
    }

    #[test]
    fn midnight_recomputes_unless_dual_day_window_is_live() {
        assert_eq!(window_action(&ctx(0)), WindowAction::TodayOnly);

        let dynamic = WindowContext {
            dynamic: true,
            ..ctx(0)
        };
        assert_eq!(window_action(&dynamic), WindowAction::TodayOnly);

        let updated = WindowContext {
            already_updated: true,
            ..dynamic
        };
        assert_eq!(window_action(&updated), WindowAction::Keep);
    }

    #[test]
    fn static_mode_keeps_window_during_the_day() {
        for hour in 1..24 {
            assert_eq!(window_action(&ctx(hour)), WindowAction::Keep);
        }
    }

    #[test]
    fn fixed_hour_policy_recomputes_at_seven_only() {
        let base = WindowContext {
            dynamic: true,
            ..ctx(7)
        };
        assert_eq!(window_action(&base), WindowAction::DualDay);
        assert_eq!(
            window_action(&WindowContext { hour: 9, ..base }),
            WindowAction::Keep
        );
        assert_eq!(
            window_action(&WindowContext {
                window_ahead: true,
                ..base
            }),
            WindowAction::Keep
        );
    }

    #[test]
    fn opportunistic_policy_recomputes_once_window_rolled_out() {
        let base = WindowContext {
            dynamic: true,
            policy: WindowPolicy::Opportunistic,
            ..ctx(14)
        };
        assert_eq!(window_action(&base), WindowAction::DualDay);
        assert_eq!(
            window_action(&WindowContext {
                already_updated: true,
                ..base
            }),
            WindowAction::Keep
        );
        assert_eq!(
            window_action(&WindowContext {
                window_ahead: true,
                ..base
            }),
            WindowAction::Keep
        );
    }

    #[test]
    fn fetch_needed_for_missing_days() {
        assert!(needs_fetch(3, false, false));
        assert!(!needs_fetch(17, true, false));
        assert!(needs_fetch(18, true, false));
        assert!(!needs_fetch(20, true, true));
    }
}
