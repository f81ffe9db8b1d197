//! Active-window evaluation.

use chrono::{DateTime, Utc};

/// Returns whether `now` falls inside the optional `[start_at, end_at]` window.
///
/// Both bounds are inclusive. A missing start means "since the beginning of
/// time", a missing end means "forever"; an item with neither is always active.
pub fn is_within_window(
    now: DateTime<Utc>,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
) -> bool {
    start_at.is_none_or(|start| now >= start) && end_at.is_none_or(|end| now <= end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn unbounded_is_always_active() {
        assert!(is_within_window(now(), None, None));
        assert!(is_within_window(DateTime::<Utc>::MIN_UTC, None, None));
    }

    #[test]
    fn future_start_is_excluded() {
        let start = now() + Duration::seconds(1);
        assert!(!is_within_window(now(), Some(start), None));
        assert!(!is_within_window(now(), Some(start), Some(start + Duration::days(1))));
    }

    #[test]
    fn past_end_is_excluded() {
        let end = now() - Duration::days(1);
        assert!(!is_within_window(now(), None, Some(end)));
        assert!(!is_within_window(now(), Some(end - Duration::days(7)), Some(end)));
    }

    #[test]
    fn start_only_stays_active_indefinitely() {
        let start = now() - Duration::days(400);
        assert!(is_within_window(now(), Some(start), None));
        assert!(is_within_window(now() + Duration::days(10_000), Some(start), None));
    }

    #[test]
    fn end_only_is_active_from_the_beginning_of_time() {
        let end = now() + Duration::hours(1);
        assert!(is_within_window(DateTime::<Utc>::MIN_UTC, None, Some(end)));
        assert!(is_within_window(now(), None, Some(end)));
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(is_within_window(now(), Some(now()), Some(now())));
    }
}
