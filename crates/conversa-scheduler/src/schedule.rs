use chrono::{DateTime, Duration, Utc};

use crate::types::RecurringPattern;

const DAYS_PER_MONTH: i64 = 30;

/// Computes the next fire time for a recurring scheduled message, stepping
/// forward from `from` by one unit of `pattern` times `interval`.
///
/// Monthly recurrence approximates a calendar month as 30 days rather than
/// tracking actual month boundaries.
pub fn next_occurrence(pattern: RecurringPattern, interval: u32, from: DateTime<Utc>) -> DateTime<Utc> {
    let interval = interval.max(1) as i64;
    let step = match pattern {
        RecurringPattern::Daily => Duration::days(interval),
        RecurringPattern::Weekly => Duration::days(7 * interval),
        RecurringPattern::Monthly => Duration::days(DAYS_PER_MONTH * interval),
    };
    from + step
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    #[test]
    fn daily_advances_one_day() {
        let next = next_occurrence(RecurringPattern::Daily, 1, at(2026, 7, 30));
        assert_eq!(next, at(2026, 7, 31));
    }

    #[test]
    fn weekly_advances_seven_days_times_interval() {
        let next = next_occurrence(RecurringPattern::Weekly, 2, at(2026, 7, 30));
        assert_eq!(next, at(2026, 8, 13));
    }

    #[test]
    fn monthly_advances_approximately_thirty_days() {
        let next = next_occurrence(RecurringPattern::Monthly, 1, at(2026, 7, 30));
        assert_eq!(next, at(2026, 8, 29));
    }

    #[test]
    fn zero_interval_is_treated_as_one() {
        let next = next_occurrence(RecurringPattern::Daily, 0, at(2026, 7, 30));
        assert_eq!(next, at(2026, 7, 31));
    }
}
