//! Expansion of a schedule window into concrete occurrence dates.

use jiff::civil;
use jiff::ToSpan;

use crate::models::RecurringType;

/// Expands `[start, end]` into the ordered list of occurrence dates.
///
/// One-time and daily schedules occupy every calendar date in the window.
/// Weekly schedules keep only the dates whose day-of-week (0 = Sunday ..
/// 6 = Saturday) is in `days_of_week`. The result is ascending and free
/// of duplicates; an empty result is possible for weekly patterns whose
/// days never occur in the window, and for an inverted window.
pub fn expand(
    start: civil::Date,
    end: civil::Date,
    recurring_type: Option<RecurringType>,
    days_of_week: Option<&[u8]>,
) -> Vec<civil::Date> {
    if end < start {
        return Vec::new();
    }

    let weekly_days = match recurring_type {
        Some(RecurringType::Weekly) => days_of_week,
        _ => None,
    };

    start
        .series(1.day())
        .take_while(|date| *date <= end)
        .filter(|date| match weekly_days {
            Some(days) => days.contains(&(date.weekday().to_sunday_zero_offset() as u8)),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;
    use proptest::prelude::*;

    #[test]
    fn daily_covers_every_date_inclusive() {
        let dates = expand(
            date(2025, 6, 5),
            date(2025, 6, 15),
            Some(RecurringType::Daily),
            None,
        );
        assert_eq!(dates.len(), 11);
        assert_eq!(dates.first(), Some(&date(2025, 6, 5)));
        assert_eq!(dates.last(), Some(&date(2025, 6, 15)));
    }

    #[test]
    fn one_time_expands_like_daily() {
        let dates = expand(date(2025, 6, 5), date(2025, 6, 7), None, None);
        assert_eq!(
            dates,
            vec![date(2025, 6, 5), date(2025, 6, 6), date(2025, 6, 7)]
        );
    }

    #[test]
    fn weekly_keeps_only_requested_days() {
        // 2025-06-02 is a Monday.
        let dates = expand(
            date(2025, 6, 1),
            date(2025, 6, 30),
            Some(RecurringType::Weekly),
            Some(&[1]),
        );
        assert_eq!(
            dates,
            vec![
                date(2025, 6, 2),
                date(2025, 6, 9),
                date(2025, 6, 16),
                date(2025, 6, 23),
                date(2025, 6, 30),
            ]
        );
    }

    #[test]
    fn weekly_with_no_matching_day_in_window_is_empty() {
        // 2025-06-03 (Tue) .. 2025-06-06 (Fri); Sunday never occurs.
        let dates = expand(
            date(2025, 6, 3),
            date(2025, 6, 6),
            Some(RecurringType::Weekly),
            Some(&[0]),
        );
        assert!(dates.is_empty());
    }

    #[test]
    fn inverted_window_yields_nothing() {
        assert!(expand(
            date(2025, 6, 10),
            date(2025, 6, 5),
            Some(RecurringType::Daily),
            None
        )
        .is_empty());
    }

    fn arb_date() -> impl Strategy<Value = civil::Date> {
        (2020i16..2030, 1i8..=12, 1i8..=28).prop_map(|(y, m, d)| date(y, m, d))
    }

    fn arb_days() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::btree_set(0u8..=6, 1..=7)
            .prop_map(|set| set.into_iter().collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Daily expansion covers exactly (end - start).days + 1 dates.
        #[test]
        fn prop_daily_cardinality(start in arb_date(), span in 0i32..120) {
            let end = start.saturating_add(jiff::Span::new().days(span));
            let dates = expand(start, end, Some(RecurringType::Daily), None);
            prop_assert_eq!(dates.len(), span as usize + 1);
            prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        }

        /// Every weekly occurrence falls on a requested day, and every
        /// in-window date on a requested day is produced exactly once.
        #[test]
        fn prop_weekly_membership_and_completeness(
            start in arb_date(),
            span in 0i32..120,
            days in arb_days(),
        ) {
            let end = start.saturating_add(jiff::Span::new().days(span));
            let dates = expand(start, end, Some(RecurringType::Weekly), Some(&days));

            for d in &dates {
                prop_assert!(days.contains(&(d.weekday().to_sunday_zero_offset() as u8)));
            }

            let expected = expand(start, end, Some(RecurringType::Daily), None)
                .into_iter()
                .filter(|d| days.contains(&(d.weekday().to_sunday_zero_offset() as u8)))
                .count();
            prop_assert_eq!(dates.len(), expected);
            prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        }

        /// Expansion is a pure function of its inputs.
        #[test]
        fn prop_expansion_deterministic(start in arb_date(), span in 0i32..60, days in arb_days()) {
            let end = start.saturating_add(jiff::Span::new().days(span));
            let a = expand(start, end, Some(RecurringType::Weekly), Some(&days));
            let b = expand(start, end, Some(RecurringType::Weekly), Some(&days));
            prop_assert_eq!(a, b);
        }
    }
}
