use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily study streak state for one user.
///
/// This is the single implementation of the streak transition; every
/// qualifying action (task completion, logged study session) goes through
/// [`StreakState::record_activity`] so call sites cannot drift apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current: u32,
    pub longest: u32,
    pub last_active: Option<NaiveDate>,
}

impl StreakState {
    /// Apply "qualifying activity happened on `day`".
    ///
    /// Same day twice is a no-op, the day after the last activity extends
    /// the streak, a later gap restarts it at 1. Days at or before
    /// `last_active` are ignored, so an out-of-order event can neither
    /// reset the streak nor rewind `last_active`. `longest` never
    /// decreases.
    pub fn record_activity(&mut self, day: NaiveDate) {
        match self.last_active {
            Some(last) if last >= day => return,
            Some(last) if last.succ_opt() == Some(day) => self.current += 1,
            _ => self.current = 1,
        }
        self.last_active = Some(day);
        self.longest = self.longest.max(self.current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn first_activity_starts_streak() {
        let mut streak = StreakState::default();
        streak.record_activity(day("2024-06-01"));
        assert_eq!(streak.current, 1);
        assert_eq!(streak.longest, 1);
        assert_eq!(streak.last_active, Some(day("2024-06-01")));
    }

    #[test]
    fn same_day_is_idempotent() {
        let mut streak = StreakState::default();
        streak.record_activity(day("2024-06-01"));
        let before = streak;
        streak.record_activity(day("2024-06-01"));
        assert_eq!(streak, before);
    }

    #[test]
    fn consecutive_days_increment_by_one() {
        let mut streak = StreakState::default();
        streak.record_activity(day("2024-06-01"));
        streak.record_activity(day("2024-06-02"));
        streak.record_activity(day("2024-06-03"));
        assert_eq!(streak.current, 3);
        assert_eq!(streak.longest, 3);
    }

    #[test]
    fn one_day_gap_resets_to_one() {
        let mut streak = StreakState::default();
        streak.record_activity(day("2024-06-01"));
        streak.record_activity(day("2024-06-02"));
        streak.record_activity(day("2024-06-04"));
        assert_eq!(streak.current, 1);
        assert_eq!(streak.longest, 2, "longest never decreases");
    }

    #[test]
    fn earlier_dates_never_rewind_the_streak() {
        let mut streak = StreakState::default();
        streak.record_activity(day("2024-06-01"));
        streak.record_activity(day("2024-06-02"));
        streak.record_activity(day("2024-06-03"));

        // A backdated event is ignored outright.
        streak.record_activity(day("2024-06-02"));
        assert_eq!(streak.current, 3);
        assert_eq!(streak.last_active, Some(day("2024-06-03")));

        // And an already-counted day cannot be re-counted afterwards.
        streak.record_activity(day("2024-06-03"));
        assert_eq!(streak.current, 3);

        streak.record_activity(day("2024-06-04"));
        assert_eq!(streak.current, 4);
    }

    #[test]
    fn works_across_month_boundary() {
        let mut streak = StreakState::default();
        streak.record_activity(day("2024-06-30"));
        streak.record_activity(day("2024-07-01"));
        assert_eq!(streak.current, 2);
    }
}
