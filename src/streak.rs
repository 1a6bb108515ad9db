use chrono::{Duration, NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::model::User;
use crate::schema::users;

/// Computes the consecutive-day learning streak after activity on `today`.
///
/// A streak continues only when the previous activity fell on the day before
/// `today`. An older last activity resets the counter to 1, as does having no
/// activity at all. Repeat activity on the same day leaves the counter alone
/// so a resubmitted quiz cannot double-count.
pub fn next_streak(current: i32, last_activity: Option<NaiveDateTime>, today: NaiveDate) -> i32 {
    let yesterday = today - Duration::days(1);
    match last_activity {
        None => 1,
        Some(ts) if ts.date() == yesterday => current + 1,
        Some(ts) if ts.date() < yesterday => 1,
        Some(_) => current,
    }
}

/// Applies the streak update for activity at `now` and persists it.
///
/// `last_activity_date` is always moved to `now`, whether or not the counter
/// changed. Returns the streak that was written.
pub fn record_activity(
    conn: &mut SqliteConnection,
    user: &User,
    now: NaiveDateTime,
) -> Result<i32, diesel::result::Error> {
    let streak = next_streak(user.learning_streak, user.last_activity_date, now.date());

    diesel::update(users::table.find(user.id))
        .set((
            users::learning_streak.eq(streak),
            users::last_activity_date.eq(now),
        ))
        .execute(conn)?;

    Ok(streak)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at_noon(date: NaiveDate) -> NaiveDateTime {
        date.and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn first_activity_starts_streak_at_one() {
        assert_eq!(next_streak(0, None, day(2024, 3, 10)), 1);
    }

    #[test]
    fn consecutive_day_increments() {
        let last = at_noon(day(2024, 3, 9));
        assert_eq!(next_streak(4, Some(last), day(2024, 3, 10)), 5);
    }

    #[test]
    fn gap_of_two_days_resets_to_one() {
        let last = at_noon(day(2024, 3, 8));
        assert_eq!(next_streak(4, Some(last), day(2024, 3, 10)), 1);
    }

    #[test]
    fn long_gap_resets_to_one() {
        let last = at_noon(day(2023, 12, 1));
        assert_eq!(next_streak(17, Some(last), day(2024, 3, 10)), 1);
    }

    #[test]
    fn same_day_repeat_leaves_streak_unchanged() {
        let last = at_noon(day(2024, 3, 10));
        assert_eq!(next_streak(4, Some(last), day(2024, 3, 10)), 4);
    }

    #[test]
    fn future_activity_leaves_streak_unchanged() {
        // Clock skew: a stored activity after "today" must not reset anything.
        let last = at_noon(day(2024, 3, 11));
        assert_eq!(next_streak(4, Some(last), day(2024, 3, 10)), 4);
    }
}
