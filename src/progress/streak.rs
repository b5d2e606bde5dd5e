// SPDX-License-Identifier: MIT
//! Study streak calculation from daily log dates.
//!
//! A streak is the number of consecutive calendar days with at least one log
//! entry, counting backwards from today. A run that ends yesterday still
//! counts in full: logging every day through yesterday shows the streak
//! unbroken until today is actually missed.

use std::collections::BTreeSet;

use chrono::{Duration, Local, NaiveDate};

/// Parse raw log date strings into a deduplicated set of calendar days.
///
/// Only the first ten characters (`YYYY-MM-DD`) of each string are read, so
/// full RFC 3339 timestamps are accepted and the time-of-day and timezone
/// suffix can never shift an entry onto a different day. Strings that do not
/// start with a valid calendar date are skipped.
pub fn parse_log_days<'a, I>(dates: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = &'a str>,
{
    dates
        .into_iter()
        .filter_map(|raw| {
            let day = raw.get(..10)?;
            NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
        })
        .collect()
}

/// Count the consecutive-day streak ending at `today` (or yesterday).
///
/// Days after `today` are ignored, so a client with a skewed clock cannot
/// inflate the streak. Walks the unique days newest-first:
///
/// - a day matching the expected day extends the streak;
/// - when today itself has no entry, a day equal to yesterday starts the
///   streak instead (the "not yet logged today" allowance, applied only at
///   the first step);
/// - the first gap ends the walk.
pub fn streak_on(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0u32;
    let mut expected = today;

    for &day in days.iter().rev() {
        if day > today {
            continue;
        }
        if day == expected {
            streak += 1;
        } else if expected == today && day == today - Duration::days(1) {
            streak += 1;
        } else {
            break;
        }
        expected = day - Duration::days(1);
    }

    streak
}

/// Current streak from raw date strings, relative to the local calendar day.
///
/// "Today" is the local wall-clock date: a user logging at 23:50 and checking
/// at 00:10 sees the day roll over exactly when their calendar does.
pub fn current_streak<'a, I>(dates: I) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    streak_on(&parse_log_days(dates), Local::now().date_naive())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
