//! Site-local time helpers for the periodic scene change check.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;
use vsight_models::{CheckWindow, ClockTime, DayPeriod};

use crate::config::TamperingSettings;

/// Parse an IANA timezone name, falling back to UTC.
pub fn parse_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!(timezone = %name, "Unknown site timezone, using UTC");
        Tz::UTC
    })
}

/// Convert a site-local wall-clock time to an instant.
///
/// Times skipped by a DST jump move forward one hour; repeated times take
/// the earlier instant.
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}

/// Start of the current check period.
///
/// Inside `(from, to]` the period began at today's `from`; after `to` it
/// began at today's `to`; before that it is still yesterday's period.
pub fn window_boundary(now: DateTime<Utc>, tz: Tz, window: &CheckWindow) -> DateTime<Utc> {
    let today = now.with_timezone(&tz).date_naive();
    let at = |date: chrono::NaiveDate, time: ClockTime| resolve_local(tz, date.and_time(time.to_naive()));

    let from = at(today, window.first_check_from);
    let to = at(today, window.first_check_to);

    if now > from && now <= to {
        from
    } else if now > to {
        to
    } else {
        let yesterday = today.pred_opt().unwrap_or(today);
        at(yesterday, window.first_check_to)
    }
}

/// Whether `now` is day or night at the site.
pub fn day_period(now: DateTime<Utc>, tz: Tz, settings: &TamperingSettings) -> DayPeriod {
    let hour = now.with_timezone(&tz).hour();
    if hour >= settings.day_start_hour && hour < settings.night_start_hour {
        DayPeriod::Day
    } else {
        DayPeriod::Night
    }
}
