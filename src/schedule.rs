//! The weekly broadcast schedule and poll pacing.
//!
//! Broadcasts happen on fixed weekdays at a fixed local hour. The UTC start
//! time is worked out per broadcast date, so it follows daylight-saving
//! changes even in a process that runs across one.

use crate::error::{CatalogError, Result};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// The UTC start of the first broadcast.
pub fn pilot_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 3, 25, 21, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// When on a broadcast day the show starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartHour {
    /// A fixed hour in UTC; broadcast days are UTC days.
    FixedUtc(u32),
    /// A local hour in a named timezone; broadcast days are local days.
    Local { tz: Tz, hour: u32 },
}

/// Whose turn it is to bring the mystery guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MysteryGuest {
    pub is_sunday: bool,
    pub host: &'static str,
}

/// A recurring weekly broadcast schedule.
#[derive(Debug, Clone)]
pub struct BroadcastSchedule {
    days: Vec<Weekday>,
    start: StartHour,
    grace: Duration,
    min_poll: Duration,
    max_poll: Duration,
    divisor: i32,
}

impl BroadcastSchedule {
    pub fn new(
        days: Vec<Weekday>,
        start: StartHour,
        grace: Duration,
        min_poll: Duration,
        max_poll: Duration,
        divisor: u32,
    ) -> Result<Self> {
        if days.is_empty() {
            return Err(CatalogError::Config("no broadcast days configured".to_string()));
        }
        let hour = match start {
            StartHour::FixedUtc(h) => h,
            StartHour::Local { hour, .. } => hour,
        };
        if hour > 23 {
            return Err(CatalogError::Config(format!("invalid broadcast hour {}", hour)));
        }
        if divisor == 0 {
            return Err(CatalogError::Config("poll divisor must be positive".to_string()));
        }
        if min_poll > max_poll || min_poll <= Duration::zero() {
            return Err(CatalogError::Config(format!(
                "invalid poll bounds {}m..{}m",
                min_poll.num_minutes(),
                max_poll.num_minutes()
            )));
        }
        Ok(Self {
            days,
            start,
            grace: grace.max(Duration::zero()),
            min_poll,
            max_poll,
            divisor: i32::try_from(divisor).unwrap_or(i32::MAX),
        })
    }

    /// The calendar date of `now` in the schedule's timezone.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        match self.start {
            StartHour::FixedUtc(_) => now.date_naive(),
            StartHour::Local { tz, .. } => now.with_timezone(&tz).date_naive(),
        }
    }

    pub fn is_broadcast_day(&self, date: NaiveDate) -> bool {
        self.days.contains(&date.weekday())
    }

    /// The UTC start of a broadcast on `date`. `None` only if the start
    /// hour does not exist on that date in the local timezone.
    pub fn start_on(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        match self.start {
            StartHour::FixedUtc(hour) => date.and_hms_opt(hour, 0, 0).map(|t| t.and_utc()),
            StartHour::Local { tz, hour } => {
                let local = date.and_hms_opt(hour, 0, 0)?;
                tz.from_local_datetime(&local)
                    .earliest()
                    .map(|t| t.with_timezone(&Utc))
            }
        }
    }

    /// The start of the first broadcast on a day after the local date of
    /// `now`.
    pub fn next_start_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = self.local_date(now);
        (1..=7u64)
            .filter_map(|n| today.checked_add_days(Days::new(n)))
            .find(|d| self.is_broadcast_day(*d))
            .and_then(|d| self.start_on(d))
    }

    /// Today's broadcast start if today is a broadcast day and the show is
    /// not over yet, else the next one.
    pub fn today_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = self.local_date(now);
        if self.is_broadcast_day(today) {
            if let Some(start) = self.start_on(today) {
                if now <= start + self.grace {
                    return Some(start);
                }
            }
        }
        self.next_start_after(now)
    }

    /// The broadcast to wait for, given the air date of the latest known
    /// episode. Once today's episode is known, or today's show is over,
    /// that is the next one.
    pub fn upcoming(&self, now: DateTime<Utc>, latest_air: NaiveDate) -> Option<DateTime<Utc>> {
        let start = self.today_start(now)?;
        if latest_air >= self.local_date(now) || now > start + self.grace {
            return self.next_start_after(now);
        }
        Some(start)
    }

    /// How long to sleep before polling again: a fixed fraction of the time
    /// left until `start`, bounded on both sides. With no known start the
    /// ceiling applies.
    pub fn poll_interval(&self, now: DateTime<Utc>, start: Option<DateTime<Utc>>) -> std::time::Duration {
        let wait = match start {
            Some(start) => (start - now) / self.divisor,
            None => self.max_poll,
        };
        wait.clamp(self.min_poll, self.max_poll)
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(60))
    }

    /// Reports whether `now` falls on a Sunday and whose week it is. Hosts
    /// alternate weekly, counting from the pilot.
    pub fn mystery_guest_sunday(&self, now: DateTime<Utc>) -> MysteryGuest {
        let weeks = (now - pilot_start()).num_weeks();
        MysteryGuest {
            is_sunday: self.local_date(now).weekday() == Weekday::Sun,
            host: if weeks % 2 == 0 { "Ben" } else { "Kate" },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eastern() -> BroadcastSchedule {
        BroadcastSchedule::new(
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri],
            StartHour::Local {
                tz: chrono_tz::America::New_York,
                hour: 17,
            },
            Duration::minutes(60),
            Duration::minutes(1),
            Duration::minutes(90),
            7,
        )
        .unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_start_tracks_daylight_saving() {
        let s = eastern();
        // 17:00 EDT and 17:00 EST.
        assert_eq!(s.start_on(date(2023, 6, 14)), Some(at(2023, 6, 14, 21, 0)));
        assert_eq!(s.start_on(date(2023, 1, 9)), Some(at(2023, 1, 9, 22, 0)));
    }

    #[test]
    fn test_today_start_on_broadcast_day() {
        let s = eastern();
        // Wednesday morning.
        assert_eq!(s.today_start(at(2023, 6, 14, 12, 0)), Some(at(2023, 6, 14, 21, 0)));
        // Running late but within the grace period.
        assert_eq!(s.today_start(at(2023, 6, 14, 22, 0)), Some(at(2023, 6, 14, 21, 0)));
        // Past the grace period: Friday.
        assert_eq!(s.today_start(at(2023, 6, 14, 22, 1)), Some(at(2023, 6, 16, 21, 0)));
    }

    #[test]
    fn test_next_start_skips_weekend() {
        let s = eastern();
        // Friday evening, Saturday and Sunday all lead to Monday.
        assert_eq!(s.next_start_after(at(2023, 6, 16, 23, 0)), Some(at(2023, 6, 19, 21, 0)));
        assert_eq!(s.today_start(at(2023, 6, 17, 15, 0)), Some(at(2023, 6, 19, 21, 0)));
        assert_eq!(s.today_start(at(2023, 6, 18, 15, 0)), Some(at(2023, 6, 19, 21, 0)));
        // Tuesday leads to Wednesday.
        assert_eq!(s.today_start(at(2023, 6, 13, 15, 0)), Some(at(2023, 6, 14, 21, 0)));
    }

    #[test]
    fn test_local_date_governs_weekday() {
        let s = eastern();
        // 02:00 UTC Wednesday is still Tuesday evening in New York.
        let now = at(2023, 6, 14, 2, 0);
        assert_eq!(s.local_date(now), date(2023, 6, 13));
        assert_eq!(s.today_start(now), Some(at(2023, 6, 14, 21, 0)));
    }

    #[test]
    fn test_next_start_across_dst_change() {
        let s = eastern();
        // Friday 10 March 2023 after the show (EST); clocks change on the
        // 12th, so Monday's show starts an hour earlier in UTC.
        let now = at(2023, 3, 10, 23, 30);
        assert_eq!(s.today_start(now), Some(at(2023, 3, 13, 21, 0)));
    }

    #[test]
    fn test_upcoming_after_todays_episode_is_known() {
        let s = eastern();
        let now = at(2023, 6, 14, 12, 0);
        assert_eq!(s.upcoming(now, date(2023, 6, 12)), Some(at(2023, 6, 14, 21, 0)));
        assert_eq!(s.upcoming(now, date(2023, 6, 14)), Some(at(2023, 6, 16, 21, 0)));
    }

    #[test]
    fn test_poll_interval_is_bounded_fraction() {
        let s = eastern();
        let now = at(2023, 6, 14, 12, 0);
        let mins = |d: std::time::Duration| d.as_secs() / 60;

        assert_eq!(mins(s.poll_interval(now, Some(now + Duration::hours(7)))), 60);
        assert_eq!(mins(s.poll_interval(now, Some(now + Duration::hours(14)))), 90);
        assert_eq!(mins(s.poll_interval(now, Some(now + Duration::minutes(3)))), 1);
        assert_eq!(mins(s.poll_interval(now, Some(now - Duration::hours(1)))), 1);
        assert_eq!(mins(s.poll_interval(now, None)), 90);
    }

    #[test]
    fn test_fixed_utc_schedule() {
        let s = BroadcastSchedule::new(
            vec![Weekday::Tue],
            StartHour::FixedUtc(20),
            Duration::zero(),
            Duration::minutes(1),
            Duration::minutes(90),
            7,
        )
        .unwrap();
        assert_eq!(s.today_start(at(2023, 6, 13, 19, 0)), Some(at(2023, 6, 13, 20, 0)));
        assert_eq!(s.today_start(at(2023, 6, 13, 20, 1)), Some(at(2023, 6, 20, 20, 0)));
    }

    #[test]
    fn test_invalid_schedules_rejected() {
        let make = |days: Vec<Weekday>, hour, divisor| {
            BroadcastSchedule::new(
                days,
                StartHour::FixedUtc(hour),
                Duration::zero(),
                Duration::minutes(1),
                Duration::minutes(90),
                divisor,
            )
        };
        assert!(make(vec![], 17, 7).is_err());
        assert!(make(vec![Weekday::Mon], 24, 7).is_err());
        assert!(make(vec![Weekday::Mon], 17, 0).is_err());
    }

    #[test]
    fn test_mystery_guest_sunday_alternates() {
        let s = eastern();
        let first = s.mystery_guest_sunday(at(2020, 3, 29, 16, 0));
        assert_eq!(first, MysteryGuest { is_sunday: true, host: "Ben" });
        let second = s.mystery_guest_sunday(at(2020, 4, 5, 16, 0));
        assert_eq!(second, MysteryGuest { is_sunday: true, host: "Kate" });
        assert!(!s.mystery_guest_sunday(at(2020, 4, 6, 16, 0)).is_sunday);
    }
}
