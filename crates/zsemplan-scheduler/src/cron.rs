//! Five-field cron expressions: `MIN HOUR DOM MON DOW`.
//!
//! Each field accepts `*`, `N`, `A-B`, `*/S`, `A-B/S` and comma lists of
//! those. Day-of-week runs 0-7 with both 0 and 7 meaning Sunday. When both
//! day-of-month and day-of-week are restricted a day matching either one fires,
//! as in classic cron.
//!
//! Expressions are evaluated on the wall clock of a tz database zone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use zsemplan_core::{Result, ZsemError};

/// How far ahead `next_after` looks before giving up (`0 0 30 2 *` never fires).
const SEARCH_DAYS: i64 = 366;

/// Set of allowed values for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    bits: u64,
    /// Written as a bare `*`.
    unrestricted: bool,
}

impl Field {
    fn parse(spec: &str, min: u32, max: u32) -> Option<Self> {
        let mut bits = 0u64;
        for part in spec.split(',') {
            let (range, step) = match part.split_once('/') {
                Some((range, step)) => (range, step.parse::<u32>().ok().filter(|s| *s > 0)?),
                None => (part, 1),
            };
            let (lo, hi) = match range {
                "*" => (min, max),
                _ => match range.split_once('-') {
                    Some((lo, hi)) => (lo.parse().ok()?, hi.parse().ok()?),
                    None => {
                        let n: u32 = range.parse().ok()?;
                        // `N/S` means from N to the end of the range.
                        if part.contains('/') { (n, max) } else { (n, n) }
                    }
                },
            };
            if lo < min || hi > max || lo > hi {
                return None;
            }
            for value in (lo..=hi).step_by(step as usize) {
                bits |= 1u64 << value;
            }
        }
        Some(Self {
            bits,
            unrestricted: spec == "*",
        })
    }

    fn contains(&self, value: u32) -> bool {
        self.bits & (1u64 << value) != 0
    }
}

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
    minutes: Field,
    hours: Field,
    days_of_month: Field,
    months: Field,
    days_of_week: Field,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        let &[min, hour, dom, mon, dow] = parts.as_slice() else {
            return Err(ZsemError::Config(format!(
                "Invalid cron expression: '{expression}' (need 5 fields: MIN HOUR DOM MON DOW)"
            )));
        };
        let field = |spec: &str, name: &str, lo: u32, hi: u32| {
            Field::parse(spec, lo, hi).ok_or_else(|| {
                ZsemError::Config(format!(
                    "Invalid {name} field '{spec}' in cron expression '{expression}'"
                ))
            })
        };

        let mut days_of_week = field(dow, "day-of-week", 0, 7)?;
        if days_of_week.contains(7) {
            days_of_week.bits = (days_of_week.bits | 1) & !(1u64 << 7);
        }

        Ok(Self {
            expression: expression.to_string(),
            minutes: field(min, "minute", 0, 59)?,
            hours: field(hour, "hour", 0, 23)?,
            days_of_month: field(dom, "day-of-month", 1, 31)?,
            months: field(mon, "month", 1, 12)?,
            days_of_week,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    fn matches_day(&self, date: NaiveDate) -> bool {
        if !self.months.contains(date.month()) {
            return false;
        }
        let dom = self.days_of_month.contains(date.day());
        let dow = self.days_of_week.contains(date.weekday().num_days_from_sunday());
        match (self.days_of_month.unrestricted, self.days_of_week.unrestricted) {
            (false, false) => dom || dow,
            _ => dom && dow,
        }
    }

    #[cfg(test)]
    fn matches(&self, local: chrono::NaiveDateTime) -> bool {
        self.matches_day(local.date())
            && self.hours.contains(local.hour())
            && self.minutes.contains(local.minute())
    }

    /// First firing minute strictly after `after`, on the wall clock of `tz`.
    ///
    /// Wall-clock minutes skipped by a DST jump never fire. A repeated minute
    /// fires at its first occurrence.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let start = after.with_timezone(&tz).naive_local();
        let mut candidate = start.with_second(0)?.with_nanosecond(0)? + Duration::minutes(1);
        let limit = start + Duration::days(SEARCH_DAYS);

        while candidate <= limit {
            if !self.matches_day(candidate.date()) {
                candidate = candidate.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
            } else if !self.hours.contains(candidate.hour()) {
                candidate = candidate.with_minute(0)? + Duration::hours(1);
            } else if !self.minutes.contains(candidate.minute()) {
                candidate += Duration::minutes(1);
            } else {
                match tz.from_local_datetime(&candidate).earliest() {
                    Some(local) if local.with_timezone(&Utc) > after => {
                        return Some(local.with_timezone(&Utc));
                    }
                    _ => candidate += Duration::minutes(1),
                }
            }
        }
        None
    }
}

impl std::fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}
