//! Page addresses derived from configuration and the current date.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use zsemplan_core::config::{SourceConfig, TeachersConfig};

/// Directory holding the generated plan pages; staff pages live here too.
pub const PLAN_DIR: &str = "/plany/plany/";

/// Calendar date of `now` in the school's time zone.
pub fn local_date(now: DateTime<Utc>, timezone: Tz) -> NaiveDate {
    now.with_timezone(&timezone).date_naive()
}

/// `{base}/zastepstwa/{DDMMYYYY}.html` for `days` days starting at `today`.
///
/// The day component is `today.day() + offset` with no carry into the month or
/// year, so near month end some addresses (day 32, 33, ...) name pages that
/// never exist and end up as failed days. Consumers depend on these exact keys.
pub fn substitution_urls(source: &SourceConfig, today: NaiveDate, days: u32) -> Vec<String> {
    (0..days)
        .map(|offset| {
            format!(
                "{}/zastepstwa/{:02}{:02}{:04}.html",
                source.base(),
                today.day() + offset,
                today.month(),
                today.year()
            )
        })
        .collect()
}

/// `{base}/plany/plany/n{i}.html` for every configured staff id.
pub fn teacher_urls(source: &SourceConfig, teachers: &TeachersConfig) -> Vec<String> {
    (teachers.first_id..=teachers.last_id)
        .map(|i| format!("{}{PLAN_DIR}n{i}.html", source.base()))
        .collect()
}

/// Byte offset of the staff page file name within a [`teacher_urls`] address.
///
/// Staff ids keep the file name form (`n5.html`), not the bare number: lesson
/// entries reference teachers by the same file name in their `teacher.id`
/// href, so the directory joins on it directly.
pub fn teacher_id_offset(source: &SourceConfig) -> usize {
    source.base().len() + PLAN_DIR.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_date_after_midnight_in_summer() {
        use chrono::TimeZone;
        // 22:30 UTC is 00:30 the next day in Warsaw under CEST.
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 22, 30, 0).unwrap();
        assert_eq!(
            local_date(now, Tz::Europe__Warsaw),
            NaiveDate::from_ymd_opt(2026, 6, 2).unwrap()
        );
        assert_eq!(local_date(now, Tz::UTC), NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
    }

    #[test]
    fn test_substitution_urls_mid_month() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let urls = substitution_urls(&SourceConfig::default(), today, 7);
        assert_eq!(urls.len(), 7);
        assert_eq!(urls[0], "https://zsem.edu.pl/zastepstwa/02032026.html");
        assert_eq!(urls[6], "https://zsem.edu.pl/zastepstwa/08032026.html");
    }

    #[test]
    fn test_substitution_urls_do_not_roll_over() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 30).unwrap();
        let urls = substitution_urls(&SourceConfig::default(), today, 7);
        assert_eq!(urls[1], "https://zsem.edu.pl/zastepstwa/31012026.html");
        assert_eq!(urls[2], "https://zsem.edu.pl/zastepstwa/32012026.html");
        assert_eq!(urls[6], "https://zsem.edu.pl/zastepstwa/36012026.html");
    }

    #[test]
    fn test_teacher_urls_and_id_offset() {
        let source = SourceConfig {
            base_url: "http://localhost:8080/".into(),
            ..Default::default()
        };
        let range = TeachersConfig {
            first_id: 9,
            last_id: 11,
        };
        let urls = teacher_urls(&source, &range);
        assert_eq!(
            urls,
            vec![
                "http://localhost:8080/plany/plany/n9.html",
                "http://localhost:8080/plany/plany/n10.html",
                "http://localhost:8080/plany/plany/n11.html",
            ]
        );
        assert_eq!(&urls[1][teacher_id_offset(&source)..], "n10.html");
    }
}
