//! Automatic backup schedule: validation and due-time arithmetic.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub const SCHEDULE_KEY: &str = "backup.schedule";
pub const LAST_RUN_KEY: &str = "backup.last_scheduled_run";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BackupSchedule {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub frequency: Frequency,
    /// `sat`..`fri`, required for weekly schedules.
    #[serde(default)]
    pub weekday: Option<String>,
    /// 1..=31, required for monthly schedules. Clamped to the month's length.
    #[serde(default)]
    pub monthday: Option<u32>,
    /// Local time of day, `HH:MM`.
    #[serde(default)]
    pub time: String,
}

pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_ascii_lowercase().as_str() {
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        _ => None,
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (y, m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

impl BackupSchedule {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.time_of_day().is_none() {
            errors.push("time must be HH:MM".to_string());
        }
        match self.frequency {
            Frequency::Daily => {}
            Frequency::Weekly => {
                if self.weekday.as_deref().and_then(parse_weekday).is_none() {
                    errors.push("weekday is required for weekly backups (sat..fri)".to_string());
                }
            }
            Frequency::Monthly => {
                if !self.monthday.is_some_and(|d| (1..=31).contains(&d)) {
                    errors.push("monthday must be between 1 and 31 for monthly backups".to_string());
                }
            }
        }
        errors
    }

    pub fn time_of_day(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(self.time.trim(), "%H:%M").ok()
    }

    /// Whether `date` is a backup day under this schedule.
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        match self.frequency {
            Frequency::Daily => true,
            Frequency::Weekly => self
                .weekday
                .as_deref()
                .and_then(parse_weekday)
                .is_some_and(|w| date.weekday() == w),
            Frequency::Monthly => self.monthday.is_some_and(|d| {
                let last = days_in_month(date.year(), date.month());
                date.day() == d.clamp(1, last)
            }),
        }
    }

    /// The slot on `date`, if the schedule runs that day.
    fn slot_on(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        let time = self.time_of_day()?;
        self.runs_on(date).then(|| date.and_time(time))
    }

    /// Due when today's slot has passed and no run happened since it.
    pub fn is_due(&self, now: NaiveDateTime, last_run: Option<NaiveDateTime>) -> bool {
        if !self.enabled {
            return false;
        }
        match self.slot_on(now.date()) {
            Some(slot) => now >= slot && last_run.is_none_or(|last| last < slot),
            None => false,
        }
    }

    /// Next slot strictly after `now`, looking up to two months ahead.
    pub fn next_run(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if !self.enabled {
            return None;
        }
        (0..=62u64)
            .filter_map(|d| now.date().checked_add_days(Days::new(d)))
            .filter_map(|date| self.slot_on(date))
            .find(|slot| *slot > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn schedule(frequency: Frequency) -> BackupSchedule {
        BackupSchedule { enabled: true, frequency, weekday: None, monthday: None, time: "02:30".into() }
    }

    #[test]
    fn validation_depends_on_frequency() {
        assert!(schedule(Frequency::Daily).validate().is_empty());
        assert_eq!(schedule(Frequency::Weekly).validate().len(), 1);
        assert_eq!(schedule(Frequency::Monthly).validate().len(), 1);

        let mut s = schedule(Frequency::Monthly);
        s.monthday = Some(32);
        assert_eq!(s.validate().len(), 1);
        s.monthday = Some(31);
        s.time = "25:00".into();
        assert_eq!(s.validate(), vec!["time must be HH:MM".to_string()]);
    }

    #[test]
    fn daily_runs_once_after_the_slot() {
        let s = schedule(Frequency::Daily);
        assert!(!s.is_due(at(2024, 5, 1, 2, 29), None));
        assert!(s.is_due(at(2024, 5, 1, 2, 30), None));
        assert!(s.is_due(at(2024, 5, 1, 9, 0), Some(at(2024, 4, 30, 2, 30))));
        assert!(!s.is_due(at(2024, 5, 1, 9, 0), Some(at(2024, 5, 1, 2, 31))));
    }

    #[test]
    fn disabled_is_never_due() {
        let mut s = schedule(Frequency::Daily);
        s.enabled = false;
        assert!(!s.is_due(at(2024, 5, 1, 3, 0), None));
        assert!(s.next_run(at(2024, 5, 1, 3, 0)).is_none());
    }

    #[test]
    fn weekly_matches_the_weekday() {
        let mut s = schedule(Frequency::Weekly);
        s.weekday = Some("sat".into());
        // 2024-05-04 is a Saturday
        assert!(s.is_due(at(2024, 5, 4, 3, 0), None));
        assert!(!s.is_due(at(2024, 5, 5, 3, 0), None));
        assert_eq!(s.next_run(at(2024, 5, 5, 3, 0)), Some(at(2024, 5, 11, 2, 30)));
    }

    #[test]
    fn monthly_clamps_to_month_length() {
        let mut s = schedule(Frequency::Monthly);
        s.monthday = Some(31);
        assert!(s.runs_on(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert!(!s.runs_on(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()));
        assert!(s.runs_on(NaiveDate::from_ymd_opt(2023, 4, 30).unwrap()));
        assert_eq!(s.next_run(at(2024, 1, 31, 3, 0)), Some(at(2024, 2, 29, 2, 30)));
    }

    #[test]
    fn client_shape_round_trips() {
        let s: BackupSchedule =
            serde_json::from_str(r#"{"enabled":true,"frequency":"weekly","weekday":"mon","time":"23:15"}"#).unwrap();
        assert_eq!(s.frequency, Frequency::Weekly);
        assert!(s.validate().is_empty());
    }
}
