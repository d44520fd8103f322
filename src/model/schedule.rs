use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

/// A recurring class slot for a teacher on one day of the week.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct ScheduledPeriod {
    pub id: u64,
    pub school_id: u64,
    pub teacher_id: u64,
    #[schema(nullable = true)]
    pub class_id: Option<u64>,
    #[schema(example = "Monday")]
    pub day_of_week: String,
    #[schema(example = "Grade 5")]
    pub grade: String,
    #[schema(example = "Mathematics")]
    pub subject: String,
    #[schema(example = "08:00:00", value_type = String, format = "time")]
    pub start_time: NaiveTime,
    #[schema(example = "08:45:00", value_type = String, format = "time")]
    pub end_time: NaiveTime,
    pub is_active: bool,
}

/// Full English day name as stored in `scheduled_periods.day_of_week`.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn day_of_week(date: NaiveDate) -> &'static str {
    weekday_name(date.weekday())
}

/// Accepts full or abbreviated day names in any case.
pub fn normalize_day_name(raw: &str) -> Option<&'static str> {
    raw.trim().parse::<Weekday>().ok().map(weekday_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_of_week_uses_full_names() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        assert_eq!(day_of_week(monday), "Monday");
        assert_eq!(day_of_week(monday.succ_opt().unwrap()), "Tuesday");
    }

    #[test]
    fn normalize_accepts_short_and_mixed_case() {
        assert_eq!(normalize_day_name("wed"), Some("Wednesday"));
        assert_eq!(normalize_day_name(" FRIDAY "), Some("Friday"));
        assert_eq!(normalize_day_name("someday"), None);
    }
}
