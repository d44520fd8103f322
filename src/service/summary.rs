use crate::model::attendance::AttendanceStatus;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub present: u32,
    pub on_leave: u32,
    pub total: u32,
    pub present_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
    pub days: Vec<DayBucket>,
    pub present: u32,
    pub total: u32,
    pub present_percentage: f64,
}

/// One decimal place; an empty bucket is 0%.
pub fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (f64::from(part) * 1000.0 / f64::from(whole)).round() / 10.0
}

fn attended(status: AttendanceStatus) -> bool {
    matches!(status, AttendanceStatus::Present | AttendanceStatus::Late)
}

/// Buckets attendance rows per day over `[from, to]`. Days without rows are
/// kept as empty buckets so charts get a continuous axis; rows outside the
/// range are ignored.
pub fn summarize(
    rows: &[(NaiveDate, AttendanceStatus)],
    from: NaiveDate,
    to: NaiveDate,
) -> AttendanceSummary {
    let mut buckets: BTreeMap<NaiveDate, (u32, u32, u32)> = from
        .iter_days()
        .take_while(|d| *d <= to)
        .map(|d| (d, (0, 0, 0)))
        .collect();

    for (date, status) in rows {
        if let Some((present, on_leave, total)) = buckets.get_mut(date) {
            *total += 1;
            if attended(*status) {
                *present += 1;
            } else if *status == AttendanceStatus::LeaveApproved {
                *on_leave += 1;
            }
        }
    }

    let days: Vec<DayBucket> = buckets
        .into_iter()
        .map(|(date, (present, on_leave, total))| DayBucket {
            date,
            present,
            on_leave,
            total,
            present_percentage: percentage(present, total),
        })
        .collect();

    let present = days.iter().map(|d| d.present).sum();
    let total = days.iter().map(|d| d.total).sum();

    AttendanceSummary {
        from,
        to,
        days,
        present,
        total,
        present_percentage: percentage(present, total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(4, 4), 100.0);
    }

    #[test]
    fn buckets_every_day_in_range() {
        let rows = vec![
            (day(12), AttendanceStatus::Present),
            (day(12), AttendanceStatus::Absent),
            (day(13), AttendanceStatus::LeaveApproved),
            (day(13), AttendanceStatus::Late),
            (day(20), AttendanceStatus::Present),
        ];
        let summary = summarize(&rows, day(12), day(14));

        assert_eq!(summary.days.len(), 3);
        assert_eq!(summary.days[0].present, 1);
        assert_eq!(summary.days[0].total, 2);
        assert_eq!(summary.days[0].present_percentage, 50.0);
        assert_eq!(summary.days[1].on_leave, 1);
        assert_eq!(summary.days[1].present, 1);
        assert_eq!(summary.days[2].total, 0);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.present_percentage, 50.0);
    }

    #[test]
    fn inverted_range_is_empty() {
        let summary = summarize(&[(day(12), AttendanceStatus::Present)], day(14), day(12));
        assert!(summary.days.is_empty());
        assert_eq!(summary.present_percentage, 0.0);
    }
}
