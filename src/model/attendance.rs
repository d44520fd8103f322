use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum AttendanceStatus {
    Present,
    Pending,
    #[serde(rename = "Leave-Approved")]
    #[strum(serialize = "Leave-Approved")]
    LeaveApproved,
    Absent,
    Late,
}

impl TryFrom<String> for AttendanceStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One row per (teacher, school, date); the store enforces uniqueness.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub teacher_id: u64,
    pub school_id: u64,
    #[schema(example = "2026-10-12", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leave_approved_uses_hyphenated_name() {
        assert_eq!(AttendanceStatus::LeaveApproved.as_ref(), "Leave-Approved");
        assert_eq!(
            "Leave-Approved".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::LeaveApproved
        );
        assert_eq!(
            serde_json::to_string(&AttendanceStatus::LeaveApproved).unwrap(),
            "\"Leave-Approved\""
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(AttendanceStatus::try_from("Holiday".to_string()).is_err());
    }
}
