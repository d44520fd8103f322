use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// What a teacher taught one grade (or class) on one day.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct DailyReport {
    pub id: u64,
    pub teacher_id: u64,
    pub school_id: u64,
    #[schema(example = "2026-10-12", value_type = String, format = "date")]
    pub report_date: NaiveDate,
    #[schema(example = "Grade 5")]
    pub grade: String,
    #[schema(nullable = true)]
    pub class_id: Option<u64>,
    #[schema(example = "Mathematics")]
    pub subject: String,
    #[schema(example = "Long division")]
    pub topics_covered: String,
    #[schema(nullable = true)]
    pub homework: Option<String>,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
