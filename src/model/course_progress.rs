use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct CourseProgress {
    pub id: u64,
    pub school_id: u64,
    pub class_id: u64,
    #[schema(example = "Science")]
    pub subject: String,
    #[schema(nullable = true)]
    pub teacher_id: Option<u64>,
    #[schema(example = 45)]
    pub percent_complete: u8,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub updated_at: Option<DateTime<Utc>>,
}
