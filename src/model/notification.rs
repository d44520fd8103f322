use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Addressed to one user, or broadcast to a school when `recipient_user_id` is null.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Notification {
    pub id: u64,
    #[schema(nullable = true)]
    pub school_id: Option<u64>,
    #[schema(nullable = true)]
    pub recipient_user_id: Option<u64>,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
