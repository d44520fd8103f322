use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Riverside Primary",
        "code": "RSP-01",
        "address": "12 River Road",
        "is_active": true,
        "created_at": "2026-01-01T00:00:00Z"
    })
)]
pub struct School {
    pub id: u64,
    pub name: String,
    pub code: String,
    #[schema(nullable = true)]
    pub address: Option<String>,
    pub is_active: bool,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub created_at: Option<DateTime<Utc>>,
}
