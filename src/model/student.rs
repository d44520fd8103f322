use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Student {
    pub id: u64,
    pub school_id: u64,
    #[schema(nullable = true)]
    pub class_id: Option<u64>,
    pub first_name: String,
    pub last_name: String,
    #[schema(example = "Grade 5")]
    pub grade: String,
    #[schema(nullable = true)]
    pub roll_number: Option<String>,
    #[schema(example = "active")]
    pub status: String,
}
