use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct Teacher {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = 1)]
    pub school_id: u64,
    #[schema(example = "Amina")]
    pub first_name: String,
    #[schema(example = "Rahman")]
    pub last_name: String,
    #[schema(example = "amina@school.edu")]
    pub email: String,
    #[schema(nullable = true)]
    pub phone: Option<String>,
    #[schema(example = "Mathematics", nullable = true)]
    pub subject: Option<String>,
    #[schema(example = "active")]
    pub status: String,
}
