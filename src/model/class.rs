use serde::Serialize;
use utoipa::ToSchema;

/// A class (grade + section) taught at a school.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct SchoolClass {
    pub id: u64,
    pub school_id: u64,
    #[schema(example = "5A")]
    pub name: String,
    #[schema(example = "Grade 5")]
    pub grade: String,
    #[schema(nullable = true)]
    pub section: Option<String>,
    #[schema(nullable = true)]
    pub homeroom_teacher_id: Option<u64>,
}
