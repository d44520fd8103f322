use crate::api::common::require_non_empty;
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::class::SchoolClass;
use crate::model::course_progress::CourseProgress;
use crate::model::role::Role;
use crate::utils::filter::{Filter, Paginated, ProgressPage, fetch_page};
use crate::utils::pagination::PageQuery;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const COLUMNS: &str =
    "id, school_id, class_id, subject, teacher_id, percent_complete, notes, updated_at";

#[derive(Deserialize, ToSchema)]
pub struct UpsertProgress {
    #[schema(example = 3)]
    pub class_id: u64,
    #[schema(example = "Science")]
    pub subject: String,
    #[schema(example = 45, minimum = 0, maximum = 100)]
    pub percent_complete: i64,
    pub notes: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct ProgressQuery {
    pub school_id: Option<u64>,
    pub class_id: Option<u64>,
    pub subject: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

fn validate_percent(value: i64) -> AppResult<u8> {
    u8::try_from(value)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| AppError::bad_request("percent_complete must be between 0 and 100"))
}

/// A teacher may record progress for a class they are scheduled into or
/// are homeroom teacher of.
async fn teaches_class(pool: &MySqlPool, teacher_id: u64, class: &SchoolClass) -> AppResult<bool> {
    if class.homeroom_teacher_id == Some(teacher_id) {
        return Ok(true);
    }

    let hits = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM scheduled_periods
        WHERE teacher_id = ? AND class_id = ? AND is_active = TRUE
        "#,
    )
    .bind(teacher_id)
    .bind(class.id)
    .fetch_one(pool)
    .await?;

    Ok(hits > 0)
}

#[utoipa::path(
    put,
    path = "/api/progress",
    request_body = UpsertProgress,
    responses(
        (status = 200, description = "Progress recorded", body = Object, example = json!({
            "message": "Progress recorded", "class_id": 3, "subject": "Science", "percent_complete": 45
        })),
        (status = 400, description = "Invalid percentage or subject"),
        (status = 403, description = "Not allowed to record progress for this class"),
        (status = 404, description = "Class not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Progress"
)]
pub async fn upsert_progress(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<UpsertProgress>,
) -> AppResult<HttpResponse> {
    require_non_empty("subject", &payload.subject)?;
    let percent = validate_percent(payload.percent_complete)?;

    let class = sqlx::query_as::<_, SchoolClass>(
        "SELECT id, school_id, name, grade, section, homeroom_teacher_id FROM classes WHERE id = ?",
    )
    .bind(payload.class_id)
    .fetch_optional(pool.get_ref())
    .await?
    .filter(|c| auth.can_access_school(c.school_id))
    .ok_or_else(|| AppError::not_found("Class not found"))?;

    let teacher_id = match auth.role {
        Role::Teacher => {
            let teacher_id = auth.require_teacher()?;
            if !teaches_class(pool.get_ref(), teacher_id, &class).await? {
                return Err(AppError::forbidden("You do not teach this class"));
            }
            Some(teacher_id)
        }
        Role::SystemAdmin | Role::SchoolAdmin => None,
        Role::Student => return Err(AppError::forbidden("Students cannot record progress")),
    };

    let subject = payload.subject.trim();
    sqlx::query(
        r#"
        INSERT INTO course_progress
            (school_id, class_id, subject, teacher_id, percent_complete, notes)
        VALUES (?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            teacher_id = COALESCE(VALUES(teacher_id), teacher_id),
            percent_complete = VALUES(percent_complete),
            notes = VALUES(notes),
            updated_at = NOW()
        "#,
    )
    .bind(class.school_id)
    .bind(class.id)
    .bind(subject)
    .bind(teacher_id)
    .bind(percent)
    .bind(payload.notes.as_deref())
    .execute(pool.get_ref())
    .await?;

    tracing::info!(class_id = class.id, subject, percent, "Course progress recorded");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Progress recorded",
        "class_id": class.id,
        "subject": subject,
        "percent_complete": percent,
    })))
}

#[utoipa::path(
    get,
    path = "/api/progress",
    params(ProgressQuery),
    responses(
        (status = 200, description = "Paginated course progress", body = ProgressPage),
        (status = 403, description = "No access to this school")
    ),
    security(("bearer_auth" = [])),
    tag = "Progress"
)]
pub async fn list_progress(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ProgressQuery>,
) -> AppResult<HttpResponse> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let filter = Filter::new()
        .and_opt("school_id = ?", auth.scoped_school(query.school_id)?)
        .and_opt("class_id = ?", query.class_id)
        .and_opt(
            "subject = ?",
            query
                .subject
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        );

    let progress: Paginated<CourseProgress> = fetch_page(
        pool.get_ref(),
        "course_progress",
        COLUMNS,
        &filter,
        "class_id ASC, subject ASC",
        page,
    )
    .await?;

    Ok(HttpResponse::Ok().json(progress))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_bounds_are_inclusive() {
        assert_eq!(validate_percent(0).unwrap(), 0);
        assert_eq!(validate_percent(100).unwrap(), 100);
    }

    #[test]
    fn percent_out_of_range_is_rejected() {
        assert!(matches!(validate_percent(101), Err(AppError::BadRequest(_))));
        assert!(matches!(validate_percent(-1), Err(AppError::BadRequest(_))));
        assert!(validate_percent(1_000).is_err());
    }
}
