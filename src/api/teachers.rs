use crate::api::common::{created, delete_scoped, fetch_scoped, require_non_empty, update_scoped};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::teacher::Teacher;
use crate::utils::filter::{Filter, Paginated, TeacherPage, fetch_page};
use crate::utils::pagination::PageQuery;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const COLUMNS: &str = "id, school_id, first_name, last_name, email, phone, subject, status";
const UPDATABLE: &[&str] = &["first_name", "last_name", "email", "phone", "subject", "status"];

#[derive(Deserialize, ToSchema)]
pub struct CreateTeacher {
    /// Required for system admins; defaults to the caller's school otherwise
    #[schema(example = 1)]
    pub school_id: Option<u64>,
    #[schema(example = "Amina")]
    pub first_name: String,
    #[schema(example = "Rahman")]
    pub last_name: String,
    #[schema(example = "amina@school.edu", format = "email")]
    pub email: String,
    pub phone: Option<String>,
    #[schema(example = "Mathematics")]
    pub subject: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct TeacherQuery {
    pub school_id: Option<u64>,
    pub status: Option<String>,
    /// Matches first name, last name or email
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/teachers",
    request_body = CreateTeacher,
    responses(
        (status = 201, description = "Teacher created"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn create_teacher(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTeacher>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let school_id = auth.school_for_write(payload.school_id)?;
    require_non_empty("first_name", &payload.first_name)?;
    require_non_empty("email", &payload.email)?;

    let result = sqlx::query(
        r#"
        INSERT INTO teachers (school_id, first_name, last_name, email, phone, subject)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(school_id)
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.email.trim())
    .bind(payload.phone.as_deref())
    .bind(payload.subject.as_deref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            AppError::Conflict("Email already registered".into())
        } else {
            e.into()
        }
    })?;

    tracing::info!(school_id, teacher_id = result.last_insert_id(), "Teacher created");
    Ok(created("Teacher", result.last_insert_id()))
}

#[utoipa::path(
    get,
    path = "/api/teachers",
    params(TeacherQuery),
    responses((status = 200, description = "Paginated teachers", body = TeacherPage)),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn list_teachers(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TeacherQuery>,
) -> AppResult<HttpResponse> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let mut filter = Filter::new()
        .and_opt("school_id = ?", auth.scoped_school(query.school_id)?)
        .and_opt("status = ?", query.status.as_deref());

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let like = format!("%{}%", search.trim());
        filter = filter.and_many(
            "(first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)",
            [like.clone(), like.clone(), like],
        );
    }

    let teachers: Paginated<Teacher> = fetch_page(
        pool.get_ref(),
        "teachers",
        COLUMNS,
        &filter,
        "last_name ASC, first_name ASC",
        page,
    )
    .await?;

    Ok(HttpResponse::Ok().json(teachers))
}

#[utoipa::path(
    get,
    path = "/api/teachers/{teacher_id}",
    params(("teacher_id" = u64, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Teacher found", body = Teacher),
        (status = 404, description = "Teacher not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn get_teacher(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let teacher: Teacher = fetch_scoped(
        pool.get_ref(),
        &auth,
        "teachers",
        COLUMNS,
        path.into_inner(),
        "Teacher",
    )
    .await?;

    Ok(HttpResponse::Ok().json(teacher))
}

#[utoipa::path(
    put,
    path = "/api/teachers/{teacher_id}",
    params(("teacher_id" = u64, Path, description = "Teacher ID")),
    request_body(content = Object, description = "Any of: first_name, last_name, email, phone, subject, status"),
    responses(
        (status = 200, description = "Teacher updated"),
        (status = 400, description = "Unknown or empty fields"),
        (status = 404, description = "Teacher not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn update_teacher(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    update_scoped(
        pool.get_ref(),
        &auth,
        "teachers",
        path.into_inner(),
        &payload,
        UPDATABLE,
        "Teacher",
    )
    .await
}

#[utoipa::path(
    delete,
    path = "/api/teachers/{teacher_id}",
    params(("teacher_id" = u64, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Teacher deleted"),
        (status = 404, description = "Teacher not found"),
        (status = 409, description = "Teacher still referenced")
    ),
    security(("bearer_auth" = [])),
    tag = "Teacher"
)]
pub async fn delete_teacher(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    delete_scoped(pool.get_ref(), &auth, "teachers", path.into_inner(), "Teacher").await
}
