use crate::api::common::{
    created, delete_scoped, ensure_in_school, fetch_scoped, require_non_empty, update_scoped,
};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::class::SchoolClass;
use crate::utils::filter::{ClassPage, Filter, Paginated, fetch_page};
use crate::utils::pagination::PageQuery;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const COLUMNS: &str = "id, school_id, name, grade, section, homeroom_teacher_id";
const UPDATABLE: &[&str] = &["name", "grade", "section", "homeroom_teacher_id"];

#[derive(Deserialize, ToSchema)]
pub struct CreateClass {
    pub school_id: Option<u64>,
    #[schema(example = "5A")]
    pub name: String,
    #[schema(example = "Grade 5")]
    pub grade: String,
    #[schema(example = "A")]
    pub section: Option<String>,
    pub homeroom_teacher_id: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct ClassQuery {
    pub school_id: Option<u64>,
    pub grade: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/classes",
    request_body = CreateClass,
    responses(
        (status = 201, description = "Class created"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Class name already used")
    ),
    security(("bearer_auth" = [])),
    tag = "Class"
)]
pub async fn create_class(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateClass>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let school_id = auth.school_for_write(payload.school_id)?;
    require_non_empty("name", &payload.name)?;
    require_non_empty("grade", &payload.grade)?;

    if let Some(teacher_id) = payload.homeroom_teacher_id {
        ensure_in_school(pool.get_ref(), "teachers", teacher_id, school_id, "Teacher").await?;
    }

    let result = sqlx::query(
        r#"
        INSERT INTO classes (school_id, name, grade, section, homeroom_teacher_id)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(school_id)
    .bind(payload.name.trim())
    .bind(payload.grade.trim())
    .bind(payload.section.as_deref())
    .bind(payload.homeroom_teacher_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            AppError::Conflict("Class name already used in this school".into())
        } else {
            e.into()
        }
    })?;

    Ok(created("Class", result.last_insert_id()))
}

#[utoipa::path(
    get,
    path = "/api/classes",
    params(ClassQuery),
    responses((status = 200, description = "Paginated classes", body = ClassPage)),
    security(("bearer_auth" = [])),
    tag = "Class"
)]
pub async fn list_classes(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ClassQuery>,
) -> AppResult<HttpResponse> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let filter = Filter::new()
        .and_opt("school_id = ?", auth.scoped_school(query.school_id)?)
        .and_opt("grade = ?", query.grade.as_deref());

    let classes: Paginated<SchoolClass> = fetch_page(
        pool.get_ref(),
        "classes",
        COLUMNS,
        &filter,
        "grade ASC, name ASC",
        page,
    )
    .await?;

    Ok(HttpResponse::Ok().json(classes))
}

#[utoipa::path(
    get,
    path = "/api/classes/{class_id}",
    params(("class_id" = u64, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class found", body = SchoolClass),
        (status = 404, description = "Class not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Class"
)]
pub async fn get_class(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let class: SchoolClass =
        fetch_scoped(pool.get_ref(), &auth, "classes", COLUMNS, path.into_inner(), "Class").await?;

    Ok(HttpResponse::Ok().json(class))
}

#[utoipa::path(
    put,
    path = "/api/classes/{class_id}",
    params(("class_id" = u64, Path, description = "Class ID")),
    request_body(content = Object, description = "Any of: name, grade, section, homeroom_teacher_id"),
    responses(
        (status = 200, description = "Class updated"),
        (status = 404, description = "Class not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Class"
)]
pub async fn update_class(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let class_id = path.into_inner();

    if let Some(teacher_id) = payload.get("homeroom_teacher_id").and_then(Value::as_u64) {
        let class: SchoolClass =
            fetch_scoped(pool.get_ref(), &auth, "classes", COLUMNS, class_id, "Class").await?;
        ensure_in_school(pool.get_ref(), "teachers", teacher_id, class.school_id, "Teacher").await?;
    }

    update_scoped(
        pool.get_ref(),
        &auth,
        "classes",
        class_id,
        &payload,
        UPDATABLE,
        "Class",
    )
    .await
}

#[utoipa::path(
    delete,
    path = "/api/classes/{class_id}",
    params(("class_id" = u64, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class deleted"),
        (status = 404, description = "Class not found"),
        (status = 409, description = "Class still referenced")
    ),
    security(("bearer_auth" = [])),
    tag = "Class"
)]
pub async fn delete_class(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    delete_scoped(pool.get_ref(), &auth, "classes", path.into_inner(), "Class").await
}
