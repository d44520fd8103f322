use crate::api::common::{created, require_non_empty};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::school::School;
use crate::utils::db_utils::{UpdateTarget, build_update_sql, execute_update};
use crate::utils::filter::{Filter, Paginated, SchoolPage, fetch_page};
use crate::utils::pagination::PageQuery;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const COLUMNS: &str = "id, name, code, address, is_active, created_at";

#[derive(Deserialize, ToSchema)]
pub struct CreateSchool {
    #[schema(example = "Riverside Primary")]
    pub name: String,
    #[schema(example = "RSP-01")]
    pub code: String,
    #[schema(example = "12 River Road")]
    pub address: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct SchoolQuery {
    pub is_active: Option<bool>,
    /// Matches name or code
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/schools",
    request_body = CreateSchool,
    responses(
        (status = 201, description = "School created", body = Object, example = json!({
            "message": "School created", "id": 1
        })),
        (status = 403, description = "System admin only"),
        (status = 409, description = "School code already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "School"
)]
pub async fn create_school(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateSchool>,
) -> AppResult<HttpResponse> {
    auth.require_system_admin()?;
    require_non_empty("name", &payload.name)?;
    require_non_empty("code", &payload.code)?;

    let result = sqlx::query("INSERT INTO schools (name, code, address) VALUES (?, ?, ?)")
        .bind(payload.name.trim())
        .bind(payload.code.trim())
        .bind(payload.address.as_deref())
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                AppError::Conflict("School code already exists".into())
            } else {
                e.into()
            }
        })?;

    tracing::info!(school_id = result.last_insert_id(), "School created");
    Ok(created("School", result.last_insert_id()))
}

#[utoipa::path(
    get,
    path = "/api/schools",
    params(SchoolQuery),
    responses((status = 200, description = "Paginated schools", body = SchoolPage)),
    security(("bearer_auth" = [])),
    tag = "School"
)]
pub async fn list_schools(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SchoolQuery>,
) -> AppResult<HttpResponse> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let mut filter = Filter::new()
        .and_opt("id = ?", auth.scoped_school(None)?)
        .and_opt("is_active = ?", query.is_active);

    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let like = format!("%{}%", search.trim());
        filter = filter.and_many("(name LIKE ? OR code LIKE ?)", [like.clone(), like]);
    }

    let schools: Paginated<School> =
        fetch_page(pool.get_ref(), "schools", COLUMNS, &filter, "name ASC", page).await?;

    Ok(HttpResponse::Ok().json(schools))
}

#[utoipa::path(
    get,
    path = "/api/schools/{school_id}",
    params(("school_id" = u64, Path, description = "School ID")),
    responses(
        (status = 200, description = "School found", body = School),
        (status = 403, description = "No access to this school"),
        (status = 404, description = "School not found")
    ),
    security(("bearer_auth" = [])),
    tag = "School"
)]
pub async fn get_school(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let school_id = path.into_inner();
    auth.require_school_access(school_id)?;

    let sql = format!("SELECT {COLUMNS} FROM schools WHERE id = ?");
    let school = sqlx::query_as::<_, School>(&sql)
        .bind(school_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("School not found"))?;

    Ok(HttpResponse::Ok().json(school))
}

#[utoipa::path(
    put,
    path = "/api/schools/{school_id}",
    params(("school_id" = u64, Path, description = "School ID")),
    request_body(content = Object, description = "Any of: name, code, address, is_active"),
    responses(
        (status = 200, description = "School updated"),
        (status = 400, description = "Unknown or empty fields"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "School not found")
    ),
    security(("bearer_auth" = [])),
    tag = "School"
)]
pub async fn update_school(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let school_id = path.into_inner();
    if !auth.is_admin_of(school_id) {
        return Err(AppError::forbidden("Admin of this school only"));
    }

    // the school code is the tenant's external identifier
    let allowed: &[&str] = if auth.require_system_admin().is_ok() {
        &["name", "code", "address", "is_active"]
    } else {
        &["name", "address"]
    };

    let target = UpdateTarget {
        table: "schools",
        id: school_id,
        school_id: None,
    };
    let update = build_update_sql(&target, &payload, allowed)?;

    match execute_update(pool.get_ref(), update).await {
        Ok(0) => Err(AppError::not_found("School not found or unchanged")),
        Ok(_) => Ok(HttpResponse::Ok().json(json!({ "message": "School updated" }))),
        Err(e) if crate::db::is_unique_violation(&e) => {
            Err(AppError::Conflict("School code already exists".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/schools/{school_id}",
    params(("school_id" = u64, Path, description = "School ID")),
    responses(
        (status = 200, description = "School deleted"),
        (status = 403, description = "System admin only"),
        (status = 404, description = "School not found"),
        (status = 409, description = "School still has dependent rows")
    ),
    security(("bearer_auth" = [])),
    tag = "School"
)]
pub async fn delete_school(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_system_admin()?;
    let school_id = path.into_inner();

    let result = sqlx::query("DELETE FROM schools WHERE id = ?")
        .bind(school_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            if crate::db::is_foreign_key_violation(&e) {
                AppError::Conflict("School still has dependent rows".into())
            } else {
                e.into()
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("School not found"));
    }

    tracing::info!(school_id, "School deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
