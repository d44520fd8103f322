use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::utils::db_utils::{UpdateTarget, build_update_sql, execute_update};
use actix_web::HttpResponse;
use serde_json::{Value, json};
use sqlx::mysql::MySqlRow;
use sqlx::{FromRow, MySqlPool};

/// Fetch one tenant row by id. Rows in another school read as missing.
pub async fn fetch_scoped<T>(
    pool: &MySqlPool,
    auth: &AuthUser,
    table: &str,
    columns: &str,
    id: u64,
    what: &str,
) -> AppResult<T>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    let scope = auth.scoped_school(None)?;
    let mut sql = format!("SELECT {columns} FROM {table} WHERE id = ?");
    if scope.is_some() {
        sql.push_str(" AND school_id = ?");
    }

    let mut q = sqlx::query_as::<_, T>(&sql).bind(id);
    if let Some(school_id) = scope {
        q = q.bind(school_id);
    }

    q.fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{what} not found")))
}

/// Partial update of a tenant row through the column whitelist.
pub async fn update_scoped(
    pool: &MySqlPool,
    auth: &AuthUser,
    table: &str,
    id: u64,
    payload: &Value,
    allowed: &[&str],
    what: &str,
) -> AppResult<HttpResponse> {
    let target = UpdateTarget {
        table,
        id,
        school_id: auth.scoped_school(None)?,
    };
    let update = build_update_sql(&target, payload, allowed)?;

    match execute_update(pool, update).await {
        Ok(0) => Err(AppError::not_found(format!("{what} not found or unchanged"))),
        Ok(_) => Ok(HttpResponse::Ok().json(json!({ "message": format!("{what} updated") }))),
        Err(e) if crate::db::is_unique_violation(&e) => {
            Err(AppError::Conflict(format!("{what} already exists")))
        }
        Err(e) if crate::db::is_foreign_key_violation(&e) => Err(AppError::bad_request(
            format!("{what} references a record that does not exist"),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_scoped(
    pool: &MySqlPool,
    auth: &AuthUser,
    table: &str,
    id: u64,
    what: &str,
) -> AppResult<HttpResponse> {
    let scope = auth.scoped_school(None)?;
    let mut sql = format!("DELETE FROM {table} WHERE id = ?");
    if scope.is_some() {
        sql.push_str(" AND school_id = ?");
    }

    let mut q = sqlx::query(&sql).bind(id);
    if let Some(school_id) = scope {
        q = q.bind(school_id);
    }

    let result = q.execute(pool).await.map_err(|e| {
        // rows still referenced elsewhere surface as FK violations
        if crate::db::is_foreign_key_violation(&e) {
            AppError::Conflict(format!("{what} is still referenced"))
        } else {
            e.into()
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("{what} not found")));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

/// 201 body for inserts: `{"message": ..., "id": ...}`.
pub fn created(what: &str, id: u64) -> HttpResponse {
    HttpResponse::Created().json(json!({
        "message": format!("{what} created"),
        "id": id,
    }))
}

pub fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        Err(AppError::bad_request(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

/// Inserts referencing another tenant row must stay inside the same school.
pub async fn ensure_in_school(
    pool: &MySqlPool,
    table: &str,
    id: u64,
    school_id: u64,
    what: &str,
) -> AppResult<()> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE id = ? AND school_id = ?");
    let hits = sqlx::query_scalar::<_, i64>(&sql)
        .bind(id)
        .bind(school_id)
        .fetch_one(pool)
        .await?;

    if hits == 0 {
        return Err(AppError::bad_request(format!("{what} does not belong to this school")));
    }
    Ok(())
}
