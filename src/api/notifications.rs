use crate::api::common::{created, require_non_empty};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::notification::Notification;
use crate::utils::filter::{Filter, NotificationPage, Paginated, fetch_page};
use crate::utils::pagination::PageQuery;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const COLUMNS: &str = "id, school_id, recipient_user_id, title, body, is_read, created_at";

#[derive(Deserialize, ToSchema)]
pub struct CreateNotification {
    /// Omit to broadcast to the whole school
    pub recipient_user_id: Option<u64>,
    /// Required for system admins broadcasting to a school
    pub school_id: Option<u64>,
    #[schema(example = "Staff meeting")]
    pub title: String,
    #[schema(example = "Friday 3pm in the library")]
    pub body: String,
}

#[derive(Deserialize, IntoParams)]
pub struct NotificationQuery {
    /// Only unread notifications
    pub unread: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = CreateNotification,
    responses(
        (status = 201, description = "Notification created"),
        (status = 400, description = "Missing title, body or school"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Recipient not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notification"
)]
pub async fn create_notification(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateNotification>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    require_non_empty("title", &payload.title)?;
    require_non_empty("body", &payload.body)?;

    let school_id = match payload.recipient_user_id {
        Some(user_id) => {
            let recipient_school = sqlx::query_scalar::<_, Option<u64>>(
                "SELECT school_id FROM users WHERE id = ?",
            )
            .bind(user_id)
            .fetch_optional(pool.get_ref())
            .await?
            .ok_or_else(|| AppError::not_found("Recipient not found"))?;

            // school admins can only reach their own school's users
            match recipient_school {
                Some(id) if auth.can_access_school(id) => Some(id),
                None if auth.require_system_admin().is_ok() => None,
                _ => return Err(AppError::not_found("Recipient not found")),
            }
        }
        None => Some(auth.school_for_write(payload.school_id)?),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO notifications (school_id, recipient_user_id, title, body)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(school_id)
    .bind(payload.recipient_user_id)
    .bind(payload.title.trim())
    .bind(payload.body.trim())
    .execute(pool.get_ref())
    .await?;

    tracing::info!(
        notification_id = result.last_insert_id(),
        recipient = ?payload.recipient_user_id,
        school_id = ?school_id,
        "Notification created"
    );
    Ok(created("Notification", result.last_insert_id()))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationQuery),
    responses((status = 200, description = "Own notifications and school broadcasts", body = NotificationPage)),
    security(("bearer_auth" = [])),
    tag = "Notification"
)]
pub async fn list_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<NotificationQuery>,
) -> AppResult<HttpResponse> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let mut filter = match auth.school_id {
        Some(school_id) => Filter::new().and_many(
            "(recipient_user_id = ? OR (recipient_user_id IS NULL AND school_id = ?))",
            [auth.user_id, school_id],
        ),
        None => Filter::new().and("recipient_user_id = ?", auth.user_id),
    };
    if query.unread == Some(true) {
        filter = filter.and("is_read = ?", false);
    }

    let notifications: Paginated<Notification> = fetch_page(
        pool.get_ref(),
        "notifications",
        COLUMNS,
        &filter,
        "created_at DESC",
        page,
    )
    .await?;

    Ok(HttpResponse::Ok().json(notifications))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{notification_id}/read",
    params(("notification_id" = u64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notification"
)]
pub async fn mark_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let notification_id = path.into_inner();

    // Broadcasts carry a single read flag, shared by the school.
    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET is_read = TRUE
        WHERE id = ?
        AND (recipient_user_id = ? OR (recipient_user_id IS NULL AND school_id = ?))
        "#,
    )
    .bind(notification_id)
    .bind(auth.user_id)
    .bind(auth.school_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        let exists = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE id = ?
            AND (recipient_user_id = ? OR (recipient_user_id IS NULL AND school_id = ?))
            "#,
        )
        .bind(notification_id)
        .bind(auth.user_id)
        .bind(auth.school_id)
        .fetch_one(pool.get_ref())
        .await?;

        // already read is not an error
        if exists == 0 {
            return Err(AppError::not_found("Notification not found"));
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Marked as read" })))
}
