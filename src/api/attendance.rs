use crate::api::common::ensure_in_school;
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::role::Role;
use crate::service::attendance_store::MySqlAttendanceStore;
use crate::service::reconciliation::{ReconcileInput, ReconcileOutcome, reconcile};
use crate::service::summary::{AttendanceSummary, summarize};
use crate::utils::filter::{AttendancePage, Filter, Paginated, fetch_page};
use crate::utils::pagination::PageQuery;
use actix_web::{HttpResponse, web};
use chrono::{Duration, Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

const COLUMNS: &str = "id, teacher_id, school_id, date, status, updated_at";
const MAX_SUMMARY_DAYS: i64 = 366;
const DEFAULT_SUMMARY_DAYS: i64 = 30;

#[derive(Deserialize, IntoParams)]
pub struct AttendanceQuery {
    pub school_id: Option<u64>,
    pub teacher_id: Option<u64>,
    /// Present, Pending, Leave-Approved, Absent or Late
    #[param(value_type = Option<String>)]
    pub status: Option<AttendanceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
pub struct SummaryQuery {
    pub school_id: Option<u64>,
    pub teacher_id: Option<u64>,
    /// Defaults to 30 days before `to`
    pub from: Option<NaiveDate>,
    /// Defaults to today
    pub to: Option<NaiveDate>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetAttendance {
    #[schema(example = 7)]
    pub teacher_id: u64,
    pub school_id: Option<u64>,
    #[schema(example = "2026-10-12", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct RecomputeAttendance {
    #[schema(example = 7)]
    pub teacher_id: u64,
    pub school_id: Option<u64>,
    #[schema(example = "2026-10-12", value_type = String, format = "date")]
    pub date: NaiveDate,
}

/// Teachers are limited to their own rows; students have no attendance view.
fn visible_teacher(auth: &AuthUser, requested: Option<u64>) -> AppResult<Option<u64>> {
    match auth.role {
        Role::Student => Err(AppError::forbidden("Students cannot read staff attendance")),
        Role::Teacher => Ok(Some(auth.require_teacher()?)),
        _ => Ok(requested),
    }
}

#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses((status = 200, description = "Paginated attendance records", body = AttendancePage)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> AppResult<HttpResponse> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let filter = Filter::new()
        .and_opt("school_id = ?", auth.scoped_school(query.school_id)?)
        .and_opt("teacher_id = ?", visible_teacher(&auth, query.teacher_id)?)
        .and_opt("status = ?", query.status.map(|s| s.as_ref().to_string()))
        .and_opt("date >= ?", query.from)
        .and_opt("date <= ?", query.to);

    let records: Paginated<AttendanceRecord> = fetch_page(
        pool.get_ref(),
        "attendance_records",
        COLUMNS,
        &filter,
        "date DESC, teacher_id ASC",
        page,
    )
    .await?;

    Ok(HttpResponse::Ok().json(records))
}

/// Start of a summary window ending at `to`; defaults to the 30 days before it.
fn summary_range(from: Option<NaiveDate>, to: NaiveDate) -> AppResult<NaiveDate> {
    let from = match from {
        Some(from) => from,
        None => to
            .checked_sub_signed(Duration::days(DEFAULT_SUMMARY_DAYS))
            .ok_or_else(|| AppError::bad_request("Invalid date range"))?,
    };

    if from > to {
        return Err(AppError::bad_request("from cannot be after to"));
    }
    if (to - from).num_days() >= MAX_SUMMARY_DAYS {
        return Err(AppError::bad_request("Date range is limited to one year"));
    }
    Ok(from)
}

/// Per-day present counts and percentages over a date range.
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Attendance summary", body = AttendanceSummary),
        (status = 400, description = "Invalid date range")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SummaryQuery>,
) -> AppResult<HttpResponse> {
    let to = query.to.unwrap_or_else(|| Local::now().date_naive());
    let from = summary_range(query.from, to)?;

    let filter = Filter::new()
        .and_opt("school_id = ?", auth.scoped_school(query.school_id)?)
        .and_opt("teacher_id = ?", visible_teacher(&auth, query.teacher_id)?)
        .and("date >= ?", from)
        .and("date <= ?", to);

    let sql = format!("SELECT date, status FROM attendance_records{}", filter.clause());
    let rows = filter
        .bind_as(sqlx::query_as::<_, (NaiveDate, String)>(&sql))
        .fetch_all(pool.get_ref())
        .await?;

    let rows: Vec<(NaiveDate, AttendanceStatus)> = rows
        .into_iter()
        .filter_map(|(date, raw)| match raw.parse() {
            Ok(status) => Some((date, status)),
            Err(_) => {
                tracing::warn!(%date, status = %raw, "Skipping unknown attendance status");
                None
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(summarize(&rows, from, to)))
}

/// Admin correction of a single day's status.
#[utoipa::path(
    put,
    path = "/api/attendance",
    request_body = SetAttendance,
    responses(
        (status = 200, description = "Attendance set"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn set_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<SetAttendance>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let school_id = auth.school_for_write(payload.school_id)?;
    ensure_in_school(pool.get_ref(), "teachers", payload.teacher_id, school_id, "Teacher").await?;

    sqlx::query(
        r#"
        INSERT INTO attendance_records (teacher_id, school_id, date, status)
        VALUES (?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE status = VALUES(status), updated_at = NOW()
        "#,
    )
    .bind(payload.teacher_id)
    .bind(school_id)
    .bind(payload.date)
    .bind(payload.status.as_ref())
    .execute(pool.get_ref())
    .await?;

    tracing::info!(
        teacher_id = payload.teacher_id,
        school_id,
        date = %payload.date,
        status = %payload.status,
        by = auth.user_id,
        "Attendance set by admin"
    );

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance updated",
        "status": payload.status,
    })))
}

/// Re-run reconciliation for one teacher and day.
#[utoipa::path(
    post,
    path = "/api/attendance/recompute",
    request_body = RecomputeAttendance,
    responses(
        (status = 200, description = "Reconciliation outcome", body = ReconcileOutcome),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn recompute_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<RecomputeAttendance>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let school_id = auth.school_for_write(payload.school_id)?;
    ensure_in_school(pool.get_ref(), "teachers", payload.teacher_id, school_id, "Teacher").await?;

    let outcome = reconcile(
        &MySqlAttendanceStore::new(pool.get_ref()),
        ReconcileInput {
            teacher_id: payload.teacher_id,
            school_id,
            date: payload.date,
        },
    )
    .await;

    Ok(HttpResponse::Ok().json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::auth::tests::user;

    #[test]
    fn teachers_only_see_themselves() {
        let teacher = user(Role::Teacher, Some(1));
        assert_eq!(visible_teacher(&teacher, Some(99)).unwrap(), Some(7));
        assert_eq!(visible_teacher(&teacher, None).unwrap(), Some(7));
    }

    #[test]
    fn admins_choose_freely_and_students_are_refused() {
        let admin = user(Role::SchoolAdmin, Some(1));
        assert_eq!(visible_teacher(&admin, Some(3)).unwrap(), Some(3));
        assert_eq!(visible_teacher(&admin, None).unwrap(), None);
        assert!(visible_teacher(&user(Role::Student, Some(1)), None).is_err());
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn summary_defaults_to_thirty_days() {
        assert_eq!(summary_range(None, d(2026, 10, 31)).unwrap(), d(2026, 10, 1));
        assert_eq!(
            summary_range(Some(d(2026, 10, 5)), d(2026, 10, 31)).unwrap(),
            d(2026, 10, 5)
        );
    }

    #[test]
    fn summary_default_near_min_date_is_rejected() {
        let to = NaiveDate::MIN + Duration::days(3);
        assert!(matches!(summary_range(None, to), Err(AppError::BadRequest(_))));
        assert_eq!(summary_range(Some(NaiveDate::MIN), to).unwrap(), NaiveDate::MIN);
    }

    #[test]
    fn summary_range_bounds() {
        assert!(summary_range(Some(d(2026, 11, 1)), d(2026, 10, 31)).is_err());
        assert!(summary_range(Some(d(2025, 1, 1)), d(2026, 10, 31)).is_err());
    }
}
