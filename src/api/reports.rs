use crate::api::common::{ensure_in_school, fetch_scoped, require_non_empty, update_scoped};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::daily_report::DailyReport;
use crate::model::role::Role;
use crate::service::attendance_store::{MySqlAttendanceStore, REPORT_COLUMNS};
use crate::service::reconciliation::{ReconcileInput, ReconcileOutcome, reconcile};
use crate::utils::filter::{Filter, Paginated, ReportPage, fetch_page};
use crate::utils::pagination::PageQuery;
use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::{IntoParams, ToSchema};

const UPDATABLE: &[&str] = &["subject", "topics_covered", "homework", "notes"];

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReport {
    /// Defaults to today
    #[schema(example = "2026-10-12", value_type = Option<String>, format = "date")]
    pub report_date: Option<NaiveDate>,
    #[schema(example = "Grade 5")]
    pub grade: String,
    pub class_id: Option<u64>,
    #[schema(example = "Mathematics")]
    pub subject: String,
    #[schema(example = "Long division")]
    pub topics_covered: String,
    pub homework: Option<String>,
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CreateReportResponse {
    #[schema(example = "Daily report submitted")]
    pub message: String,
    pub report: DailyReport,
    pub attendance: ReconcileOutcome,
}

#[derive(Deserialize, IntoParams)]
pub struct ReportQuery {
    pub school_id: Option<u64>,
    pub teacher_id: Option<u64>,
    pub grade: Option<String>,
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Submit a daily report, then recompute the teacher's attendance for that day.
#[utoipa::path(
    post,
    path = "/api/reports",
    request_body = CreateReport,
    responses(
        (status = 201, description = "Report saved; attendance progress attached", body = CreateReportResponse),
        (status = 400, description = "Invalid report"),
        (status = 403, description = "No teacher profile"),
        (status = 409, description = "Report for this grade and date already exists"),
        (status = 500, description = "Report could not be saved", body = Object, example = json!({
            "error": "Failed to save daily report",
            "hint": "Check the report fields and submit again"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
#[instrument(
    name = "create_report",
    skip(auth, pool, payload),
    fields(user_id = auth.user_id)
)]
pub async fn create_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateReport>,
) -> AppResult<HttpResponse> {
    let teacher_id = auth.require_teacher()?;
    let school_id = auth
        .school_id
        .ok_or_else(|| AppError::forbidden("Account has no school"))?;

    require_non_empty("grade", &payload.grade)?;
    require_non_empty("subject", &payload.subject)?;
    require_non_empty("topics_covered", &payload.topics_covered)?;

    let today = Local::now().date_naive();
    let report_date = payload.report_date.unwrap_or(today);
    if report_date > today {
        return Err(AppError::bad_request("report_date cannot be in the future"));
    }

    if let Some(class_id) = payload.class_id {
        ensure_in_school(pool.get_ref(), "classes", class_id, school_id, "Class").await?;
    }

    debug!(teacher_id, %report_date, grade = %payload.grade, "Saving daily report");

    let result = sqlx::query(
        r#"
        INSERT INTO daily_reports
            (teacher_id, school_id, report_date, grade, class_id, subject, topics_covered, homework, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(teacher_id)
    .bind(school_id)
    .bind(report_date)
    .bind(payload.grade.trim())
    .bind(payload.class_id)
    .bind(payload.subject.trim())
    .bind(payload.topics_covered.trim())
    .bind(payload.homework.as_deref())
    .bind(payload.notes.as_deref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            return AppError::Conflict(
                "A report for this grade and date already exists; update it instead".into(),
            );
        }
        error!(error = %e, teacher_id, "Failed to save daily report");
        AppError::internal(
            "Failed to save daily report",
            "Check the report fields and submit again",
        )
    })?;

    let report = DailyReport {
        id: result.last_insert_id(),
        teacher_id,
        school_id,
        report_date,
        grade: payload.grade.trim().to_string(),
        class_id: payload.class_id,
        subject: payload.subject.trim().to_string(),
        topics_covered: payload.topics_covered.trim().to_string(),
        homework: payload.homework.clone(),
        notes: payload.notes.clone(),
        created_at: Some(chrono::Utc::now()),
    };

    let attendance = reconcile(
        &MySqlAttendanceStore::new(pool.get_ref()),
        ReconcileInput {
            teacher_id,
            school_id,
            date: report_date,
        },
    )
    .await;

    info!(
        report_id = report.id,
        attendance = ?attendance.status,
        "Daily report submitted"
    );

    Ok(HttpResponse::Created().json(CreateReportResponse {
        message: "Daily report submitted".to_string(),
        report,
        attendance,
    }))
}

#[utoipa::path(
    get,
    path = "/api/reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Paginated reports", body = ReportPage),
        (status = 403, description = "Students cannot read reports")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn list_reports(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReportQuery>,
) -> AppResult<HttpResponse> {
    let teacher_id = match auth.role {
        Role::Student => return Err(AppError::forbidden("Students cannot read reports")),
        // teachers only ever see their own reports
        Role::Teacher => Some(auth.require_teacher()?),
        _ => query.teacher_id,
    };

    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve();

    let filter = Filter::new()
        .and_opt("school_id = ?", auth.scoped_school(query.school_id)?)
        .and_opt("teacher_id = ?", teacher_id)
        .and_opt("grade = ?", query.grade.as_deref())
        .and_opt("report_date >= ?", query.from)
        .and_opt("report_date <= ?", query.to);

    let reports: Paginated<DailyReport> = fetch_page(
        pool.get_ref(),
        "daily_reports",
        REPORT_COLUMNS,
        &filter,
        "report_date DESC, id DESC",
        page,
    )
    .await?;

    Ok(HttpResponse::Ok().json(reports))
}

async fn fetch_visible(pool: &MySqlPool, auth: &AuthUser, report_id: u64) -> AppResult<DailyReport> {
    let report: DailyReport =
        fetch_scoped(pool, auth, "daily_reports", REPORT_COLUMNS, report_id, "Report").await?;

    match auth.role {
        Role::Student => Err(AppError::forbidden("Students cannot read reports")),
        Role::Teacher if auth.teacher_id != Some(report.teacher_id) => {
            Err(AppError::not_found("Report not found"))
        }
        _ => Ok(report),
    }
}

#[utoipa::path(
    get,
    path = "/api/reports/{report_id}",
    params(("report_id" = u64, Path, description = "Daily report ID")),
    responses(
        (status = 200, description = "Report found", body = DailyReport),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn get_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let report = fetch_visible(pool.get_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// Edit report content. Teacher, date and grade are the report's identity
/// and cannot change.
#[utoipa::path(
    put,
    path = "/api/reports/{report_id}",
    params(("report_id" = u64, Path, description = "Daily report ID")),
    request_body(content = Object, description = "Any of: subject, topics_covered, homework, notes"),
    responses(
        (status = 200, description = "Report updated"),
        (status = 400, description = "Field cannot be updated"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn update_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let report_id = path.into_inner();
    // ownership check before the write
    fetch_visible(pool.get_ref(), &auth, report_id).await?;

    update_scoped(
        pool.get_ref(),
        &auth,
        "daily_reports",
        report_id,
        &payload,
        UPDATABLE,
        "Report",
    )
    .await
}
