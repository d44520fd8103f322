use crate::model::attendance::AttendanceStatus;
use crate::model::daily_report::DailyReport;
use crate::model::schedule::ScheduledPeriod;
use crate::service::reconciliation::ReconcileStore;
use chrono::NaiveDate;
use sqlx::MySqlPool;

pub const PERIOD_COLUMNS: &str = "id, school_id, teacher_id, class_id, day_of_week, grade, subject, start_time, end_time, is_active";
pub const REPORT_COLUMNS: &str = "id, teacher_id, school_id, report_date, grade, class_id, subject, topics_covered, homework, notes, created_at";

/// Reconciliation reads and writes against the MySQL schema.
pub struct MySqlAttendanceStore<'a> {
    pool: &'a MySqlPool,
}

impl<'a> MySqlAttendanceStore<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }
}

impl ReconcileStore for MySqlAttendanceStore<'_> {
    type Error = sqlx::Error;

    async fn active_periods(
        &self,
        teacher_id: u64,
        school_id: u64,
        day_of_week: &str,
    ) -> Result<Vec<ScheduledPeriod>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {PERIOD_COLUMNS}
            FROM scheduled_periods
            WHERE teacher_id = ? AND school_id = ? AND day_of_week = ? AND is_active = TRUE
            "#
        );
        sqlx::query_as::<_, ScheduledPeriod>(&sql)
            .bind(teacher_id)
            .bind(school_id)
            .bind(day_of_week)
            .fetch_all(self.pool)
            .await
    }

    async fn reports_for_day(
        &self,
        teacher_id: u64,
        school_id: u64,
        date: NaiveDate,
    ) -> Result<Vec<DailyReport>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM daily_reports
            WHERE teacher_id = ? AND school_id = ? AND report_date = ?
            "#
        );
        sqlx::query_as::<_, DailyReport>(&sql)
            .bind(teacher_id)
            .bind(school_id)
            .bind(date)
            .fetch_all(self.pool)
            .await
    }

    async fn attendance_status(
        &self,
        teacher_id: u64,
        school_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceStatus>, sqlx::Error> {
        let raw = sqlx::query_scalar::<_, String>(
            r#"
            SELECT status
            FROM attendance_records
            WHERE teacher_id = ? AND school_id = ? AND date = ?
            "#,
        )
        .bind(teacher_id)
        .bind(school_id)
        .bind(date)
        .fetch_optional(self.pool)
        .await?;

        raw.map(|s| s.parse::<AttendanceStatus>())
            .transpose()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }

    async fn has_approved_leave(
        &self,
        teacher_id: u64,
        school_id: u64,
        date: NaiveDate,
    ) -> Result<bool, sqlx::Error> {
        let hits = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM leave_requests
            WHERE teacher_id = ? AND school_id = ? AND status = 'approved'
            AND start_date <= ? AND end_date >= ?
            "#,
        )
        .bind(teacher_id)
        .bind(school_id)
        .bind(date)
        .bind(date)
        .fetch_one(self.pool)
        .await?;

        Ok(hits > 0)
    }

    async fn upsert_present(
        &self,
        teacher_id: u64,
        school_id: u64,
        date: NaiveDate,
    ) -> Result<(), sqlx::Error> {
        // updated_at is assigned first: MySQL applies these left to right,
        // so `status` still holds the old value when it is read there.
        sqlx::query(
            r#"
            INSERT INTO attendance_records (teacher_id, school_id, date, status)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                updated_at = IF(status = 'Leave-Approved', updated_at, NOW()),
                status = IF(status = 'Leave-Approved', status, VALUES(status))
            "#,
        )
        .bind(teacher_id)
        .bind(school_id)
        .bind(date)
        .bind(AttendanceStatus::Present.as_ref())
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
