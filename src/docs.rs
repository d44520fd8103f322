use crate::api::attendance::{RecomputeAttendance, SetAttendance};
use crate::api::classes::CreateClass;
use crate::api::leave_request::{CreateLeave, LeaveFilter, LeaveType};
use crate::api::notifications::CreateNotification;
use crate::api::progress::UpsertProgress;
use crate::api::reports::{CreateReport, CreateReportResponse};
use crate::api::schedules::CreatePeriod;
use crate::api::schools::CreateSchool;
use crate::api::students::CreateStudent;
use crate::api::teachers::CreateTeacher;
use crate::auth::auth::AuthUser;
use crate::auth::handlers::{CreateUserReq, LoginResponse};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus},
    class::SchoolClass,
    course_progress::CourseProgress,
    daily_report::DailyReport,
    leave_request::{LeaveRequest, LeaveStatus},
    notification::Notification,
    role::Role,
    schedule::ScheduledPeriod,
    school::School,
    student::Student,
    teacher::Teacher,
};
use crate::models::LoginReqDto;
use crate::service::reconciliation::{ReconcileOutcome, ReconcileStatus};
use crate::service::summary::{AttendanceSummary, DayBucket};
use crate::utils::filter::{
    AttendancePage, ClassPage, LeavePage, NotificationPage, ProgressPage, ReportPage,
    SchedulePage, SchoolPage, StudentPage, TeacherPage,
};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Management API",
        version = "1.0.0",
        description = r#"
## School Management System

Multi-tenant API for running schools: directory data, timetables, teachers'
daily reports and the attendance derived from them.

### Key Features
- **Directory**: schools, teachers, students, classes and scheduled periods
- **Daily Reports**: teachers submit one report per grade per day
- **Attendance**: a teacher is marked Present once every scheduled period
  of the day is covered by a report; approved leave is never overwritten
- **Leave Management**: apply, approve and reject leave requests
- **Course Progress** and **Notifications**

### Security
Endpoints under `/api` require a JWT access token, either as
`Authorization: Bearer <token>` or the `access_token` cookie. Cookie-authenticated
writes must echo the `csrf_token` cookie in the `x-csrf-token` header.

### Response Format
- JSON bodies; errors are `{"error": "...", "hint": "..."}`
- Pagination via `page` / `per_page` on list endpoints
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::create_user,
        crate::auth::handlers::me,

        crate::api::schools::create_school,
        crate::api::schools::list_schools,
        crate::api::schools::get_school,
        crate::api::schools::update_school,
        crate::api::schools::delete_school,

        crate::api::teachers::create_teacher,
        crate::api::teachers::list_teachers,
        crate::api::teachers::get_teacher,
        crate::api::teachers::update_teacher,
        crate::api::teachers::delete_teacher,

        crate::api::students::create_student,
        crate::api::students::list_students,
        crate::api::students::get_student,
        crate::api::students::update_student,
        crate::api::students::delete_student,

        crate::api::classes::create_class,
        crate::api::classes::list_classes,
        crate::api::classes::get_class,
        crate::api::classes::update_class,
        crate::api::classes::delete_class,

        crate::api::schedules::create_period,
        crate::api::schedules::list_periods,
        crate::api::schedules::get_period,
        crate::api::schedules::update_period,
        crate::api::schedules::delete_period,

        crate::api::reports::create_report,
        crate::api::reports::list_reports,
        crate::api::reports::get_report,
        crate::api::reports::update_report,

        crate::api::attendance::list_attendance,
        crate::api::attendance::attendance_summary,
        crate::api::attendance::set_attendance,
        crate::api::attendance::recompute_attendance,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::progress::upsert_progress,
        crate::api::progress::list_progress,

        crate::api::notifications::create_notification,
        crate::api::notifications::list_notifications,
        crate::api::notifications::mark_read
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            CreateUserReq,
            AuthUser,
            Role,
            CreateSchool,
            School,
            SchoolPage,
            CreateTeacher,
            Teacher,
            TeacherPage,
            CreateStudent,
            Student,
            StudentPage,
            CreateClass,
            SchoolClass,
            ClassPage,
            CreatePeriod,
            ScheduledPeriod,
            SchedulePage,
            CreateReport,
            CreateReportResponse,
            DailyReport,
            ReportPage,
            ReconcileOutcome,
            ReconcileStatus,
            AttendanceRecord,
            AttendanceStatus,
            AttendancePage,
            SetAttendance,
            RecomputeAttendance,
            AttendanceSummary,
            DayBucket,
            CreateLeave,
            LeaveType,
            LeaveFilter,
            LeaveRequest,
            LeaveStatus,
            LeavePage,
            UpsertProgress,
            CourseProgress,
            ProgressPage,
            CreateNotification,
            Notification,
            NotificationPage
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-in, token rotation and accounts"),
        (name = "School", description = "Tenant schools"),
        (name = "Teacher", description = "Teacher directory"),
        (name = "Student", description = "Student directory"),
        (name = "Class", description = "Classes per school"),
        (name = "Schedule", description = "Weekly timetable periods"),
        (name = "Report", description = "Teachers' daily reports"),
        (name = "Attendance", description = "Teacher attendance derived from reports"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Progress", description = "Course progress per class and subject"),
        (name = "Notification", description = "User and school-wide notifications"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("LeavePage"));
    }

    #[test]
    fn reconciliation_routes_are_documented() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/reports"));
        assert!(doc.paths.paths.contains_key("/api/attendance/recompute"));
        assert!(doc.paths.paths.contains_key("/api/leave/{leave_id}/approve"));
    }
}
