pub mod attendance;
pub mod class;
pub mod course_progress;
pub mod daily_report;
pub mod leave_request;
pub mod notification;
pub mod role;
pub mod schedule;
pub mod school;
pub mod student;
pub mod teacher;
