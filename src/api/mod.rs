pub mod attendance;
pub mod classes;
pub mod common;
pub mod leave_request;
pub mod notifications;
pub mod progress;
pub mod reports;
pub mod schedules;
pub mod schools;
pub mod students;
pub mod teachers;
