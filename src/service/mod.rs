pub mod attendance_store;
pub mod leave_decision;
pub mod reconciliation;
pub mod summary;
