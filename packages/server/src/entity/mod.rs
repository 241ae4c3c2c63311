pub mod attendance;
pub mod class;
pub mod notice;
pub mod quick_attendance;
pub mod role;
pub mod role_permission;
pub mod section;
pub mod student;
pub mod student_result;
pub mod teacher_section;
pub mod user;
