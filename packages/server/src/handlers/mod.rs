pub mod attendance;
pub mod auth;
pub mod class;
pub mod notice;
pub mod quick_attendance;
pub mod result;
pub mod section;
pub mod student;
pub mod teacher_section;
pub mod user;
