pub mod academic;
pub mod attendance;
pub mod auth;
pub mod notice;
pub mod quick_attendance;
pub mod result;
pub mod shared;
pub mod teacher_section;
pub mod user;
