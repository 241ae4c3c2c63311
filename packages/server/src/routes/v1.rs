use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::{
    attendance, auth, class, notice, quick_attendance, result, section, student, teacher_section, user,
};
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/student-results", result_routes(config.upload.max_bytes))
        .nest("/attendance", attendance_routes())
        .nest("/quickattendance", quick_attendance_routes())
        .nest("/classes", class_routes())
        .nest("/sections", section_routes())
        .nest("/students", student_routes())
        .nest("/teacher-sections", teacher_section_routes())
        .nest("/users", user_routes())
        .nest("/notices", notice_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(auth::register))
        .routes(routes!(auth::login))
        .routes(routes!(auth::me))
        .routes(routes!(auth::logout))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(user::list_users))
        .routes(routes!(user::get_user, user::update_user, user::delete_user))
}

fn result_routes(upload_max_bytes: usize) -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(result::list_results, result::create_result))
        .routes(routes!(result::bulk_create_results))
        .routes(routes!(result::get_by_identifier))
        .routes(routes!(result::strict_search))
        .routes(routes!(result::search_results))
        .routes(routes!(result::list_by_class_year))
        .routes(routes!(result::grouped_summary))
        .routes(routes!(result::update_result, result::delete_result));

    let upload = OpenApiRouter::new()
        .routes(routes!(result::upload_results))
        .layer(result::upload_body_limit(upload_max_bytes));

    crud.merge(upload)
}

fn attendance_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(attendance::record_attendance))
        .routes(routes!(attendance::bulk_record_attendance))
        .routes(routes!(attendance::get_student_attendance))
        .routes(routes!(attendance::get_section_attendance))
        .routes(routes!(attendance::section_report))
        .routes(routes!(
            attendance::get_attendance,
            attendance::update_attendance,
            attendance::delete_attendance
        ))
}

fn quick_attendance_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            quick_attendance::record_quick_attendance,
            quick_attendance::list_quick_attendance
        ))
        .routes(routes!(quick_attendance::quick_report))
}

fn class_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(class::list_classes, class::create_class))
        .routes(routes!(class::get_class, class::update_class, class::delete_class))
}

fn section_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(section::list_sections, section::create_section))
        .routes(routes!(
            section::get_section,
            section::update_section,
            section::delete_section
        ))
        .routes(routes!(section::list_section_students))
}

fn student_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(student::list_students, student::create_student))
        .routes(routes!(
            student::get_student,
            student::update_student,
            student::delete_student
        ))
}

fn teacher_section_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(teacher_section::assign_section))
        .routes(routes!(teacher_section::list_teacher_sections))
        .routes(routes!(
            teacher_section::get_assignment,
            teacher_section::update_assignment,
            teacher_section::delete_assignment
        ))
}

fn notice_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(notice::list_notices, notice::create_notice))
        .routes(routes!(notice::list_notices_by_page))
        .routes(routes!(notice::search_notices))
        .routes(routes!(
            notice::get_notice,
            notice::update_notice,
            notice::delete_notice
        ))
}
