use sea_orm::sea_query::{Index, IndexCreateStatement, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::config::AuthConfig;
use crate::entity::{
    attendance, quick_attendance, role, role_permission, section, student_result, teacher_section, user,
};
use crate::utils::hash;

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["headmaster", "teacher", "guest"];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Headmaster: all permissions
    ("headmaster", "result:manage"),
    ("headmaster", "attendance:record"),
    ("headmaster", "attendance:view"),
    ("headmaster", "academic:manage"),
    ("headmaster", "user:manage"),
    ("headmaster", "notice:manage"),
    // Teacher
    ("teacher", "attendance:record"),
    ("teacher", "attendance:view"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(0) | Err(DbErr::RecordNotInserted) => {}
            Ok(_) => roles_inserted += 1,
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(0) | Err(DbErr::RecordNotInserted) => {}
            Ok(_) => perms_inserted += 1,
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// Schema-sync only knows single-column constraints, so the composite ones
/// are created here. The unique indexes back the one-row-per-day rules of
/// both attendance tables and the one-assignment-per-section rule, and must
/// exist before serving traffic.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let unique = [
        (
            "uq_attendance_student_date",
            Index::create()
                .if_not_exists()
                .unique()
                .name("uq_attendance_student_date")
                .table(attendance::Entity)
                .col(attendance::Column::StudentId)
                .col(attendance::Column::AttendanceDate)
                .to_owned(),
        ),
        (
            "uq_quick_attendance_section_date",
            Index::create()
                .if_not_exists()
                .unique()
                .name("uq_quick_attendance_section_date")
                .table(quick_attendance::Entity)
                .col(quick_attendance::Column::SectionId)
                .col(quick_attendance::Column::AttendanceDate)
                .to_owned(),
        ),
        (
            "uq_section_class_name",
            Index::create()
                .if_not_exists()
                .unique()
                .name("uq_section_class_name")
                .table(section::Entity)
                .col(section::Column::ClassId)
                .col(section::Column::Name)
                .to_owned(),
        ),
        (
            "uq_teacher_section_user_section",
            Index::create()
                .if_not_exists()
                .unique()
                .name("uq_teacher_section_user_section")
                .table(teacher_section::Entity)
                .col(teacher_section::Column::UserId)
                .col(teacher_section::Column::SectionId)
                .to_owned(),
        ),
    ];
    for (name, stmt) in unique {
        create_index(db, name, stmt).await?;
    }

    // Lookup indexes for result search: by identifier and by class/year.
    let lookup = [
        (
            "idx_student_result_identity",
            Index::create()
                .if_not_exists()
                .name("idx_student_result_identity")
                .table(student_result::Entity)
                .col(student_result::Column::Roll)
                .col(student_result::Column::ClassName)
                .col(student_result::Column::Section)
                .col(student_result::Column::Year)
                .to_owned(),
        ),
        (
            "idx_student_result_class_year",
            Index::create()
                .if_not_exists()
                .name("idx_student_result_class_year")
                .table(student_result::Entity)
                .col(student_result::Column::ClassName)
                .col(student_result::Column::Year)
                .to_owned(),
        ),
    ];
    for (name, stmt) in lookup {
        if let Err(e) = create_index(db, name, stmt).await {
            tracing::warn!("Failed to create index {}: {}", name, e);
        }
    }

    Ok(())
}

async fn create_index(
    db: &DatabaseConnection,
    name: &str,
    stmt: IndexCreateStatement,
) -> Result<(), DbErr> {
    db.execute_unprepared(&stmt.to_string(PostgresQueryBuilder))
        .await?;
    info!("Ensured index {} exists", name);
    Ok(())
}

/// Create the configured headmaster account if it does not exist yet.
pub async fn ensure_bootstrap_admin(db: &DatabaseConnection, auth: &AuthConfig) -> Result<(), DbErr> {
    let (Some(username), Some(password)) = (&auth.bootstrap_username, &auth.bootstrap_password)
    else {
        return Ok(());
    };

    let password_hash =
        hash::hash_password(password).map_err(|e| DbErr::Custom(format!("Password hash error: {e}")))?;

    let model = user::ActiveModel {
        username: Set(username.trim().to_string()),
        password: Set(password_hash),
        full_name: Set(None),
        role: Set(role::ADMIN_ROLE.to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = user::Entity::insert(model)
        .on_conflict(OnConflict::column(user::Column::Username).do_nothing().to_owned())
        .exec_without_returning(db)
        .await;

    match result {
        Ok(0) | Err(DbErr::RecordNotInserted) => {}
        Ok(_) => info!("Created bootstrap account '{}'", username.trim()),
        Err(e) => return Err(e),
    }
    Ok(())
}
