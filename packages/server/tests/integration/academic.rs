use serde_json::json;

use crate::common::{TestApp, routes};

mod classes {
    use super::*;

    #[tokio::test]
    async fn class_crud_round() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;

        let id = app.create_class(&token, "Class 9").await;

        let res = app.get_with_token(&routes::class(id), &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["name"], "Class 9");

        let res = app
            .put_with_token(&routes::class(id), &json!({"name": "Class Nine"}), &token)
            .await;
        assert_eq!(res.status, 200, "update failed: {}", res.text);
        assert_eq!(res.body["name"], "Class Nine");

        let res = app.delete_with_token(&routes::class(id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::class(id), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn duplicate_class_name_conflicts() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        app.create_class(&token, "Class 9").await;

        let res = app
            .post_with_token(routes::CLASSES, &json!({"name": "Class 9"}), &token)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn class_with_sections_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        let id = app.create_class(&token, "Class 9").await;
        app.create_section(&token, id, "A").await;

        let res = app.delete_with_token(&routes::class(id), &token).await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn any_user_can_read_but_only_managers_write() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        app.create_class(&token, "Class 9").await;
        let teacher = app
            .create_user_with_role("teacher1", "password123", "teacher")
            .await;

        let res = app.get_with_token(routes::CLASSES, &teacher).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body.as_array().unwrap().len(), 1);

        let res = app
            .post_with_token(routes::CLASSES, &json!({"name": "Class 10"}), &teacher)
            .await;
        assert_eq!(res.status, 403);

        let res = app.get_without_token(routes::CLASSES).await;
        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;

        let res = app
            .post_with_token(routes::CLASSES, &json!({"name": "  "}), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod sections {
    use super::*;

    #[tokio::test]
    async fn sections_filter_by_class_and_names_are_unique_per_class() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        let nine = app.create_class(&token, "Class 9").await;
        let ten = app.create_class(&token, "Class 10").await;
        app.create_section(&token, nine, "A").await;
        app.create_section(&token, nine, "B").await;
        app.create_section(&token, ten, "A").await;

        let res = app
            .get_with_token(&format!("{}?class_id={nine}", routes::SECTIONS), &token)
            .await;
        assert_eq!(res.status, 200);
        let names: Vec<&str> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["A", "B"]);

        let res = app
            .post_with_token(routes::SECTIONS, &json!({"name": "A", "class_id": nine}), &token)
            .await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn section_needs_an_existing_class() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;

        let res = app
            .post_with_token(routes::SECTIONS, &json!({"name": "A", "class_id": 777}), &token)
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn section_lists_its_students_by_roll() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        let class_id = app.create_class(&token, "Class 9").await;
        let section_id = app.create_section(&token, class_id, "A").await;
        app.create_student(&token, section_id, "Tanvir", "2").await;
        app.create_student(&token, section_id, "Mahin", "1").await;

        let res = app.get_with_token(&routes::section_students(section_id), &token).await;

        assert_eq!(res.status, 200);
        let rows = res.body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Mahin");

        let res = app.delete_with_token(&routes::section(section_id), &token).await;
        assert_eq!(res.status, 409);
    }
}

mod students {
    use super::*;

    #[tokio::test]
    async fn student_update_replaces_fields() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        let class_id = app.create_class(&token, "Class 9").await;
        let a = app.create_section(&token, class_id, "A").await;
        let b = app.create_section(&token, class_id, "B").await;
        let id = app.create_student(&token, a, "Tanvir", "2").await;

        let res = app
            .put_with_token(
                &routes::student(id),
                &json!({"section_id": b, "name": "Tanvir Hasan", "email": "tanvir@example.com"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "update failed: {}", res.text);
        assert_eq!(res.body["section_id"], b);
        assert_eq!(res.body["name"], "Tanvir Hasan");
        assert!(res.body["roll"].is_null());
        assert_eq!(res.body["email"], "tanvir@example.com");
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        let class_id = app.create_class(&token, "Class 9").await;
        let section_id = app.create_section(&token, class_id, "A").await;

        let res = app
            .post_with_token(
                routes::STUDENTS,
                &json!({"section_id": section_id, "name": "Tanvir", "email": "nope"}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn deleting_a_student_removes_their_attendance() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        let class_id = app.create_class(&token, "Class 9").await;
        let section_id = app.create_section(&token, class_id, "A").await;
        let id = app.create_student(&token, section_id, "Tanvir", "2").await;
        let res = app
            .post_with_token(
                routes::ATTENDANCE_RECORD,
                &json!({"studentId": id, "status": "present"}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "record failed: {}", res.text);

        let res = app.delete_with_token(&routes::student(id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::student(id), &token).await;
        assert_eq!(res.status, 404);
        let res = app.get_with_token(routes::STUDENTS, &token).await;
        assert_eq!(res.body, json!([]));
    }
}

mod teacher_sections {
    use super::*;

    #[tokio::test]
    async fn assignments_list_with_section_and_class_names() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        let teacher = app
            .create_user_with_role("teacher1", "password123", "teacher")
            .await;
        let teacher_id = app.user_id(&teacher).await;
        let nine = app.create_class(&token, "Class 9").await;
        let ten = app.create_class(&token, "Class 10").await;
        let nine_a = app.create_section(&token, nine, "A").await;
        let ten_b = app.create_section(&token, ten, "B").await;

        let res = app
            .post_with_token(
                routes::TEACHER_SECTIONS,
                &json!({"user_id": teacher_id, "section_id": nine_a}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "assign failed: {}", res.text);
        assert_eq!(res.body["is_primary"], false);
        assert_eq!(res.body["section_name"], "A");
        assert_eq!(res.body["class_name"], "Class 9");
        assert_eq!(res.body["teacher_name"], "teacher1");

        let res = app
            .post_with_token(
                routes::TEACHER_SECTIONS,
                &json!({"user_id": teacher_id, "section_id": ten_b, "is_primary": true}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "assign failed: {}", res.text);

        let res = app
            .get_with_token(&routes::teacher_sections_of(teacher_id), &teacher)
            .await;
        assert_eq!(res.status, 200);
        let rows = res.body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["class_name"], "Class 10");
        assert_eq!(rows[0]["is_primary"], true);
        assert_eq!(rows[1]["section_id"], nine_a);
    }

    #[tokio::test]
    async fn duplicate_assignment_conflicts_and_guests_are_refused() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        let teacher = app
            .create_user_with_role("teacher1", "password123", "teacher")
            .await;
        let teacher_id = app.user_id(&teacher).await;
        let guest = app.create_authenticated_user("visitor", "password123").await;
        let guest_id = app.user_id(&guest).await;
        let class_id = app.create_class(&token, "Class 9").await;
        let section_id = app.create_section(&token, class_id, "A").await;
        let body = json!({"user_id": teacher_id, "section_id": section_id});

        let res = app.post_with_token(routes::TEACHER_SECTIONS, &body, &token).await;
        assert_eq!(res.status, 201, "assign failed: {}", res.text);
        let res = app.post_with_token(routes::TEACHER_SECTIONS, &body, &token).await;
        assert_eq!(res.status, 409);

        let res = app
            .post_with_token(
                routes::TEACHER_SECTIONS,
                &json!({"user_id": guest_id, "section_id": section_id}),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);

        let res = app.post_with_token(routes::TEACHER_SECTIONS, &body, &teacher).await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn assignment_update_get_and_delete() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        let teacher = app
            .create_user_with_role("teacher1", "password123", "teacher")
            .await;
        let teacher_id = app.user_id(&teacher).await;
        let class_id = app.create_class(&token, "Class 9").await;
        let a = app.create_section(&token, class_id, "A").await;
        let b = app.create_section(&token, class_id, "B").await;

        let res = app
            .post_with_token(
                routes::TEACHER_SECTIONS,
                &json!({"user_id": teacher_id, "section_id": a}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "assign failed: {}", res.text);
        let id = res.id();

        let res = app
            .put_with_token(
                &routes::teacher_section(id),
                &json!({"section_id": b, "is_primary": true}),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "update failed: {}", res.text);

        let res = app.get_with_token(&routes::teacher_section(id), &teacher).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["section_name"], "B");
        assert_eq!(res.body["is_primary"], true);

        let res = app.delete_with_token(&routes::teacher_section(id), &token).await;
        assert_eq!(res.status, 204);
        let res = app.get_with_token(&routes::teacher_section(id), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn deleting_a_section_drops_its_assignments() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;
        let teacher = app
            .create_user_with_role("teacher1", "password123", "teacher")
            .await;
        let teacher_id = app.user_id(&teacher).await;
        let class_id = app.create_class(&token, "Class 9").await;
        let section_id = app.create_section(&token, class_id, "A").await;
        let res = app
            .post_with_token(
                routes::TEACHER_SECTIONS,
                &json!({"user_id": teacher_id, "section_id": section_id}),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "assign failed: {}", res.text);

        let res = app.delete_with_token(&routes::section(section_id), &token).await;
        assert_eq!(res.status, 204);

        let res = app
            .get_with_token(&routes::teacher_sections_of(teacher_id), &token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!([]));
    }
}
