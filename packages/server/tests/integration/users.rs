use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn assigned_role_applies_at_next_login() {
    let app = TestApp::spawn().await;
    let admin = app.bootstrap_token().await;
    let guest = app.create_authenticated_user("rina", "password123").await;
    let id = app.user_id(&guest).await;

    let res = app
        .put_with_token(&routes::user(id), &json!({"role": "teacher"}), &admin)
        .await;
    assert_eq!(res.status, 200, "update failed: {}", res.text);
    assert_eq!(res.body["role"], "teacher");
    assert!(res.body.get("password").is_none());

    let me = app.get_with_token(routes::ME, &guest).await;
    assert_eq!(me.body["role"], "guest");

    let token = app.login("rina", "password123").await;
    let me = app.get_with_token(routes::ME, &token).await;
    assert_eq!(me.body["role"], "teacher");
    assert!(
        me.body["permissions"]
            .as_array()
            .unwrap()
            .contains(&json!("attendance:record"))
    );
}

#[tokio::test]
async fn unknown_role_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.bootstrap_token().await;
    let guest = app.create_authenticated_user("rina", "password123").await;
    let id = app.user_id(&guest).await;

    let res = app
        .put_with_token(&routes::user(id), &json!({"role": "janitor"}), &admin)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn users_edit_their_own_name_but_not_their_role() {
    let app = TestApp::spawn().await;
    let token = app.create_authenticated_user("rina", "password123").await;
    let id = app.user_id(&token).await;

    let res = app
        .put_with_token(&routes::user(id), &json!({"full_name": " Rina Akter "}), &token)
        .await;
    assert_eq!(res.status, 200, "update failed: {}", res.text);
    assert_eq!(res.body["full_name"], "Rina Akter");

    let res = app
        .put_with_token(&routes::user(id), &json!({"role": "headmaster"}), &token)
        .await;
    assert_eq!(res.status, 403);

    let res = app.get_with_token(&routes::user(id), &token).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["role"], "guest");

    let admin = app.bootstrap_token().await;
    let admin_id = app.user_id(&admin).await;
    let res = app
        .put_with_token(&routes::user(admin_id), &json!({"role": "guest"}), &admin)
        .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn listing_needs_user_manage_and_filters_by_role() {
    let app = TestApp::spawn().await;
    let admin = app.bootstrap_token().await;
    let guest = app.create_authenticated_user("rina", "password123").await;
    app.create_user_with_role("teacher1", "password123", "teacher")
        .await;
    app.create_user_with_role("teacher2", "password123", "teacher")
        .await;

    let res = app.get_with_token(routes::USERS, &guest).await;
    assert_eq!(res.status, 403);

    let res = app
        .get_with_token(&format!("{}?role=teacher", routes::USERS), &admin)
        .await;
    assert_eq!(res.status, 200);
    let names: Vec<&str> = res.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["teacher1", "teacher2"]);
    assert_eq!(res.body["pagination"]["total"], 2);

    let res = app
        .get_with_token(&format!("{}?per_page=2&page=2", routes::USERS), &admin)
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["pagination"]["total"], 4);
    assert_eq!(res.body["pagination"]["total_pages"], 2);
    assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn delete_removes_the_account() {
    let app = TestApp::spawn().await;
    let admin = app.bootstrap_token().await;
    let guest = app.create_authenticated_user("rina", "password123").await;
    let id = app.user_id(&guest).await;

    let res = app.delete_with_token(&routes::user(id), &admin).await;
    assert_eq!(res.status, 204);

    let res = app.get_with_token(&routes::user(id), &admin).await;
    assert_eq!(res.status, 404);

    let res = app
        .post_without_token(routes::LOGIN, &json!({"username": "rina", "password": "password123"}))
        .await;
    assert_eq!(res.status, 401);

    let admin_id = app.user_id(&admin).await;
    let res = app.delete_with_token(&routes::user(admin_id), &admin).await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn recorder_of_attendance_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let admin = app.bootstrap_token().await;
    let teacher = app
        .create_user_with_role("teacher1", "password123", "teacher")
        .await;
    let teacher_id = app.user_id(&teacher).await;
    let class_id = app.create_class(&admin, "Class 6").await;
    let section_id = app.create_section(&admin, class_id, "A").await;

    let res = app
        .post_with_token(
            routes::QUICK,
            &json!({"sectionId": section_id, "maleCount": 10, "femaleCount": 12}),
            &teacher,
        )
        .await;
    assert_eq!(res.status, 201, "quick attendance failed: {}", res.text);

    let res = app.delete_with_token(&routes::user(teacher_id), &admin).await;

    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "CONFLICT");
}
