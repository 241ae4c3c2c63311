use serde_json::json;

use crate::common::{TestApp, routes};

/// Two classes with one section each. Returns (token, [section ids], [class ids]).
async fn sections(app: &TestApp) -> (String, [i32; 2], [i32; 2]) {
    let token = app.headmaster().await;
    let six = app.create_class(&token, "Class 6").await;
    let seven = app.create_class(&token, "Class 7").await;
    let six_a = app.create_section(&token, six, "A").await;
    let seven_a = app.create_section(&token, seven, "A").await;
    (token, [six_a, seven_a], [six, seven])
}

mod record {
    use super::*;

    #[tokio::test]
    async fn second_record_for_the_same_day_is_a_duplicate() {
        let app = TestApp::spawn().await;
        let (token, [section_id, _], _) = sections(&app).await;
        let body = json!({
            "sectionId": section_id,
            "maleCount": 18,
            "femaleCount": 21,
            "attendanceDate": "2024-05-01",
        });

        let first = app.post_with_token(routes::QUICK, &body, &token).await;
        assert_eq!(first.status, 201, "record failed: {}", first.text);
        assert_eq!(first.body["attendance_date"], "2024-05-01");
        assert_eq!(first.body["male_count"], 18);

        let mut retry = body.clone();
        retry["maleCount"] = json!(1);
        let second = app.post_with_token(routes::QUICK, &retry, &token).await;
        assert_eq!(second.status, 400);
        assert_eq!(second.body["code"], "DUPLICATE_ATTENDANCE");

        let mut next_day = body;
        next_day["attendanceDate"] = json!("2024-05-02");
        let third = app.post_with_token(routes::QUICK, &next_day, &token).await;
        assert_eq!(third.status, 201);

        let all = app.get_with_token(routes::QUICK, &token).await;
        let rows = all.body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["attendance_date"], "2024-05-02");
        assert_eq!(rows[1]["male_count"], 18);
    }

    #[tokio::test]
    async fn timestamp_dates_keep_their_calendar_day() {
        let app = TestApp::spawn().await;
        let (token, [section_id, _], _) = sections(&app).await;

        let res = app
            .post_with_token(
                routes::QUICK,
                &json!({
                    "sectionId": section_id,
                    "maleCount": 3,
                    "femaleCount": 0,
                    "attendanceDate": "2024-05-01T23:30:00+06:00",
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "record failed: {}", res.text);
        assert_eq!(res.body["attendance_date"], "2024-05-01");
    }

    #[tokio::test]
    async fn recorder_defaults_to_the_caller() {
        let app = TestApp::spawn().await;
        let (token, [section_id, _], _) = sections(&app).await;
        let me = app.user_id(&token).await;

        let res = app
            .post_with_token(
                routes::QUICK,
                &json!({"sectionId": section_id, "maleCount": 1, "femaleCount": 1}),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "record failed: {}", res.text);
        assert_eq!(res.body["recorded_by"], me);
    }

    #[tokio::test]
    async fn invalid_counts_are_rejected() {
        let app = TestApp::spawn().await;
        let (token, [section_id, _], _) = sections(&app).await;

        for body in [
            json!({"maleCount": 1, "femaleCount": 1}),
            json!({"sectionId": section_id, "femaleCount": 1}),
            json!({"sectionId": section_id, "maleCount": -1, "femaleCount": 4}),
            json!({"sectionId": section_id, "maleCount": 0, "femaleCount": 0}),
            json!({"sectionId": section_id, "maleCount": 1, "femaleCount": 1, "attendanceDate": "May 1"}),
        ] {
            let res = app.post_with_token(routes::QUICK, &body, &token).await;
            assert_eq!(res.status, 400, "expected rejection for {body}");
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn unknown_recorder_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let (token, [section_id, _], _) = sections(&app).await;

        let res = app
            .post_with_token(
                routes::QUICK,
                &json!({"sectionId": section_id, "maleCount": 3, "femaleCount": 4, "recordedBy": 999999}),
                &token,
            )
            .await;

        assert_eq!(res.status, 400, "unexpected: {}", res.text);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_section_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.headmaster().await;

        let res = app
            .post_with_token(
                routes::QUICK,
                &json!({"sectionId": 4242, "maleCount": 1, "femaleCount": 1}),
                &token,
            )
            .await;

        assert_eq!(res.status, 404);
    }
}

mod report {
    use super::*;

    async fn seed(app: &TestApp, token: &str, section_id: i32, date: &str) {
        let res = app
            .post_with_token(
                routes::QUICK,
                &json!({"sectionId": section_id, "maleCount": 10, "femaleCount": 12, "attendanceDate": date}),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "seed failed: {}", res.text);
    }

    #[tokio::test]
    async fn filters_combine_and_rows_carry_names() {
        let app = TestApp::spawn().await;
        let (token, [six_a, seven_a], [six, _]) = sections(&app).await;
        let teacher = app
            .create_user_with_role("teacher1", "password123", "teacher")
            .await;
        let teacher_id = app.user_id(&teacher).await;

        seed(&app, &token, six_a, "2024-05-01").await;
        seed(&app, &token, six_a, "2024-05-03").await;
        seed(&app, &teacher, seven_a, "2024-05-03").await;

        let by_day = app
            .get_with_token(&format!("{}?date=2024-05-03", routes::QUICK_REPORT), &token)
            .await;
        assert_eq!(by_day.status, 200);
        assert_eq!(by_day.body.as_array().unwrap().len(), 2);

        let by_class = app
            .get_with_token(&format!("{}?classId={six}", routes::QUICK_REPORT), &token)
            .await;
        let rows = by_class.body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["attendance_date"], "2024-05-03");
        assert_eq!(rows[0]["class_name"], "Class 6");
        assert_eq!(rows[0]["section_name"], "A");
        assert_eq!(rows[0]["teacher_name"], "head");

        let by_teacher = app
            .get_with_token(
                &format!("{}?teacherId={teacher_id}", routes::QUICK_REPORT),
                &teacher,
            )
            .await;
        let rows = by_teacher.body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["section_id"], seven_a);

        let open_ended = app
            .get_with_token(
                &format!("{}?startDate=2024-05-02&sectionId={six_a}", routes::QUICK_REPORT),
                &token,
            )
            .await;
        let rows = open_ended.body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["attendance_date"], "2024-05-03");
    }

    #[tokio::test]
    async fn no_match_is_an_empty_list() {
        let app = TestApp::spawn().await;
        let (token, [six_a, _], _) = sections(&app).await;
        seed(&app, &token, six_a, "2024-05-01").await;

        let res = app
            .get_with_token(&format!("{}?date=2023-01-01", routes::QUICK_REPORT), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!([]));
    }

    #[tokio::test]
    async fn guest_cannot_read_the_report() {
        let app = TestApp::spawn().await;
        let guest = app.create_authenticated_user("visitor", "password123").await;

        let res = app.get_with_token(routes::QUICK_REPORT, &guest).await;

        assert_eq!(res.status, 403);
    }
}
