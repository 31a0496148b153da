use mhtcet_session::error::{ApiError, AppError};
use mhtcet_session::models::QuestionQuery;
use mhtcet_session::session::PollOutcome;
use mhtcet_session::{
    AttemptKey, AttemptStatus, AttemptStore, ExamApi, ExamClient, MemoryAttemptStore,
    SessionController, TestType,
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::collections::BTreeMap;
use tokio_test::{assert_err, assert_ok};

const TEST_ID: &str = "11111111-1111-1111-1111-111111111111";
const USER_ID: &str = "student-42";

fn client_for(server: &Server) -> ExamClient {
    ExamClient::with_http(reqwest::Client::new(), &server.url(), None)
}

fn state_body(status: &str, time_left: u64) -> String {
    json!({
        "status": status,
        "timeLeft": time_left,
        "questions": [
            {
                "id": "q0",
                "subject": "Physics",
                "text": "<p>Unit of force?</p>",
                "options": [
                    { "text": "Joule", "order": 2 },
                    { "text": "Newton", "order": 1 },
                    { "text": "Watt", "order": 3 },
                    { "text": "Pascal", "order": 4 }
                ]
            },
            {
                "id": "q1",
                "subject": "Mathematics",
                "text": "<p>d/dx x^2 ?</p>",
                "options": [
                    { "text": "x", "order": 1 },
                    { "text": "2x", "order": 2 }
                ]
            }
        ],
        "responses": {}
    })
    .to_string()
}

#[tokio::test]
async fn list_subjects_passes_standard_filter() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/subjects")
        .match_query(Matcher::UrlEncoded("standard".into(), "12".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                { "id": "s1", "name": "Physics", "code": "PHY", "standard": "12" },
                { "id": "s2", "name": "Chemistry", "code": "CHE", "standard": 12 }
            ])
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let subjects = assert_ok!(client_for(&server).list_subjects(Some("12")).await);

    assert_eq!(subjects.len(), 2);
    assert_eq!(subjects[1].standard, "12");
    mock.assert_async().await;
}

#[tokio::test]
async fn list_questions_returns_records_unchanged() {
    let mut server = Server::new_async().await;
    let records = json!([{ "id": "q9", "anything": { "nested": true } }]);
    let mock = server
        .mock("GET", "/questions")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("chapterId".into(), "c7".into()),
            Matcher::UrlEncoded("limit".into(), "5".into()),
        ]))
        .with_status(200)
        .with_body(records.to_string())
        .create_async()
        .await;

    let query = QuestionQuery {
        chapter_id: Some("c7".to_string()),
        limit: Some(5),
        ..Default::default()
    };
    let questions = assert_ok!(client_for(&server).list_questions(&query).await);

    assert_eq!(json!(questions), records);
    mock.assert_async().await;
}

#[tokio::test]
async fn create_tests_post_expected_bodies() {
    let mut server = Server::new_async().await;
    let full = server
        .mock("POST", "/tests/create")
        .match_body(Matcher::Json(json!({ "type": "PCB" })))
        .with_status(200)
        .with_body(json!({ "testId": TEST_ID }).to_string())
        .create_async()
        .await;
    let chapter = server
        .mock("POST", "/tests/create/chapter")
        .match_body(Matcher::Json(
            json!({ "chapterId": "c7", "count": 20, "time": 30 }),
        ))
        .with_status(200)
        .with_body(json!({ "testId": "t-chapter" }).to_string())
        .create_async()
        .await;

    let client = client_for(&server);
    assert_eq!(
        assert_ok!(client.create_full_test(TestType::Pcb).await),
        TEST_ID
    );
    assert_eq!(
        assert_ok!(client.create_chapter_test("c7", 20, 30).await),
        "t-chapter"
    );

    full.assert_async().await;
    chapter.assert_async().await;
}

#[tokio::test]
async fn invalid_shapes_are_rejected_without_a_request() {
    let mut server = Server::new_async().await;
    let subject = server
        .mock("POST", "/tests/create/subject")
        .expect(0)
        .create_async()
        .await;
    let response = server
        .mock("POST", "/tests/response")
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server);
    assert_err!(client.create_subject_test("s1", 0, 30).await);
    assert_err!(client.submit_response("A1", "q0", 5).await);
    let err = assert_err!(client.start_attempt("not-a-uuid", USER_ID).await);
    assert!(err.is_malformed_id());

    subject.assert_async().await;
    response.assert_async().await;
}

#[tokio::test]
async fn non_success_status_becomes_bad_response() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/tests/state/A1")
        .with_status(500)
        .with_body("engine down")
        .create_async()
        .await;

    let err = assert_err!(client_for(&server).attempt_state("A1").await);

    match err {
        AppError::Api(ApiError::BadResponse {
            endpoint,
            status,
            body,
        }) => {
            assert_eq!(endpoint, "/tests/state/A1");
            assert_eq!(status, 500);
            assert_eq!(body, "engine down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn bearer_token_is_attached() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/tests/submit-section")
        .match_header("authorization", "Bearer secret-token")
        .match_body(Matcher::Json(json!({ "attemptId": "A1" })))
        .with_status(200)
        .with_body(json!({ "status": "SUBMITTED" }).to_string())
        .create_async()
        .await;

    let client = ExamClient::with_http(
        reqwest::Client::new(),
        &server.url(),
        Some("secret-token".to_string()),
    );
    let ack = assert_ok!(client.submit_section("A1").await);

    assert_eq!(ack, json!({ "status": "SUBMITTED" }));
    mock.assert_async().await;
}

#[tokio::test]
async fn empty_ack_body_is_null() {
    let mut server = Server::new_async().await;
    let answers = BTreeMap::from([("q0".to_string(), 2u8), ("q1".to_string(), 1u8)]);
    let mock = server
        .mock("POST", "/tests/sync")
        .match_body(Matcher::Json(
            json!({ "attemptId": "A1", "answers": { "q0": 2, "q1": 1 } }),
        ))
        .with_status(204)
        .create_async()
        .await;

    let ack = assert_ok!(client_for(&server).sync_answers("A1", &answers).await);

    assert!(ack.is_null());
    mock.assert_async().await;
}

#[tokio::test]
async fn start_answer_and_submit_over_http() {
    let mut server = Server::new_async().await;
    let start = server
        .mock("POST", "/tests/start")
        .match_body(Matcher::Json(json!({ "testId": TEST_ID, "userId": USER_ID })))
        .with_status(200)
        .with_body(json!({ "attemptId": "A1" }).to_string())
        .expect(1)
        .create_async()
        .await;
    let state = server
        .mock("GET", "/tests/state/A1")
        .with_status(200)
        .with_body(state_body("IN_PROGRESS", 5400))
        .expect(1)
        .create_async()
        .await;
    let response = server
        .mock("POST", "/tests/response")
        .match_body(Matcher::Json(
            json!({ "attemptId": "A1", "questionId": "q0", "optionOrder": 2 }),
        ))
        .with_status(200)
        .with_body(json!({ "ok": true }).to_string())
        .expect(1)
        .create_async()
        .await;
    let submit = server
        .mock("POST", "/tests/submit-section")
        .with_status(200)
        .with_body(json!({ "status": "SUBMITTED" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let store = MemoryAttemptStore::new();
    let mut session = SessionController::new(client_for(&server), store.clone());
    let key = AttemptKey::new(TEST_ID, USER_ID);

    assert_ok!(session.initialize(TEST_ID, USER_ID).await);
    assert_eq!(session.status(), AttemptStatus::InProgress);
    assert_eq!(session.time_left(), Some(5400));
    assert_eq!(assert_ok!(store.load(&key)).as_deref(), Some("A1"));

    let first = session.attempt().unwrap().questions[0].clone();
    assert_eq!(first.options[0], "Newton");

    assert_ok!(session.select_answer(&first.id, 2).await);
    assert_ok!(session.submit().await);

    assert_eq!(session.status(), AttemptStatus::Submitted);
    assert!(assert_ok!(store.load(&key)).is_none());
    // 交卷后不再请求状态
    assert_eq!(assert_ok!(session.poll().await), PollOutcome::Stopped);

    start.assert_async().await;
    state.assert_async().await;
    response.assert_async().await;
    submit.assert_async().await;
}

#[tokio::test]
async fn resume_from_cache_skips_start() {
    let mut server = Server::new_async().await;
    let start = server
        .mock("POST", "/tests/start")
        .expect(0)
        .create_async()
        .await;
    let state = server
        .mock("GET", "/tests/state/A7")
        .with_status(200)
        .with_body(state_body("IN_PROGRESS", 1800))
        .expect(1)
        .create_async()
        .await;

    let store = MemoryAttemptStore::new();
    assert_ok!(store.save(&AttemptKey::new(TEST_ID, USER_ID), "A7"));
    let mut session = SessionController::new(client_for(&server), store);

    assert_ok!(session.initialize(TEST_ID, USER_ID).await);
    assert_eq!(session.attempt().unwrap().attempt_id, "A7");
    assert_eq!(session.time_left(), Some(1800));

    start.assert_async().await;
    state.assert_async().await;
}
