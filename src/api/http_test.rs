use super::*;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Json;
use serde_json::{Value, json};

const TIMEOUTS: RequestTimeouts = RequestTimeouts { request_secs: 5, connect_secs: 2 };

fn login_body() -> Value {
    json!({
        "success": true,
        "data": {
            "user": {
                "id": "u-1",
                "email": "amina@example.com",
                "firstName": "Amina",
                "lastName": "Odhiambo",
                "phoneNumber": "+254700000000",
                "role": "student",
                "studentInfo": { "grade": "Form 2", "school": "Moi Girls" }
            },
            "tokens": { "accessToken": "access-1", "refreshToken": "refresh-1" }
        }
    })
}

/// Serve `app` on an ephemeral port and return its `/api` base URL.
async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

// =============================================================================
// parse_login / parse_refresh
// =============================================================================

#[test]
fn parse_login_extracts_user_and_tokens() {
    let grant = parse_login(&login_body().to_string()).unwrap();
    assert_eq!(grant.user.id, "u-1");
    assert_eq!(grant.user.first_name, "Amina");
    assert_eq!(grant.tokens.access_token, "access-1");
    assert_eq!(grant.tokens.refresh_token, "refresh-1");
}

#[test]
fn parse_login_missing_tokens_is_parse_error() {
    let body = json!({ "data": { "user": login_body()["data"]["user"].clone() } });
    let err = parse_login(&body.to_string()).unwrap_err();
    assert!(matches!(err, ApiError::Parse(_)));
}

#[test]
fn parse_login_accepts_partial_profile() {
    let body = json!({
        "data": {
            "user": { "_id": "665f1c", "email": "amina@example.com", "firstName": "Amina" },
            "tokens": { "accessToken": "access-1", "refreshToken": "refresh-1" }
        }
    });
    let grant = parse_login(&body.to_string()).unwrap();
    assert_eq!(grant.user.id, "665f1c");
    assert_eq!(grant.user.last_name, "");
    assert_eq!(grant.user.student_info, None);
    assert_eq!(grant.tokens.refresh_token, "refresh-1");
}

#[test]
fn parse_refresh_extracts_access_token() {
    let token = parse_refresh(r#"{"data":{"accessToken":"access-2"}}"#).unwrap();
    assert_eq!(token, "access-2");
}

#[test]
fn parse_refresh_invalid_json() {
    assert!(matches!(parse_refresh("not json"), Err(ApiError::Parse(_))));
}

// =============================================================================
// parse_rejection
// =============================================================================

#[test]
fn rejection_carries_message() {
    let err = parse_rejection(401, r#"{"message":"Invalid credentials"}"#);
    assert!(matches!(
        err,
        ApiError::Rejected { status: 401, message: Some(ref m), errors: None } if m == "Invalid credentials"
    ));
}

#[test]
fn rejection_carries_field_errors() {
    let err = parse_rejection(422, r#"{"errors":{"email":"already registered"}}"#);
    let ApiError::Rejected { message, errors, .. } = err else {
        panic!("expected Rejected");
    };
    assert_eq!(message, None);
    assert_eq!(errors, Some(json!({ "email": "already registered" })));
}

#[test]
fn rejection_non_json_body_has_no_message() {
    let err = parse_rejection(502, "<html>Bad Gateway</html>");
    assert!(matches!(err, ApiError::Rejected { status: 502, message: None, errors: None }));
}

#[test]
fn rejection_blank_message_is_dropped() {
    let err = parse_rejection(400, r#"{"message":"   ","errors":null}"#);
    assert!(matches!(err, ApiError::Rejected { message: None, errors: None, .. }));
}

// =============================================================================
// HttpAuthApi against an in-process backend
// =============================================================================

#[test]
fn new_trims_trailing_slash() {
    let api = HttpAuthApi::new("http://localhost:5000/api/", TIMEOUTS).unwrap();
    assert_eq!(api.base_url(), "http://localhost:5000/api");
    assert_eq!(api.url(LOGIN_PATH), "http://localhost:5000/api/auth/login");
    assert_eq!(api.url("subjects"), "http://localhost:5000/api/subjects");
}

#[tokio::test]
async fn login_posts_credentials() {
    let app = Router::new().route(
        "/api/auth/login",
        post(|Json(body): Json<Value>| async move {
            if body == json!({ "email": "amina@example.com", "password": "siri" }) {
                (StatusCode::OK, Json(login_body()))
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" })))
            }
        }),
    );
    let api = HttpAuthApi::new(&spawn_backend(app).await, TIMEOUTS).unwrap();

    let grant = api.login("amina@example.com", "siri").await.unwrap();
    assert_eq!(grant.tokens.access_token, "access-1");

    let err = api.login("amina@example.com", "wrong").await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Rejected { status: 401, message: Some(ref m), .. } if m == "Invalid credentials"
    ));
}

#[tokio::test]
async fn refresh_sends_bearer_refresh_token() {
    let app = Router::new().route(
        "/api/auth/refresh",
        post(|headers: HeaderMap| async move {
            let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
            if auth == Some("Bearer refresh-1") {
                (StatusCode::OK, Json(json!({ "data": { "accessToken": "access-2" } })))
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid refresh token" })))
            }
        }),
    );
    let api = HttpAuthApi::new(&spawn_backend(app).await, TIMEOUTS).unwrap();

    assert_eq!(api.refresh("refresh-1").await.unwrap(), "access-2");
    assert!(matches!(api.refresh("stale").await, Err(ApiError::Rejected { status: 401, .. })));
}

#[tokio::test]
async fn register_passes_payload_through() {
    let app = Router::new().route(
        "/api/auth/register",
        post(|Json(body): Json<Value>| async move {
            if body["email"] == "taken@example.com" {
                (StatusCode::CONFLICT, Json(json!({ "errors": { "email": "already registered" } })))
            } else {
                (StatusCode::CREATED, Json(json!({ "success": true })))
            }
        }),
    );
    let api = HttpAuthApi::new(&spawn_backend(app).await, TIMEOUTS).unwrap();

    api.register(&json!({ "email": "new@example.com", "role": "student" })).await.unwrap();
    let err = api.register(&json!({ "email": "taken@example.com" })).await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { status: 409, message: None, errors: Some(_) }));
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = HttpAuthApi::new(&format!("http://{addr}/api"), TIMEOUTS).unwrap();
    let err = api.login("a@example.com", "pw").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn get_json_sends_access_token() {
    let app = Router::new().route(
        "/api/subjects",
        get(|headers: HeaderMap| async move {
            let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
            if auth == Some("Bearer access-1") {
                (StatusCode::OK, Json(json!({ "data": ["Hisabati", "Kiswahili"] })))
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({ "message": "jwt expired" })))
            }
        }),
    );
    let api = HttpAuthApi::new(&spawn_backend(app).await, TIMEOUTS).unwrap();

    let body = api.get_json("/subjects", "access-1").await.unwrap();
    assert_eq!(body["data"][1], "Kiswahili");
    assert!(matches!(api.get_json("/subjects", "old").await, Err(ApiError::Rejected { status: 401, .. })));
}
