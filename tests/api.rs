use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use portfolio::{
    app::build_app,
    auth::{
        errors::AuthError,
        jwt::{Clock, TokenIssuer},
        memory::MemoryUserRepository,
        repo::UserRepository,
        repo_types::User,
    },
    state::AppState,
};
use serde_json::{json, Value};
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    state: AppState,
    users: Arc<MemoryUserRepository>,
}

impl TestApp {
    fn new() -> Self {
        let users = Arc::new(MemoryUserRepository::new());
        let state = AppState::fake(users.clone()).expect("fake state");
        Self {
            router: build_app(state.clone()),
            state,
            users,
        }
    }

    fn with_store(store: Arc<dyn UserRepository>) -> Self {
        let state = AppState::fake(store).expect("fake state");
        Self {
            router: build_app(state.clone()),
            state,
            users: Arc::new(MemoryUserRepository::new()),
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let res = self.router.clone().oneshot(req).await.expect("infallible");
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(Method::GET).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> (StatusCode, Value) {
        self.post(
            "/api/auth/register",
            json!({ "name": name, "email": email, "password": password }),
        )
        .await
    }
}

/// Store whose every call fails the way an unreachable database does.
struct DownStore;

#[async_trait]
impl UserRepository for DownStore {
    async fn find_by_email(&self, _email: &str) -> Result<Option<User>, AuthError> {
        Err(AuthError::from(sqlx::Error::PoolTimedOut))
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, AuthError> {
        Err(AuthError::from(sqlx::Error::PoolTimedOut))
    }

    async fn create(&self, _name: &str, _email: &str, _hash: &str) -> Result<User, AuthError> {
        Err(AuthError::from(sqlx::Error::PoolTimedOut))
    }
}

struct FixedClock(OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

#[tokio::test]
async fn health_route_is_open() {
    let app = TestApp::new();
    let (status, body) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "API is running");
    assert!(body["time"].is_string());
}

#[tokio::test]
async fn register_returns_created_with_token() {
    let app = TestApp::new();
    let (status, body) = app.register("Ada", "Ada@Example.com", "secret").await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["name"], "Ada");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn duplicate_registration_is_bad_request() {
    let app = TestApp::new();
    app.register("Ada", "a@b.com", "secret").await;
    let (status, body) = app.register("Imposter", "A@B.COM", "secret2").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "DuplicateEmail" }));
}

#[tokio::test]
async fn concurrent_duplicate_registrations_have_one_winner() {
    let app = Arc::new(TestApp::new());
    let mut tasks = Vec::new();
    for _ in 0..6 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            app.register("Ada", "race@b.com", "secret").await.0
        }));
    }

    let mut statuses = Vec::new();
    for t in tasks {
        statuses.push(t.await.unwrap());
    }
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::BAD_REQUEST).count(), 5);
    assert_eq!(app.users.len().await, 1);
}

#[tokio::test]
async fn register_validates_input() {
    let app = TestApp::new();

    let (status, body) = app.register("Ada", "not-an-email", "secret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "ValidationError");

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({ "name": "Ada", "email": "a@b.com", "password": "secret", "confirmPassword": "secrets" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "ValidationError");

    let (status, body) = app
        .post("/api/auth/register", json!({ "email": "a@b.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "ValidationError");
}

#[tokio::test]
async fn login_is_case_insensitive_on_email() {
    let app = TestApp::new();
    let (_, reg) = app.register("Ada", "A@B.com", "secret").await;

    let (status, body) = app
        .post("/api/auth/login", json!({ "email": "a@b.com", "password": "secret" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], reg["user"]["id"]);
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.register("Ada", "a@b.com", "secret").await;

    let wrong_password = app
        .post("/api/auth/login", json!({ "email": "a@b.com", "password": "guess!" }))
        .await;
    let unknown_email = app
        .post("/api/auth/login", json!({ "email": "nobody@b.com", "password": "secret" }))
        .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password.1, json!({ "message": "InvalidCredentials" }));
}

#[tokio::test]
async fn me_returns_the_session_user() {
    let app = TestApp::new();
    let (_, reg) = app.register("Ada", "a@b.com", "secret").await;
    let token = reg["token"].as_str().unwrap();

    let (status, body) = app.get("/api/auth/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, reg["user"]);
}

#[tokio::test]
async fn guard_rejects_missing_and_malformed_tokens() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "MissingToken");

    let (status, body) = app.get("/api/auth/me", Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "InvalidToken");

    let (status, _) = app.get("/api/profile", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn guard_rejects_expired_tokens() {
    let app = TestApp::new();
    let (_, reg) = app.register("Ada", "a@b.com", "secret").await;
    let user_id: Uuid = reg["user"]["id"].as_str().unwrap().parse().unwrap();

    let past = OffsetDateTime::now_utc() - Duration::days(1);
    let stale_issuer = TokenIssuer::with_clock(&app.state.config.jwt, Arc::new(FixedClock(past)));
    let stale = stale_issuer.issue(user_id).unwrap();

    let (status, body) = app.get("/api/auth/me", Some(&stale)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "ExpiredToken");
}

#[tokio::test]
async fn guard_rejects_tampered_tokens() {
    let app = TestApp::new();
    let (_, reg) = app.register("Ada", "a@b.com", "secret").await;
    let token = reg["token"].as_str().unwrap();

    // Flip one character in the middle of the payload segment.
    let dot = token.find('.').unwrap();
    let idx = dot + 5;
    let original = token.as_bytes()[idx];
    let replacement = if original == b'x' { "y" } else { "x" };
    let mut tampered = token.to_string();
    tampered.replace_range(idx..idx + 1, replacement);

    let (status, body) = app.get("/api/auth/me", Some(&tampered)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "InvalidToken");
}

#[tokio::test]
async fn me_after_user_removal_is_user_not_found() {
    let app = TestApp::new();
    let (_, reg) = app.register("Ada", "a@b.com", "secret").await;
    let token = reg["token"].as_str().unwrap();
    let user_id: Uuid = reg["user"]["id"].as_str().unwrap().parse().unwrap();

    assert!(app.users.delete(user_id).await);

    let (status, body) = app.get("/api/auth/me", Some(token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "UserNotFound" }));
}

#[tokio::test]
async fn profile_is_served_to_signed_in_users() {
    let app = TestApp::new();
    let (_, reg) = app.register("Ada", "a@b.com", "secret").await;
    let token = reg["token"].as_str().unwrap();

    let (status, body) = app.get("/api/profile", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], app.state.profile.name.as_str());
    assert_eq!(body["skills"].as_array().unwrap().len(), 4);
    assert!(body["projects"][0]["techStack"].is_string());
}

#[tokio::test]
async fn unreachable_store_is_service_unavailable() {
    let app = TestApp::with_store(Arc::new(DownStore));
    let expected = json!({ "message": "StoreUnavailable" });

    let (status, body) = app.register("Ada", "a@b.com", "secret").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, expected);

    let (status, body) = app
        .post("/api/auth/login", json!({ "email": "a@b.com", "password": "secret" }))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, expected);

    let token = app.state.tokens.issue(Uuid::new_v4()).unwrap();
    let (status, body) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, expected);
}
