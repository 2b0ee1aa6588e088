//! End-to-end gateway tests
//!
//! Full HTTP round-trips over `axum_test::TestServer`: login, the auth
//! gate, every model endpoint, the error taxonomy and sanitization. The
//! fixture is a small task tracker with role/owner rules and scope field
//! projection.

use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum_test::TestServer;
use jsonwebtoken::Algorithm;
use serde_json::{Value, json};

use restgate::config::GatewayConfig;
use restgate::core::credentials::{Credentials, Principal};
use restgate::core::model::ModelDescriptor;
use restgate::core::token::TokenCodec;
use restgate::server::GatewayBuilder;
use restgate::storage::{Access, InMemoryStore, ModelSpec, RoleRule, StaticCredentialSource};

const SECRET: &str = "!AmazingSecret!";

fn field_list(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

fn task_spec() -> ModelSpec {
    ModelSpec::new(ModelDescriptor::new(
        "Task",
        "id",
        field_list(&["id", "title", "user_id"]),
        field_list(&["id", "title", "content", "user_id"]),
    ))
    .require("title")
    .owned_by("user_id")
    .role("admin", RoleRule::all())
    .role(
        "manager",
        RoleRule {
            create: true,
            read: Access::All,
            update: Access::Owner,
            delete: Access::All,
            update_fields: Some(vec!["title".to_string()]),
        },
    )
    .role("user", RoleRule::owner())
}

fn user_spec() -> ModelSpec {
    ModelSpec::new(ModelDescriptor::new(
        "User",
        "id",
        field_list(&["id", "login", "role"]),
        field_list(&["id", "login", "role"]),
    ))
    .owned_by("id")
    .role("admin", RoleRule::all())
    .role(
        "user",
        RoleRule {
            create: false,
            read: Access::Owner,
            update: Access::Denied,
            delete: Access::Denied,
            update_fields: None,
        },
    )
}

fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new().register(user_spec()).register(task_spec());

    let users = [
        ("admin@domain.org", "admin"),
        ("user1@domain.org", "user"),
        ("user2@domain.org", "user"),
        ("user3@domain.org", "user"),
        ("user4@domain.org", "manager"),
    ];
    for (login, role) in users {
        store
            .seed("User", json!({"login": login, "role": role}))
            .expect("user seed should succeed");
    }
    for n in 1..=5 {
        store
            .seed(
                "Task",
                json!({
                    "title": format!("Task {n}"),
                    "content": format!("Content Task {n} owned by user {n}"),
                    "user_id": n
                }),
            )
            .expect("task seed should succeed");
    }
    store
}

fn principals() -> Vec<Principal> {
    let hash = StaticCredentialSource::hash_password("demo", 4).expect("hashing should succeed");
    vec![
        Principal::new(1, "admin")
            .with_password_hash(hash.clone())
            .with_property("login", "admin@domain.org"),
        Principal::new(2, "user")
            .with_password_hash(hash.clone())
            .with_property("login", "user1@domain.org")
            .confirmed(true),
        Principal::new(3, "user")
            .with_password_hash(hash.clone())
            .with_property("login", "user2@domain.org")
            .confirmed(true)
            .disabled(),
        Principal::new(4, "user")
            .with_password_hash(hash.clone())
            .with_property("login", "user3@domain.org")
            .confirmed(false),
        Principal::new(5, "manager")
            .with_password_hash(hash)
            .with_property("login", "user4@domain.org")
            .confirmed(true),
    ]
}

fn make_server() -> TestServer {
    let router = GatewayBuilder::new()
        .with_config(GatewayConfig::with_secret(SECRET))
        .with_store(seeded_store())
        .with_credential_source(StaticCredentialSource::new(principals()))
        .build()
        .expect("gateway should build");
    TestServer::new(router).expect("test server should start")
}

async fn login(server: &TestServer, login: &str) -> String {
    let response = server
        .post("/api/login")
        .json(&json!({"login": login, "password": "demo"}))
        .await;
    response.assert_status(StatusCode::OK);
    response
        .headers()
        .get(AUTHORIZATION)
        .expect("login response should carry a token")
        .to_str()
        .expect("token should be ascii")
        .to_string()
}

// ==============================================================
// Login
// ==============================================================

#[tokio::test]
async fn test_login_returns_token_and_claims() {
    let server = make_server();

    let response = server
        .post("/api/login")
        .json(&json!({"login": "admin@domain.org", "password": "demo"}))
        .await;

    response.assert_status(StatusCode::OK);
    assert!(response.headers().get(AUTHORIZATION).is_some());

    let body: Value = response.json();
    assert_eq!(body["id"], 1);
    assert_eq!(body["role"], "admin");
    assert!(body["iat"].as_i64().is_some());
    assert!(body["exp"].as_i64().is_some());
    // nothing but claims in the body
    assert!(body.get("password_hash").is_none());
    assert!(body.get("login").is_none());
}

#[tokio::test]
async fn test_login_wrong_password_is_401() {
    let server = make_server();

    let response = server
        .post("/api/login")
        .json(&json!({"login": "admin@domain.org", "password": "nope"}))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "BadCredentials");
    assert!(body["message"].as_str().expect("message").contains("BadCredentials"));
}

#[tokio::test]
async fn test_login_unknown_user_is_401() {
    let server = make_server();

    let response = server
        .post("/api/login")
        .json(&json!({"login": "nobody@domain.org", "password": "demo"}))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_without_payload_is_401() {
    let server = make_server();

    let response = server.post("/api/login").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server.post("/api/login").json(&json!({"login": ""})).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_disabled_account_is_403() {
    let server = make_server();

    let response = server
        .post("/api/login")
        .json(&json!({"login": "user2@domain.org", "password": "demo"}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"], "UserDisabled");
}

#[tokio::test]
async fn test_login_unconfirmed_account_is_403() {
    let server = make_server();

    let response = server
        .post("/api/login")
        .json(&json!({"login": "user3@domain.org", "password": "demo"}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"], "InvalidUser");
}

// ==============================================================
// Auth gate
// ==============================================================

#[tokio::test]
async fn test_request_without_token_is_401() {
    let server = make_server();

    let response = server.get("/api/Task").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "MissingCredentials");
}

#[tokio::test]
async fn test_garbage_token_is_401() {
    let server = make_server();

    let response = server
        .get("/api/Task")
        .add_header(AUTHORIZATION, "not.a.token")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "InvalidToken");
}

#[tokio::test]
async fn test_expired_token_is_401() {
    let server = make_server();

    let stale = TokenCodec::new(SECRET, Algorithm::HS256, -3600);
    let (token, _) = stale
        .sign(Credentials {
            id: json!(1),
            role: "admin".to_string(),
            scope: None,
        })
        .expect("signing should succeed");

    let response = server
        .get("/api/Task")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "ExpiredToken");
}

#[tokio::test]
async fn test_token_for_vanished_principal_is_401() {
    let server = make_server();

    let codec = TokenCodec::new(SECRET, Algorithm::HS256, 3600);
    let (token, _) = codec
        .sign(Credentials {
            id: json!(999),
            role: "admin".to_string(),
            scope: None,
        })
        .expect("signing should succeed");

    let response = server
        .get("/api/Task")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_bearer_prefix_accepted() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .get("/api/Task")
        .add_header(AUTHORIZATION, format!("Bearer {token}"))
        .await;
    response.assert_status(StatusCode::OK);
}

// ==============================================================
// Collection reads
// ==============================================================

#[tokio::test]
async fn test_admin_lists_all_tasks_without_content() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .get("/api/Task")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    let tasks = body.as_array().expect("collection should be an array");
    assert_eq!(tasks.len(), 5);
    // collection scope projects content away
    assert!(tasks[0].get("title").is_some());
    assert!(tasks[0].get("content").is_none());
}

#[tokio::test]
async fn test_user_lists_only_own_tasks() {
    let server = make_server();
    let token = login(&server, "user1@domain.org").await;

    let response = server
        .get("/api/Task")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    let tasks = body.as_array().expect("collection should be an array");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["user_id"], 2);
}

#[tokio::test]
async fn test_user_sees_only_own_user_row() {
    let server = make_server();
    let token = login(&server, "user1@domain.org").await;

    let response = server
        .get("/api/User")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    let rows = body.as_array().expect("collection should be an array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["login"], "user1@domain.org");
}

#[tokio::test]
async fn test_unknown_model_is_404() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .get("/api/Ghost")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "UnknownModel");
}

// ==============================================================
// Single reads
// ==============================================================

#[tokio::test]
async fn test_single_read_includes_content() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .get("/api/Task/2")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["id"], 2);
    assert_eq!(body["content"], "Content Task 2 owned by user 2");
}

#[tokio::test]
async fn test_single_read_missing_record_is_404() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .get("/api/Task/99")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "RecordNotFound");
    assert!(body["message"].as_str().expect("message").contains("RecordNotFound"));
}

#[tokio::test]
async fn test_single_read_foreign_record_is_404_for_owner_role() {
    let server = make_server();
    let token = login(&server, "user1@domain.org").await;

    let response = server
        .get("/api/Task/1")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

// ==============================================================
// Create / clone
// ==============================================================

#[tokio::test]
async fn test_create_returns_201_with_location() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .post("/api/Task")
        .add_header(AUTHORIZATION, token)
        .json(&json!({"title": "Task 6", "content": "fresh"}))
        .await;

    response.assert_status(StatusCode::CREATED);
    let location = response
        .headers()
        .get("location")
        .expect("created response should carry Location")
        .to_str()
        .expect("location should be ascii");
    assert_eq!(location, "/api/Task/6");

    let body: Value = response.json();
    assert_eq!(body["id"], 6);
    assert_eq!(body["title"], "Task 6");
}

#[tokio::test]
async fn test_create_missing_required_field_is_422_with_errors() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .post("/api/Task")
        .add_header(AUTHORIZATION, token)
        .json(&json!({"content": "no title"}))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"], "Validation");
    let errors = body["errors"].as_array().expect("errors array");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], "title");
    // allow-listed fields only
    assert!(errors[0].get("stack").is_none());
}

#[tokio::test]
async fn test_create_without_body_is_422() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .post("/api/Task")
        .add_header(AUTHORIZATION, token)
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"], "UndefinedProperties");
}

#[tokio::test]
async fn test_create_malformed_json_is_422() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .post("/api/Task")
        .add_header(AUTHORIZATION, token)
        .text("{not json")
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"], "InvalidPayload");
}

#[tokio::test]
async fn test_create_denied_role_is_401() {
    let server = make_server();
    let token = login(&server, "user1@domain.org").await;

    let response = server
        .post("/api/User")
        .add_header(AUTHORIZATION, token)
        .json(&json!({"login": "evil@domain.org", "role": "admin"}))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_clone_inherits_source_and_applies_overrides() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .post("/api/Task?clone=1")
        .add_header(AUTHORIZATION, token.clone())
        .json(&json!({"title": "Copy of Task 1"}))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["id"], 6);
    assert_eq!(body["title"], "Copy of Task 1");

    // content inherited from the source, visible on a single read
    let response = server
        .get("/api/Task/6")
        .add_header(AUTHORIZATION, token)
        .await;
    let body: Value = response.json();
    assert_eq!(body["content"], "Content Task 1 owned by user 1");
}

#[tokio::test]
async fn test_clone_missing_source_is_404() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .post("/api/Task?clone=99")
        .add_header(AUTHORIZATION, token)
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "CloneSrcNotFound");
}

// ==============================================================
// Update
// ==============================================================

#[tokio::test]
async fn test_update_returns_bare_count() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .patch("/api/Task/1")
        .add_header(AUTHORIZATION, token.clone())
        .json(&json!({"title": "Renamed"}))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body, json!(1));

    let response = server
        .get("/api/Task/1")
        .add_header(AUTHORIZATION, token)
        .await;
    let body: Value = response.json();
    assert_eq!(body["title"], "Renamed");
}

#[tokio::test]
async fn test_put_behaves_like_patch() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .put("/api/Task/1")
        .add_header(AUTHORIZATION, token)
        .json(&json!({"title": "Replaced"}))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body, json!(1));
}

#[tokio::test]
async fn test_update_missing_record_is_404() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .patch("/api/Task/99")
        .add_header(AUTHORIZATION, token)
        .json(&json!({"title": "Nope"}))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_foreign_record_is_404_for_owner_role() {
    let server = make_server();
    let token = login(&server, "user1@domain.org").await;

    let response = server
        .patch("/api/Task/1")
        .add_header(AUTHORIZATION, token)
        .json(&json!({"title": "Hijack"}))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manager_update_restricted_to_declared_fields() {
    let server = make_server();
    let manager_token = login(&server, "user4@domain.org").await;

    // Task 5 is owned by principal 5 (the manager)
    let response = server
        .patch("/api/Task/5")
        .add_header(AUTHORIZATION, manager_token)
        .json(&json!({"title": "Managed", "content": "overwritten?"}))
        .await;
    response.assert_status(StatusCode::OK);

    let admin_token = login(&server, "admin@domain.org").await;
    let response = server
        .get("/api/Task/5")
        .add_header(AUTHORIZATION, admin_token)
        .await;
    let body: Value = response.json();
    assert_eq!(body["title"], "Managed");
    // fields outside the restriction are silently dropped
    assert_eq!(body["content"], "Content Task 5 owned by user 5");
}

// ==============================================================
// Delete
// ==============================================================

#[tokio::test]
async fn test_delete_reports_count_then_404() {
    let server = make_server();
    let token = login(&server, "admin@domain.org").await;

    let response = server
        .delete("/api/Task/1")
        .add_header(AUTHORIZATION, token.clone())
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body, json!({"del_count": 1}));

    let response = server
        .delete("/api/Task/1")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_foreign_record_is_404_for_owner_role() {
    let server = make_server();
    let token = login(&server, "user1@domain.org").await;

    let response = server
        .delete("/api/Task/1")
        .add_header(AUTHORIZATION, token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}
