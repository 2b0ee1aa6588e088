//! Runnable task gateway over the in-memory store.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example task_api
//!
//! TOKEN=$(curl -si -X POST localhost:3000/api/login \
//!   -d '{"login":"admin@domain.org","password":"demo"}' \
//!   | grep -i '^authorization:' | cut -d' ' -f2 | tr -d '\r')
//! curl -H "Authorization: Bearer $TOKEN" localhost:3000/api/Task
//! ```

use restgate::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let store = InMemoryStore::new().register(
        ModelSpec::new(ModelDescriptor::new(
            "Task",
            "id",
            vec!["id".into(), "title".into()],
            vec!["id".into(), "title".into(), "content".into(), "user_id".into()],
        ))
        .require("title")
        .owned_by("user_id")
        .role("admin", RoleRule::all())
        .role("user", RoleRule::owner()),
    );
    store.seed("Task", json!({"title": "Task 1", "content": "First!", "user_id": 1}))?;
    store.seed("Task", json!({"title": "Task 2", "content": "Second.", "user_id": 2}))?;

    let demo_hash = StaticCredentialSource::hash_password("demo", 10)?;
    let users = StaticCredentialSource::new(vec![
        Principal::new(1, "admin")
            .with_password_hash(demo_hash.clone())
            .with_property("login", "admin@domain.org"),
        Principal::new(2, "user")
            .with_password_hash(demo_hash)
            .with_property("login", "user@domain.org"),
    ]);

    println!("🚀 restgate task API on http://127.0.0.1:3000/api");
    println!("   POST /api/login with {{\"login\", \"password\"}} to get a token\n");

    GatewayBuilder::new()
        .with_config(GatewayConfig::with_secret("!AmazingSecret!"))
        .with_store(store)
        .with_credential_source(users)
        .serve("127.0.0.1:3000")
        .await
}
