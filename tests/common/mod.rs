#![allow(dead_code)]

use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use fitscore_backend::services::scoring::ScoringModel;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

/// Resolves the disposable test database. Never falls back to `DATABASE_URL`,
/// since some tests empty the candidate tables.
pub fn test_database_url() -> String {
    dotenvy::dotenv().ok();
    disposable_url(
        env::var("TEST_DATABASE_URL").ok(),
        env::var("DATABASE_URL").ok(),
    )
}

pub fn disposable_url(test_url: Option<String>, app_url: Option<String>) -> String {
    let url = test_url
        .filter(|u| !u.trim().is_empty())
        .expect("TEST_DATABASE_URL must point at a disposable Postgres database");
    if app_url.as_deref() == Some(url.as_str()) {
        panic!("TEST_DATABASE_URL must differ from DATABASE_URL");
    }
    url
}

pub async fn setup_pool() -> PgPool {
    let database_url = test_database_url();
    let pool = fitscore_backend::database::pool::create_pool(&database_url)
        .await
        .expect("pool");
    fitscore_backend::database::pool::run_migrations(&pool)
        .await
        .expect("migrations");
    pool
}

pub async fn setup_app(model: ScoringModel) -> (Router, PgPool) {
    let pool = setup_pool().await;
    let state = fitscore_backend::AppState::new(pool.clone(), model);
    (fitscore_backend::routes::router(state, 1000), pool)
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, Uuid::new_v4().simple())
}

pub async fn skill_ids(pool: &PgPool, names: &[&str]) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for name in names {
        let id: Uuid = sqlx::query_scalar("SELECT id FROM skills WHERE name = $1")
            .bind(name)
            .fetch_one(pool)
            .await
            .expect("seeded skill");
        ids.push(id);
    }
    ids
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &JsonValue) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
