//! Common test utilities for integration tests.
//!
//! Every test gets its own in-memory SQLite database and a mock stylist, so
//! tests run without any external service.

// Not every integration test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use domain::models::Place;
use domain::services::MockStylistService;
use serde_json::Value;
use sqlx::SqlitePool;
use squadvibe_api::{
    app::{create_app, AppState},
    config::Config,
};
use tower::ServiceExt;

pub const PHOTO: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==";
pub const SHIRT: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQ==";

/// A running application plus handles to its internals.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub state: AppState,
    pub stylist: Arc<MockStylistService>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_stylist(MockStylistService::with_catalog(sample_places())).await
    }

    pub async fn with_stylist(stylist: MockStylistService) -> Self {
        let config = Config::load_for_test(&[]).expect("test config");
        let pool = persistence::db::create_memory_pool()
            .await
            .expect("in-memory database");
        let stylist = Arc::new(stylist);

        let state = AppState::new(config, pool.clone(), stylist.clone());
        state.initialize().await.expect("initialize state");

        Self {
            router: create_app(state.clone()),
            pool,
            state,
            stylist,
        }
    }

    pub async fn get(&self, uri: &str) -> (u16, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (u16, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (u16, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (u16, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (u16, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        (status, parse_response_body(response).await)
    }

    /// Add a member without the base-model regeneration.
    pub async fn add_member(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/squad",
                serde_json::json!({ "name": name, "photoData": PHOTO, "enhance": false }),
            )
            .await;
        assert_eq!(status, 201, "add member failed: {}", body);
        settle().await;
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn add_garment(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/closet",
                serde_json::json!({ "name": name, "imageData": SHIRT }),
            )
            .await;
        assert_eq!(status, 201, "add garment failed: {}", body);
        settle().await;
        body["id"].as_str().unwrap().to_string()
    }

    /// Search, open the first result and enter compose with its first image.
    pub async fn enter_compose(&self) -> Value {
        let (status, _) = self
            .post("/api/v1/studio/search", serde_json::json!({ "query": "Hanoi" }))
            .await;
        assert_eq!(status, 200);

        let (status, _) = self.post("/api/v1/studio/places/p-hoan-kiem", Value::Null).await;
        assert_eq!(status, 200);

        let (status, body) = self
            .post(
                "/api/v1/studio/visualize",
                serde_json::json!({ "imageUrl": "https://images.test/hoan-kiem.jpg" }),
            )
            .await;
        assert_eq!(status, 200);
        body
    }
}

/// Collections are ordered by creation time; keep consecutive inserts apart.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
}

/// Parse response body as JSON; empty bodies become `Null`.
pub async fn parse_response_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

pub fn sample_places() -> Vec<Place> {
    vec![
        place(
            "p-hoan-kiem",
            "Hoan Kiem Lake",
            "Historic lake in the heart of the Old Quarter.",
            21.0288,
            105.8525,
        ),
        place(
            "p-temple",
            "Temple of Literature",
            "Confucian temple with leafy courtyards.",
            21.0294,
            105.8355,
        ),
    ]
}

fn place(id: &str, name: &str, description: &str, lat: f64, lng: f64) -> Place {
    Place {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        lat,
        lng,
        image_urls: vec![format!("https://images.test/{}.jpg", &id[2..])],
        suggested_attire: "Light linen".to_string(),
        best_time: "Early morning".to_string(),
        tips: "Walk the full loop.".to_string(),
    }
}
