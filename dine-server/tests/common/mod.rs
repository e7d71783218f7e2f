//! Shared fixtures for the integration tests

#![allow(dead_code)]

use axum::body::Body;
use dine_server::auth::{JwtConfig, JwtService};
use dine_server::{Config, DineStorage, ServerState};
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use shared::models::{Profile, Role};

pub const ADMIN_ID: &str = "admin-user";
pub const CUSTOMER_ID: &str = "customer-user";

pub struct TestServer {
    pub state: ServerState,
    pub admin_token: String,
    pub customer_token: String,
}

pub fn jwt_service() -> JwtService {
    let config = JwtConfig::from_secret(Some("integration-test-secret-0123456789abcdef".into()), false)
        .unwrap();
    JwtService::with_config(config)
}

/// In-memory store, one admin profile, one customer without a profile row
pub fn create_test_server() -> TestServer {
    let mut config = Config::with_overrides("./target/test-data", 0);
    config.public_base_url = "http://diner.test".into();
    let storage = DineStorage::open_in_memory().unwrap();
    storage
        .put_profile(&Profile {
            id: ADMIN_ID.into(),
            email: Some("admin@diner.test".into()),
            role: Role::Admin,
        })
        .unwrap();

    let jwt = jwt_service();
    let admin_token = jwt.generate_token(ADMIN_ID, None).unwrap();
    let customer_token = jwt.generate_token(CUSTOMER_ID, None).unwrap();

    TestServer {
        state: ServerState::with_jwt(&config, storage, jwt),
        admin_token,
        customer_token,
    }
}

impl TestServer {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.state.http.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let token = self.admin_token.clone();
        self.request(method, uri, body, Some(&token)).await
    }

    pub async fn diner(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(method, uri, body, None).await
    }

    /// Seed burger 10.00, soda 2.50 and a table
    pub async fn seed(&self, table_numbers: &[i32]) {
        for (id, name, price) in [("burger", "Burger", 10.0), ("soda", "Soda", 2.5)] {
            let (status, _) = self
                .admin(
                    Method::POST,
                    "/api/menu",
                    Some(serde_json::json!({
                        "id": id, "name": name, "description": null,
                        "price": price, "category": "Mains", "image_url": null
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
        for number in table_numbers {
            let (status, _) = self
                .admin(
                    Method::POST,
                    "/api/tables",
                    Some(serde_json::json!({ "number": number, "name": null })),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
    }
}

pub fn cart(table_number: Option<i32>, lines: &[(&str, f64, i32)]) -> Value {
    serde_json::json!({
        "table_number": table_number,
        "items": lines
            .iter()
            .map(|(id, price, quantity)| serde_json::json!({
                "id": id, "name": id, "price": price, "quantity": quantity
            }))
            .collect::<Vec<_>>(),
    })
}
