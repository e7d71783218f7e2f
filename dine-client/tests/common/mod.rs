//! In-process server for the client tests

#![allow(dead_code)]

use dine_client::{ClientConfig, DineBackend, LocalBackend};
use dine_server::auth::{JwtConfig, JwtService};
use dine_server::{Config, DineStorage, ServerState};
use http::Method;
use shared::models::{Profile, Role};
use std::sync::Arc;
use std::time::Duration;

pub const ADMIN_ID: &str = "admin-user";
pub const CUSTOMER_ID: &str = "customer-user";

pub struct TestEnv {
    pub state: ServerState,
    pub admin_token: String,
    pub customer_token: String,
}

pub fn create_test_env() -> TestEnv {
    let config = Config::with_overrides("./target/test-data", 0);
    let storage = DineStorage::open_in_memory().unwrap();
    storage
        .put_profile(&Profile {
            id: ADMIN_ID.into(),
            email: Some("admin@diner.test".into()),
            role: Role::Admin,
        })
        .unwrap();

    let jwt = JwtService::with_config(
        JwtConfig::from_secret(Some("client-test-secret-0123456789abcdefgh".into()), false)
            .unwrap(),
    );
    let admin_token = jwt.generate_token(ADMIN_ID, None).unwrap();
    let customer_token = jwt.generate_token(CUSTOMER_ID, None).unwrap();

    TestEnv {
        state: ServerState::with_jwt(&config, storage, jwt),
        admin_token,
        customer_token,
    }
}

impl TestEnv {
    /// Anonymous diner
    pub fn diner(&self) -> Arc<dyn DineBackend> {
        Arc::new(LocalBackend::new(self.state.clone()))
    }

    /// Backend already carrying the admin token
    pub fn staff(&self) -> Arc<dyn DineBackend> {
        Arc::new(LocalBackend::new(self.state.clone()).with_token(self.admin_token.clone()))
    }

    /// Burger 10.00, soda 2.50 and the given tables
    pub async fn seed(&self, table_numbers: &[i32]) {
        let staff = self.staff();
        for (id, name, price) in [("burger", "Burger", 10.0), ("soda", "Soda", 2.5)] {
            staff
                .request(
                    Method::POST,
                    "/api/menu",
                    Some(serde_json::json!({
                        "id": id, "name": name, "description": null,
                        "price": price, "category": "Mains", "image_url": null
                    })),
                )
                .await
                .unwrap();
        }
        for number in table_numbers {
            staff
                .request(
                    Method::POST,
                    "/api/tables",
                    Some(serde_json::json!({ "number": number, "name": null })),
                )
                .await
                .unwrap();
        }
    }
}

/// Fast timers so polling and reconnects happen within a test
pub fn client_config() -> ClientConfig {
    ClientConfig::new("http://in-process").with_poll_interval(Duration::from_millis(100))
}
