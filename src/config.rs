use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub db_url: Option<String>,
    pub app_name: String,
    pub keycloak_ui_id: String,
    pub keycloak_url: String,
    pub keycloak_realm: String,
    pub deployment: String,
    pub listen_addr: String,
    pub tests_running: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load from .env file if available
        let db_url = match env::var("DB_URL") {
            Ok(url) => url,
            Err(_) => format!(
                "{}://{}:{}@{}:{}/{}",
                env::var("DB_PREFIX").unwrap_or_else(|_| "postgresql".to_string()),
                env::var("DB_USER").context("DB_USER must be set")?,
                env::var("DB_PASSWORD").context("DB_PASSWORD must be set")?,
                env::var("DB_HOST").context("DB_HOST must be set")?,
                env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string()),
                env::var("DB_NAME").context("DB_NAME must be set")?,
            ),
        };

        Ok(Config {
            app_name: env::var("APP_NAME").context("APP_NAME must be set")?,
            // Keycloak is optional; an empty URL disables token checks
            keycloak_ui_id: env::var("KEYCLOAK_UI_ID").unwrap_or_default(),
            keycloak_url: env::var("KEYCLOAK_URL").unwrap_or_default(),
            keycloak_realm: env::var("KEYCLOAK_REALM").unwrap_or_default(),
            deployment: env::var("DEPLOYMENT")
                .context("DEPLOYMENT must be set, this can be local, dev, stage, or prod")?,
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            tests_running: false,
            db_url: Some(db_url),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            app_name: "microqc-api-test".to_string(),
            keycloak_ui_id: "test-ui".to_string(),
            keycloak_url: String::new(),
            keycloak_realm: "test-realm".to_string(),
            deployment: "test".to_string(),
            listen_addr: "127.0.0.1:0".to_string(),
            tests_running: true,
            db_url: None,
        }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::common::auth::{ACTOR_NAME_HEADER, ACTOR_ROLE_HEADER};
    use crate::common::state::AppState;
    use crate::routes::build_router;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    /// Fresh in-memory database per test, so tests never share rows.
    pub async fn setup_test_db() -> DatabaseConnection {
        // A single pooled connection keeps the in-memory database alive
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let db = Database::connect(options)
            .await
            .expect("Failed to open in-memory test database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run database migrations");

        db
    }

    pub async fn setup_test_app() -> (Router, DatabaseConnection) {
        let db = setup_test_db().await;
        let state = AppState::new(db.clone(), Config::for_tests(), None);
        (build_router(&state), db)
    }

    /// Extract response body as JSON for testing
    pub async fn extract_response_body(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let body: Value = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            let raw_text = String::from_utf8_lossy(&bytes);
            json!({"error": raw_text})
        });
        (status, body)
    }

    /// Send a request as the given actor, with an optional JSON body
    pub async fn send_as(
        app: &Router,
        role: &str,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(ACTOR_NAME_HEADER, format!("{role}-tester"))
            .header(ACTOR_ROLE_HEADER, role);

        let request = match body {
            Some(json_body) => builder
                .header("content-type", "application/json")
                .body(Body::from(json_body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        extract_response_body(response).await
    }
}
