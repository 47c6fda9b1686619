mod alerts;
mod bacteria;
mod common;
mod config;
mod forms;
mod history;
mod routes;
mod samples;

use crate::common::state::AppState;
use crate::config::Config;
use anyhow::Context;
use axum_keycloak_auth::{
    Url,
    instance::{KeycloakAuthInstance, KeycloakConfig},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;

fn keycloak_instance(config: &Config) -> anyhow::Result<Option<Arc<KeycloakAuthInstance>>> {
    if config.keycloak_url.is_empty() {
        return Ok(None);
    }
    let server = Url::parse(&config.keycloak_url).context("KEYCLOAK_URL is not a valid URL")?;
    Ok(Some(Arc::new(KeycloakAuthInstance::new(
        KeycloakConfig::builder()
            .server(server)
            .realm(config.keycloak_realm.clone())
            .build(),
    ))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let db_url = config
        .db_url
        .clone()
        .context("no database URL configured")?;

    let db: DatabaseConnection = Database::connect(&db_url)
        .await
        .context("could not connect to the database")?;
    if db.ping().await.is_ok() {
        tracing::info!("Connected to the database");
    } else {
        tracing::warn!("Database did not answer the initial ping");
    }

    Migrator::up(&db, None)
        .await
        .context("failed to run migrations")?;
    tracing::info!("DB migrations complete");

    let keycloak = keycloak_instance(&config)?;
    if keycloak.is_none() {
        tracing::warn!("KEYCLOAK_URL is empty, acting users are read from request headers");
    }

    tracing::info!(
        "Starting server {} ({} deployment) ...",
        config.app_name,
        config.deployment.to_uppercase()
    );
    let addr: std::net::SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("LISTEN_ADDR '{}' is not a socket address", config.listen_addr))?;
    let state = AppState::new(db, config, keycloak);
    let router = routes::build_router(&state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    tracing::info!("Listening on {addr}");
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
