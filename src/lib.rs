#[macro_use]
extern crate rocket;

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod env;
pub mod error;
pub mod models;
pub mod telemetry;
pub mod validation;
#[cfg(test)]
mod test;

use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use auth::AccessPolicy;
use config::AppConfig;
use database::{CURRENT_SCHEMA, connect, migrate_database_declaratively};
use error::AppError;
use telemetry::{TelemetryFairing, init_tracing, shutdown_telemetry};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Figment(rocket::figment::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::figment::Error> for Error {
    fn from(value: rocket::figment::Error) -> Self {
        Error::Figment(value)
    }
}

/// Loads configuration, prepares the database, and assembles the server.
pub async fn build_rocket() -> Result<Rocket<Build>, Error> {
    env::load_environment()?;
    let config = AppConfig::load()?;
    init_tracing(&config)?;

    let pool = connect(&config.database_url).await?;

    info!("Running declarative database migrations...");
    let changed = migrate_database_declaratively(
        pool.clone(),
        CURRENT_SCHEMA,
        config.allow_destructive_migrations,
    )
    .await?;
    if changed {
        info!("Database schema updated");
    }

    Ok(init_rocket(pool, config.access_policy())
        .await
        .attach(AdHoc::on_shutdown("Telemetry shutdown", |_| {
            Box::pin(async {
                shutdown_telemetry();
            })
        })))
}

pub async fn init_rocket(pool: SqlitePool, access_policy: AccessPolicy) -> Rocket<Build> {
    info!("Starting portfolio api");

    rocket::build()
        .manage(pool)
        .manage(access_policy)
        .mount("/api", api::routes())
        .register("/api", api::catchers())
        .attach(TelemetryFairing)
}
