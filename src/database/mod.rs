pub mod migrations;
pub mod projects;
pub mod schema;
pub mod taxonomy;
pub mod work;

pub use migrations::*;
pub use projects::*;
pub use schema::*;
pub use taxonomy::*;
pub use work::*;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::DbTechnology;

/// A technology row joined through a link table, tagged with the owning row's id.
#[derive(FromRow)]
pub(crate) struct LinkedTechnology {
    pub owner_id: i64,
    #[sqlx(flatten)]
    pub technology: DbTechnology,
}

#[instrument]
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    info!("Connecting to SQLite database");
    open_pool(database_url, true).await
}

/// Like [`connect`], but fails instead of creating a missing database file.
#[instrument]
pub async fn connect_existing(database_url: &str) -> Result<SqlitePool, AppError> {
    info!("Connecting to existing SQLite database");
    open_pool(database_url, false).await
}

async fn open_pool(database_url: &str, create_if_missing: bool) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(create_if_missing)
        .foreign_keys(true);

    Ok(SqlitePoolOptions::new().connect_with(options).await?)
}

fn invalid_pk(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

pub(crate) async fn row_exists(
    conn: &mut SqliteConnection,
    table: &'static str,
    id: i64,
) -> Result<bool, AppError> {
    let found: Option<i64> = sqlx::query_scalar(&format!("SELECT id FROM {} WHERE id = ?", table))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(found.is_some())
}

/// Fails with a field error on `field` unless `table` has a row with `id`.
pub(crate) async fn ensure_exists(
    conn: &mut SqliteConnection,
    table: &'static str,
    id: i64,
    field: &str,
) -> Result<(), AppError> {
    if row_exists(conn, table, id).await? {
        Ok(())
    } else {
        Err(AppError::field(field, invalid_pk(id)))
    }
}

/// Like [`ensure_exists`] for a list of references; every dangling id is reported.
pub(crate) async fn ensure_all_exist(
    conn: &mut SqliteConnection,
    table: &'static str,
    ids: &[i64],
    field: &str,
) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }

    let found: Vec<i64> = sqlx::query_scalar(&format!(
        "SELECT id FROM {} WHERE id IN (SELECT value FROM json_each(?))",
        table
    ))
    .bind(id_list_param(ids))
    .fetch_all(&mut *conn)
    .await?;

    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !found.contains(id))
        .map(|id| invalid_pk(*id))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        let mut errors = crate::error::FieldErrors::new();
        errors.insert(field.to_string(), missing);
        Err(AppError::Validation(errors))
    }
}

/// Encodes ids as a JSON array so one statement can bind a whole list via `json_each`.
pub(crate) fn id_list_param(ids: &[i64]) -> String {
    let items: Vec<String> = ids.iter().map(i64::to_string).collect();
    format!("[{}]", items.join(","))
}

/// Drops repeated ids while keeping first-seen order.
pub(crate) fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
