use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Connection, Pool, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::{info, instrument, warn};

use crate::error::AppError;

/// Differences between the live database and the declared schema.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct SchemaChanges {
    pub new_tables: Vec<String>,
    pub removed_tables: Vec<String>,
    pub modified_tables: Vec<ModifiedTable>,
    pub new_indices: Vec<String>,
    pub removed_indices: Vec<String>,
    pub modified_indices: Vec<String>,
    pub target_user_version: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifiedTable {
    pub name: String,
    pub removed_columns: Vec<String>,
}

impl SchemaChanges {
    pub fn is_empty(&self) -> bool {
        self.new_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.modified_tables.is_empty()
            && self.new_indices.is_empty()
            && self.removed_indices.is_empty()
            && self.modified_indices.is_empty()
            && self.target_user_version.is_none()
    }

    /// True when applying the changes would drop tables, columns, or indices.
    pub fn is_destructive(&self) -> bool {
        !self.removed_tables.is_empty()
            || !self.removed_indices.is_empty()
            || self
                .modified_tables
                .iter()
                .any(|table| !table.removed_columns.is_empty())
    }
}

pub struct DeclarativeMigrator {
    pool: Pool<Sqlite>,
    target_schema: String,
    allow_deletions: bool,
    schema_changes_made: u32,
}

impl DeclarativeMigrator {
    pub fn new(pool: Pool<Sqlite>, target_schema: &str, allow_deletions: bool) -> Self {
        Self {
            pool,
            target_schema: target_schema.to_string(),
            allow_deletions,
            schema_changes_made: 0,
        }
    }

    async fn pristine_pool(&self) -> Result<SqlitePool, AppError> {
        // Every connection to `sqlite::memory:` is its own database.
        let pristine = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        if !self.target_schema.trim().is_empty() {
            sqlx::raw_sql(&self.target_schema)
                .execute(&pristine)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create pristine schema: {}", e)))?;
        }
        Ok(pristine)
    }

    #[instrument(skip(self))]
    pub async fn pending_changes(&self) -> Result<SchemaChanges, AppError> {
        let pristine = self.pristine_pool().await?;
        let mut conn = self.pool.acquire().await?;
        analyze_changes(&mut conn, &pristine).await
    }

    #[instrument(skip(self))]
    pub async fn migrate(&mut self) -> Result<bool, AppError> {
        info!("Starting declarative database migration");

        let pristine = self.pristine_pool().await?;
        let mut conn = self.pool.acquire().await?;

        let changes = analyze_changes(&mut conn, &pristine).await?;
        if changes.is_empty() {
            info!("No schema changes needed");
            return Ok(false);
        }

        if changes.is_destructive() && !self.allow_deletions {
            return Err(AppError::Internal(format!(
                "Refusing destructive migration (tables {:?}, indices {:?}, columns {:?}). Set allow_destructive_migrations to permit this.",
                changes.removed_tables,
                changes.removed_indices,
                changes
                    .modified_tables
                    .iter()
                    .filter(|t| !t.removed_columns.is_empty())
                    .collect::<Vec<_>>()
            )));
        }

        // Rebuilding a parent table must not fire ON DELETE CASCADE, and the
        // pragma is a no-op inside a transaction.
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;

        let result = self.apply_in_transaction(&mut conn, &pristine, &changes).await;

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await?;

        result?;

        if self.schema_changes_made > 0 {
            info!("Running VACUUM after migration");
            sqlx::query("VACUUM").execute(&mut *conn).await?;
        }

        info!(
            "Migration completed. Schema changes made: {}",
            self.schema_changes_made
        );
        Ok(self.schema_changes_made > 0)
    }

    async fn apply_in_transaction(
        &mut self,
        conn: &mut SqliteConnection,
        pristine: &SqlitePool,
        changes: &SchemaChanges,
    ) -> Result<(), AppError> {
        let mut tx = conn.begin().await?;

        self.apply_changes(&mut tx, pristine, changes).await?;

        let violations = sqlx::query("PRAGMA foreign_key_check")
            .fetch_all(&mut *tx)
            .await?;
        if !violations.is_empty() {
            tx.rollback().await?;
            return Err(AppError::Internal(format!(
                "Migration would leave {} foreign key violations",
                violations.len()
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, conn, pristine))]
    async fn apply_changes(
        &mut self,
        conn: &mut SqliteConnection,
        pristine: &SqlitePool,
        changes: &SchemaChanges,
    ) -> Result<(), AppError> {
        let target_tables = table_definitions(pristine).await?;

        for name in &changes.new_tables {
            if let Some(sql) = target_tables.get(name) {
                self.execute_schema_change(&format!("Create new table {}", name), sql, &mut *conn)
                    .await?;
            }
        }

        for table in &changes.modified_tables {
            if let Some(sql) = target_tables.get(&table.name) {
                self.rebuild_table(&mut *conn, &table.name, sql, pristine)
                    .await?;
            }
        }

        for name in &changes.removed_tables {
            self.execute_schema_change(
                &format!("Drop table {}", name),
                &format!("DROP TABLE {}", name),
                &mut *conn,
            )
            .await?;
        }

        // Rebuilt tables lose their indices, so compare against the live state again.
        let current_indices = index_definitions(&mut *conn).await?;
        let target_indices = index_definitions(pristine).await?;

        for name in current_indices.keys() {
            if !target_indices.contains_key(name) {
                self.execute_schema_change(
                    &format!("Drop obsolete index {}", name),
                    &format!("DROP INDEX {}", name),
                    &mut *conn,
                )
                .await?;
            }
        }

        for (name, target_sql) in &target_indices {
            match current_indices.get(name) {
                Some(current_sql) if normalize_sql(current_sql) == normalize_sql(target_sql) => {}
                Some(_) => {
                    self.execute_schema_change(
                        &format!("Drop changed index {}", name),
                        &format!("DROP INDEX {}", name),
                        &mut *conn,
                    )
                    .await?;
                    self.execute_schema_change(
                        &format!("Recreate index {}", name),
                        target_sql,
                        &mut *conn,
                    )
                    .await?;
                }
                None => {
                    self.execute_schema_change(
                        &format!("Create new index {}", name),
                        target_sql,
                        &mut *conn,
                    )
                    .await?;
                }
            }
        }

        if let Some(version) = changes.target_user_version {
            self.execute_schema_change(
                &format!("Set user_version to {}", version),
                &format!("PRAGMA user_version = {}", version),
                &mut *conn,
            )
            .await?;
        }

        Ok(())
    }

    #[instrument(skip(self, conn, target_sql, pristine))]
    async fn rebuild_table(
        &mut self,
        conn: &mut SqliteConnection,
        table_name: &str,
        target_sql: &str,
        pristine: &SqlitePool,
    ) -> Result<(), AppError> {
        info!("Rebuilding table: {}", table_name);

        let temp_name = format!("{}_migration_new", table_name);
        let temp_sql = target_sql.replacen(
            &format!("CREATE TABLE {}", table_name),
            &format!("CREATE TABLE {}", temp_name),
            1,
        );

        self.execute_schema_change(
            &format!("Create temporary table for {}", table_name),
            &temp_sql,
            &mut *conn,
        )
        .await?;

        let current_columns: HashSet<String> =
            table_columns(&mut *conn, table_name).await?.into_iter().collect();
        let common_columns: Vec<String> = table_columns(pristine, table_name)
            .await?
            .into_iter()
            .filter(|column| current_columns.contains(column))
            .collect();

        if !common_columns.is_empty() {
            let columns = common_columns.join(", ");
            self.execute_schema_change(
                &format!("Copy data to new {}", table_name),
                &format!(
                    "INSERT INTO {} ({}) SELECT {} FROM {}",
                    temp_name, columns, columns, table_name
                ),
                &mut *conn,
            )
            .await?;
        }

        self.execute_schema_change(
            &format!("Drop old table {}", table_name),
            &format!("DROP TABLE {}", table_name),
            &mut *conn,
        )
        .await?;

        self.execute_schema_change(
            &format!("Rename new table to {}", table_name),
            &format!("ALTER TABLE {} RENAME TO {}", temp_name, table_name),
            &mut *conn,
        )
        .await
    }

    #[instrument(skip(self, executor))]
    async fn execute_schema_change(
        &mut self,
        description: &str,
        sql: &str,
        executor: impl sqlx::Executor<'_, Database = Sqlite>,
    ) -> Result<(), AppError> {
        info!("Database migration: {} with SQL:\n{}", description, sql);
        sqlx::query(sql).execute(executor).await?;
        self.schema_changes_made += 1;
        Ok(())
    }
}

#[instrument(skip_all)]
async fn analyze_changes(
    conn: &mut SqliteConnection,
    pristine: &SqlitePool,
) -> Result<SchemaChanges, AppError> {
    let mut changes = SchemaChanges::default();

    let current_tables = table_definitions(&mut *conn).await?;
    let target_tables = table_definitions(pristine).await?;

    let (new_tables, removed_tables, changed_tables) = diff(&current_tables, &target_tables);
    changes.new_tables = new_tables;
    changes.removed_tables = removed_tables;

    for name in changed_tables {
        let target_columns: HashSet<String> =
            table_columns(pristine, &name).await?.into_iter().collect();
        let mut removed_columns: Vec<String> = table_columns(&mut *conn, &name)
            .await?
            .into_iter()
            .filter(|column| !target_columns.contains(column))
            .collect();
        removed_columns.sort();

        changes.modified_tables.push(ModifiedTable {
            name,
            removed_columns,
        });
    }

    let current_indices = index_definitions(&mut *conn).await?;
    let target_indices = index_definitions(pristine).await?;

    let (new_indices, removed_indices, changed_indices) =
        diff(&current_indices, &target_indices);
    changes.new_indices = new_indices;
    changes.removed_indices = removed_indices;
    changes.modified_indices = changed_indices;

    let current_version = user_version(&mut *conn).await?;
    let target_version = user_version(pristine).await?;
    if current_version != target_version {
        if target_version < current_version {
            warn!(
                current_version,
                target_version, "Declared schema has an older user_version than the database"
            );
        }
        changes.target_user_version = Some(target_version);
    }

    Ok(changes)
}

/// Splits two name → SQL maps into (added, removed, changed) name lists, sorted.
fn diff(
    current: &HashMap<String, String>,
    target: &HashMap<String, String>,
) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut added: Vec<String> = target
        .keys()
        .filter(|name| !current.contains_key(*name))
        .cloned()
        .collect();
    let mut removed: Vec<String> = current
        .keys()
        .filter(|name| !target.contains_key(*name))
        .cloned()
        .collect();
    let mut changed: Vec<String> = current
        .iter()
        .filter(|(name, sql)| {
            target
                .get(*name)
                .is_some_and(|target_sql| normalize_sql(sql) != normalize_sql(target_sql))
        })
        .map(|(name, _)| name.clone())
        .collect();

    added.sort();
    removed.sort();
    changed.sort();
    (added, removed, changed)
}

async fn table_definitions(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
) -> Result<HashMap<String, String>, AppError> {
    let rows = sqlx::query(
        "SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get::<String, _>(0), row.get::<String, _>(1)))
        .collect())
}

async fn index_definitions(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
) -> Result<HashMap<String, String>, AppError> {
    let rows =
        sqlx::query("SELECT name, sql FROM sqlite_master WHERE type = 'index' AND sql IS NOT NULL")
            .fetch_all(executor)
            .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get::<String, _>(0), row.get::<String, _>(1)))
        .collect())
}

async fn table_columns(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
    table_name: &str,
) -> Result<Vec<String>, AppError> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table_name))
        .fetch_all(executor)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| row.get::<String, _>("name"))
        .collect())
}

async fn user_version(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
) -> Result<i64, AppError> {
    Ok(sqlx::query("PRAGMA user_version")
        .fetch_one(executor)
        .await?
        .get::<i64, _>(0))
}

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"--[^\n]*(\n|$)").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r" *([(),]) *").expect("valid regex"));
static QUOTED_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r#""(\w+)""#).expect("valid regex"));

/// Canonical form used to compare stored and declared DDL.
pub fn normalize_sql(sql: &str) -> String {
    let sql = COMMENT.replace_all(sql, " ");
    let sql = WHITESPACE.replace_all(&sql, " ");
    let sql = PUNCTUATION.replace_all(&sql, "$1");
    let sql = QUOTED_IDENT.replace_all(&sql, "$1");
    sql.trim().to_string()
}

#[instrument(skip(pool, target_schema))]
pub async fn migrate_database_declaratively(
    pool: Pool<Sqlite>,
    target_schema: &str,
    allow_deletions: bool,
) -> Result<bool, AppError> {
    let mut migrator = DeclarativeMigrator::new(pool, target_schema, allow_deletions);
    migrator.migrate().await
}

#[instrument(skip(pool, target_schema))]
pub async fn get_schema_changes(
    pool: Pool<Sqlite>,
    target_schema: &str,
) -> Result<SchemaChanges, AppError> {
    DeclarativeMigrator::new(pool, target_schema, false)
        .pending_changes()
        .await
}
