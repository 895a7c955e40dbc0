use std::collections::HashMap;

use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use super::{ensure_exists, id_list_param, invalid_pk, row_exists};
use crate::error::AppError;
use crate::models::{
    Category, DbCategory, DbSubcategory, DbTechnology, NewCategory, NewSubcategory,
    NewTechnology, Subcategory, Technology,
};

const TECHNOLOGY_COLUMNS: &str = "t.id, t.name, t.subcategory_id";

fn technologies_by_subcategory(rows: Vec<DbTechnology>) -> HashMap<i64, Vec<Technology>> {
    let mut grouped: HashMap<i64, Vec<Technology>> = HashMap::new();
    for row in rows {
        if let Some(subcategory_id) = row.subcategory_id {
            grouped
                .entry(subcategory_id)
                .or_default()
                .push(Technology::from(row));
        }
    }
    grouped
}

fn assemble_subcategories(
    rows: Vec<DbSubcategory>,
    technology_rows: Vec<DbTechnology>,
) -> Vec<Subcategory> {
    let mut technologies = technologies_by_subcategory(technology_rows);
    rows.into_iter()
        .map(|row| {
            let owned = technologies.remove(&row.id).unwrap_or_default();
            Subcategory::from_row(row, owned)
        })
        .collect()
}

fn assemble_categories(
    rows: Vec<DbCategory>,
    subcategory_rows: Vec<DbSubcategory>,
    technology_rows: Vec<DbTechnology>,
) -> Vec<Category> {
    let mut subcategories: HashMap<i64, Vec<Subcategory>> = HashMap::new();
    for subcategory in assemble_subcategories(subcategory_rows, technology_rows) {
        subcategories
            .entry(subcategory.category)
            .or_default()
            .push(subcategory);
    }

    rows.into_iter()
        .map(|row| {
            let owned = subcategories.remove(&row.id).unwrap_or_default();
            Category::from_row(row, owned)
        })
        .collect()
}

/// Loads the full tree for the given categories (all of them when `ids` is `None`).
async fn load_categories(
    conn: &mut SqliteConnection,
    ids: Option<&[i64]>,
) -> Result<Vec<Category>, AppError> {
    let (category_rows, subcategory_rows, technology_rows) = match ids {
        None => (
            sqlx::query_as::<_, DbCategory>("SELECT id, name FROM categories ORDER BY id")
                .fetch_all(&mut *conn)
                .await?,
            sqlx::query_as::<_, DbSubcategory>(
                "SELECT id, name, category_id FROM subcategories ORDER BY id",
            )
            .fetch_all(&mut *conn)
            .await?,
            sqlx::query_as::<_, DbTechnology>(&format!(
                "SELECT {} FROM technologies t WHERE t.subcategory_id IS NOT NULL ORDER BY t.id",
                TECHNOLOGY_COLUMNS
            ))
            .fetch_all(&mut *conn)
            .await?,
        ),
        Some(ids) => {
            let param = id_list_param(ids);
            (
                sqlx::query_as::<_, DbCategory>(
                    "SELECT id, name FROM categories
                     WHERE id IN (SELECT value FROM json_each(?))
                     ORDER BY id",
                )
                .bind(&param)
                .fetch_all(&mut *conn)
                .await?,
                sqlx::query_as::<_, DbSubcategory>(
                    "SELECT id, name, category_id FROM subcategories
                     WHERE category_id IN (SELECT value FROM json_each(?))
                     ORDER BY id",
                )
                .bind(&param)
                .fetch_all(&mut *conn)
                .await?,
                sqlx::query_as::<_, DbTechnology>(&format!(
                    "SELECT {} FROM technologies t
                     JOIN subcategories s ON s.id = t.subcategory_id
                     WHERE s.category_id IN (SELECT value FROM json_each(?))
                     ORDER BY t.id",
                    TECHNOLOGY_COLUMNS
                ))
                .bind(&param)
                .fetch_all(&mut *conn)
                .await?,
            )
        }
    };

    Ok(assemble_categories(
        category_rows,
        subcategory_rows,
        technology_rows,
    ))
}

async fn load_subcategories(
    conn: &mut SqliteConnection,
    id: Option<i64>,
) -> Result<Vec<Subcategory>, AppError> {
    let (rows, technology_rows) = match id {
        None => (
            sqlx::query_as::<_, DbSubcategory>(
                "SELECT id, name, category_id FROM subcategories ORDER BY id",
            )
            .fetch_all(&mut *conn)
            .await?,
            sqlx::query_as::<_, DbTechnology>(&format!(
                "SELECT {} FROM technologies t WHERE t.subcategory_id IS NOT NULL ORDER BY t.id",
                TECHNOLOGY_COLUMNS
            ))
            .fetch_all(&mut *conn)
            .await?,
        ),
        Some(id) => (
            sqlx::query_as::<_, DbSubcategory>(
                "SELECT id, name, category_id FROM subcategories WHERE id = ?",
            )
            .bind(id)
            .fetch_all(&mut *conn)
            .await?,
            sqlx::query_as::<_, DbTechnology>(&format!(
                "SELECT {} FROM technologies t WHERE t.subcategory_id = ? ORDER BY t.id",
                TECHNOLOGY_COLUMNS
            ))
            .bind(id)
            .fetch_all(&mut *conn)
            .await?,
        ),
    };

    Ok(assemble_subcategories(rows, technology_rows))
}

// Categories

#[instrument(skip(pool))]
pub async fn get_all_categories(pool: &Pool<Sqlite>) -> Result<Vec<Category>, AppError> {
    info!("Getting all categories");
    let mut tx = pool.begin().await?;
    let categories = load_categories(&mut tx, None).await?;
    tx.commit().await?;
    Ok(categories)
}

#[instrument(skip(pool))]
pub async fn get_category(pool: &Pool<Sqlite>, id: i64) -> Result<Category, AppError> {
    info!("Fetching category by ID");
    let mut tx = pool.begin().await?;
    let category = load_categories(&mut tx, Some(std::slice::from_ref(&id))).await?.pop();
    tx.commit().await?;

    category.ok_or_else(|| AppError::not_found("Category", id))
}

#[instrument(skip(pool))]
pub async fn create_category(
    pool: &Pool<Sqlite>,
    category: NewCategory,
) -> Result<Category, AppError> {
    info!("Creating category");
    let id: i64 = sqlx::query_scalar("INSERT INTO categories (name) VALUES (?) RETURNING id")
        .bind(&category.name)
        .fetch_one(pool)
        .await?;

    get_category(pool, id).await
}

#[instrument(skip(pool))]
pub async fn update_category(
    pool: &Pool<Sqlite>,
    id: i64,
    category: NewCategory,
) -> Result<Category, AppError> {
    info!("Updating category");
    let result = sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
        .bind(&category.name)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Category", id));
    }

    get_category(pool, id).await
}

/// Removes the category; subcategories and their technologies go with it.
#[instrument(skip(pool))]
pub async fn delete_category(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting category");
    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Category", id));
    }

    Ok(())
}

// Subcategories

#[instrument(skip(pool))]
pub async fn get_all_subcategories(pool: &Pool<Sqlite>) -> Result<Vec<Subcategory>, AppError> {
    info!("Getting all subcategories");
    let mut tx = pool.begin().await?;
    let subcategories = load_subcategories(&mut tx, None).await?;
    tx.commit().await?;
    Ok(subcategories)
}

#[instrument(skip(pool))]
pub async fn get_subcategory(pool: &Pool<Sqlite>, id: i64) -> Result<Subcategory, AppError> {
    info!("Fetching subcategory by ID");
    let mut tx = pool.begin().await?;
    let subcategory = load_subcategories(&mut tx, Some(id)).await?.pop();
    tx.commit().await?;

    subcategory.ok_or_else(|| AppError::not_found("Subcategory", id))
}

#[instrument(skip(pool))]
pub async fn get_subcategory_technologies(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<Vec<Technology>, AppError> {
    info!("Getting technologies for subcategory");
    Ok(get_subcategory(pool, id).await?.technologies)
}

/// Name of the category a subcategory is being filed under, or a field error on `category`.
async fn parent_category_name(
    conn: &mut SqliteConnection,
    category_id: i64,
) -> Result<String, AppError> {
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM categories WHERE id = ?")
        .bind(category_id)
        .fetch_optional(&mut *conn)
        .await?;

    name.ok_or_else(|| AppError::field("category", invalid_pk(category_id)))
}

#[instrument(skip(pool))]
pub async fn create_subcategory(
    pool: &Pool<Sqlite>,
    subcategory: NewSubcategory,
) -> Result<Subcategory, AppError> {
    info!("Creating subcategory");
    let mut tx = pool.begin().await?;
    let category_name = parent_category_name(&mut tx, subcategory.category).await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO subcategories (name, category_id) VALUES (?, ?) RETURNING id",
    )
    .bind(&subcategory.name)
    .bind(subcategory.category)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    let created = get_subcategory(pool, id).await?;
    info!("Created subcategory {}", created.qualified_name(&category_name));
    Ok(created)
}

#[instrument(skip(pool))]
pub async fn update_subcategory(
    pool: &Pool<Sqlite>,
    id: i64,
    subcategory: NewSubcategory,
) -> Result<Subcategory, AppError> {
    info!("Updating subcategory");
    let mut tx = pool.begin().await?;
    if !row_exists(&mut tx, "subcategories", id).await? {
        return Err(AppError::not_found("Subcategory", id));
    }
    let category_name = parent_category_name(&mut tx, subcategory.category).await?;

    sqlx::query("UPDATE subcategories SET name = ?, category_id = ? WHERE id = ?")
        .bind(&subcategory.name)
        .bind(subcategory.category)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let updated = get_subcategory(pool, id).await?;
    info!("Updated subcategory {}", updated.qualified_name(&category_name));
    Ok(updated)
}

#[instrument(skip(pool))]
pub async fn delete_subcategory(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting subcategory");
    let result = sqlx::query("DELETE FROM subcategories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Subcategory", id));
    }

    Ok(())
}

// Technologies

/// Lists technologies in id order, optionally only those filed under the named category.
#[instrument(skip(pool))]
pub async fn get_all_technologies(
    pool: &Pool<Sqlite>,
    category: Option<&str>,
) -> Result<Vec<Technology>, AppError> {
    info!("Getting all technologies");
    let rows = match category {
        Some(name) => {
            sqlx::query_as::<_, DbTechnology>(&format!(
                "SELECT {} FROM technologies t
                 JOIN subcategories s ON s.id = t.subcategory_id
                 JOIN categories c ON c.id = s.category_id
                 WHERE c.name = ?
                 ORDER BY t.id",
                TECHNOLOGY_COLUMNS
            ))
            .bind(name)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbTechnology>(&format!(
                "SELECT {} FROM technologies t ORDER BY t.id",
                TECHNOLOGY_COLUMNS
            ))
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows.into_iter().map(Technology::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_technology(pool: &Pool<Sqlite>, id: i64) -> Result<Technology, AppError> {
    info!("Fetching technology by ID");
    let row = sqlx::query_as::<_, DbTechnology>(
        "SELECT id, name, subcategory_id FROM technologies WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(technology) => Ok(Technology::from(technology)),
        None => Err(AppError::not_found("Technology", id)),
    }
}

#[instrument(skip(pool))]
pub async fn create_technology(
    pool: &Pool<Sqlite>,
    technology: NewTechnology,
) -> Result<Technology, AppError> {
    info!("Creating technology");
    let mut tx = pool.begin().await?;
    if let Some(subcategory_id) = technology.subcategory {
        ensure_exists(&mut tx, "subcategories", subcategory_id, "subcategory").await?;
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO technologies (name, subcategory_id) VALUES (?, ?) RETURNING id",
    )
    .bind(&technology.name)
    .bind(technology.subcategory)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    get_technology(pool, id).await
}

#[instrument(skip(pool))]
pub async fn update_technology(
    pool: &Pool<Sqlite>,
    id: i64,
    technology: NewTechnology,
) -> Result<Technology, AppError> {
    info!("Updating technology");
    let mut tx = pool.begin().await?;
    if !row_exists(&mut tx, "technologies", id).await? {
        return Err(AppError::not_found("Technology", id));
    }
    if let Some(subcategory_id) = technology.subcategory {
        ensure_exists(&mut tx, "subcategories", subcategory_id, "subcategory").await?;
    }

    sqlx::query("UPDATE technologies SET name = ?, subcategory_id = ? WHERE id = ?")
        .bind(&technology.name)
        .bind(technology.subcategory)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    get_technology(pool, id).await
}

/// Removes the technology and its links to projects and jobs.
#[instrument(skip(pool))]
pub async fn delete_technology(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting technology");
    let result = sqlx::query("DELETE FROM technologies WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Technology", id));
    }

    Ok(())
}
