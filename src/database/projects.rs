use std::collections::HashMap;

use sqlx::{FromRow, Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use super::{LinkedTechnology, dedup_ids, ensure_all_exist, id_list_param, row_exists};
use crate::error::AppError;
use crate::models::{DbProject, NewProject, Project, Technology};

/// Which projects a read should load.
#[derive(Debug, Clone, Copy)]
enum ProjectScope<'a> {
    All,
    Single(i64),
    CategoryName(&'a str),
    CategoryId(i64),
}

#[derive(FromRow)]
struct ProjectCategoryName {
    project_id: i64,
    name: String,
}

async fn project_ids(
    conn: &mut SqliteConnection,
    scope: ProjectScope<'_>,
) -> Result<Vec<i64>, AppError> {
    let ids = match scope {
        ProjectScope::All => {
            sqlx::query_scalar("SELECT id FROM projects ORDER BY id")
                .fetch_all(&mut *conn)
                .await?
        }
        ProjectScope::Single(id) => {
            sqlx::query_scalar("SELECT id FROM projects WHERE id = ?")
                .bind(id)
                .fetch_all(&mut *conn)
                .await?
        }
        ProjectScope::CategoryName(name) => {
            sqlx::query_scalar(
                "SELECT DISTINCT pt.project_id FROM project_technologies pt
                 JOIN technologies t ON t.id = pt.technology_id
                 JOIN subcategories s ON s.id = t.subcategory_id
                 JOIN categories c ON c.id = s.category_id
                 WHERE c.name = ?
                 ORDER BY pt.project_id",
            )
            .bind(name)
            .fetch_all(&mut *conn)
            .await?
        }
        ProjectScope::CategoryId(category_id) => {
            sqlx::query_scalar(
                "SELECT DISTINCT pt.project_id FROM project_technologies pt
                 JOIN technologies t ON t.id = pt.technology_id
                 JOIN subcategories s ON s.id = t.subcategory_id
                 WHERE s.category_id = ?
                 ORDER BY pt.project_id",
            )
            .bind(category_id)
            .fetch_all(&mut *conn)
            .await?
        }
    };

    Ok(ids)
}

async fn load_projects(
    conn: &mut SqliteConnection,
    scope: ProjectScope<'_>,
) -> Result<Vec<Project>, AppError> {
    let ids = project_ids(&mut *conn, scope).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let param = id_list_param(&ids);

    let rows = sqlx::query_as::<_, DbProject>(
        "SELECT id, name, description, github FROM projects
         WHERE id IN (SELECT value FROM json_each(?))
         ORDER BY id",
    )
    .bind(&param)
    .fetch_all(&mut *conn)
    .await?;

    let links = sqlx::query_as::<_, LinkedTechnology>(
        "SELECT pt.project_id AS owner_id, t.id, t.name, t.subcategory_id
         FROM project_technologies pt
         JOIN technologies t ON t.id = pt.technology_id
         WHERE pt.project_id IN (SELECT value FROM json_each(?))
         ORDER BY t.id",
    )
    .bind(&param)
    .fetch_all(&mut *conn)
    .await?;

    let labels = sqlx::query_as::<_, ProjectCategoryName>(
        "SELECT DISTINCT pt.project_id, c.id AS category_id, c.name
         FROM project_technologies pt
         JOIN technologies t ON t.id = pt.technology_id
         JOIN subcategories s ON s.id = t.subcategory_id
         JOIN categories c ON c.id = s.category_id
         WHERE pt.project_id IN (SELECT value FROM json_each(?))
         ORDER BY c.id",
    )
    .bind(&param)
    .fetch_all(&mut *conn)
    .await?;

    let mut technologies: HashMap<i64, Vec<Technology>> = HashMap::new();
    for link in links {
        technologies
            .entry(link.owner_id)
            .or_default()
            .push(Technology::from(link.technology));
    }

    let mut categories: HashMap<i64, Vec<String>> = HashMap::new();
    for label in labels {
        let names = categories.entry(label.project_id).or_default();
        // Two categories may share a name.
        if !names.contains(&label.name) {
            names.push(label.name);
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            Project::from_row(
                row,
                technologies.remove(&id).unwrap_or_default(),
                categories.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

async fn replace_project_technologies(
    conn: &mut SqliteConnection,
    project_id: i64,
    technology_ids: &[i64],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM project_technologies WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut *conn)
        .await?;

    for technology_id in dedup_ids(technology_ids) {
        sqlx::query("INSERT INTO project_technologies (project_id, technology_id) VALUES (?, ?)")
            .bind(project_id)
            .bind(technology_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_all_projects(
    pool: &Pool<Sqlite>,
    category: Option<&str>,
) -> Result<Vec<Project>, AppError> {
    info!("Getting all projects");
    let scope = match category {
        Some(name) => ProjectScope::CategoryName(name),
        None => ProjectScope::All,
    };

    let mut tx = pool.begin().await?;
    let projects = load_projects(&mut tx, scope).await?;
    tx.commit().await?;
    Ok(projects)
}

#[instrument(skip(pool))]
pub async fn get_project(pool: &Pool<Sqlite>, id: i64) -> Result<Project, AppError> {
    info!("Fetching project by ID");
    let mut tx = pool.begin().await?;
    let project = load_projects(&mut tx, ProjectScope::Single(id)).await?.pop();
    tx.commit().await?;

    project.ok_or_else(|| AppError::not_found("Project", id))
}

/// Projects that use at least one technology filed under the category.
#[instrument(skip(pool))]
pub async fn get_category_projects(
    pool: &Pool<Sqlite>,
    category_id: i64,
) -> Result<Vec<Project>, AppError> {
    info!("Getting projects for category");
    let mut tx = pool.begin().await?;
    if !row_exists(&mut tx, "categories", category_id).await? {
        return Err(AppError::not_found("Category", category_id));
    }
    let projects = load_projects(&mut tx, ProjectScope::CategoryId(category_id)).await?;
    tx.commit().await?;
    Ok(projects)
}

#[instrument(skip(pool))]
pub async fn create_project(
    pool: &Pool<Sqlite>,
    project: NewProject,
) -> Result<Project, AppError> {
    info!("Creating project");
    let mut tx = pool.begin().await?;
    ensure_all_exist(&mut tx, "technologies", &project.technology, "technology").await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO projects (name, description, github) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(&project.github)
    .fetch_one(&mut *tx)
    .await?;

    replace_project_technologies(&mut tx, id, &project.technology).await?;
    tx.commit().await?;

    get_project(pool, id).await
}

#[instrument(skip(pool))]
pub async fn update_project(
    pool: &Pool<Sqlite>,
    id: i64,
    project: NewProject,
) -> Result<Project, AppError> {
    info!("Updating project");
    let mut tx = pool.begin().await?;
    if !row_exists(&mut tx, "projects", id).await? {
        return Err(AppError::not_found("Project", id));
    }
    ensure_all_exist(&mut tx, "technologies", &project.technology, "technology").await?;

    sqlx::query("UPDATE projects SET name = ?, description = ?, github = ? WHERE id = ?")
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.github)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    replace_project_technologies(&mut tx, id, &project.technology).await?;
    tx.commit().await?;

    get_project(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_project(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting project");
    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Project", id));
    }

    Ok(())
}
