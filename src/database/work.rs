use std::collections::HashMap;

use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use super::{
    LinkedTechnology, dedup_ids, ensure_all_exist, ensure_exists, id_list_param, row_exists,
};
use crate::error::AppError;
use crate::models::{Achievement, DbJob, Job, NewAchievement, NewJob, Technology};

async fn load_jobs(
    conn: &mut SqliteConnection,
    ids: Vec<i64>,
) -> Result<Vec<Job>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let param = id_list_param(&ids);

    let rows = sqlx::query_as::<_, DbJob>(
        "SELECT id, company, link, title, start_date, end_date, is_current FROM jobs
         WHERE id IN (SELECT value FROM json_each(?))
         ORDER BY start_date DESC, id ASC",
    )
    .bind(&param)
    .fetch_all(&mut *conn)
    .await?;

    let links = sqlx::query_as::<_, LinkedTechnology>(
        "SELECT jt.job_id AS owner_id, t.id, t.name, t.subcategory_id
         FROM job_technologies jt
         JOIN technologies t ON t.id = jt.technology_id
         WHERE jt.job_id IN (SELECT value FROM json_each(?))
         ORDER BY t.id",
    )
    .bind(&param)
    .fetch_all(&mut *conn)
    .await?;

    let achievement_rows = sqlx::query_as::<_, Achievement>(
        "SELECT id, description, job_id AS job FROM achievements
         WHERE job_id IN (SELECT value FROM json_each(?))
         ORDER BY id",
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

    let mut achievements: HashMap<i64, Vec<Achievement>> = HashMap::new();
    for achievement in achievement_rows {
        achievements
            .entry(achievement.job)
            .or_default()
            .push(achievement);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let id = row.id;
            Job::from_row(
                row,
                technologies.remove(&id).unwrap_or_default(),
                achievements.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

async fn replace_job_technologies(
    conn: &mut SqliteConnection,
    job_id: i64,
    technology_ids: &[i64],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM job_technologies WHERE job_id = ?")
        .bind(job_id)
        .execute(&mut *conn)
        .await?;

    for technology_id in dedup_ids(technology_ids) {
        sqlx::query("INSERT INTO job_technologies (job_id, technology_id) VALUES (?, ?)")
            .bind(job_id)
            .bind(technology_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

// Jobs

/// Most recent first; `technology` keeps only jobs that used it.
#[instrument(skip(pool))]
pub async fn get_all_jobs(
    pool: &Pool<Sqlite>,
    technology: Option<i64>,
) -> Result<Vec<Job>, AppError> {
    info!("Getting all jobs");
    let mut tx = pool.begin().await?;

    let ids: Vec<i64> = match technology {
        Some(technology_id) => {
            sqlx::query_scalar("SELECT job_id FROM job_technologies WHERE technology_id = ?")
                .bind(technology_id)
                .fetch_all(&mut *tx)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT id FROM jobs")
                .fetch_all(&mut *tx)
                .await?
        }
    };

    let jobs = load_jobs(&mut tx, ids).await?;
    tx.commit().await?;
    Ok(jobs)
}

#[instrument(skip(pool))]
pub async fn get_job(pool: &Pool<Sqlite>, id: i64) -> Result<Job, AppError> {
    info!("Fetching job by ID");
    let mut tx = pool.begin().await?;
    let job = load_jobs(&mut tx, vec![id]).await?.pop();
    tx.commit().await?;

    job.ok_or_else(|| AppError::not_found("Job", id))
}

#[instrument(skip(pool))]
pub async fn create_job(pool: &Pool<Sqlite>, job: NewJob) -> Result<Job, AppError> {
    info!("Creating job");
    let job = job.normalized();

    let mut tx = pool.begin().await?;
    ensure_all_exist(&mut tx, "technologies", &job.technologies, "technologies").await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO jobs (company, link, title, start_date, end_date, is_current)
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&job.company)
    .bind(&job.link)
    .bind(&job.title)
    .bind(job.start_date)
    .bind(job.end_date)
    .bind(job.is_current)
    .fetch_one(&mut *tx)
    .await?;

    replace_job_technologies(&mut tx, id, &job.technologies).await?;
    tx.commit().await?;

    get_job(pool, id).await
}

#[instrument(skip(pool))]
pub async fn update_job(pool: &Pool<Sqlite>, id: i64, job: NewJob) -> Result<Job, AppError> {
    info!("Updating job");
    let job = job.normalized();

    let mut tx = pool.begin().await?;
    if !row_exists(&mut tx, "jobs", id).await? {
        return Err(AppError::not_found("Job", id));
    }
    ensure_all_exist(&mut tx, "technologies", &job.technologies, "technologies").await?;

    sqlx::query(
        "UPDATE jobs
         SET company = ?, link = ?, title = ?, start_date = ?, end_date = ?, is_current = ?
         WHERE id = ?",
    )
    .bind(&job.company)
    .bind(&job.link)
    .bind(&job.title)
    .bind(job.start_date)
    .bind(job.end_date)
    .bind(job.is_current)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    replace_job_technologies(&mut tx, id, &job.technologies).await?;
    tx.commit().await?;

    get_job(pool, id).await
}

/// Removes the job together with its achievements.
#[instrument(skip(pool))]
pub async fn delete_job(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting job");
    let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Job", id));
    }

    Ok(())
}

// Achievements

#[instrument(skip(pool))]
pub async fn get_all_achievements(pool: &Pool<Sqlite>) -> Result<Vec<Achievement>, AppError> {
    info!("Getting all achievements");
    Ok(sqlx::query_as::<_, Achievement>(
        "SELECT id, description, job_id AS job FROM achievements ORDER BY id",
    )
    .fetch_all(pool)
    .await?)
}

#[instrument(skip(pool))]
pub async fn get_achievement(pool: &Pool<Sqlite>, id: i64) -> Result<Achievement, AppError> {
    info!("Fetching achievement by ID");
    sqlx::query_as::<_, Achievement>(
        "SELECT id, description, job_id AS job FROM achievements WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Achievement", id))
}

#[instrument(skip(pool))]
pub async fn create_achievement(
    pool: &Pool<Sqlite>,
    achievement: NewAchievement,
) -> Result<Achievement, AppError> {
    info!("Creating achievement");
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, "jobs", achievement.job, "job").await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO achievements (description, job_id) VALUES (?, ?) RETURNING id",
    )
    .bind(&achievement.description)
    .bind(achievement.job)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    get_achievement(pool, id).await
}

#[instrument(skip(pool))]
pub async fn update_achievement(
    pool: &Pool<Sqlite>,
    id: i64,
    achievement: NewAchievement,
) -> Result<Achievement, AppError> {
    info!("Updating achievement");
    let mut tx = pool.begin().await?;
    if !row_exists(&mut tx, "achievements", id).await? {
        return Err(AppError::not_found("Achievement", id));
    }
    ensure_exists(&mut tx, "jobs", achievement.job, "job").await?;

    sqlx::query("UPDATE achievements SET description = ?, job_id = ? WHERE id = ?")
        .bind(&achievement.description)
        .bind(achievement.job)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    get_achievement(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_achievement(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting achievement");
    let result = sqlx::query("DELETE FROM achievements WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Achievement", id));
    }

    Ok(())
}
