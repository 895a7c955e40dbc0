use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde_json::Value;
use sqlx::{Pool, Sqlite};

use crate::auth::{Caller, Permission};
use crate::database::{
    create_achievement, create_job, delete_achievement, delete_job, get_achievement,
    get_all_achievements, get_all_jobs, get_job, update_achievement, update_job,
};
use crate::models::{Achievement, AchievementPayload, Job, JobPayload};
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt, apply_patch};

pub fn routes() -> Vec<Route> {
    routes![
        list_jobs,
        get_job_by_id,
        post_job,
        put_job,
        patch_job,
        remove_job,
        list_achievements,
        get_achievement_by_id,
        post_achievement,
        put_achievement,
        patch_achievement,
        remove_achievement,
    ]
}

// Jobs

#[get("/jobs?<technology>")]
pub async fn list_jobs(
    technology: Option<i64>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Job>>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let jobs = get_all_jobs(db, technology).await.validate_custom()?;
    Ok(Json(jobs))
}

#[get("/jobs/<id>")]
pub async fn get_job_by_id(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Job>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let job = get_job(db, id).await.validate_custom()?;
    Ok(Json(job))
}

#[post("/jobs", data = "<payload>")]
pub async fn post_job(
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Job>>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: JobPayload = payload.validate_custom()?;
    let job = create_job(db, payload.into()).await.validate_custom()?;

    Ok(Custom(Status::Created, Json(job)))
}

#[put("/jobs/<id>", data = "<payload>")]
pub async fn put_job(
    id: i64,
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Job>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: JobPayload = payload.validate_custom()?;
    let job = update_job(db, id, payload.into()).await.validate_custom()?;

    Ok(Json(job))
}

#[patch("/jobs/<id>", data = "<patch>")]
pub async fn patch_job(
    id: i64,
    patch: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Job>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let current = get_job(db, id).await.validate_custom()?;
    let payload =
        apply_patch(&JobPayload::from(&current), patch.into_inner()).validate_custom()?;
    let job = update_job(db, id, payload.into()).await.validate_custom()?;

    Ok(Json(job))
}

#[delete("/jobs/<id>")]
pub async fn remove_job(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    delete_job(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}

// Achievements

#[get("/achievements")]
pub async fn list_achievements(
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Achievement>>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let achievements = get_all_achievements(db).await.validate_custom()?;
    Ok(Json(achievements))
}

#[get("/achievements/<id>")]
pub async fn get_achievement_by_id(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Achievement>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let achievement = get_achievement(db, id).await.validate_custom()?;
    Ok(Json(achievement))
}

#[post("/achievements", data = "<payload>")]
pub async fn post_achievement(
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Achievement>>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: AchievementPayload = payload.validate_custom()?;
    let achievement = create_achievement(db, payload.into())
        .await
        .validate_custom()?;

    Ok(Custom(Status::Created, Json(achievement)))
}

#[put("/achievements/<id>", data = "<payload>")]
pub async fn put_achievement(
    id: i64,
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Achievement>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: AchievementPayload = payload.validate_custom()?;
    let achievement = update_achievement(db, id, payload.into())
        .await
        .validate_custom()?;

    Ok(Json(achievement))
}

#[patch("/achievements/<id>", data = "<patch>")]
pub async fn patch_achievement(
    id: i64,
    patch: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Achievement>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let current = get_achievement(db, id).await.validate_custom()?;
    let payload = apply_patch(&AchievementPayload::from(&current), patch.into_inner())
        .validate_custom()?;
    let achievement = update_achievement(db, id, payload.into())
        .await
        .validate_custom()?;

    Ok(Json(achievement))
}

#[delete("/achievements/<id>")]
pub async fn remove_achievement(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    delete_achievement(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}
