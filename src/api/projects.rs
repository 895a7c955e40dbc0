use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde_json::Value;
use sqlx::{Pool, Sqlite};

use crate::auth::{Caller, Permission};
use crate::database::{
    create_project, delete_project, get_all_projects, get_project, update_project,
};
use crate::models::{Project, ProjectPayload};
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt, apply_patch};

pub fn routes() -> Vec<Route> {
    routes![
        list_projects,
        get_project_by_id,
        post_project,
        put_project,
        patch_project,
        remove_project,
    ]
}

/// `?category=<name>` keeps projects using a technology filed under that category.
#[get("/projects?<category>")]
pub async fn list_projects(
    category: Option<String>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Project>>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let projects = get_all_projects(db, category.as_deref())
        .await
        .validate_custom()?;
    Ok(Json(projects))
}

#[get("/projects/<id>")]
pub async fn get_project_by_id(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Project>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let project = get_project(db, id).await.validate_custom()?;
    Ok(Json(project))
}

#[post("/projects", data = "<payload>")]
pub async fn post_project(
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Project>>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: ProjectPayload = payload.validate_custom()?;
    let project = create_project(db, payload.into())
        .await
        .validate_custom()?;

    Ok(Custom(Status::Created, Json(project)))
}

#[put("/projects/<id>", data = "<payload>")]
pub async fn put_project(
    id: i64,
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Project>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: ProjectPayload = payload.validate_custom()?;
    let project = update_project(db, id, payload.into())
        .await
        .validate_custom()?;

    Ok(Json(project))
}

#[patch("/projects/<id>", data = "<patch>")]
pub async fn patch_project(
    id: i64,
    patch: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Project>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let current = get_project(db, id).await.validate_custom()?;
    let payload = apply_patch(&ProjectPayload::from(&current), patch.into_inner())
        .validate_custom()?;
    let project = update_project(db, id, payload.into())
        .await
        .validate_custom()?;

    Ok(Json(project))
}

#[delete("/projects/<id>")]
pub async fn remove_project(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    delete_project(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}
