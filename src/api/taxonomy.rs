use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde_json::Value;
use sqlx::{Pool, Sqlite};

use crate::auth::{Caller, Permission};
use crate::database::{
    create_category, create_subcategory, create_technology, delete_category,
    delete_subcategory, delete_technology, get_all_categories, get_all_subcategories,
    get_all_technologies, get_category, get_category_projects, get_subcategory,
    get_subcategory_technologies, get_technology, update_category, update_subcategory,
    update_technology,
};
use crate::models::{
    Category, CategoryPayload, Project, Subcategory, SubcategoryPayload, Technology,
    TechnologyPayload,
};
use crate::validation::{ApiResult, AppErrorExt, JsonValidateExt, apply_patch};

pub fn routes() -> Vec<Route> {
    routes![
        list_categories,
        get_category_by_id,
        get_projects_for_category,
        post_category,
        put_category,
        patch_category,
        remove_category,
        list_subcategories,
        get_subcategory_by_id,
        get_technologies_for_subcategory,
        post_subcategory,
        put_subcategory,
        patch_subcategory,
        remove_subcategory,
        list_technologies,
        get_technology_by_id,
        post_technology,
        put_technology,
        patch_technology,
        remove_technology,
    ]
}

// Categories

#[get("/categories")]
pub async fn list_categories(
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Category>>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let categories = get_all_categories(db).await.validate_custom()?;
    Ok(Json(categories))
}

#[get("/categories/<id>")]
pub async fn get_category_by_id(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Category>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let category = get_category(db, id).await.validate_custom()?;
    Ok(Json(category))
}

#[get("/categories/<id>/projects")]
pub async fn get_projects_for_category(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Project>>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let projects = get_category_projects(db, id).await.validate_custom()?;
    Ok(Json(projects))
}

#[post("/categories", data = "<payload>")]
pub async fn post_category(
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Category>>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: CategoryPayload = payload.validate_custom()?;
    let category = create_category(db, payload.into())
        .await
        .validate_custom()?;

    Ok(Custom(Status::Created, Json(category)))
}

#[put("/categories/<id>", data = "<payload>")]
pub async fn put_category(
    id: i64,
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Category>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: CategoryPayload = payload.validate_custom()?;
    let category = update_category(db, id, payload.into())
        .await
        .validate_custom()?;

    Ok(Json(category))
}

#[patch("/categories/<id>", data = "<patch>")]
pub async fn patch_category(
    id: i64,
    patch: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Category>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let current = get_category(db, id).await.validate_custom()?;
    let payload = apply_patch(&CategoryPayload::from(&current), patch.into_inner())
        .validate_custom()?;
    let category = update_category(db, id, payload.into())
        .await
        .validate_custom()?;

    Ok(Json(category))
}

#[delete("/categories/<id>")]
pub async fn remove_category(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    delete_category(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}

// Subcategories

#[get("/subcategories")]
pub async fn list_subcategories(
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Subcategory>>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let subcategories = get_all_subcategories(db).await.validate_custom()?;
    Ok(Json(subcategories))
}

#[get("/subcategories/<id>")]
pub async fn get_subcategory_by_id(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Subcategory>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let subcategory = get_subcategory(db, id).await.validate_custom()?;
    Ok(Json(subcategory))
}

#[get("/subcategories/<id>/technologies")]
pub async fn get_technologies_for_subcategory(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Technology>>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let technologies = get_subcategory_technologies(db, id)
        .await
        .validate_custom()?;
    Ok(Json(technologies))
}

#[post("/subcategories", data = "<payload>")]
pub async fn post_subcategory(
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Subcategory>>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: SubcategoryPayload = payload.validate_custom()?;
    let subcategory = create_subcategory(db, payload.into())
        .await
        .validate_custom()?;

    Ok(Custom(Status::Created, Json(subcategory)))
}

#[put("/subcategories/<id>", data = "<payload>")]
pub async fn put_subcategory(
    id: i64,
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Subcategory>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: SubcategoryPayload = payload.validate_custom()?;
    let subcategory = update_subcategory(db, id, payload.into())
        .await
        .validate_custom()?;

    Ok(Json(subcategory))
}

#[patch("/subcategories/<id>", data = "<patch>")]
pub async fn patch_subcategory(
    id: i64,
    patch: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Subcategory>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let current = get_subcategory(db, id).await.validate_custom()?;
    let payload = apply_patch(&SubcategoryPayload::from(&current), patch.into_inner())
        .validate_custom()?;
    let subcategory = update_subcategory(db, id, payload.into())
        .await
        .validate_custom()?;

    Ok(Json(subcategory))
}

#[delete("/subcategories/<id>")]
pub async fn remove_subcategory(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    delete_subcategory(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}

// Technologies

#[get("/technologies?<category>")]
pub async fn list_technologies(
    category: Option<String>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Vec<Technology>>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let technologies = get_all_technologies(db, category.as_deref())
        .await
        .validate_custom()?;
    Ok(Json(technologies))
}

#[get("/technologies/<id>")]
pub async fn get_technology_by_id(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Technology>> {
    caller
        .require_permission(Permission::ReadContent)
        .validate_custom()?;

    let technology = get_technology(db, id).await.validate_custom()?;
    Ok(Json(technology))
}

#[post("/technologies", data = "<payload>")]
pub async fn post_technology(
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Custom<Json<Technology>>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: TechnologyPayload = payload.validate_custom()?;
    let technology = create_technology(db, payload.into())
        .await
        .validate_custom()?;

    Ok(Custom(Status::Created, Json(technology)))
}

#[put("/technologies/<id>", data = "<payload>")]
pub async fn put_technology(
    id: i64,
    payload: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Technology>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let payload: TechnologyPayload = payload.validate_custom()?;
    let technology = update_technology(db, id, payload.into())
        .await
        .validate_custom()?;

    Ok(Json(technology))
}

#[patch("/technologies/<id>", data = "<patch>")]
pub async fn patch_technology(
    id: i64,
    patch: Json<Value>,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Json<Technology>> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    let current = get_technology(db, id).await.validate_custom()?;
    let payload = apply_patch(&TechnologyPayload::from(&current), patch.into_inner())
        .validate_custom()?;
    let technology = update_technology(db, id, payload.into())
        .await
        .validate_custom()?;

    Ok(Json(technology))
}

#[delete("/technologies/<id>")]
pub async fn remove_technology(
    id: i64,
    caller: Caller,
    db: &State<Pool<Sqlite>>,
) -> ApiResult<Status> {
    caller
        .require_permission(Permission::WriteContent)
        .validate_custom()?;

    delete_technology(db, id).await.validate_custom()?;
    Ok(Status::NoContent)
}
