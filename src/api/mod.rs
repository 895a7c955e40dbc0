pub mod projects;
pub mod taxonomy;
pub mod work;

use rocket::serde::json::Json;
use rocket::{Catcher, Request, Route, http::Status};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::validation::{ApiError, ToValidationResponse};

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthResponse {
    pub status: String,
}

#[get("/health")]
pub fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub fn routes() -> Vec<Route> {
    let mut routes = routes![health];
    routes.extend(taxonomy::routes());
    routes.extend(projects::routes());
    routes.extend(work::routes());
    routes
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> ApiError {
    Status::BadRequest.to_validation_response()
}

#[catch(401)]
pub fn unauthorized(_req: &Request) -> ApiError {
    warn!("Unauthorized access attempt");
    Status::Unauthorized.to_validation_response()
}

#[catch(403)]
pub fn forbidden(_req: &Request) -> ApiError {
    warn!("Forbidden access attempt");
    Status::Forbidden.to_validation_response()
}

#[catch(404)]
pub fn not_found(_req: &Request) -> ApiError {
    Status::NotFound.to_validation_response()
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> ApiError {
    Status::UnprocessableEntity.to_validation_response()
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> ApiError {
    Status::InternalServerError.to_validation_response()
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error
    ]
}
