use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;
use url::Url;
use validator::{Validate, ValidationError};

use crate::error::{AppError, FieldErrors, NON_FIELD_ERRORS, field_errors};

#[derive(Debug, Serialize, Clone)]
pub struct ValidationResponse {
    pub status: &'static str,
    pub errors: FieldErrors,
}

impl ValidationResponse {
    pub fn new(errors: FieldErrors) -> Self {
        Self {
            status: "error",
            errors,
        }
    }

    pub fn with_error(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::new(errors)
    }
}

pub type ApiError = Custom<Json<ValidationResponse>>;
pub type ApiResult<T> = Result<T, ApiError>;

pub trait ToValidationResponse {
    fn to_validation_response(self) -> ApiError;
}

impl ToValidationResponse for AppError {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        self.log_and_record("API Validation Error");
        let status = self.status_code();

        let response = match self {
            AppError::Validation(errors) => ValidationResponse::new(errors),
            AppError::NotFound(_) => ValidationResponse::with_error("resource", "Not found."),
            // Datastore details stay in the logs.
            AppError::Database(_) | AppError::Internal(_) => {
                ValidationResponse::with_error("server", "Internal server error")
            }
        };

        Custom(status, Json(response))
    }
}

impl ToValidationResponse for Status {
    #[instrument]
    fn to_validation_response(self) -> ApiError {
        let (field, message) = match self.code {
            403 => (
                "permission",
                "You don't have permission to perform this action",
            ),
            401 => ("authentication", "Authentication required"),
            404 => ("resource", "Not found."),
            400 | 422 => (NON_FIELD_ERRORS, "Malformed request."),
            500 => ("server", "Internal server error"),
            _ => ("error", "An error occurred"),
        };

        // Body parse failures surface as 422 from the JSON guard; report them as 400.
        let status = if self == Status::UnprocessableEntity {
            Status::BadRequest
        } else {
            self
        };

        Custom(status, Json(ValidationResponse::with_error(field, message)))
    }
}

/// Maps any failure that knows its response shape into the API error type.
pub trait AppErrorExt<T> {
    fn validate_custom(self) -> ApiResult<T>;
}

impl<T, E: ToValidationResponse> AppErrorExt<T> for Result<T, E> {
    fn validate_custom(self) -> ApiResult<T> {
        self.map_err(ToValidationResponse::to_validation_response)
    }
}

/// Parses a JSON body into a payload and runs its field validators.
pub trait JsonValidateExt {
    fn validate_custom<T>(self) -> ApiResult<T>
    where
        T: DeserializeOwned + Validate;
}

impl JsonValidateExt for Json<Value> {
    fn validate_custom<T>(self) -> ApiResult<T>
    where
        T: DeserializeOwned + Validate,
    {
        parse_payload(self.into_inner()).validate_custom()
    }
}

/// Deserializes a request body into `T`, reporting every failure under the
/// field it belongs to.
///
/// String values are trimmed first. Each top-level key is deserialized on its
/// own so a wrongly typed field is named, then dropped before the full
/// payload is built and validated. Every field of `T` must be optional or
/// defaulted.
pub fn parse_payload<T>(body: Value) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let Value::Object(mut fields) = body else {
        return Err(AppError::field(
            NON_FIELD_ERRORS,
            "Invalid data. Expected a dictionary.",
        ));
    };

    for value in fields.values_mut() {
        if let Value::String(text) = value {
            let trimmed = text.trim();
            if trimmed.len() != text.len() {
                *text = trimmed.to_string();
            }
        }
    }

    let mut errors = FieldErrors::new();
    for (key, value) in &fields {
        let mut single = Map::new();
        single.insert(key.clone(), value.clone());
        if let Err(e) = serde_json::from_value::<T>(Value::Object(single)) {
            errors.insert(key.clone(), vec![e.to_string()]);
        }
    }
    fields.retain(|key, _| !errors.contains_key(key));

    let payload: T = match serde_json::from_value(Value::Object(fields)) {
        Ok(payload) => payload,
        Err(e) => {
            errors
                .entry(NON_FIELD_ERRORS.to_string())
                .or_default()
                .push(e.to_string());
            return Err(AppError::Validation(errors));
        }
    };

    if let Err(validation) = payload.validate() {
        for (field, messages) in field_errors(&validation) {
            // A type error on a field outranks the "required" it now triggers.
            errors.entry(field).or_insert(messages);
        }
    }

    if errors.is_empty() {
        Ok(payload)
    } else {
        Err(AppError::Validation(errors))
    }
}

/// Overlays the top-level fields of `patch` on the write form of the stored
/// record and validates the result. Explicit `null` clears a field.
pub fn apply_patch<T>(current: &T, patch: Value) -> Result<T, AppError>
where
    T: Serialize + DeserializeOwned + Validate,
{
    let Value::Object(changes) = patch else {
        return Err(AppError::field(
            NON_FIELD_ERRORS,
            "Invalid data. Expected a dictionary.",
        ));
    };

    let mut merged = serde_json::to_value(current)?;
    if let Value::Object(fields) = &mut merged {
        fields.extend(changes);
    }

    parse_payload(merged)
}

/// Blank strings from optional form fields are stored as absent.
pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

const WEB_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

/// Accepts absolute web links only: http(s) or ftp(s) with a host.
pub fn validate_web_url(value: &str) -> Result<(), ValidationError> {
    match Url::parse(value) {
        Ok(url) if WEB_SCHEMES.contains(&url.scheme()) && url.host().is_some() => Ok(()),
        _ => Err(ValidationError::new("url")),
    }
}
