use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use tracing::{error, warn};

use super::{Permission, Role};
use crate::error::AppError;

/// Who may write content. Reads are always open.
#[derive(Debug, Clone, Default)]
pub enum AccessPolicy {
    /// Every caller is an editor.
    #[default]
    Open,
    /// Only callers presenting a bearer token matching the bcrypt hash may write.
    EditorToken { token_hash: String },
}

impl AccessPolicy {
    pub fn resolve(&self, bearer: Option<&str>) -> Result<Role, AppError> {
        match self {
            AccessPolicy::Open => Ok(Role::Editor),
            AccessPolicy::EditorToken { token_hash } => {
                let Some(token) = bearer else {
                    return Ok(Role::Visitor);
                };

                if bcrypt::verify(token, token_hash)? {
                    Ok(Role::Editor)
                } else {
                    Ok(Role::Visitor)
                }
            }
        }
    }
}

/// The resolved identity behind a request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub role: Role,
    pub presented_credentials: bool,
}

impl Caller {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), Status> {
        if self.has_permission(permission) {
            return Ok(());
        }

        warn!(
            role = %self.role.as_str(),
            permission = ?permission,
            presented_credentials = self.presented_credentials,
            "Permission denied"
        );

        if self.presented_credentials {
            Err(Status::Forbidden)
        } else {
            Err(Status::Unauthorized)
        }
    }
}

fn bearer_token<'r>(request: &'r Request<'_>) -> Option<&'r str> {
    request
        .headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Caller {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let auth_span = tracing::info_span!("caller_guard");
        let _guard = auth_span.enter();

        let open = AccessPolicy::Open;
        let policy = request.rocket().state::<AccessPolicy>().unwrap_or(&open);
        let bearer = bearer_token(request);

        match policy.resolve(bearer) {
            Ok(role) => Outcome::Success(Caller {
                role,
                presented_credentials: bearer.is_some(),
            }),
            Err(err) => {
                error!(error = %err, "Failed to resolve caller role");
                Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}
