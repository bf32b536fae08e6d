use axum::{
    Json,
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{identity::IdentityError, repository::StoreError};

/// Application-level errors for HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[source] anyhow::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let msg = match &self {
            AppError::InternalError(_) => {
                // Log the detailed error with full context chain
                tracing::error!("Handler error: {:?}", self);
                "Internal server error".to_string()
            }
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => {
                tracing::debug!(status = %status, "Request rejected: {msg}");
                msg.clone()
            }
        };

        let body = json!({
            "code": 1,
            "msg": msg,
        });

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProjectNotFound(id) => AppError::NotFound(format!("Project {id} not found")),
            StoreError::ProjectExists(id) => {
                AppError::Conflict(format!("Project {id} already exists"))
            }
            StoreError::AlreadyVoted { project_id, .. } => AppError::Conflict(format!(
                "You have already voted for project {project_id}"
            )),
            other => AppError::InternalError(anyhow::Error::new(other)),
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UsernameExists => {
                AppError::Conflict("This username isn't available".to_string())
            }
            IdentityError::InvalidInput(msg) => AppError::BadRequest(msg),
            IdentityError::InvalidCredentials => {
                AppError::BadRequest("Invalid credentials provided".to_string())
            }
            IdentityError::NotConfirmed => AppError::BadRequest(
                "Account not confirmed, enter the code sent to your email".to_string(),
            ),
            IdentityError::CodeMismatch => {
                AppError::BadRequest("Invalid verification code provided".to_string())
            }
            IdentityError::ExpiredCode => {
                AppError::BadRequest("Verification code has expired".to_string())
            }
            IdentityError::UserNotFound => AppError::BadRequest("Unknown user".to_string()),
            IdentityError::Backend(err) => AppError::InternalError(err),
        }
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError(err)
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_statuses() {
        let not_found: AppError = StoreError::ProjectNotFound("p1".into()).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let voted: AppError = StoreError::AlreadyVoted {
            username: "alice".into(),
            project_id: "p1".into(),
        }
        .into();
        assert_eq!(voted.status_code(), StatusCode::CONFLICT);

        let malformed: AppError = StoreError::Malformed("votes".into()).into();
        assert_eq!(malformed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unauthorized_renders_json_envelope() {
        let response = AppError::Unauthorized("You need to be logged in".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"code": 1, "msg": "You need to be logged in"}));
    }

    #[test]
    fn test_identity_errors_map_to_statuses() {
        let taken: AppError = IdentityError::UsernameExists.into();
        assert_eq!(taken.status_code(), StatusCode::CONFLICT);

        let creds: AppError = IdentityError::InvalidCredentials.into();
        assert_eq!(creds.status_code(), StatusCode::BAD_REQUEST);

        let expired: AppError = IdentityError::ExpiredCode.into();
        assert_eq!(expired.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(expired.to_string(), "Bad request: Verification code has expired");

        let backend: AppError = IdentityError::Backend(anyhow::anyhow!("boom")).into();
        assert_eq!(backend.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
