//! Request-boundary error mapping.
//!
//! Handlers return `Result<_, AppError>`; every failure kind is turned into a
//! status code in one place (`AppError::status`) and rendered as
//! `{"detail": "..."}`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::errors::{AuthError, Forbidden, PasswordError};

pub type ApiResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("User with this email or username already exist.")]
    DuplicateUser,

    #[error("Not authenticated")]
    MissingToken,

    #[error("Could not validate credentials")]
    MalformedToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Could not find user")]
    PrincipalNotFound,

    #[error("Forbidden")]
    Forbidden,

    /// Carries the resource name, e.g. "Post".
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::DuplicateUser | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::MissingToken | AppError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AppError::MalformedToken | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::PrincipalNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn wants_bearer_challenge(&self) -> bool {
        matches!(
            self,
            AppError::MissingToken | AppError::ExpiredToken | AppError::MalformedToken
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal server error".to_owned()
            }
            other => other.to_string(),
        };
        let mut response = (status, Json(json!({ "detail": detail }))).into_response();
        if self.wants_bearer_challenge() {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => AppError::MissingToken,
            AuthError::MalformedToken => AppError::MalformedToken,
            AuthError::ExpiredToken => AppError::ExpiredToken,
            AuthError::PrincipalNotFound => AppError::PrincipalNotFound,
            AuthError::Store(e) => AppError::Internal(e),
        }
    }
}

impl From<Forbidden> for AppError {
    fn from(_: Forbidden) -> Self {
        AppError::Forbidden
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooLong { .. } => AppError::BadRequest(err.to_string()),
            PasswordError::Hashing(_) | PasswordError::CorruptHash => {
                AppError::Internal(anyhow::Error::new(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table() {
        let cases = [
            (AppError::InvalidCredentials, StatusCode::BAD_REQUEST),
            (AppError::DuplicateUser, StatusCode::BAD_REQUEST),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::MissingToken, StatusCode::UNAUTHORIZED),
            (AppError::ExpiredToken, StatusCode::UNAUTHORIZED),
            (AppError::MalformedToken, StatusCode::FORBIDDEN),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
            (AppError::PrincipalNotFound, StatusCode::NOT_FOUND),
            (AppError::NotFound("Post"), StatusCode::NOT_FOUND),
            (
                AppError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err:?}");
        }
    }

    #[test]
    fn auth_errors_keep_expired_and_malformed_apart() {
        assert_eq!(
            AppError::from(AuthError::ExpiredToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AuthError::MalformedToken).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(AuthError::PrincipalNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn not_found_renders_detail() {
        let response = AppError::NotFound("Post").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["detail"], "Post not found");
    }

    #[tokio::test]
    async fn internal_errors_are_redacted() {
        let response = AppError::Internal(anyhow::anyhow!("db password is hunter2")).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Internal server error"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn token_errors_carry_bearer_challenge() {
        let response = AppError::ExpiredToken.into_response();
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }
}
