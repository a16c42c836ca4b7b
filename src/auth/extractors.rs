use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};

use super::claims::TokenKind;
use super::errors::AuthError;
use super::repo::User;
use crate::{error::AppError, state::AppState};

/// Resolves an access token to the user it was issued for.
///
/// The user is looked up on every call; a token whose subject no longer
/// exists yields `PrincipalNotFound` until it expires.
pub async fn resolve(state: &AppState, token: &str) -> Result<User, AuthError> {
    let claims = state.jwt.verify(token, TokenKind::Access).map_err(|e| {
        warn!(error = %e, "access token rejected");
        AuthError::from(e)
    })?;

    match User::find_by_email(&state.db, &claims.sub).await? {
        Some(user) => {
            debug!(user_id = user.id, "principal resolved");
            Ok(user)
        }
        None => {
            warn!("token subject has no matching user");
            Err(AuthError::PrincipalNotFound)
        }
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// The authenticated user of the current request.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = resolve(state, token).await?;
        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use time::Duration;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc"))).unwrap(), "abc");
        assert_eq!(bearer_token(&parts_with(Some("bearer abc"))).unwrap(), "abc");
        assert!(matches!(
            bearer_token(&parts_with(None)),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            bearer_token(&parts_with(Some("Basic abc"))),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            bearer_token(&parts_with(Some("Bearer "))),
            Err(AuthError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn resolves_existing_user() {
        let state = AppState::fake().await;
        let bob = User::create(&state.db, "bob", "bob@x.com", "hash").await.unwrap();
        let token = state.jwt.issue_access("bob@x.com").unwrap();
        let user = resolve(&state, &token).await.unwrap();
        assert_eq!(user.id, bob.id);
    }

    #[tokio::test]
    async fn deleted_user_is_not_found() {
        let state = AppState::fake().await;
        let bob = User::create(&state.db, "bob", "bob@x.com", "hash").await.unwrap();
        let token = state.jwt.issue_access("bob@x.com").unwrap();
        User::delete(&state.db, bob.id).await.unwrap();
        let err = resolve(&state, &token).await.unwrap_err();
        assert!(matches!(err, AuthError::PrincipalNotFound));
    }

    #[tokio::test]
    async fn expired_token_is_expired() {
        let state = AppState::fake().await;
        User::create(&state.db, "bob", "bob@x.com", "hash").await.unwrap();
        let token = state
            .jwt
            .issue(TokenKind::Access, "bob@x.com", Duration::minutes(-1))
            .unwrap();
        let err = resolve(&state, &token).await.unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken));
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let state = AppState::fake().await;
        User::create(&state.db, "bob", "bob@x.com", "hash").await.unwrap();
        let token = state.jwt.issue_refresh("bob@x.com").unwrap();
        let err = resolve(&state, &token).await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken));
    }
}
