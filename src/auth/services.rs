use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::dto::{LoginForm, SignupRequest, TokenResponse};
use super::password::{hash_password, verify_password};
use super::repo::User;
use crate::db::is_unique_violation;
use crate::error::{ApiResult, AppError};
use crate::state::AppState;

pub const MAX_USERNAME_CHARS: usize = 50;
pub const MAX_EMAIL_CHARS: usize = 255;

lazy_static! {
    /// Hash checked against when the email is unknown.
    static ref DUMMY_HASH: String = hash_password("itish-dummy-password").unwrap_or_default();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

/// Usernames end up in URLs and storage keys: letters, digits, `_`, `-`
/// and `.`, but never `..`.
pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex =
            Regex::new(r"^[\w.-]+$").expect("username regex compiles");
    }
    USERNAME_RE.is_match(username) && !username.contains("..")
}

/// Trims and checks the identity fields shared by signup and profile update.
pub(crate) fn normalize_identity(payload: &mut SignupRequest) -> ApiResult<()> {
    payload.username = payload.username.trim().to_owned();
    payload.email = payload.email.trim().to_owned();

    if payload.username.is_empty() || payload.username.chars().count() > MAX_USERNAME_CHARS {
        return Err(AppError::BadRequest(format!(
            "Username must be 1 to {MAX_USERNAME_CHARS} characters"
        )));
    }
    if !is_valid_username(&payload.username) {
        return Err(AppError::BadRequest(
            "Username may only contain letters, digits, '_', '-' and '.'".into(),
        ));
    }
    if payload.email.chars().count() > MAX_EMAIL_CHARS || !is_valid_email(&payload.email) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    Ok(())
}

pub async fn register(state: &AppState, mut payload: SignupRequest) -> ApiResult<User> {
    normalize_identity(&mut payload)?;

    if User::is_taken(&state.db, &payload.username, &payload.email, None).await? {
        warn!(username = %payload.username, "username or email already registered");
        return Err(AppError::DuplicateUser);
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &hash)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateUser
            } else {
                AppError::Internal(e)
            }
        })?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn login(state: &AppState, form: LoginForm) -> ApiResult<TokenResponse> {
    let email = form.username.trim();

    let Some(user) = User::find_by_email(&state.db, email).await? else {
        // same argon2 cost as a real mismatch
        let _ = verify_password(&form.password, &DUMMY_HASH);
        warn!("login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&form.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let access_token = state
        .jwt
        .issue_access(&user.email)
        .map_err(|e| AppError::Internal(e.into()))?;
    let refresh_token = state
        .jwt
        .issue_refresh(&user.email)
        .map_err(|e| AppError::Internal(e.into()))?;

    info!(user_id = user.id, "user logged in");
    Ok(TokenResponse {
        user_id: user.id,
        access_token,
        refresh_token,
        token_type: "bearer",
    })
}
