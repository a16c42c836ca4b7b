use serde::{Deserialize, Serialize};

/// Request body for user registration (also used for profile updates).
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Form body for login. `username` carries the email address.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}
