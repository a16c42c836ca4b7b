use axum::{extract::State, routing::post, Form, Json, Router};
use tracing::instrument;

use super::{
    dto::{LoginForm, SignupRequest, TokenResponse},
    repo::User,
    services,
};
use crate::{error::ApiResult, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<Json<User>> {
    let user = services::register(&state, payload).await?;
    Ok(Json(user))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<TokenResponse>> {
    let tokens = services::login(&state, form).await?;
    Ok(Json(tokens))
}
