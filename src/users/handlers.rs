use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use tracing::{error, info, instrument};

use super::{
    dto::{AvatarResponse, TabQuery, UserTab},
    services,
};
use crate::{
    auth::{extractors::CurrentUser, repo::User, SignupRequest},
    error::{ApiResult, AppError},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/me", get(me).put(update_me).delete(delete_me))
        .route(
            "/user/me/avatar",
            put(upload_avatar).layer(DefaultBodyLimit::max(5 * 1024 * 1024)),
        )
        .route("/user/:username", get(profile))
        .route("/user/:username/avatar", get(avatar))
}

async fn load_user(state: &AppState, username: &str) -> ApiResult<User> {
    User::find_by_username(&state.db, username)
        .await?
        .ok_or(AppError::NotFound("User"))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<TabQuery>,
) -> ApiResult<Json<UserTab>> {
    let tab = services::profile_tab(&state.db, user, query.tab.as_deref()).await?;
    Ok(Json(tab))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(services::update_profile(&state.db, &user, payload).await?))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<User>> {
    User::delete(&state.db, user.id).await?;
    info!(user_id = user.id, "user deleted");
    Ok(Json(user))
}

/// PUT /user/me/avatar (multipart, field `file`)
///
/// The key is recorded right away; the bytes are written in the background
/// and a failed write is only logged.
#[instrument(skip(state, user, mp), fields(user_id = user.id))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut mp: Multipart,
) -> ApiResult<Json<AvatarResponse>> {
    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        upload = Some((content_type, body));
        break;
    }

    let (content_type, body) =
        upload.ok_or_else(|| AppError::BadRequest("file is required".into()))?;
    let ext = services::avatar_ext(&content_type)
        .ok_or_else(|| AppError::BadRequest("Invalid file format".into()))?;
    let key = services::avatar_key(&user.username, ext);

    User::set_avatar(&state.db, user.id, &key).await?;

    let storage = state.storage.clone();
    let object_key = key.clone();
    tokio::spawn(async move {
        if let Err(e) = storage.put_object(&object_key, body).await {
            error!(error = %e, key = %object_key, "avatar write failed");
        }
    });

    info!(key = %key, "avatar accepted");
    Ok(Json(AvatarResponse { avatar: key }))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<TabQuery>,
) -> ApiResult<Json<UserTab>> {
    let user = load_user(&state, &username).await?;
    let tab = services::profile_tab(&state.db, user, query.tab.as_deref()).await?;
    Ok(Json(tab))
}

#[instrument(skip(state))]
pub async fn avatar(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user = load_user(&state, &username).await?;
    let key = user
        .avatar
        .unwrap_or_else(|| services::DEFAULT_AVATAR_KEY.to_owned());
    let body = state
        .storage
        .get_object(&key)
        .await?
        .ok_or(AppError::NotFound("Avatar"))?;
    Ok(([(CONTENT_TYPE, services::content_type_for(&key))], body))
}
