use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{
        CreateCommentRequest, CreateLikeRequest, DeleteCommentRequest, DeleteLikeRequest,
        HomeListing, HomeQuery, PostRequest, UpdateCommentRequest,
    },
    repo::{self, Comment, Like, Post, Tag},
    repo_types::PostView,
    services,
};
use crate::{
    auth::{extractors::CurrentUser, guard::authorize},
    db::{is_unique_violation, Db},
    error::{ApiResult, AppError},
    state::AppState,
};

pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/blog", get(home))
        .route("/blog/", get(home))
        .route("/blog/post", post(create_post))
        .route(
            "/blog/post/:slug",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/blog/post/:slug/comments", get(post_comments))
        .route("/blog/post/:slug/likes", get(post_likes))
        .route("/blog/tag/:slug", get(tag_posts))
        .route(
            "/blog/comment",
            post(create_comment).put(update_comment).delete(delete_comment),
        )
        .route("/blog/like", post(create_like).delete(delete_like))
}

async fn load_post(db: &Db, slug: &str) -> ApiResult<Post> {
    repo::find_post_by_slug(db, slug)
        .await?
        .ok_or(AppError::NotFound("Post"))
}

// ---- Listing ----

#[instrument(skip(state))]
pub async fn home(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
) -> ApiResult<Json<HomeListing>> {
    match query.tab.as_deref().unwrap_or("posts") {
        "" | "posts" => {
            let q = query.q.as_deref().filter(|q| !q.is_empty());
            let posts = repo::list_posts(&state.db, q).await?;
            Ok(Json(HomeListing::Posts(
                services::post_views(&state.db, posts).await?,
            )))
        }
        "tags" => Ok(Json(HomeListing::Tags(repo::list_tags(&state.db).await?))),
        _ => Err(AppError::NotFound("Tab")),
    }
}

#[instrument(skip(state))]
pub async fn tag_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Vec<PostView>>> {
    let tag: Tag = repo::find_tag_by_slug(&state.db, &slug)
        .await?
        .ok_or(AppError::NotFound("Tag"))?;
    let posts = repo::posts_for_tag(&state.db, tag.id).await?;
    Ok(Json(services::post_views(&state.db, posts).await?))
}

// ---- Posts ----

#[instrument(skip(state))]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<PostView>> {
    let post = load_post(&state.db, &slug).await?;
    Ok(Json(services::post_view(&state.db, post).await?))
}

#[instrument(skip(state))]
pub async fn post_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Vec<Comment>>> {
    let post = load_post(&state.db, &slug).await?;
    Ok(Json(repo::comments_for_post(&state.db, post.id).await?))
}

#[instrument(skip(state))]
pub async fn post_likes(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Vec<i64>>> {
    let post = load_post(&state.db, &slug).await?;
    Ok(Json(repo::likers_of_post(&state.db, post.id).await?))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<PostRequest>,
) -> ApiResult<Json<PostView>> {
    Ok(Json(services::create_post(&state.db, user.id, payload).await?))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Json(payload): Json<PostRequest>,
) -> ApiResult<Json<PostView>> {
    let post = load_post(&state.db, &slug).await?;
    authorize(post.user_id, user.id).inspect_err(|_| {
        warn!(post_id = post.id, "update of foreign post refused");
    })?;
    Ok(Json(services::update_post(&state.db, post, payload).await?))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<PostView>> {
    let post = load_post(&state.db, &slug).await?;
    authorize(post.user_id, user.id).inspect_err(|_| {
        warn!(post_id = post.id, "delete of foreign post refused");
    })?;
    let view = services::post_view(&state.db, post).await?;
    repo::delete_post(&state.db, view.post.id).await?;
    info!(post_id = view.post.id, "post deleted");
    Ok(Json(view))
}

// ---- Comments ----

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    if payload.body.trim().is_empty() {
        return Err(AppError::BadRequest("Body must not be empty".into()));
    }
    let post = repo::find_post_by_id(&state.db, payload.post_id)
        .await?
        .ok_or(AppError::NotFound("Post"))?;
    let comment = repo::insert_comment(&state.db, &payload.body, user.id, post.id).await?;
    info!(comment_id = comment.id, post_id = post.id, "comment created");
    Ok(Json(comment))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    if payload.body.trim().is_empty() {
        return Err(AppError::BadRequest("Body must not be empty".into()));
    }
    let comment = repo::find_comment(&state.db, payload.id)
        .await?
        .ok_or(AppError::NotFound("Comment"))?;
    authorize(comment.user_id, user.id)?;
    Ok(Json(
        repo::update_comment(&state.db, comment.id, &payload.body).await?,
    ))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<DeleteCommentRequest>,
) -> ApiResult<Json<Comment>> {
    let comment = repo::find_comment(&state.db, payload.id)
        .await?
        .ok_or(AppError::NotFound("Comment"))?;
    authorize(comment.user_id, user.id)?;
    repo::delete_comment(&state.db, comment.id).await?;
    info!(comment_id = comment.id, "comment deleted");
    Ok(Json(comment))
}

// ---- Likes ----

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateLikeRequest>,
) -> ApiResult<Json<Like>> {
    let post = repo::find_post_by_id(&state.db, payload.post_id)
        .await?
        .ok_or(AppError::NotFound("Post"))?;
    let like = repo::insert_like(&state.db, user.id, post.id)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::BadRequest("Post already liked".into())
            } else {
                AppError::Internal(e)
            }
        })?;
    Ok(Json(like))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn delete_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<DeleteLikeRequest>,
) -> ApiResult<Json<Like>> {
    let owner_id = payload.user_id.unwrap_or(user.id);
    let like = repo::find_like(&state.db, owner_id, payload.post_id)
        .await?
        .ok_or(AppError::NotFound("Like"))?;
    authorize(like.user_id, user.id)?;
    repo::delete_like(&state.db, like.id).await?;
    Ok(Json(like))
}
