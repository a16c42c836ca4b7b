use tracing::{debug, info, warn};

use super::dto::UserTab;
use crate::auth::password::hash_password;
use crate::auth::repo::User;
use crate::auth::services::normalize_identity;
use crate::auth::SignupRequest;
use crate::blog::{repo, services as blog};
use crate::db::{is_unique_violation, Db};
use crate::error::{ApiResult, AppError};

pub const DEFAULT_AVATAR_KEY: &str = "avatars/default.png";

/// Maps an upload's content type to a file extension. Only PNG and JPEG
/// are accepted.
pub fn avatar_ext(content_type: &str) -> Option<&'static str> {
    let (kind, subtype) = content_type.split_once('/')?;
    if kind != "image" {
        return None;
    }
    match subtype.split(';').next()?.trim() {
        "png" => Some("png"),
        "jpg" => Some("jpg"),
        "jpeg" => Some("jpeg"),
        _ => None,
    }
}

pub fn avatar_key(username: &str, ext: &str) -> String {
    format!("avatars/{username}.{ext}")
}

pub fn content_type_for(key: &str) -> &'static str {
    match key.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Builds the requested profile tab. An absent or empty tab means overview.
pub async fn profile_tab(db: &Db, user: User, tab: Option<&str>) -> ApiResult<UserTab> {
    let tab = tab.unwrap_or_default();
    debug!(user_id = user.id, tab, "profile tab");
    match tab {
        "" | "overview" => Ok(UserTab::Overview(user)),
        "posts" => {
            let posts = repo::posts_by_user(db, user.id).await?;
            Ok(UserTab::Posts(blog::post_views(db, posts).await?))
        }
        "comments" => Ok(UserTab::Comments(repo::comments_by_user(db, user.id).await?)),
        "likes" => Ok(UserTab::Likes(repo::likes_by_user(db, user.id).await?)),
        _ => Err(AppError::NotFound("Tab")),
    }
}

/// Replaces username, email and password of `user`. The new identity may
/// not collide with any other account.
pub async fn update_profile(db: &Db, user: &User, mut payload: SignupRequest) -> ApiResult<User> {
    normalize_identity(&mut payload)?;

    if User::is_taken(db, &payload.username, &payload.email, Some(user.id)).await? {
        warn!(user_id = user.id, "profile update collides with another account");
        return Err(AppError::DuplicateUser);
    }

    let hash = hash_password(&payload.password)?;
    let updated = User::update_profile(db, user.id, &payload.username, &payload.email, &hash)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateUser
            } else {
                AppError::Internal(e)
            }
        })?;

    info!(user_id = updated.id, "profile updated");
    Ok(updated)
}
