use serde::{Deserialize, Serialize};

use crate::auth::repo::User;
use crate::blog::repo::{Comment, Like};
use crate::blog::repo_types::PostView;

#[derive(Debug, Deserialize)]
pub struct TabQuery {
    #[serde(default)]
    pub tab: Option<String>,
}

/// One tab of a profile page. Serialized without a tag.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UserTab {
    Overview(User),
    Posts(Vec<PostView>),
    Comments(Vec<Comment>),
    Likes(Vec<Like>),
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar: String,
}
