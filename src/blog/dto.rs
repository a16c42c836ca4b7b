use serde::{Deserialize, Serialize};

use super::repo_types::{PostView, Tag};

/// Body for creating or updating a post. `tags` is comma separated.
#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
    pub post_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub id: i64,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCommentRequest {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateLikeRequest {
    pub post_id: i64,
}

/// `user_id` defaults to the caller.
#[derive(Debug, Deserialize)]
pub struct DeleteLikeRequest {
    pub post_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HomeListing {
    Posts(Vec<PostView>),
    Tags(Vec<Tag>),
}
