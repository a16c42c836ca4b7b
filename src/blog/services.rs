use tracing::{debug, info};

use super::dto::PostRequest;
use super::repo::{self, Post, Tag};
use super::repo_types::PostView;
use crate::db::{is_unique_violation, Db};
use crate::error::{ApiResult, AppError};
use crate::slug::slugify;

pub const MAX_POST_TITLE_CHARS: usize = 70;
pub const MAX_TAG_TITLE_CHARS: usize = 30;

/// Splits `"Rust, web ,rust"` into `["rust", "web"]`: trimmed, lowercased,
/// empties dropped, first occurrence kept.
pub fn parse_tag_titles(raw: Option<&str>) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();
    for title in raw.unwrap_or_default().split(',') {
        let title = title.trim().to_lowercase();
        if !title.is_empty() && !titles.contains(&title) {
            titles.push(title);
        }
    }
    titles
}

fn validate(req: &PostRequest, tag_titles: &[String]) -> ApiResult<String> {
    let title_len = req.title.chars().count();
    if req.title.trim().is_empty() || title_len > MAX_POST_TITLE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Title must be 1 to {MAX_POST_TITLE_CHARS} characters"
        )));
    }
    if req.body.trim().is_empty() {
        return Err(AppError::BadRequest("Body must not be empty".into()));
    }
    if let Some(long) = tag_titles
        .iter()
        .find(|t| t.chars().count() > MAX_TAG_TITLE_CHARS)
    {
        return Err(AppError::BadRequest(format!(
            "Tag {long:?} is longer than {MAX_TAG_TITLE_CHARS} characters"
        )));
    }
    Ok(slugify(&req.title))
}

fn duplicate_title(e: anyhow::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::BadRequest("Post with this title already exists".into())
    } else {
        AppError::Internal(e)
    }
}

pub async fn create_post(db: &Db, user_id: i64, req: PostRequest) -> ApiResult<PostView> {
    let tag_titles = parse_tag_titles(req.tags.as_deref());
    let slug = validate(&req, &tag_titles)?;

    let mut tx = db.begin().await.map_err(anyhow::Error::from)?;
    let post = repo::insert_post_tx(&mut tx, &req.title, &slug, &req.body, user_id)
        .await
        .map_err(duplicate_title)?;
    let tags = attach_tags(&mut tx, post.id, &tag_titles).await?;
    tx.commit().await.map_err(anyhow::Error::from)?;

    info!(post_id = post.id, user_id, slug = %post.slug, "post created");
    Ok(PostView { post, tags })
}

/// Rewrites title, slug, body and the whole tag set of an already
/// authorized post.
pub async fn update_post(db: &Db, post: Post, req: PostRequest) -> ApiResult<PostView> {
    let tag_titles = parse_tag_titles(req.tags.as_deref());
    let slug = validate(&req, &tag_titles)?;

    let mut tx = db.begin().await.map_err(anyhow::Error::from)?;
    let post = repo::update_post_tx(&mut tx, post.id, &req.title, &slug, &req.body)
        .await
        .map_err(duplicate_title)?;
    let tags = attach_tags(&mut tx, post.id, &tag_titles).await?;
    tx.commit().await.map_err(anyhow::Error::from)?;

    info!(post_id = post.id, slug = %post.slug, "post updated");
    Ok(PostView { post, tags })
}

async fn attach_tags(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    post_id: i64,
    titles: &[String],
) -> ApiResult<Vec<Tag>> {
    let mut tags = Vec::with_capacity(titles.len());
    for title in titles {
        let tag = repo::upsert_tag_tx(tx, title, &slugify(title)).await?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    let ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
    repo::set_post_tags_tx(tx, post_id, &ids).await?;
    debug!(post_id, count = ids.len(), "post tags set");
    Ok(tags)
}

pub async fn post_view(db: &Db, post: Post) -> ApiResult<PostView> {
    let tags = repo::tags_for_post(db, post.id).await?;
    Ok(PostView { post, tags })
}

pub async fn post_views(db: &Db, posts: Vec<Post>) -> ApiResult<Vec<PostView>> {
    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        views.push(post_view(db, post).await?);
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::User;
    use crate::db::test_pool;

    fn req(title: &str, tags: Option<&str>) -> PostRequest {
        PostRequest {
            title: title.into(),
            body: "body".into(),
            tags: tags.map(Into::into),
        }
    }

    #[test]
    fn tag_titles_are_normalized() {
        assert_eq!(
            parse_tag_titles(Some("Rust, web ,rust,, ")),
            vec!["rust".to_string(), "web".to_string()]
        );
        assert!(parse_tag_titles(None).is_empty());
        assert!(parse_tag_titles(Some("")).is_empty());
    }

    #[tokio::test]
    async fn create_post_slugs_title_and_creates_tags() {
        let db = test_pool().await;
        let user = User::create(&db, "bob", "bob@x.com", "hash").await.unwrap();
        let view = create_post(&db, user.id, req("Hello World", Some("Rust, Web")))
            .await
            .unwrap();
        assert_eq!(view.post.slug, "hello-world");
        assert_eq!(view.post.user_id, user.id);
        let titles: Vec<&str> = view.tags.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["rust", "web"]);
    }

    #[tokio::test]
    async fn duplicate_title_is_bad_request() {
        let db = test_pool().await;
        let user = User::create(&db, "bob", "bob@x.com", "hash").await.unwrap();
        create_post(&db, user.id, req("Same", None)).await.unwrap();
        let err = create_post(&db, user.id, req("Same", None)).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn update_replaces_tags_and_slug() {
        let db = test_pool().await;
        let user = User::create(&db, "bob", "bob@x.com", "hash").await.unwrap();
        let view = create_post(&db, user.id, req("Old Title", Some("a, b")))
            .await
            .unwrap();
        let updated = update_post(&db, view.post, req("New Title", Some("c")))
            .await
            .unwrap();
        assert_eq!(updated.post.slug, "new-title");
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.tags[0].title, "c");
        let reloaded = post_view(&db, updated.post.clone()).await.unwrap();
        assert_eq!(reloaded.tags, updated.tags);
    }

    #[tokio::test]
    async fn overlong_inputs_are_rejected() {
        let db = test_pool().await;
        let user = User::create(&db, "bob", "bob@x.com", "hash").await.unwrap();
        let long_title = "t".repeat(MAX_POST_TITLE_CHARS + 1);
        assert!(matches!(
            create_post(&db, user.id, req(&long_title, None)).await,
            Err(AppError::BadRequest(_))
        ));
        let long_tag = "g".repeat(MAX_TAG_TITLE_CHARS + 1);
        assert!(matches!(
            create_post(&db, user.id, req("Fine", Some(&long_tag))).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
