use anyhow::Context;
use sqlx::{Sqlite, Transaction};
use time::OffsetDateTime;

pub use super::repo_types::{Comment, Like, Post, Tag};
use crate::db::Db;

type Tx<'a> = Transaction<'a, Sqlite>;

// ---- Posts ----

pub async fn list_posts(db: &Db, title_query: Option<&str>) -> anyhow::Result<Vec<Post>> {
    let rows = match title_query {
        Some(q) => {
            sqlx::query_as::<_, Post>(
                r#"
                SELECT id, title, slug, body, created_at, user_id
                  FROM posts
                 WHERE title LIKE ?1 ESCAPE '\'
                 ORDER BY id DESC
                "#,
            )
            .bind(like_pattern(q))
            .fetch_all(db)
            .await
        }
        None => {
            sqlx::query_as::<_, Post>(
                r#"
                SELECT id, title, slug, body, created_at, user_id
                  FROM posts
                 ORDER BY id DESC
                "#,
            )
            .fetch_all(db)
            .await
        }
    }
    .context("list posts")?;
    Ok(rows)
}

/// `%q%` with LIKE wildcards in `q` escaped.
fn like_pattern(q: &str) -> String {
    let escaped = q
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

pub async fn find_post_by_slug(db: &Db, slug: &str) -> anyhow::Result<Option<Post>> {
    let row = sqlx::query_as::<_, Post>(
        "SELECT id, title, slug, body, created_at, user_id FROM posts WHERE slug = ?1",
    )
    .bind(slug)
    .fetch_optional(db)
    .await
    .context("find post by slug")?;
    Ok(row)
}

pub async fn find_post_by_id(db: &Db, id: i64) -> anyhow::Result<Option<Post>> {
    let row = sqlx::query_as::<_, Post>(
        "SELECT id, title, slug, body, created_at, user_id FROM posts WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find post by id")?;
    Ok(row)
}

pub async fn posts_by_user(db: &Db, user_id: i64) -> anyhow::Result<Vec<Post>> {
    let rows = sqlx::query_as::<_, Post>(
        r#"
        SELECT id, title, slug, body, created_at, user_id
          FROM posts
         WHERE user_id = ?1
         ORDER BY id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list posts by user")?;
    Ok(rows)
}

pub async fn posts_for_tag(db: &Db, tag_id: i64) -> anyhow::Result<Vec<Post>> {
    let rows = sqlx::query_as::<_, Post>(
        r#"
        SELECT p.id, p.title, p.slug, p.body, p.created_at, p.user_id
          FROM posts p
          JOIN post_tags pt ON pt.post_id = p.id
         WHERE pt.tag_id = ?1
         ORDER BY p.id DESC
        "#,
    )
    .bind(tag_id)
    .fetch_all(db)
    .await
    .context("list posts for tag")?;
    Ok(rows)
}

pub async fn insert_post_tx(
    tx: &mut Tx<'_>,
    title: &str,
    slug: &str,
    body: &str,
    user_id: i64,
) -> anyhow::Result<Post> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (title, slug, body, created_at, user_id)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id, title, slug, body, created_at, user_id
        "#,
    )
    .bind(title)
    .bind(slug)
    .bind(body)
    .bind(OffsetDateTime::now_utc())
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(post)
}

pub async fn update_post_tx(
    tx: &mut Tx<'_>,
    id: i64,
    title: &str,
    slug: &str,
    body: &str,
) -> anyhow::Result<Post> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        UPDATE posts SET title = ?2, slug = ?3, body = ?4
         WHERE id = ?1
        RETURNING id, title, slug, body, created_at, user_id
        "#,
    )
    .bind(id)
    .bind(title)
    .bind(slug)
    .bind(body)
    .fetch_one(&mut **tx)
    .await?;
    Ok(post)
}

/// Comments, likes and tag links are removed by cascade.
pub async fn delete_post(db: &Db, id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await
        .context("delete post")?;
    Ok(())
}

// ---- Tags ----

pub async fn list_tags(db: &Db) -> anyhow::Result<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>("SELECT id, title, slug FROM tags ORDER BY title")
        .fetch_all(db)
        .await
        .context("list tags")?;
    Ok(rows)
}

pub async fn find_tag_by_slug(db: &Db, slug: &str) -> anyhow::Result<Option<Tag>> {
    let row = sqlx::query_as::<_, Tag>("SELECT id, title, slug FROM tags WHERE slug = ?1")
        .bind(slug)
        .fetch_optional(db)
        .await
        .context("find tag by slug")?;
    Ok(row)
}

pub async fn tags_for_post(db: &Db, post_id: i64) -> anyhow::Result<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.title, t.slug
          FROM tags t
          JOIN post_tags pt ON pt.tag_id = t.id
         WHERE pt.post_id = ?1
         ORDER BY t.title
        "#,
    )
    .bind(post_id)
    .fetch_all(db)
    .await
    .context("list tags for post")?;
    Ok(rows)
}

/// Returns the tag with this title, creating it when missing. A different
/// title that slugs to the same value resolves to the existing tag.
pub async fn upsert_tag_tx(tx: &mut Tx<'_>, title: &str, slug: &str) -> anyhow::Result<Tag> {
    sqlx::query("INSERT INTO tags (title, slug) VALUES (?1, ?2) ON CONFLICT DO NOTHING")
        .bind(title)
        .bind(slug)
        .execute(&mut **tx)
        .await
        .context("insert tag")?;
    let tag = sqlx::query_as::<_, Tag>(
        "SELECT id, title, slug FROM tags WHERE title = ?1 OR slug = ?2 ORDER BY title = ?1 DESC LIMIT 1",
    )
    .bind(title)
    .bind(slug)
    .fetch_one(&mut **tx)
    .await
    .context("load tag")?;
    Ok(tag)
}

/// Replaces the post's tag links with `tag_ids`.
pub async fn set_post_tags_tx(tx: &mut Tx<'_>, post_id: i64, tag_ids: &[i64]) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM post_tags WHERE post_id = ?1")
        .bind(post_id)
        .execute(&mut **tx)
        .await
        .context("clear post tags")?;
    for &tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?1, ?2)")
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .context("link post tag")?;
    }
    Ok(())
}

// ---- Comments ----

pub async fn find_comment(db: &Db, id: i64) -> anyhow::Result<Option<Comment>> {
    let row = sqlx::query_as::<_, Comment>(
        "SELECT id, body, created_at, user_id, post_id FROM comments WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find comment")?;
    Ok(row)
}

/// Newest first.
pub async fn comments_for_post(db: &Db, post_id: i64) -> anyhow::Result<Vec<Comment>> {
    let rows = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, body, created_at, user_id, post_id
          FROM comments
         WHERE post_id = ?1
         ORDER BY id DESC
        "#,
    )
    .bind(post_id)
    .fetch_all(db)
    .await
    .context("list comments for post")?;
    Ok(rows)
}

pub async fn comments_by_user(db: &Db, user_id: i64) -> anyhow::Result<Vec<Comment>> {
    let rows = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, body, created_at, user_id, post_id
          FROM comments
         WHERE user_id = ?1
         ORDER BY id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list comments by user")?;
    Ok(rows)
}

pub async fn insert_comment(
    db: &Db,
    body: &str,
    user_id: i64,
    post_id: i64,
) -> anyhow::Result<Comment> {
    let row = sqlx::query_as::<_, Comment>(
        r#"
        INSERT INTO comments (body, created_at, user_id, post_id)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, body, created_at, user_id, post_id
        "#,
    )
    .bind(body)
    .bind(OffsetDateTime::now_utc())
    .bind(user_id)
    .bind(post_id)
    .fetch_one(db)
    .await
    .context("insert comment")?;
    Ok(row)
}

pub async fn update_comment(db: &Db, id: i64, body: &str) -> anyhow::Result<Comment> {
    let row = sqlx::query_as::<_, Comment>(
        r#"
        UPDATE comments SET body = ?2
         WHERE id = ?1
        RETURNING id, body, created_at, user_id, post_id
        "#,
    )
    .bind(id)
    .bind(body)
    .fetch_one(db)
    .await
    .context("update comment")?;
    Ok(row)
}

pub async fn delete_comment(db: &Db, id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await
        .context("delete comment")?;
    Ok(())
}

// ---- Likes ----

pub async fn insert_like(db: &Db, user_id: i64, post_id: i64) -> anyhow::Result<Like> {
    let row = sqlx::query_as::<_, Like>(
        r#"
        INSERT INTO likes (created_at, user_id, post_id)
        VALUES (?1, ?2, ?3)
        RETURNING id, created_at, user_id, post_id
        "#,
    )
    .bind(OffsetDateTime::now_utc())
    .bind(user_id)
    .bind(post_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn find_like(db: &Db, user_id: i64, post_id: i64) -> anyhow::Result<Option<Like>> {
    let row = sqlx::query_as::<_, Like>(
        "SELECT id, created_at, user_id, post_id FROM likes WHERE user_id = ?1 AND post_id = ?2",
    )
    .bind(user_id)
    .bind(post_id)
    .fetch_optional(db)
    .await
    .context("find like")?;
    Ok(row)
}

pub async fn delete_like(db: &Db, id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM likes WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await
        .context("delete like")?;
    Ok(())
}

/// Ids of the users who liked the post, oldest like first.
pub async fn likers_of_post(db: &Db, post_id: i64) -> anyhow::Result<Vec<i64>> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT user_id FROM likes WHERE post_id = ?1 ORDER BY id")
            .bind(post_id)
            .fetch_all(db)
            .await
            .context("list likers")?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn likes_by_user(db: &Db, user_id: i64) -> anyhow::Result<Vec<Like>> {
    let rows = sqlx::query_as::<_, Like>(
        r#"
        SELECT id, created_at, user_id, post_id
          FROM likes
         WHERE user_id = ?1
         ORDER BY id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list likes by user")?;
    Ok(rows)
}
