use time::OffsetDateTime;

pub use crate::auth::repo_types::User;
use crate::db::Db;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, avatar";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &Db, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_username(db: &Db, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Whether another account already holds `username` or `email`.
    pub async fn is_taken(
        db: &Db,
        username: &str,
        email: &str,
        except_id: Option<i64>,
    ) -> anyhow::Result<bool> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM users
            WHERE (username = ?1 OR email = ?2) AND id != ?3
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(except_id.unwrap_or(-1))
        .fetch_one(db)
        .await?;
        Ok(count > 0)
    }

    /// Create a new user with an already hashed password.
    pub async fn create(
        db: &Db,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn update_profile(
        db: &Db,
        id: i64,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET username = ?2, email = ?3, password_hash = ?4
            WHERE id = ?1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn set_avatar(db: &Db, id: i64, key: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET avatar = ?2 WHERE id = ?1")
            .bind(id)
            .bind(key)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Deletes the user; posts, comments and likes go with it.
    pub async fn delete(db: &Db, id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{is_unique_violation, test_pool};

    #[tokio::test]
    async fn create_and_find_user() {
        let db = test_pool().await;
        let created = User::create(&db, "bob", "bob@x.com", "hash").await.unwrap();
        assert!(created.avatar.is_none());

        let by_email = User::find_by_email(&db, "bob@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        let by_name = User::find_by_username(&db, "bob").await.unwrap().unwrap();
        assert_eq!(by_name.email, "bob@x.com");
        assert!(User::find_by_email(&db, "nobody@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn is_taken_checks_username_or_email() {
        let db = test_pool().await;
        let bob = User::create(&db, "bob", "bob@x.com", "hash").await.unwrap();
        assert!(User::is_taken(&db, "bob", "other@x.com", None).await.unwrap());
        assert!(User::is_taken(&db, "other", "bob@x.com", None).await.unwrap());
        assert!(!User::is_taken(&db, "other", "other@x.com", None).await.unwrap());
        assert!(!User::is_taken(&db, "bob", "bob@x.com", Some(bob.id)).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let db = test_pool().await;
        User::create(&db, "bob", "bob@x.com", "hash").await.unwrap();
        let err = User::create(&db, "bobby", "bob@x.com", "hash").await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn serialization_hides_password_hash() {
        let db = test_pool().await;
        let user = User::create(&db, "bob", "bob@x.com", "secret-hash").await.unwrap();
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("bob@x.com"));
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
