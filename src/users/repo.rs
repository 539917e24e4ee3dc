use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewUser, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find the user holding this exact `(email, social_id)` pair.
    async fn find_by_identity(&self, email: &str, social_id: &str) -> anyhow::Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Insert `new` unless a row with the same `(email, social_id)` exists.
    /// Returns `None` when the pair was already taken.
    async fn insert_if_absent(&self, new: &NewUser) -> anyhow::Result<Option<User>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_identity(&self, email: &str, social_id: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, social_id, created_at
            FROM users
            WHERE email = $1 AND social_id = $2
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(social_id)
        .fetch_optional(&self.db)
        .await
        .context("find user by identity")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password, social_id, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn insert_if_absent(&self, new: &NewUser) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password, social_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email, social_id) DO NOTHING
            RETURNING id, name, email, password, social_id, created_at
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password)
        .bind(&new.social_id)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }
}
