//! PostgreSQL identity store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{StoreResult, UserRepository};
use crate::models::{NewUser, User};

const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.password_hash, u.created_at,
           ARRAY(SELECT up.palette_id FROM user_palettes up
                 WHERE up.user_id = u.id ORDER BY up.added_at) AS my_palettes,
           ARRAY(SELECT s.palette_id FROM palette_saves s
                 WHERE s.user_id = u.id ORDER BY s.created_at) AS favorites
    FROM users u
"#;

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        my_palettes: row.try_get("my_palettes")?,
        favorites: row.try_get("favorites")?,
    })
}

/// User repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: &NewUser) -> StoreResult<User> {
        info!("Creating new user: {}", new_user.username);

        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            created_at,
            my_palettes: Vec::new(),
            favorites: Vec::new(),
        })
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        info!("Finding user by username: {}", username);

        let row = sqlx::query(&format!("{USER_SELECT} WHERE u.username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        info!("Finding user by ID: {}", id);

        let row = sqlx::query(&format!("{USER_SELECT} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn remove_owned_palette(
        &self,
        user_id: Uuid,
        palette_id: Uuid,
    ) -> StoreResult<Option<User>> {
        info!("Removing palette {} from user {}", palette_id, user_id);

        sqlx::query("DELETE FROM user_palettes WHERE user_id = $1 AND palette_id = $2")
            .bind(user_id)
            .bind(palette_id)
            .execute(&self.pool)
            .await?;

        self.find_by_id(user_id).await
    }
}
