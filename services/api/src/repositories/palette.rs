//! PostgreSQL palette store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{PaletteRepository, StoreResult, order_by_ids};
use crate::models::{NewPalette, Palette, PaletteColors};

const PALETTE_SELECT: &str = r#"
    SELECT p.id, p.title, p.description,
           p.primary_color, p.secondary_color, p.accent1, p.accent2, p.accent3,
           p.username, p.created_at,
           ARRAY(SELECT v.user_id FROM palette_upvotes v
                 WHERE v.palette_id = p.id ORDER BY v.created_at) AS upvotes,
           ARRAY(SELECT s.user_id FROM palette_saves s
                 WHERE s.palette_id = p.id ORDER BY s.created_at) AS saves,
           ARRAY(SELECT pt.tag_id FROM palette_tags pt
                 WHERE pt.palette_id = p.id ORDER BY pt.created_at) AS tags
    FROM palettes p
"#;

fn palette_from_row(row: &PgRow) -> Result<Palette, sqlx::Error> {
    Ok(Palette {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        colors: PaletteColors {
            primary: row.try_get("primary_color")?,
            secondary: row.try_get("secondary_color")?,
            accent1: row.try_get("accent1")?,
            accent2: row.try_get("accent2")?,
            accent3: row.try_get("accent3")?,
        },
        username: row.try_get("username")?,
        created_at: row.try_get("created_at")?,
        upvotes: row.try_get("upvotes")?,
        saves: row.try_get("saves")?,
        tags: row.try_get("tags")?,
    })
}

fn palettes_from_rows(rows: &[PgRow]) -> Result<Vec<Palette>, sqlx::Error> {
    rows.iter().map(palette_from_row).collect()
}

/// Palette repository
#[derive(Clone)]
pub struct PgPaletteRepository {
    pool: PgPool,
}

impl PgPaletteRepository {
    /// Create a new palette repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaletteRepository for PgPaletteRepository {
    async fn create(
        &self,
        owner_id: Uuid,
        owner_username: &str,
        new_palette: &NewPalette,
    ) -> StoreResult<Palette> {
        info!("Creating palette '{}' for {}", new_palette.title, owner_username);

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let colors = &new_palette.colors;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO palettes (id, title, description, primary_color, secondary_color,
                                  accent1, accent2, accent3, username, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(&new_palette.title)
        .bind(&new_palette.description)
        .bind(&colors.primary)
        .bind(&colors.secondary)
        .bind(&colors.accent1)
        .bind(&colors.accent2)
        .bind(&colors.accent3)
        .bind(owner_username)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_palettes (user_id, palette_id) VALUES ($1, $2)")
            .bind(owner_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Palette {
            id,
            title: new_palette.title.clone(),
            description: new_palette.description.clone(),
            colors: colors.clone(),
            username: owner_username.to_string(),
            created_at,
            upvotes: Vec::new(),
            saves: Vec::new(),
            tags: Vec::new(),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Palette>> {
        let row = sqlx::query(&format!("{PALETTE_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(palette_from_row).transpose()?)
    }

    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Palette>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!("{PALETTE_SELECT} WHERE p.id = ANY($1)"))
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        Ok(order_by_ids(ids, palettes_from_rows(&rows)?, |p| p.id))
    }

    async fn list(&self, username: Option<&str>) -> StoreResult<Vec<Palette>> {
        let rows = match username {
            Some(username) => {
                sqlx::query(&format!(
                    "{PALETTE_SELECT} WHERE p.username = $1 ORDER BY p.created_at DESC"
                ))
                .bind(username)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{PALETTE_SELECT} ORDER BY p.created_at DESC"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(palettes_from_rows(&rows)?)
    }

    async fn list_all(&self) -> StoreResult<Vec<Palette>> {
        let rows = sqlx::query(&format!("{PALETTE_SELECT} ORDER BY p.created_at ASC"))
            .fetch_all(&self.pool)
            .await?;

        Ok(palettes_from_rows(&rows)?)
    }

    async fn add_upvote(&self, palette_id: Uuid, user_id: Uuid) -> StoreResult<Option<Palette>> {
        info!("User {} upvoting palette {}", user_id, palette_id);

        sqlx::query(
            r#"
            INSERT INTO palette_upvotes (palette_id, user_id)
            SELECT $1, $2 WHERE EXISTS (SELECT 1 FROM palettes WHERE id = $1)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(palette_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        self.find_by_id(palette_id).await
    }

    async fn add_save(&self, palette_id: Uuid, user_id: Uuid) -> StoreResult<Option<Palette>> {
        info!("User {} saving palette {}", user_id, palette_id);

        sqlx::query(
            r#"
            INSERT INTO palette_saves (palette_id, user_id)
            SELECT $1, $2 WHERE EXISTS (SELECT 1 FROM palettes WHERE id = $1)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(palette_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        self.find_by_id(palette_id).await
    }
}
