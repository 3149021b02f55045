//! PostgreSQL tag store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{StoreResult, TagRepository, order_by_ids};
use crate::models::Tag;

const TAG_SELECT: &str = r#"
    SELECT t.id, t.name, t.created_at,
           ARRAY(SELECT pt.palette_id FROM palette_tags pt
                 WHERE pt.tag_id = t.id ORDER BY pt.created_at) AS tagged_palettes
    FROM tags t
"#;

fn tag_from_row(row: &PgRow) -> Result<Tag, sqlx::Error> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        tagged_palettes: row.try_get("tagged_palettes")?,
    })
}

/// Tag repository
#[derive(Clone)]
pub struct PgTagRepository {
    pool: PgPool,
}

impl PgTagRepository {
    /// Create a new tag repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: Uuid) -> StoreResult<Option<Tag>> {
        let row = sqlx::query(&format!("{TAG_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(tag_from_row).transpose()?)
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn create(&self, name: &str) -> StoreResult<Tag> {
        info!("Creating tag: {}", name);

        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query("INSERT INTO tags (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(name)
            .bind(created_at)
            .execute(&self.pool)
            .await?;

        Ok(Tag {
            id,
            name: name.to_string(),
            created_at,
            tagged_palettes: Vec::new(),
        })
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        let row = sqlx::query(&format!(
            "{TAG_SELECT} WHERE t.name = $1 ORDER BY t.created_at ASC LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(tag_from_row).transpose()?)
    }

    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!("{TAG_SELECT} WHERE t.id = ANY($1)"))
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        let tags = rows.iter().map(tag_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(order_by_ids(ids, tags, |t| t.id))
    }

    async fn list(&self) -> StoreResult<Vec<Tag>> {
        let rows = sqlx::query(&format!("{TAG_SELECT} ORDER BY t.created_at ASC"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(tag_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn link_palette(&self, tag_id: Uuid, palette_id: Uuid) -> StoreResult<Option<Tag>> {
        info!("Linking tag {} to palette {}", tag_id, palette_id);

        let mut tx = self.pool.begin().await?;

        let both_exist: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM tags WHERE id = $1)
               AND EXISTS (SELECT 1 FROM palettes WHERE id = $2)
            "#,
        )
        .bind(tag_id)
        .bind(palette_id)
        .fetch_one(&mut *tx)
        .await?;

        if !both_exist {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query(
            "INSERT INTO palette_tags (palette_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(palette_id)
        .bind(tag_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.fetch(tag_id).await
    }
}
