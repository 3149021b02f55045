//! Storage seams for users, palettes and tags
//!
//! Each store is a trait so the operation layer can run against PostgreSQL
//! in production and against [`memory::MemoryStore`] in development and
//! tests. Relation writes (owner link, upvote, save, tag link) are single
//! atomic operations on every backend.

use async_trait::async_trait;
use common::error::{DatabaseError, foreign_key_violation, unique_violation};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewPalette, NewUser, Palette, Tag, User};

pub mod memory;
pub mod palette;
pub mod tag;
pub mod user;

pub use memory::MemoryStore;
pub use palette::PgPaletteRepository;
pub use tag::PgTagRepository;
pub use user::PgUserRepository;

/// Errors raised by store implementations
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("{field} is already taken")]
    Conflict { field: String },

    /// The acting user has no record, so nothing was written
    #[error("user does not exist")]
    UnknownUser,

    /// Any other database failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(constraint) = unique_violation(&err) {
            return StoreError::Conflict {
                field: constraint_field(&constraint).to_string(),
            };
        }
        if foreign_key_violation(&err).is_some_and(|c| c.ends_with("user_id_fkey")) {
            return StoreError::UnknownUser;
        }
        StoreError::Database(DatabaseError::Query(err))
    }
}

/// Column name encoded in a `<table>_<column>_key` constraint name.
fn constraint_field(constraint: &str) -> &str {
    constraint
        .strip_suffix("_key")
        .and_then(|rest| rest.split_once('_').map(|(_, field)| field))
        .unwrap_or(constraint)
}

/// Type alias for store results
pub type StoreResult<T> = Result<T, StoreError>;

/// Identity store
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; fails with [`StoreError::Conflict`] on a taken
    /// username or email.
    async fn create(&self, new_user: &NewUser) -> StoreResult<User>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Drop `palette_id` from the user's own palette set and return the
    /// updated user. The palette itself is left untouched.
    async fn remove_owned_palette(&self, user_id: Uuid, palette_id: Uuid)
    -> StoreResult<Option<User>>;
}

/// Palette store
#[async_trait]
pub trait PaletteRepository: Send + Sync {
    /// Insert a palette and add it to the owner's palette set in one
    /// atomic write. Fails with [`StoreError::UnknownUser`], writing
    /// nothing, when the owner has no record.
    async fn create(
        &self,
        owner_id: Uuid,
        owner_username: &str,
        new_palette: &NewPalette,
    ) -> StoreResult<Palette>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Palette>>;

    /// Palettes for `ids`, in the order of `ids`; unknown ids are skipped.
    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Palette>>;

    /// All palettes, or one owner's, newest first.
    async fn list(&self, username: Option<&str>) -> StoreResult<Vec<Palette>>;

    /// Every palette in insertion order.
    async fn list_all(&self) -> StoreResult<Vec<Palette>>;

    /// Add `user_id` to the upvoter set. `None` when the palette is unknown,
    /// [`StoreError::UnknownUser`] when the user is.
    async fn add_upvote(&self, palette_id: Uuid, user_id: Uuid) -> StoreResult<Option<Palette>>;

    /// Record a save, which is also the user's favorite. `None` when the
    /// palette is unknown, [`StoreError::UnknownUser`] when the user is.
    async fn add_save(&self, palette_id: Uuid, user_id: Uuid) -> StoreResult<Option<Palette>>;
}

/// Tag store
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Insert a tag. Names are not unique.
    async fn create(&self, name: &str) -> StoreResult<Tag>;

    /// Oldest tag carrying `name`.
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Tag>>;

    /// Tags for `ids`, in the order of `ids`; unknown ids are skipped.
    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Tag>>;

    /// Every tag in creation order.
    async fn list(&self) -> StoreResult<Vec<Tag>>;

    /// Link a palette and a tag on both sides. `None` when either is unknown.
    async fn link_palette(&self, tag_id: Uuid, palette_id: Uuid) -> StoreResult<Option<Tag>>;
}

/// Run the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))
}

/// Restore the order of `ids` on records fetched with `= ANY($1)`.
pub(crate) fn order_by_ids<T>(ids: &[Uuid], mut records: Vec<T>, id_of: impl Fn(&T) -> Uuid) -> Vec<T> {
    let mut ordered = Vec::with_capacity(records.len());
    for id in ids {
        if let Some(pos) = records.iter().position(|record| id_of(record) == *id) {
            ordered.push(records.swap_remove(pos));
        }
    }
    ordered
}
