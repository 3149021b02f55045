//! In-process store for development and tests
//!
//! One lock guards users, palettes and tags together, so every write that
//! touches both sides of a relation happens atomically.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{PaletteRepository, StoreError, StoreResult, TagRepository, UserRepository};
use crate::models::{NewPalette, NewUser, Palette, Tag, User};

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<User>,
    palettes: Vec<Palette>,
    tags: Vec<Tag>,
}

impl MemoryState {
    fn ensure_user(&self, id: Uuid) -> StoreResult<()> {
        if self.users.iter().any(|u| u.id == id) {
            Ok(())
        } else {
            Err(StoreError::UnknownUser)
        }
    }

    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn palette_mut(&mut self, id: Uuid) -> Option<&mut Palette> {
        self.palettes.iter_mut().find(|p| p.id == id)
    }

    fn tag_mut(&mut self, id: Uuid) -> Option<&mut Tag> {
        self.tags.iter_mut().find(|t| t.id == id)
    }
}

/// Add `id` to `set` unless it is already a member.
fn insert_unique(set: &mut Vec<Uuid>, id: Uuid) {
    if !set.contains(&id) {
        set.push(id);
    }
}

/// Memory-backed implementation of every store trait
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, new_user: &NewUser) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if state.users.iter().any(|u| u.username == new_user.username) {
            return Err(StoreError::Conflict {
                field: "username".to_string(),
            });
        }
        if state.users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict {
                field: "email".to_string(),
            });
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            created_at: Utc::now(),
            my_palettes: Vec::new(),
            favorites: Vec::new(),
        };
        state.users.push(user.clone());

        info!("Created user {} in memory store", user.username);
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn remove_owned_palette(
        &self,
        user_id: Uuid,
        palette_id: Uuid,
    ) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;
        Ok(state.user_mut(user_id).map(|user| {
            user.my_palettes.retain(|id| *id != palette_id);
            user.clone()
        }))
    }
}

#[async_trait]
impl PaletteRepository for MemoryStore {
    async fn create(
        &self,
        owner_id: Uuid,
        owner_username: &str,
        new_palette: &NewPalette,
    ) -> StoreResult<Palette> {
        let mut state = self.state.write().await;
        state.ensure_user(owner_id)?;

        let palette = Palette {
            id: Uuid::new_v4(),
            title: new_palette.title.clone(),
            description: new_palette.description.clone(),
            colors: new_palette.colors.clone(),
            username: owner_username.to_string(),
            created_at: Utc::now(),
            upvotes: Vec::new(),
            saves: Vec::new(),
            tags: Vec::new(),
        };

        state.palettes.push(palette.clone());
        if let Some(owner) = state.user_mut(owner_id) {
            insert_unique(&mut owner.my_palettes, palette.id);
        }

        Ok(palette)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Palette>> {
        let state = self.state.read().await;
        Ok(state.palettes.iter().find(|p| p.id == id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Palette>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.palettes.iter().find(|p| p.id == *id).cloned())
            .collect())
    }

    async fn list(&self, username: Option<&str>) -> StoreResult<Vec<Palette>> {
        let state = self.state.read().await;

        // Newest insertions first, so equal timestamps keep reverse insertion order.
        let mut palettes: Vec<Palette> = state
            .palettes
            .iter()
            .rev()
            .filter(|p| username.is_none_or(|name| p.username == name))
            .cloned()
            .collect();
        palettes.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(palettes)
    }

    async fn list_all(&self) -> StoreResult<Vec<Palette>> {
        let state = self.state.read().await;
        Ok(state.palettes.clone())
    }

    async fn add_upvote(&self, palette_id: Uuid, user_id: Uuid) -> StoreResult<Option<Palette>> {
        let mut state = self.state.write().await;
        state.ensure_user(user_id)?;
        Ok(state.palette_mut(palette_id).map(|palette| {
            insert_unique(&mut palette.upvotes, user_id);
            palette.clone()
        }))
    }

    async fn add_save(&self, palette_id: Uuid, user_id: Uuid) -> StoreResult<Option<Palette>> {
        let mut state = self.state.write().await;
        state.ensure_user(user_id)?;

        let Some(palette) = state.palette_mut(palette_id) else {
            return Ok(None);
        };
        insert_unique(&mut palette.saves, user_id);
        let palette = palette.clone();

        if let Some(user) = state.user_mut(user_id) {
            insert_unique(&mut user.favorites, palette_id);
        }

        Ok(Some(palette))
    }
}

#[async_trait]
impl TagRepository for MemoryStore {
    async fn create(&self, name: &str) -> StoreResult<Tag> {
        let mut state = self.state.write().await;

        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
            tagged_palettes: Vec::new(),
        };
        state.tags.push(tag.clone());

        Ok(tag)
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        let state = self.state.read().await;
        Ok(state.tags.iter().find(|t| t.name == name).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<Tag>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.tags.iter().find(|t| t.id == *id).cloned())
            .collect())
    }

    async fn list(&self) -> StoreResult<Vec<Tag>> {
        let state = self.state.read().await;
        Ok(state.tags.clone())
    }

    async fn link_palette(&self, tag_id: Uuid, palette_id: Uuid) -> StoreResult<Option<Tag>> {
        let mut state = self.state.write().await;

        let palette_known = state.palettes.iter().any(|p| p.id == palette_id);
        let tag_known = state.tags.iter().any(|t| t.id == tag_id);
        if !palette_known || !tag_known {
            return Ok(None);
        }

        if let Some(palette) = state.palette_mut(palette_id) {
            insert_unique(&mut palette.tags, tag_id);
        }
        Ok(state.tag_mut(tag_id).map(|tag| {
            insert_unique(&mut tag.tagged_palettes, palette_id);
            tag.clone()
        }))
    }
}
