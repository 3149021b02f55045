//! Query and mutation operations
//!
//! Every operation is a thin orchestration over the three stores. Those
//! that need an identity resolve it to a stored user before writing.

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    identity::{Identity, require},
    jwt::JwtService,
    models::{
        AddPaletteRequest, AddUserRequest, AuthPayload, NewPalette, NewUser, Palette,
        PaletteView, Tag, TagSummary, TagView, User, UserProfile, UserSummary,
    },
    password::{hash_password, verify_password},
    repositories::{PaletteRepository, TagRepository, UserRepository},
    validation::{validate_registration, validate_title},
};

/// Palette service
#[derive(Clone)]
pub struct PaletteService {
    users: Arc<dyn UserRepository>,
    palettes: Arc<dyn PaletteRepository>,
    tags: Arc<dyn TagRepository>,
    jwt: JwtService,
}

impl PaletteService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        palettes: Arc<dyn PaletteRepository>,
        tags: Arc<dyn TagRepository>,
        jwt: JwtService,
    ) -> Self {
        Self {
            users,
            palettes,
            tags,
            jwt,
        }
    }

    // Expansion helpers

    async fn expand_palettes(&self, palettes: Vec<Palette>) -> ApiResult<Vec<PaletteView>> {
        let mut tag_ids: Vec<Uuid> = Vec::new();
        for id in palettes.iter().flat_map(|p| p.tags.iter()) {
            if !tag_ids.contains(id) {
                tag_ids.push(*id);
            }
        }
        let tags = self.tags.find_many(&tag_ids).await?;

        Ok(palettes
            .into_iter()
            .map(|palette| {
                let summaries = palette
                    .tags
                    .iter()
                    .filter_map(|id| tags.iter().find(|t| t.id == *id).map(TagSummary::from))
                    .collect();
                PaletteView::new(palette, summaries)
            })
            .collect())
    }

    async fn expand_palette(&self, palette: Palette) -> ApiResult<PaletteView> {
        let mut views = self.expand_palettes(vec![palette]).await?;
        views.pop().ok_or(ApiError::InternalServerError)
    }

    async fn profile(&self, user: User) -> ApiResult<UserProfile> {
        let my_palettes = self.palettes.find_many(&user.my_palettes).await?;
        let favorites = self.palettes.find_many(&user.favorites).await?;

        Ok(UserProfile {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            my_palettes: self.expand_palettes(my_palettes).await?,
            favorites: self.expand_palettes(favorites).await?,
        })
    }

    async fn tag_view(&self, tag: Tag) -> ApiResult<TagView> {
        let palettes = self.palettes.find_many(&tag.tagged_palettes).await?;

        Ok(TagView {
            id: tag.id,
            name: tag.name,
            created_at: tag.created_at,
            tagged_palettes: self.expand_palettes(palettes).await?,
        })
    }

    /// The stored user behind a resolved identity. A token that outlives
    /// its user counts as no identity at all.
    async fn acting_user(&self, identity: Option<&Identity>) -> ApiResult<User> {
        let identity = require(identity)?;

        self.users
            .find_by_id(identity.id)
            .await?
            .ok_or(ApiError::Unauthenticated)
    }

    fn auth_payload(&self, user: User) -> ApiResult<AuthPayload> {
        let token = self.jwt.generate_token(&user).map_err(|e| {
            error!("Failed to generate session token: {}", e);
            ApiError::InternalServerError
        })?;

        Ok(AuthPayload {
            token,
            user: user.into(),
        })
    }

    // Queries

    /// The resolved identity's own profile
    pub async fn me(&self, identity: Option<&Identity>) -> ApiResult<UserProfile> {
        let user = self.acting_user(identity).await?;
        self.profile(user).await
    }

    pub async fn user(&self, username: &str) -> ApiResult<Option<UserProfile>> {
        match self.users.find_by_username(username).await? {
            Some(user) => Ok(Some(self.profile(user).await?)),
            None => Ok(None),
        }
    }

    /// All palettes, or one owner's, newest first
    pub async fn palettes(&self, username: Option<&str>) -> ApiResult<Vec<PaletteView>> {
        let palettes = self.palettes.list(username).await?;
        self.expand_palettes(palettes).await
    }

    pub async fn palette(&self, id: Uuid) -> ApiResult<Option<PaletteView>> {
        match self.palettes.find_by_id(id).await? {
            Some(palette) => Ok(Some(self.expand_palette(palette).await?)),
            None => Ok(None),
        }
    }

    pub async fn tag(&self, name: &str) -> ApiResult<Option<TagView>> {
        match self.tags.find_by_name(name).await? {
            Some(tag) => Ok(Some(self.tag_view(tag).await?)),
            None => Ok(None),
        }
    }

    pub async fn tags(&self) -> ApiResult<Vec<TagView>> {
        let mut views = Vec::new();
        for tag in self.tags.list().await? {
            views.push(self.tag_view(tag).await?);
        }
        Ok(views)
    }

    /// Every palette in insertion order
    pub async fn search_all_palettes(&self) -> ApiResult<Vec<PaletteView>> {
        let palettes = self.palettes.list_all().await?;
        self.expand_palettes(palettes).await
    }

    // Mutations

    /// Register a user and sign them in
    pub async fn add_user(&self, request: AddUserRequest) -> ApiResult<AuthPayload> {
        validate_registration(&request).map_err(ApiError::BadRequest)?;

        let password_hash = hash_password(&request.password).map_err(|e| {
            error!("Failed to hash password: {}", e);
            ApiError::InternalServerError
        })?;

        let user = self
            .users
            .create(&NewUser {
                username: request.username,
                email: request.email,
                password_hash,
            })
            .await?;

        info!("Registered user {}", user.username);
        self.auth_payload(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<AuthPayload> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(ApiError::InvalidCredentials);
        }

        self.auth_payload(user)
    }

    pub async fn add_palette(
        &self,
        identity: Option<&Identity>,
        request: AddPaletteRequest,
    ) -> ApiResult<PaletteView> {
        let owner = self.acting_user(identity).await?;
        validate_title(&request.title).map_err(ApiError::BadRequest)?;

        let new_palette = NewPalette {
            title: request.title,
            description: request.description,
            colors: request.colors,
        };
        let palette = self
            .palettes
            .create(owner.id, &owner.username, &new_palette)
            .await?;

        Ok(PaletteView::new(palette, Vec::new()))
    }

    /// Release a palette from the caller's own set.
    ///
    /// The palette record, its upvotes, saves and tag links all remain.
    pub async fn remove_palette(
        &self,
        identity: Option<&Identity>,
        palette_id: Uuid,
    ) -> ApiResult<UserSummary> {
        let user = self.acting_user(identity).await?;

        let user = self
            .users
            .remove_owned_palette(user.id, palette_id)
            .await?
            .ok_or(ApiError::Unauthenticated)?;
        Ok(user.into())
    }

    pub async fn add_upvote(
        &self,
        identity: Option<&Identity>,
        palette_id: Uuid,
    ) -> ApiResult<PaletteView> {
        let user = self.acting_user(identity).await?;

        let palette = self
            .palettes
            .add_upvote(palette_id, user.id)
            .await?
            .ok_or(ApiError::NotFound("Palette"))?;
        self.expand_palette(palette).await
    }

    /// Save a palette; it also becomes one of the caller's favorites
    pub async fn add_fav_palette(
        &self,
        identity: Option<&Identity>,
        palette_id: Uuid,
    ) -> ApiResult<PaletteView> {
        let user = self.acting_user(identity).await?;

        let palette = self
            .palettes
            .add_save(palette_id, user.id)
            .await?
            .ok_or(ApiError::NotFound("Palette"))?;
        self.expand_palette(palette).await
    }

    pub async fn create_tag(&self, name: &str) -> ApiResult<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::BadRequest("Tag name is required".to_string()));
        }

        Ok(self.tags.create(name).await?)
    }

    /// Link a tag and a palette; returns the tag, not the palette
    pub async fn link_tag_to_palette(
        &self,
        identity: Option<&Identity>,
        palette_id: Uuid,
        tag_id: Uuid,
    ) -> ApiResult<Tag> {
        self.acting_user(identity).await?;

        self.tags
            .link_palette(tag_id, palette_id)
            .await?
            .ok_or(ApiError::NotFound("Palette or tag"))
    }
}
