//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::ORIGIN},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::ApiError,
    identity::{Identity, identity_middleware},
    models::{AddPaletteRequest, AddUserRequest, CreateTagRequest, LoginRequest},
    state::AppState,
};

type MaybeIdentity = Option<Extension<Identity>>;
type JsonBody<T> = WithRejection<Json<T>, ApiError>;
type PathParams<T> = WithRejection<Path<T>, ApiError>;
type QueryParams<T> = WithRejection<Query<T>, ApiError>;

fn identity_of(identity: &MaybeIdentity) -> Option<&Identity> {
    identity.as_ref().map(|Extension(identity)| identity)
}

/// Query parameters for palette listing
#[derive(Debug, Deserialize)]
pub struct PalettesQuery {
    pub username: Option<String>,
}

/// Request for a donation checkout
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub tier: String,
}

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/me", get(me))
        .route("/users", post(add_user))
        .route("/users/:username", get(user))
        .route("/login", post(login))
        .route("/palettes", get(palettes).post(add_palette))
        .route("/palettes/:id", get(palette).delete(remove_palette))
        .route("/palettes/:id/upvote", post(add_upvote))
        .route("/palettes/:id/favorite", post(add_fav_palette))
        .route("/palettes/:id/tags/:tag_id", post(link_tag_to_palette))
        .route("/search/palettes", get(search_all_palettes))
        .route("/tags", get(tags).post(create_tag))
        .route("/tags/:name", get(tag))
        .route("/checkout", post(checkout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db_pool {
        Some(pool) => match common::database::health_check(pool).await {
            Ok(true) => "ok",
            _ => "unavailable",
        },
        None => "memory",
    };

    Json(json!({
        "status": "ok",
        "service": "swatchbook-api",
        "database": database,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    identity: MaybeIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.palette_service.me(identity_of(&identity)).await?;
    Ok(Json(profile))
}

pub async fn user(
    State(state): State<AppState>,
    WithRejection(Path(username), _): PathParams<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.palette_service.user(&username).await?))
}

pub async fn palettes(
    State(state): State<AppState>,
    WithRejection(Query(query), _): QueryParams<PalettesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let username = query.username.as_deref().filter(|name| !name.is_empty());
    Ok(Json(state.palette_service.palettes(username).await?))
}

pub async fn palette(
    State(state): State<AppState>,
    WithRejection(Path(id), _): PathParams<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.palette_service.palette(id).await?))
}

pub async fn tag(
    State(state): State<AppState>,
    WithRejection(Path(name), _): PathParams<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.palette_service.tag(&name).await?))
}

pub async fn tags(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.palette_service.tags().await?))
}

pub async fn search_all_palettes(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.palette_service.search_all_palettes().await?))
}

/// Register a new user
pub async fn add_user(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<AddUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.palette_service.add_user(payload).await?;
    Ok((StatusCode::CREATED, Json(auth)))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state
        .palette_service
        .login(&payload.username, &payload.password)
        .await?;
    Ok(Json(auth))
}

pub async fn add_palette(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    WithRejection(Json(payload), _): JsonBody<AddPaletteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let palette = state
        .palette_service
        .add_palette(identity_of(&identity), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(palette)))
}

pub async fn remove_palette(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    WithRejection(Path(id), _): PathParams<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .palette_service
        .remove_palette(identity_of(&identity), id)
        .await?;
    Ok(Json(user))
}

pub async fn add_upvote(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    WithRejection(Path(id), _): PathParams<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let palette = state
        .palette_service
        .add_upvote(identity_of(&identity), id)
        .await?;
    Ok(Json(palette))
}

pub async fn add_fav_palette(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    WithRejection(Path(id), _): PathParams<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let palette = state
        .palette_service
        .add_fav_palette(identity_of(&identity), id)
        .await?;
    Ok(Json(palette))
}

pub async fn create_tag(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): JsonBody<CreateTagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state.palette_service.create_tag(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn link_tag_to_palette(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    WithRejection(Path((id, tag_id)), _): PathParams<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state
        .palette_service
        .link_tag_to_palette(identity_of(&identity), id, tag_id)
        .await?;
    Ok(Json(tag))
}

/// Start a donation checkout; the origin comes from the request when sent
pub async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    WithRejection(Json(payload), _): JsonBody<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let origin = headers
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_else(|| state.payment_client.public_url())
        .to_string();

    let session = state
        .payment_client
        .checkout(&payload.tier, &origin)
        .await?;
    Ok(Json(json!({ "session": session })))
}
