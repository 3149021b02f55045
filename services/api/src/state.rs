//! Application state shared across handlers

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    jwt::JwtService,
    payment::PaymentClient,
    repositories::{MemoryStore, PgPaletteRepository, PgTagRepository, PgUserRepository},
    service::PaletteService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: Option<PgPool>,
    pub jwt_service: JwtService,
    pub palette_service: PaletteService,
    pub payment_client: PaymentClient,
}

impl AppState {
    /// State backed by PostgreSQL repositories
    pub fn postgres(pool: PgPool, jwt_service: JwtService, payment_client: PaymentClient) -> Self {
        let palette_service = PaletteService::new(
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgPaletteRepository::new(pool.clone())),
            Arc::new(PgTagRepository::new(pool.clone())),
            jwt_service.clone(),
        );

        Self {
            db_pool: Some(pool),
            jwt_service,
            palette_service,
            payment_client,
        }
    }

    /// State backed by a fresh in-process store
    pub fn memory(jwt_service: JwtService, payment_client: PaymentClient) -> Self {
        let store = Arc::new(MemoryStore::new());
        let palette_service = PaletteService::new(
            store.clone(),
            store.clone(),
            store,
            jwt_service.clone(),
        );

        Self {
            db_pool: None,
            jwt_service,
            palette_service,
            payment_client,
        }
    }
}
