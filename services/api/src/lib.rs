//! Swatchbook palette service
//!
//! Users register, submit color palettes, upvote, favorite and tag them.
//! The crate exposes the operations through an axum router; storage is
//! PostgreSQL or an in-process store.

pub mod config;
pub mod error;
pub mod identity;
pub mod jwt;
pub mod models;
pub mod password;
pub mod payment;
pub mod repositories;
pub mod routes;
pub mod service;
pub mod state;
pub mod validation;

pub use routes::create_router;
pub use state::AppState;
