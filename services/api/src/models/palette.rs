//! Palette records and payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TagSummary;

/// The five color values of a palette.
///
/// Values are opaque strings (usually hex codes) and are stored as given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaletteColors {
    pub primary: String,
    pub secondary: String,
    pub accent1: String,
    pub accent2: String,
    pub accent3: String,
}

/// Palette record as held by the palette store
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub colors: PaletteColors,
    /// Owner username, copied at creation time.
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub upvotes: Vec<Uuid>,
    pub saves: Vec<Uuid>,
    pub tags: Vec<Uuid>,
}

/// Palette creation payload after validation
#[derive(Debug, Clone)]
pub struct NewPalette {
    pub title: String,
    pub description: String,
    pub colors: PaletteColors,
}

/// Request body for `POST /palettes`
#[derive(Debug, Clone, Deserialize)]
pub struct AddPaletteRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub colors: PaletteColors,
}

/// Palette as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaletteView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub colors: PaletteColors,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub upvotes: Vec<Uuid>,
    pub upvote_count: usize,
    pub saves: Vec<Uuid>,
    pub save_count: usize,
    pub tags: Vec<TagSummary>,
}

impl PaletteView {
    /// Build the client view, `tags` being the already-resolved summaries
    /// of `palette.tags`.
    pub fn new(palette: Palette, tags: Vec<TagSummary>) -> Self {
        Self {
            id: palette.id,
            title: palette.title,
            description: palette.description,
            colors: palette.colors,
            username: palette.username,
            created_at: palette.created_at,
            upvote_count: palette.upvotes.len(),
            upvotes: palette.upvotes,
            save_count: palette.saves.len(),
            saves: palette.saves,
            tags,
        }
    }
}
