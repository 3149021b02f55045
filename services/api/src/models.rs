//! API models for records and request/response payloads

pub mod palette;
pub mod tag;
pub mod user;

pub use palette::{AddPaletteRequest, NewPalette, Palette, PaletteColors, PaletteView};
pub use tag::{CreateTagRequest, Tag, TagSummary, TagView};
pub use user::{AddUserRequest, AuthPayload, LoginRequest, NewUser, User, UserProfile, UserSummary};
