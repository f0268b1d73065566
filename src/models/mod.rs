//! Core data models for the video storage service.
//!
//! These entities represent vaults, their stored records, the chunk/playlist
//! pair produced by the segment encoder, and the catalog summaries assembled
//! from them. Persistent types map to database tables via `sqlx::FromRow`
//! and serialize naturally as JSON via `serde`.

pub mod chunk;
pub mod playlist;
pub mod record;
pub mod vault;
pub mod video;
pub mod wallet;
