//! WALTUBE: a video storage and streaming service.
//!
//! Videos are split into fixed-duration chunks described by an HLS-like
//! playlist, persisted as records grouped into per-video vaults, discovered
//! through naming-convention catalogs, and played back through a
//! sliding-window prefetch player. Wallet lookups against the hosted
//! identity platform live alongside the storage surface.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
