//! Shared router state: the clients constructed once at process start.

use crate::services::{catalog::CatalogReader, identity::IdentityClient, vault_store::VaultStore};

/// Carried by every route handler via `State` extraction. No handler builds
/// its own backend client; reconnection is the connect route's explicit ping
/// against this shared store.
#[derive(Clone)]
pub struct AppState {
    pub store: VaultStore,
    pub catalog: CatalogReader,
    pub identity: IdentityClient,
    pub storage_api_key: String,
}

impl AppState {
    pub fn new(store: VaultStore, identity: IdentityClient, storage_api_key: String) -> Self {
        Self {
            catalog: CatalogReader::new(store.clone()),
            store,
            identity,
            storage_api_key,
        }
    }
}
