//! The shared application state for the API server.

use std::sync::Arc;

use crate::error::Result;
use crate::resource::Registry;
use crate::resources;
use crate::store::Datastore;

/// The shared state accessible by all API handlers.
///
/// The registry is immutable after startup; the datastore carries its own
/// locking. Both are behind `Arc` so the state clones cheaply per request.
#[derive(Clone)]
pub struct AppState {
    /// The validated resource registry driving dispatch and serialization.
    pub registry: Arc<Registry>,
    /// The record store, one table per registered resource.
    pub store: Arc<Datastore>,
}

impl AppState {
    /// Builds the registry and an empty in-memory store.
    ///
    /// Registry validation failures surface here, at startup, rather than on
    /// the first request.
    pub fn new() -> Result<Self> {
        let registry = resources::build_registry()?;
        let store = Datastore::new(&registry.resource_names());
        Ok(Self {
            registry: Arc::new(registry),
            store: Arc::new(store),
        })
    }
}
