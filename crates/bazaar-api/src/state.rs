use std::sync::Arc;

use bazaar_store::{MemoryCollection, MemoryStore};

use crate::error::ApiError;
use crate::notify::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    pub fn new(store: MemoryStore, notifier: Notifier) -> Self {
        Self {
            store: Arc::new(store),
            notifier: Arc::new(notifier),
        }
    }

    pub fn collection(&self, name: &str) -> Arc<MemoryCollection> {
        self.store.collection(name)
    }
}

/// Run synchronous store work off the async executor.
pub async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}
