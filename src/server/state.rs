use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::error::{Result, ServeError};
use crate::pipelines::sentiment::SentimentClassifier;

/// Shared handle given to every request handler.
///
/// The engine slot is written at most once. Before that, the state reports
/// not ready; afterwards the engine is immutable for the life of the process.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<ServingState>,
}

struct ServingState {
    device: String,
    container_id: String,
    engine: OnceCell<Arc<dyn SentimentClassifier>>,
}

impl AppState {
    /// Empty state bound to the device labelled `device`.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ServingState {
                device: device.into(),
                container_id: container_id(),
                engine: OnceCell::new(),
            }),
        }
    }

    /// Make `engine` visible to request handlers.
    pub fn publish(&self, engine: Arc<dyn SentimentClassifier>) -> Result<()> {
        self.inner
            .engine
            .set(engine)
            .map_err(|_| ServeError::AlreadyLoaded)
    }

    pub fn engine(&self) -> Option<Arc<dyn SentimentClassifier>> {
        self.inner.engine.get().cloned()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.engine.get().is_some()
    }

    pub fn device(&self) -> &str {
        &self.inner.device
    }

    /// Identifier of the host serving requests.
    pub fn container_id(&self) -> &str {
        &self.inner.container_id
    }
}

fn container_id() -> String {
    match hostname::get() {
        Ok(name) if !name.is_empty() => name.to_string_lossy().into_owned(),
        Ok(_) => "unknown".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read hostname");
            "unknown".to_string()
        }
    }
}
