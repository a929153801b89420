use std::sync::Arc;

use super::state::AppState;
use crate::config::ServeArgs;
use crate::error::{Result, ServeError};
use crate::loaders::{ArtifactStore, ModelArtifact};
use crate::pipelines::sentiment::{
    SentimentAnalysisModel, SentimentAnalysisPipeline, SentimentBert,
};
use crate::pipelines::utils::device_label;

/// The loaded engine, scoped to the lifetime of the server.
///
/// Dropping the value is the shutdown phase; it runs on every exit path,
/// including a startup that failed after the device was selected.
pub struct Lifespan {
    state: AppState,
}

impl Lifespan {
    /// Run the startup sequence with the BERT sentiment classifier.
    pub async fn startup(settings: &ServeArgs, store: &dyn ArtifactStore) -> Result<Self> {
        Self::startup_with::<SentimentBert>(settings, store).await
    }

    /// Select the device, provision the artifact, load tokenizer and model, then publish.
    ///
    /// Any error aborts startup; the returned state is never published in that case.
    pub async fn startup_with<M>(settings: &ServeArgs, store: &dyn ArtifactStore) -> Result<Self>
    where
        M: SentimentAnalysisModel + 'static,
    {
        let device = settings.device.resolve()?;
        let lifespan = Lifespan {
            state: AppState::new(device_label(&device)),
        };

        if let Err(e) = lifespan.load::<M>(settings, store, device).await {
            tracing::error!(error = %e, "Error loading model");
            return Err(e);
        }

        tracing::info!(device = %lifespan.state.device(), "Model loaded successfully");
        Ok(lifespan)
    }

    async fn load<M>(
        &self,
        settings: &ServeArgs,
        store: &dyn ArtifactStore,
        device: candle_core::Device,
    ) -> Result<()>
    where
        M: SentimentAnalysisModel + 'static,
    {
        let artifact =
            ModelArtifact::sentiment(settings.bucket_name.as_deref(), &settings.model_prefix)?;

        tracing::info!("Starting model download from object storage...");
        let model_dir = artifact.ensure_local(store, &settings.model_dir).await?;

        let pipeline = tokio::task::spawn_blocking(move || {
            SentimentAnalysisPipeline::<M>::load(&model_dir, device)
        })
        .await
        .map_err(|e| ServeError::Load(format!("Model loading task failed: {e}")))??;

        self.state.publish(Arc::new(pipeline))
    }

    /// Handle for request handlers.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }
}

impl Drop for Lifespan {
    fn drop(&mut self) {
        if self.state.is_ready() {
            tracing::info!("Shutting down...");
        } else {
            tracing::info!("Releasing partially initialized serving state");
        }
    }
}
