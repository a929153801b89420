use crate::error::Result;
use candle_core::{Device, Tensor};
use std::path::Path;

/// A sequence classifier that turns token ids into class scores.
pub trait SentimentAnalysisModel: Send + Sync {
    /// Load weights from `model_dir` onto `device`, ready for inference.
    fn load(model_dir: &Path, device: Device) -> Result<Self>
    where
        Self: Sized;

    /// Raw class scores of shape `(batch, num_labels)`.
    ///
    /// All inputs are `(batch, seq_len)` and must live on [`device`](Self::device).
    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor>;

    fn device(&self) -> &Device;
}
