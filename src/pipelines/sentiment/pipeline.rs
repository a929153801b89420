use super::model::SentimentAnalysisModel;
use crate::error::{Result, ServeError};
use crate::pipelines::stats::EncoderStats;
use candle_core::{Device, Tensor, D};
use candle_nn::ops::softmax;
use serde::Serialize;
use std::path::Path;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Longest token sequence fed to the model; longer inputs are truncated.
pub const MAX_SEQUENCE_LENGTH: usize = 512;

// ============ Output types ============

/// Human-readable sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sentiment {
    Negative,
    Positive,
    /// A class index outside the two-entry label map.
    Unknown,
}

impl Sentiment {
    /// Fixed mapping `{0: Negative, 1: Positive}`; anything else is [`Sentiment::Unknown`].
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Sentiment::Negative,
            1 => Sentiment::Positive,
            _ => Sentiment::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "Negative",
            Sentiment::Positive => "Positive",
            Sentiment::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sentiment prediction with label and confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// The predicted sentiment.
    pub label: Sentiment,
    /// Index of the predicted class.
    pub class_index: usize,
    /// Probability of the predicted class (0.0 to 1.0).
    pub confidence: f32,
}

impl ClassificationResult {
    /// Confidence as a percentage in `[0, 100]`, rounded to two decimals.
    pub fn confidence_percent(&self) -> f64 {
        let percent = (f64::from(self.confidence) * 100.0).clamp(0.0, 100.0);
        (percent * 100.0).round() / 100.0
    }
}

/// Output from [`SentimentAnalysisPipeline::run`].
#[derive(Debug)]
pub struct Output {
    /// Sentiment prediction.
    pub prediction: ClassificationResult,
    /// Execution statistics.
    pub stats: EncoderStats,
}

// ============ Object-safe entry point ============

/// Anything that can classify a piece of text. Request handlers only see this trait.
pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<ClassificationResult>;
}

// ============ Pipeline ============

/// Tokenizer and classification model bound to one device.
///
/// Construct with [`SentimentAnalysisPipeline::load`] from a directory that holds
/// `tokenizer.json`, `config.json` and `model.safetensors`.
pub struct SentimentAnalysisPipeline<M: SentimentAnalysisModel> {
    pub(crate) model: M,
    pub(crate) tokenizer: Tokenizer,
}

impl<M: SentimentAnalysisModel> SentimentAnalysisPipeline<M> {
    /// Load the tokenizer, then the model, from `model_dir`.
    pub fn load(model_dir: &Path, device: Device) -> Result<Self> {
        tracing::info!("Loading tokenizer...");
        let tokenizer = load_tokenizer(model_dir)?;

        tracing::info!("Loading model...");
        let model = M::load(model_dir, device)?;

        Self::new(model, tokenizer)
    }

    /// Wrap an already loaded model, enabling truncation and padding on the tokenizer.
    pub fn new(model: M, mut tokenizer: Tokenizer) -> Result<Self> {
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| ServeError::Load(format!("Failed to configure truncation: {e}")))?;

        if tokenizer.get_padding().is_none() {
            let pad_token = "[PAD]".to_string();
            let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(0);
            tokenizer.with_padding(Some(PaddingParams {
                strategy: PaddingStrategy::BatchLongest,
                pad_id,
                pad_token,
                ..Default::default()
            }));
        }

        Ok(Self { model, tokenizer })
    }

    /// Classify `text`.
    pub fn run(&self, text: &str) -> Result<Output> {
        let stats_builder = EncoderStats::start();
        let prediction = self.predict(text)?;
        let stats = stats_builder.finish(1);

        tracing::debug!(
            label = %prediction.label,
            confidence = prediction.confidence,
            elapsed_ms = stats.total_time.as_millis() as u64,
            "Classified text"
        );

        Ok(Output { prediction, stats })
    }

    /// Returns the device (CPU/GPU) the model is running on.
    pub fn device(&self) -> &Device {
        self.model.device()
    }

    fn predict(&self, text: &str) -> Result<ClassificationResult> {
        let encoding = self.tokenizer.encode(text, true).map_err(|e| {
            ServeError::Tokenization(format!(
                "Tokenization failed on '{}': {}",
                &text.chars().take(50).collect::<String>(),
                e
            ))
        })?;

        if encoding.get_ids().is_empty() {
            return Err(ServeError::Tokenization(
                "Input produced no tokens".to_string(),
            ));
        }

        let device = self.model.device();
        let input_ids = Tensor::new(encoding.get_ids(), device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), device)?.unsqueeze(0)?;

        let logits = self
            .model
            .forward(&input_ids, &token_type_ids, &attention_mask)?;
        let probs = softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec1::<f32>()?;

        let (class_index, confidence) = argmax(&probs).ok_or_else(|| {
            ServeError::Inference("Model returned no class scores".to_string())
        })?;

        Ok(ClassificationResult {
            label: Sentiment::from_index(class_index),
            class_index,
            confidence,
        })
    }
}

impl<M: SentimentAnalysisModel> SentimentClassifier for SentimentAnalysisPipeline<M> {
    fn classify(&self, text: &str) -> Result<ClassificationResult> {
        self.run(text).map(|output| output.prediction)
    }
}

/// Load `tokenizer.json` from `model_dir`.
pub fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_path = model_dir.join("tokenizer.json");
    Tokenizer::from_file(&tokenizer_path).map_err(|e| {
        ServeError::Load(format!(
            "Failed to load tokenizer from '{}': {}",
            tokenizer_path.display(),
            e
        ))
    })
}

// First maximum wins on ties.
fn argmax(probs: &[f32]) -> Option<(usize, f32)> {
    probs
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
}
