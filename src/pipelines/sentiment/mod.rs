//! Sentiment analysis pipeline.
//!
//! Classify text as `Negative` or `Positive` with a confidence score.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sentiment_serve::pipelines::sentiment::{SentimentAnalysisPipeline, SentimentBert};
//! use std::path::Path;
//!
//! # fn main() -> sentiment_serve::error::Result<()> {
//! let device = candle_core::Device::Cpu;
//! let pipeline = SentimentAnalysisPipeline::<SentimentBert>::load(Path::new("./model"), device)?;
//!
//! let output = pipeline.run("great plot, wonderful acting")?;
//! println!(
//!     "sentiment: {} (confidence: {:.2}%)",
//!     output.prediction.label,
//!     output.prediction.confidence_percent()
//! );
//! # Ok(())
//! # }
//! ```

pub(crate) mod model;
pub(crate) mod pipeline;

pub use model::SentimentAnalysisModel;
pub use pipeline::{
    load_tokenizer, ClassificationResult, Output, Sentiment, SentimentAnalysisPipeline,
    SentimentClassifier, MAX_SEQUENCE_LENGTH,
};

/// The BERT sequence classifier. Use as the type parameter of [`SentimentAnalysisPipeline`].
pub type SentimentBert = crate::models::bert::SentimentBertModel;
