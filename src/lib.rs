//! Sentiment predictions from a BERT classifier, served over HTTP.
//!
//! Powered by [Candle](https://github.com/huggingface/candle). On startup the model
//! artifact is provisioned from object storage into a local cache directory,
//! loaded onto the best available device and published to the request handlers.

pub mod config;
pub mod error;
pub mod loaders;
pub mod logging;
pub mod models;
pub mod pipelines;
pub mod server;

pub use error::{Result, ServeError};
pub use pipelines::sentiment;
