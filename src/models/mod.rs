// ============ Model implementations ============

pub mod bert;

pub use bert::{BertForSequenceClassification, SentimentBertModel};
