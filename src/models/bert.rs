use candle_core::{DType, Device, IndexOp, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, ServeError};
use crate::pipelines::sentiment::model::SentimentAnalysisModel;

/// BERT encoder with the pooler and linear head used by `BertForSequenceClassification`
/// checkpoints (`bert.*`, `bert.pooler.dense`, `classifier`).
pub struct BertForSequenceClassification {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
}

impl BertForSequenceClassification {
    pub fn load(
        vb: VarBuilder,
        config: &Config,
        hidden_size: usize,
        num_labels: usize,
    ) -> candle_core::Result<Self> {
        let bert = BertModel::load(vb.pp("bert"), config)?;
        let pooler = linear(hidden_size, hidden_size, vb.pp("bert").pp("pooler").pp("dense"))?;
        let classifier = linear(hidden_size, num_labels, vb.pp("classifier"))?;

        Ok(Self {
            bert,
            pooler,
            classifier,
        })
    }

    /// Class scores of shape `(batch, num_labels)`.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> candle_core::Result<Tensor> {
        let hidden = self.bert.forward(input_ids, token_type_ids, Some(attention_mask))?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        self.classifier.forward(&pooled)
    }
}

/// The sentiment classifier served over HTTP, loaded from a local model directory.
pub struct SentimentBertModel {
    model: BertForSequenceClassification,
    device: Device,
}

impl SentimentBertModel {
    pub fn new(model_dir: &Path, device: Device) -> Result<Self> {
        let (config, head) = load_config(model_dir)?;
        let weights_path = model_dir.join("model.safetensors");

        // Weights are plain tensors, not `Var`s, so the forward pass records no gradient graph.
        let weights = [weights_path.as_path()];
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&weights, DType::F32, &device) }
            .map_err(|e| {
                ServeError::Load(format!(
                    "Failed to load weights from '{}': {e}",
                    weights_path.display()
                ))
            })?;

        let num_labels = head.num_labels();
        let model = BertForSequenceClassification::load(vb, &config, head.hidden_size, num_labels)
            .map_err(|e| ServeError::Load(format!("Failed to build classifier: {e}")))?;

        Ok(Self { model, device })
    }
}

impl SentimentAnalysisModel for SentimentBertModel {
    fn load(model_dir: &Path, device: Device) -> Result<Self> {
        SentimentBertModel::new(model_dir, device)
    }

    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        Ok(self.model.forward(input_ids, token_type_ids, attention_mask)?)
    }

    fn device(&self) -> &Device {
        &self.device
    }
}

#[derive(Deserialize)]
struct ClassifierConfigJson {
    hidden_size: usize,
    #[serde(default)]
    id2label: HashMap<String, String>,
    #[serde(default)]
    num_labels: Option<usize>,
}

impl ClassifierConfigJson {
    fn num_labels(&self) -> usize {
        if !self.id2label.is_empty() {
            self.id2label.len()
        } else {
            self.num_labels.unwrap_or(2)
        }
    }
}

fn load_config(model_dir: &Path) -> Result<(Config, ClassifierConfigJson)> {
    let config_path = model_dir.join("config.json");
    let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
        ServeError::Load(format!(
            "Failed to read model config '{}': {}",
            config_path.display(),
            e
        ))
    })?;

    let config: Config = serde_json::from_str(&config_str)?;
    let head: ClassifierConfigJson = serde_json::from_str(&config_str)?;
    Ok((config, head))
}
