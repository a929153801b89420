//! Shared fixtures: a tiny randomly initialized BERT classifier written in the
//! same on-disk layout as a real checkpoint.

#![allow(dead_code)]

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use candle_transformers::models::bert::Config;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use sentiment_serve::loaders::{ObjectStoreArtifacts, MODEL_FILES};
use sentiment_serve::models::BertForSequenceClassification;
use std::path::Path;
use std::sync::Arc;

pub const BUCKET: &str = "test-models";
pub const PREFIX: &str = "ml-models/tinybert-sentiment-analysis";

const VOCAB: [&str; 12] = [
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "great", "plot", "wonderful", "acting", "boring", "bad",
    "movie", ",",
];

const HIDDEN_SIZE: usize = 8;

fn config_json() -> serde_json::Value {
    serde_json::json!({
        "architectures": ["BertForSequenceClassification"],
        "vocab_size": VOCAB.len(),
        "hidden_size": HIDDEN_SIZE,
        "num_hidden_layers": 1,
        "num_attention_heads": 2,
        "intermediate_size": 16,
        "hidden_act": "gelu",
        "hidden_dropout_prob": 0.1,
        "attention_probs_dropout_prob": 0.1,
        "max_position_embeddings": 512,
        "type_vocab_size": 2,
        "initializer_range": 0.02,
        "layer_norm_eps": 1e-12,
        "pad_token_id": 0,
        "position_embedding_type": "absolute",
        "classifier_dropout": null,
        "model_type": "bert",
        "id2label": {"0": "NEGATIVE", "1": "POSITIVE"},
        "label2id": {"NEGATIVE": 0, "POSITIVE": 1}
    })
}

fn tokenizer_json() -> serde_json::Value {
    let vocab: serde_json::Map<String, serde_json::Value> = VOCAB
        .iter()
        .enumerate()
        .map(|(i, t)| (t.to_string(), serde_json::json!(i)))
        .collect();

    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": {"type": "Lowercase"},
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": {
            "type": "BertProcessing",
            "sep": ["[SEP]", 3],
            "cls": ["[CLS]", 2]
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    })
}

/// Write all six model files into `dir`. `bias` is the classifier bias, which
/// dominates the random weights and so decides the predicted class.
pub fn write_tiny_model(dir: &Path, bias: [f32; 2]) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    let device = Device::Cpu;

    let config_value = config_json();
    let config: Config = serde_json::from_value(config_value.clone())?;

    let mut varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    BertForSequenceClassification::load(vb, &config, HIDDEN_SIZE, 2)?;
    varmap.set_one("classifier.bias", Tensor::new(&bias, &device)?)?;
    varmap.save(dir.join("model.safetensors"))?;

    std::fs::write(
        dir.join("config.json"),
        serde_json::to_string_pretty(&config_value)?,
    )?;
    std::fs::write(
        dir.join("tokenizer.json"),
        serde_json::to_string_pretty(&tokenizer_json())?,
    )?;
    std::fs::write(
        dir.join("special_tokens_map.json"),
        r#"{"cls_token":"[CLS]","mask_token":"[MASK]","pad_token":"[PAD]","sep_token":"[SEP]","unk_token":"[UNK]"}"#,
    )?;
    std::fs::write(
        dir.join("tokenizer_config.json"),
        r#"{"do_lower_case":true,"model_max_length":512,"tokenizer_class":"BertTokenizer"}"#,
    )?;
    std::fs::write(dir.join("vocab.txt"), VOCAB.join("\n"))?;

    Ok(())
}

/// Put `contents` at `key` in `store`.
pub async fn put(store: &InMemory, key: &str, contents: &[u8]) -> anyhow::Result<()> {
    let path = ObjectPath::parse(key)?;
    store.put(&path, PutPayload::from(contents.to_vec())).await?;
    Ok(())
}

/// In-memory bucket holding every file of `model_dir` under [`PREFIX`].
pub async fn bucket_with_model(model_dir: &Path) -> anyhow::Result<ObjectStoreArtifacts> {
    let store = InMemory::new();
    for file in MODEL_FILES {
        let contents = std::fs::read(model_dir.join(file))?;
        put(&store, &format!("{PREFIX}/{file}"), &contents).await?;
    }
    Ok(ObjectStoreArtifacts::new().with_bucket(BUCKET, Arc::new(store)))
}

/// In-memory bucket with a placeholder body for each key in `files`.
pub async fn bucket_with_files(files: &[&str]) -> anyhow::Result<ObjectStoreArtifacts> {
    let store = InMemory::new();
    for file in files {
        put(&store, &format!("{PREFIX}/{file}"), format!("remote {file}").as_bytes()).await?;
    }
    Ok(ObjectStoreArtifacts::new().with_bucket(BUCKET, Arc::new(store)))
}
