//! Model artifact provisioning.
//!
//! A model artifact is a fixed list of files stored under a key prefix in a
//! bucket. [`ensure_local`] materializes it into a local cache directory,
//! fetching only the files that are not already there.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;

use crate::error::{Result, ServeError};

/// Local cache directory used when none is configured.
pub const DEFAULT_MODEL_DIR: &str = "./model";

/// Key prefix of the sentiment model inside the bucket.
pub const DEFAULT_MODEL_PREFIX: &str = "ml-models/tinybert-sentiment-analysis";

/// Files that make up a usable model: configuration, weights and tokenizer assets.
pub const MODEL_FILES: [&str; 6] = [
    "config.json",
    "model.safetensors",
    "special_tokens_map.json",
    "tokenizer_config.json",
    "tokenizer.json",
    "vocab.txt",
];

/// Capability to move single objects between a bucket and the local filesystem.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Fetch `bucket/key` into `dest`.
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<()>;

    /// Store the local file `src` as `bucket/key`.
    async fn put(&self, bucket: &str, key: &str, src: &Path) -> Result<()>;
}

/// S3 buckets, configured from the standard `AWS_*` environment variables.
///
/// One client is built per bucket and reused for every transfer.
#[derive(Debug, Clone)]
pub struct S3ArtifactStore {
    builder: AmazonS3Builder,
    clients: Arc<Mutex<HashMap<String, Arc<AmazonS3>>>>,
}

impl S3ArtifactStore {
    pub fn from_env() -> Self {
        Self {
            builder: AmazonS3Builder::from_env(),
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn bucket(&self, bucket: &str) -> Result<Arc<AmazonS3>> {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = clients.get(bucket) {
            return Ok(Arc::clone(client));
        }

        let client = self
            .builder
            .clone()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| {
                ServeError::Config(format!("Failed to configure bucket '{bucket}': {e}"))
            })?;
        let client = Arc::new(client);
        clients.insert(bucket.to_string(), Arc::clone(&client));
        Ok(client)
    }

    #[cfg(test)]
    fn client_count(&self) -> usize {
        self.clients.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for S3ArtifactStore {
    fn default() -> Self {
        Self::from_env()
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let store = self.bucket(bucket)?;
        download_to(store.as_ref(), key, dest).await
    }

    async fn put(&self, bucket: &str, key: &str, src: &Path) -> Result<()> {
        let store = self.bucket(bucket)?;
        upload_from(store.as_ref(), key, src).await
    }
}

/// Buckets backed by arbitrary [`ObjectStore`] instances (in-memory, local filesystem, ...).
#[derive(Default, Clone)]
pub struct ObjectStoreArtifacts {
    buckets: HashMap<String, Arc<dyn ObjectStore>>,
}

impl ObjectStoreArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under the bucket name `bucket`.
    pub fn with_bucket(mut self, bucket: &str, store: Arc<dyn ObjectStore>) -> Self {
        self.buckets.insert(bucket.to_string(), store);
        self
    }

    fn bucket(&self, bucket: &str) -> Result<&Arc<dyn ObjectStore>> {
        self.buckets
            .get(bucket)
            .ok_or_else(|| ServeError::Download(format!("Bucket '{bucket}' does not exist")))
    }
}

#[async_trait]
impl ArtifactStore for ObjectStoreArtifacts {
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        download_to(self.bucket(bucket)?.as_ref(), key, dest).await
    }

    async fn put(&self, bucket: &str, key: &str, src: &Path) -> Result<()> {
        upload_from(self.bucket(bucket)?.as_ref(), key, src).await
    }
}

// Streams into a sibling `.part` file and renames on success, so `dest` only
// ever exists once its contents are complete.
async fn download_to(store: &dyn ObjectStore, key: &str, dest: &Path) -> Result<()> {
    let location = ObjectPath::parse(key)?;
    let partial = partial_path(dest);

    let transfer = async {
        let mut stream = store.get(&location).await?.into_stream();
        let mut file = tokio::fs::File::create(&partial).await?;
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok::<_, ServeError>(())
    };

    if let Err(e) = transfer.await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    tokio::fs::rename(&partial, dest).await?;
    Ok(())
}

async fn upload_from(store: &dyn ObjectStore, key: &str, src: &Path) -> Result<()> {
    let location = ObjectPath::parse(key)?;
    let data = tokio::fs::read(src).await?;
    store
        .put(&location, PutPayload::from(Bytes::from(data)))
        .await?;
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// A named set of model files under `bucket/prefix`.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    bucket: String,
    prefix: String,
    files: Vec<String>,
}

impl ModelArtifact {
    /// Fails with [`ServeError::Config`] when no bucket is configured.
    pub fn new(bucket: Option<&str>, prefix: &str, files: &[&str]) -> Result<Self> {
        let bucket = bucket.map(str::trim).unwrap_or_default();
        if bucket.is_empty() {
            return Err(ServeError::Config(
                "BUCKET_NAME is not set; cannot locate the model artifact".into(),
            ));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
        })
    }

    /// The sentiment model at `prefix` with the standard [`MODEL_FILES`].
    pub fn sentiment(bucket: Option<&str>, prefix: &str) -> Result<Self> {
        Self::new(bucket, prefix, &MODEL_FILES)
    }

    /// Object key of `file` inside the bucket.
    pub fn key(&self, file: &str) -> String {
        join_key(&self.prefix, file)
    }

    /// Every required file exists under `dir`. Contents are not checked.
    pub fn is_complete(&self, dir: &Path) -> bool {
        self.files.iter().all(|f| dir.join(f).exists())
    }

    /// Download whatever is missing from `local_dir`, in list order.
    ///
    /// The first failed fetch aborts the whole operation; files fetched before
    /// it stay on disk so a later call resumes from there.
    pub async fn ensure_local(
        &self,
        store: &dyn ArtifactStore,
        local_dir: &Path,
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(local_dir).await?;

        tracing::info!(
            bucket = %self.bucket,
            prefix = %self.prefix,
            dir = %local_dir.display(),
            "Downloading model from object storage"
        );

        for file in &self.files {
            let dest = local_dir.join(file);
            if tokio::fs::try_exists(&dest).await? {
                tracing::info!(file = %file, "File already exists, skipping");
                continue;
            }

            let key = self.key(file);
            tracing::info!(key = %key, "Downloading");
            if let Err(e) = store.fetch(&self.bucket, &key, &dest).await {
                tracing::error!(file = %file, error = %e, "Error downloading model file");
                return Err(ServeError::Download(format!(
                    "Failed to download '{}' from '{}/{}': {}",
                    file, self.bucket, key, e
                )));
            }
            tracing::info!(file = %file, "Successfully downloaded");
        }

        tracing::info!("Model download completed successfully");
        Ok(local_dir.to_path_buf())
    }
}

/// Make sure `local_dir` holds every file in `required_files`, fetching the
/// missing ones from `bucket/prefix`. Returns `local_dir`.
///
/// A missing bucket is reported before any directory or network access.
pub async fn ensure_local(
    store: &dyn ArtifactStore,
    local_dir: &Path,
    bucket: Option<&str>,
    prefix: &str,
    required_files: &[&str],
) -> Result<PathBuf> {
    let artifact = ModelArtifact::new(bucket, prefix, required_files)?;
    artifact.ensure_local(store, local_dir).await
}

/// Upload every file below `source_dir` to `bucket/prefix/<relative path>`.
///
/// Returns the uploaded keys in the order they were written.
pub async fn upload_dir(
    store: &dyn ArtifactStore,
    source_dir: &Path,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<String>> {
    if bucket.trim().is_empty() {
        return Err(ServeError::Config("BUCKET_NAME is not set".into()));
    }

    let mut pending = vec![source_dir.to_path_buf()];
    let mut files = Vec::new();
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();

    let mut keys = Vec::with_capacity(files.len());
    for path in files {
        let relative = path
            .strip_prefix(source_dir)
            .map_err(|e| ServeError::Unexpected(e.to_string()))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let key = join_key(prefix, &relative);

        store.put(bucket, &key, &path).await?;
        tracing::info!(key = %key, "Uploaded");
        keys.push(key);
    }

    Ok(keys)
}
