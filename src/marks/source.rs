use crate::error::{Result, WordcastError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Name of the speech-mark resource for chunk `index`.
pub fn chunk_marks_name(index: usize) -> String {
    format!("chunk_{:04}_marks.json", index)
}

/// Name of the audio resource for chunk `index`.
pub fn chunk_audio_name(index: usize, extension: &str) -> String {
    format!("chunk_{:04}.{}", index, extension)
}

/// Somewhere static assets can be read from.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch a text resource by name.
    async fn fetch_text(&self, name: &str) -> Result<String>;

    /// Address the audio output should open for `name`.
    fn locate(&self, name: &str) -> String;

    /// Path on disk, when the asset is local.
    fn local_path(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}

/// Assets in a directory on disk.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetSource for DirSource {
    async fn fetch_text(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        debug!("Reading {:?}", path);
        fs::read_to_string(&path)
            .await
            .map_err(|e| WordcastError::load(path.display().to_string(), e.to_string()))
    }

    fn locate(&self, name: &str) -> String {
        self.root.join(name).display().to_string()
    }

    fn local_path(&self, name: &str) -> Option<PathBuf> {
        Some(self.root.join(name))
    }
}

/// Assets served over HTTP under a base URL.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AssetSource for HttpSource {
    async fn fetch_text(&self, name: &str) -> Result<String> {
        let url = self.locate(name);
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WordcastError::load(url.clone(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WordcastError::load(url, format!("HTTP {}", status)));
        }

        Ok(response.text().await?)
    }

    fn locate(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

/// Assets held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.insert(name, contents);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(name.into(), contents.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.files.remove(name)
    }
}

#[async_trait]
impl AssetSource for MemorySource {
    async fn fetch_text(&self, name: &str) -> Result<String> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| WordcastError::load(name, "not found"))
    }

    fn locate(&self, name: &str) -> String {
        format!("memory:{}", name)
    }
}
