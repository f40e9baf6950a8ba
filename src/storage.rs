use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

/// Key/value string storage scoped to one client profile.
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()>;
    async fn remove_item(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<RwLock<HashMap<String, String>>>,
}

#[async_trait]
impl LocalStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

/// Local storage persisted as a single JSON object on disk.
///
/// A missing file reads as empty. Every write rewrites the whole file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load(&self) -> anyhow::Result<HashMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parse storage file {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => {
                Err(e).with_context(|| format!("read storage file {}", self.path.display()))
            }
        }
    }

    async fn store(&self, items: &HashMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context("create storage directory")?;
        }
        let body = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(&self.path, body)
            .await
            .with_context(|| format!("write storage file {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl LocalStorage for FileStorage {
    async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        items.insert(key.to_string(), value.to_string());
        self.store(&items).await
    }

    async fn remove_item(&self, key: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        if items.remove(key).is_some() {
            self.store(&items).await?;
        }
        Ok(())
    }
}
