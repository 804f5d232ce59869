//! JSON file backing for the fact store

use async_trait::async_trait;
use sdk::errors::EngineError;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{Memory, MemoryStore};

/// Stores `{"facts": [...]}` in a single pretty-printed JSON file.
///
/// Read-modify-write cycles are serialised by an async mutex, and each write
/// lands in a sibling temp file that is renamed over the target so readers
/// never observe a half-written document.
pub struct FileMemoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileMemoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Memory {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Memory::default(),
            Err(e) => {
                tracing::warn!("Cannot read memory file {}: {}", self.path.display(), e);
                return Memory::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(memory) => memory,
            Err(e) => {
                tracing::warn!(
                    "Memory file {} is not valid JSON, starting empty: {}",
                    self.path.display(),
                    e
                );
                Memory::default()
            }
        }
    }

    async fn write(&self, memory: &Memory) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(memory)
            .map_err(|e| EngineError::Memory(format!("Failed to serialize memory: {}", e)))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            EngineError::Memory(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    async fn load(&self) -> Memory {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn update(&self, fact: &str) -> Result<bool, EngineError> {
        let _guard = self.lock.lock().await;
        let mut memory = self.read().await;

        if !memory.insert(fact) {
            tracing::debug!("Fact already stored: {}", fact);
            return Ok(false);
        }

        self.write(&memory).await?;
        tracing::info!("Stored fact ({} total)", memory.facts.len());
        Ok(true)
    }

    async fn delete(&self, fact: &str) -> Result<bool, EngineError> {
        let _guard = self.lock.lock().await;
        let mut memory = self.read().await;

        if !memory.remove(fact) {
            return Ok(false);
        }

        self.write(&memory).await?;
        tracing::info!("Deleted fact ({} remaining)", memory.facts.len());
        Ok(true)
    }

    async fn clear(&self) -> Result<(), EngineError> {
        let _guard = self.lock.lock().await;
        self.write(&Memory::default()).await?;
        tracing::info!("Cleared all facts");
        Ok(())
    }
}
