//! Directory-backed share for development and tests

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{FileShare, FileStat};

#[derive(Debug, Clone)]
pub struct LocalShare {
    root: PathBuf,
}

impl LocalShare {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Share paths are rooted at `root`; `..` may not climb out of it
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!("Path escapes share root: {}", path);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileShare for LocalShare {
    async fn stat(&self, path: &str) -> Result<FileStat> {
        let full = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&full)
            .await
            .with_context(|| format!("Failed to stat {}", full.display()))?;

        Ok(FileStat {
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .with_context(|| format!("Failed to read {}", full.display()))
    }
}
