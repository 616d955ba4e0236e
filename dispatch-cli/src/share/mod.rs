//! Network file share access for the partner workbooks

mod local;
mod webdav;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use local::LocalShare;
pub use webdav::WebDavShare;

/// Metadata reported by the share for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileStat {
    pub modified: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait FileShare: Send + Sync {
    async fn stat(&self, path: &str) -> Result<FileStat>;

    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}
