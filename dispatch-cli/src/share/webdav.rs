//! WebDAV access to the branch NAS

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};

use super::{FileShare, FileStat};

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:"><d:prop><d:getlastmodified/></d:prop></d:propfind>"#;

#[derive(Debug, Clone)]
pub struct WebDavShare {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl WebDavShare {
    pub fn new(base_url: &str, username: &str, password: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build WebDAV client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        file_url(&self.base_url, path)
    }
}

/// Join a share path onto the base URL, percent-encoding each segment
fn file_url(base_url: &str, path: &str) -> String {
    let encoded: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect();
    format!("{}/{}", base_url.trim_end_matches('/'), encoded.join("/"))
}

/// Pull `getlastmodified` out of a PROPFIND multistatus body
fn parse_last_modified(xml: &str) -> Result<Option<DateTime<Utc>>> {
    let doc = roxmltree::Document::parse(xml).context("Invalid PROPFIND response")?;
    let Some(text) = doc
        .descendants()
        .find(|n| n.has_tag_name(("DAV:", "getlastmodified")))
        .and_then(|n| n.text())
    else {
        return Ok(None);
    };

    let parsed = DateTime::parse_from_rfc2822(text.trim())
        .with_context(|| format!("Invalid getlastmodified value: {}", text))?;
    Ok(Some(parsed.with_timezone(&Utc)))
}

#[async_trait]
impl FileShare for WebDavShare {
    async fn stat(&self, path: &str) -> Result<FileStat> {
        let url = self.url_for(path);
        let method = Method::from_bytes(b"PROPFIND").context("Invalid PROPFIND method")?;

        let response = self
            .client
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Depth", "0")
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(PROPFIND_BODY)
            .send()
            .await
            .with_context(|| format!("PROPFIND request failed: {}", path))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            bail!("File not found on share: {}", path);
        }
        if !status.is_success() {
            bail!("PROPFIND {} returned {}", path, status);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read PROPFIND response: {}", path))?;
        let modified = parse_last_modified(&body)?;
        if modified.is_none() {
            log::warn!("Share reported no modification time for {}", path);
        }

        Ok(FileStat { modified })
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url_for(path);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .with_context(|| format!("Download request failed: {}", path))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Download of {} returned {}", path, status);
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read file contents: {}", path))?;
        log::debug!("Fetched {} ({} bytes)", path, bytes.len());
        Ok(bytes.to_vec())
    }
}
