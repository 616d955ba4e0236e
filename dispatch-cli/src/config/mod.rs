//! Configuration: `config.toml` plus environment overrides

pub mod database;
pub mod repository;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::share::{FileShare, LocalShare, WebDavShare};

const APP_DIR: &str = "dispatch-board";
const DEFAULT_TIMEZONE: &str = "Asia/Seoul";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding snapshots and settings
    pub database_path: PathBuf,
    /// IANA zone used to decide "today" for sheet years
    pub timezone: String,
    pub share: ShareConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ShareConfig {
    Webdav {
        url: String,
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    Local {
        root: PathBuf,
    },
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ShareConfig {
    fn default() -> Self {
        ShareConfig::Webdav {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: data_dir().join("dispatch.db"),
            timezone: DEFAULT_TIMEZONE.to_string(),
            share: ShareConfig::default(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default location of `config.toml`
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl Config {
    /// Load from `path` (or the default location) and apply environment overrides
    ///
    /// A missing file at the default location yields defaults; a missing file
    /// that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    log::debug!("No config at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// `DISPATCH_DATABASE`, and `NAS_URL` / `NAS_USER` / `NAS_PW` for a WebDAV share
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(db) = var("DISPATCH_DATABASE") {
            self.database_path = PathBuf::from(db);
        }
        if let Some(tz) = var("DISPATCH_TIMEZONE") {
            self.timezone = tz;
        }

        if let ShareConfig::Webdav {
            url,
            username,
            password,
            ..
        } = &mut self.share
        {
            if let Some(v) = var("NAS_URL") {
                *url = v;
            }
            if let Some(v) = var("NAS_USER") {
                *username = v;
            }
            if let Some(v) = var("NAS_PW") {
                *password = v;
            }
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid timezone '{}': {}", self.timezone, e))
    }

    /// Build the configured file share client
    pub fn file_share(&self) -> Result<Box<dyn FileShare>> {
        match &self.share {
            ShareConfig::Webdav {
                url,
                username,
                password,
                timeout_secs,
            } => {
                if url.is_empty() {
                    bail!("No WebDAV URL configured (set share.url or NAS_URL)");
                }
                Ok(Box::new(WebDavShare::new(
                    url,
                    username,
                    password,
                    Duration::from_secs(*timeout_secs),
                )?))
            }
            ShareConfig::Local { root } => Ok(Box::new(LocalShare::new(root.clone()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_webdav_config() {
        let config = Config::from_toml(
            r#"
            database_path = "/var/lib/dispatch/dispatch.db"

            [share]
            kind = "webdav"
            url = "https://nas.local/webdav"
            username = "board"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/dispatch/dispatch.db"));
        assert_eq!(config.timezone, "Asia/Seoul");
        assert_eq!(
            config.share,
            ShareConfig::Webdav {
                url: "https://nas.local/webdav".to_string(),
                username: "board".to_string(),
                password: String::new(),
                timeout_secs: 60,
            }
        );
        assert_eq!(config.timezone().unwrap(), chrono_tz::Asia::Seoul);
    }

    #[test]
    fn test_parse_local_config() {
        let config = Config::from_toml(
            r#"
            timezone = "UTC"
            [share]
            kind = "local"
            root = "/srv/nas"
            "#,
        )
        .unwrap();
        assert_eq!(config.share, ShareConfig::Local { root: PathBuf::from("/srv/nas") });
        assert!(config.file_share().is_ok());
    }

    #[test]
    fn test_env_overrides_webdav_credentials() {
        let env: HashMap<&str, &str> = [
            ("NAS_URL", "https://override/dav"),
            ("NAS_PW", "secret"),
            ("DISPATCH_DATABASE", "/tmp/board.db"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path, PathBuf::from("/tmp/board.db"));
        match &config.share {
            ShareConfig::Webdav { url, password, .. } => {
                assert_eq!(url, "https://override/dav");
                assert_eq!(password, "secret");
            }
            other => panic!("unexpected share config: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_timezone_and_missing_url() {
        let config = Config {
            timezone: "Mars/Olympus".to_string(),
            ..Config::default()
        };
        assert!(config.timezone().is_err());
        assert!(config.file_share().is_err());
    }
}
