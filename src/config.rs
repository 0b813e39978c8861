use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::archive::DEFAULT_TTL_SECS;
use crate::provider::NavigationRule;
use crate::xkcd::XKCD_ERROR_PAGE;

/// User preferences plus the bit of state worth keeping between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache_ttl_secs: u64,
    /// Ids that prev/next step over.
    pub skip_ids: Vec<u64>,
    pub max_redirects: u32,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub reopen_last_comic: bool,
    pub last_comic: Option<String>,
    pub last_read_at: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_TTL_SECS,
            skip_ids: vec![XKCD_ERROR_PAGE],
            max_redirects: 2,
            request_timeout_secs: 60,
            user_agent: format!("comic-viewer/{}", env!("CARGO_PKG_VERSION")),
            reopen_last_comic: false,
            last_comic: None,
            last_read_at: None,
        }
    }
}

impl Settings {
    /// Read `path`, falling back to defaults when it is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Settings::default();
        }

        match fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
        {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring unreadable settings {}: {}", path.display(), e);
                Settings::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn navigation(&self) -> NavigationRule {
        NavigationRule::new(self.skip_ids.iter().copied())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn record_last_read(&mut self, id: &str) {
        self.last_comic = Some(id.to_string());
        self.last_read_at = Some(Utc::now());
    }
}

/// Where settings and bookmarks live on disk.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// `override_dir` wins; otherwise `~/.comic_viewer`.
    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match override_dir {
            Some(dir) => dir,
            None => Self::get_app_data_dir()?,
        };
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)
                .with_context(|| format!("creating {}", data_dir.display()))?;
        }
        Ok(Self { data_dir })
    }

    fn get_app_data_dir() -> Result<PathBuf> {
        let home_dir =
            dirs_next::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home_dir.join(".comic_viewer"))
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join("bookmarks.db")
    }
}
