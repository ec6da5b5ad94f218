//! User settings stored as JSON in the platform config directory.

use crate::downscale::DownscaleOptions;
use crate::error::{PosterError, Result};
use crate::gallery::FileStorage;
use crate::poster::DEFAULT_BRAND;
use crate::video::PollPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "poster-studio";

/// Persistent settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// API key; `GOOGLE_API_KEY` in the environment takes precedence.
    pub api_key: Option<String>,
    /// Brand text placed on every poster.
    pub brand_name: String,
    /// Image model identifier.
    pub image_model: String,
    /// Video model identifier.
    pub video_model: String,
    /// Directory for the gallery; defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Seconds between video status checks.
    pub poll_interval_secs: u64,
    /// Status checks before a video job is abandoned.
    pub poll_max_attempts: u32,
    /// Overall video deadline in seconds.
    pub poll_timeout_secs: u64,
    /// Width cap for gallery thumbnails.
    pub thumbnail_max_width: u32,
    /// JPEG quality for gallery thumbnails, 1-100.
    pub thumbnail_quality: u8,
    /// Size cap for the serialized gallery, `None` for unlimited.
    pub gallery_quota_bytes: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            brand_name: DEFAULT_BRAND.to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            video_model: "veo-3.1-fast-generate-preview".to_string(),
            data_dir: None,
            poll_interval_secs: 10,
            poll_max_attempts: 60,
            poll_timeout_secs: 600,
            thumbnail_max_width: 800,
            thumbnail_quality: 70,
            gallery_quota_bytes: Some(5 * 1024 * 1024),
        }
    }
}

impl Settings {
    /// Loads settings from the default location, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Loads settings from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            if !key.trim().is_empty() {
                settings.api_key = Some(key);
            }
        }
        Ok(settings)
    }

    /// Writes settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `<config dir>/poster-studio/config.json`.
    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| PosterError::InvalidRequest("no config directory found".into()))?;
        Ok(base.join(APP_DIR).join("config.json"))
    }

    /// Directory holding the gallery.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir()
            .ok_or_else(|| PosterError::InvalidRequest("no data directory found".into()))?;
        Ok(base.join(APP_DIR))
    }

    /// File-backed gallery storage with the configured quota.
    pub fn gallery_storage(&self) -> Result<FileStorage> {
        Ok(FileStorage::new(self.resolved_data_dir()?).with_quota(self.gallery_quota_bytes))
    }

    /// Polling limits for video jobs.
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            max_attempts: self.poll_max_attempts.max(1),
            timeout: Duration::from_secs(self.poll_timeout_secs),
        }
    }

    /// Thumbnail parameters for gallery saves.
    pub fn downscale_options(&self) -> DownscaleOptions {
        DownscaleOptions {
            max_width: self.thumbnail_max_width.max(1),
            quality: self.thumbnail_quality.clamp(1, 100),
        }
    }
}
