//! Persisted gallery of saved posters.
//!
//! The gallery lives in memory and is mirrored to a single string-keyed slot
//! of a [`Storage`] backend after every mutation. A failed write leaves the
//! in-memory list untouched and is reported to the caller.

use crate::downscale::{downscale_data_uri, DownscaleOptions};
use crate::error::{PosterError, Result, StorageError};
use crate::poster::{url_digest, GeneratedPoster, SavedItem};
use crate::upload::DataUri;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Storage slot holding the serialized gallery.
pub const GALLERY_KEY: &str = "poster_studio_gallery_v3";

/// Durable string-keyed storage.
pub trait Storage: Send + Sync {
    /// Reads the value under `key`, `None` when absent.
    fn read(&self, key: &str) -> std::result::Result<Option<String>, StorageError>;

    /// Replaces the value under `key`.
    fn write(&self, key: &str, value: &str) -> std::result::Result<(), StorageError>;
}

fn check_quota(quota: Option<usize>, needed: usize) -> std::result::Result<(), StorageError> {
    match quota {
        Some(quota) if needed > quota => Err(StorageError::QuotaExceeded { needed, quota }),
        _ => Ok(()),
    }
}

/// In-process storage with an optional byte quota per value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    /// Creates an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects writes larger than `bytes`.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    /// Pre-populates a slot.
    pub fn with_value(self, key: &str, value: impl Into<String>) -> Self {
        self.lock().insert(key.to_string(), value.into());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        check_quota(self.quota_bytes, value.len())?;
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileStorage {
    /// Stores slots under `dir`, creating it on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota_bytes: None,
        }
    }

    /// Rejects writes larger than `bytes`.
    pub fn with_quota(mut self, bytes: Option<usize>) -> Self {
        self.quota_bytes = bytes;
        self
    }

    /// Path backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        check_quota(self.quota_bytes, value.len())?;
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Result of [`GalleryStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new item was inserted under this id.
    Saved(String),
    /// The artifact was already in the gallery under this id.
    AlreadySaved(String),
}

impl SaveOutcome {
    /// The id of the gallery entry.
    pub fn id(&self) -> &str {
        match self {
            Self::Saved(id) | Self::AlreadySaved(id) => id,
        }
    }
}

/// The user's saved posters, newest first.
pub struct GalleryStore<S: Storage> {
    storage: S,
    items: Vec<SavedItem>,
}

impl<S: Storage> GalleryStore<S> {
    /// Loads the gallery from `storage`.
    ///
    /// Missing, unreadable or malformed data yields an empty gallery; the
    /// problem is logged and never returned.
    pub fn load(storage: S) -> Self {
        let items = match storage.read(GALLERY_KEY) {
            Ok(Some(text)) => parse_items(&text),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read gallery, starting empty");
                Vec::new()
            }
        };
        tracing::debug!(count = items.len(), "gallery loaded");
        Self { storage, items }
    }

    /// Saved items, newest first.
    pub fn items(&self) -> &[SavedItem] {
        &self.items
    }

    /// Number of saved items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when nothing is saved.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks an item up by id.
    pub fn get(&self, id: &str) -> Option<&SavedItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Finds the entry saved from the artifact at `url`.
    pub fn find_source(&self, url: &str) -> Option<&SavedItem> {
        let digest = url_digest(url);
        self.items
            .iter()
            .find(|item| item.source_digest == digest || item.url == url)
    }

    /// Returns true when the artifact at `url` has been saved.
    pub fn contains_source(&self, url: &str) -> bool {
        self.find_source(url).is_some()
    }

    /// Downscales `poster` and inserts it at the front.
    ///
    /// An artifact whose URL was saved before is not inserted again. When the
    /// write-back fails the new item stays in memory and the error is returned.
    pub fn save(
        &mut self,
        poster: &GeneratedPoster,
        options: &DownscaleOptions,
    ) -> Result<SaveOutcome> {
        if let Some(existing) = self.find_source(&poster.url) {
            return Ok(SaveOutcome::AlreadySaved(existing.id.clone()));
        }

        let source = DataUri::parse(&poster.url)?;
        let thumbnail = downscale_data_uri(&source, options)?;

        let now = chrono::Utc::now().timestamp_millis();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("item-{now}-{}", &suffix[..8]);
        let item = SavedItem {
            id: id.clone(),
            timestamp: now,
            url: thumbnail.to_string(),
            video_url: poster.video_url.clone(),
            prompt: poster.prompt.clone(),
            source_digest: poster.digest(),
        };
        self.items.insert(0, item);
        tracing::info!(id = %id, count = self.items.len(), "poster saved to gallery");

        self.persist()?;
        Ok(SaveOutcome::Saved(id))
    }

    /// Removes an item, returning it if it existed.
    pub fn remove(&mut self, id: &str) -> Result<Option<SavedItem>> {
        let Some(pos) = self.items.iter().position(|item| item.id == id) else {
            return Ok(None);
        };
        let removed = self.items.remove(pos);
        self.persist()?;
        Ok(Some(removed))
    }

    /// Removes every item.
    pub fn clear(&mut self) -> Result<()> {
        self.items.clear();
        self.persist()
    }

    /// Writes the current list back to storage.
    pub fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.items)?;
        self.storage.write(GALLERY_KEY, &json).map_err(|e| {
            tracing::warn!(error = %e, count = self.items.len(), "gallery write failed");
            PosterError::Storage(e)
        })
    }

    /// The backing storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

fn parse_items(text: &str) -> Vec<SavedItem> {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "discarding malformed gallery data");
            return Vec::new();
        }
    };
    let serde_json::Value::Array(entries) = value else {
        tracing::warn!("discarding gallery data that is not an array");
        return Vec::new();
    };
    let total = entries.len();
    let items: Vec<SavedItem> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();
    if items.len() < total {
        tracing::warn!(dropped = total - items.len(), "skipped malformed gallery entries");
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat as CodecFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_url(width: u32, height: u32, shade: u8) -> String {
        let img = RgbImage::from_pixel(width, height, Rgb([shade, 100, 200]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), CodecFormat::Png)
            .unwrap();
        DataUri::from_bytes(&bytes, "image/png").to_string()
    }

    fn poster(shade: u8) -> GeneratedPoster {
        GeneratedPoster::new(png_url(1200, 600, shade), "Create ... Style: Vintage and Rustic.")
    }

    #[test]
    fn test_load_absent_is_empty() {
        let gallery = GalleryStore::load(MemoryStorage::new());
        assert!(gallery.is_empty());
    }

    #[test]
    fn test_load_invalid_json_is_empty() {
        let storage = MemoryStorage::new().with_value(GALLERY_KEY, "{not json");
        let gallery = GalleryStore::load(storage);
        assert!(gallery.is_empty());
    }

    #[test]
    fn test_load_non_array_is_empty() {
        let storage = MemoryStorage::new().with_value(GALLERY_KEY, r#"{"id": "x"}"#);
        assert!(GalleryStore::load(storage).is_empty());
    }

    #[test]
    fn test_load_skips_bad_entries() {
        let storage = MemoryStorage::new().with_value(
            GALLERY_KEY,
            r#"[
                {"id": "item-1", "timestamp": 1, "url": "data:image/jpeg;base64,AA==", "prompt": "p"},
                {"id": 5}
            ]"#,
        );
        let gallery = GalleryStore::load(storage);
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.items()[0].id, "item-1");
        assert_eq!(gallery.items()[0].source_digest, "");
    }

    #[test]
    fn test_save_downscales_and_persists() {
        let mut gallery = GalleryStore::load(MemoryStorage::new());
        let original = poster(10);
        let outcome = gallery.save(&original, &DownscaleOptions::default()).unwrap();
        assert!(matches!(outcome, SaveOutcome::Saved(_)));

        let item = gallery.get(outcome.id()).unwrap();
        assert!(item.url.starts_with("data:image/jpeg;base64,"));
        assert_ne!(item.url, original.url);
        assert_eq!(item.prompt, original.prompt);

        let thumb = DataUri::parse(&item.url).unwrap().decode().unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 400));

        let stored = gallery.storage().read(GALLERY_KEY).unwrap().unwrap();
        assert!(!stored.contains(&original.url));
        let reloaded: Vec<SavedItem> = serde_json::from_str(&stored).unwrap();
        assert_eq!(reloaded, gallery.items());
    }

    #[test]
    fn test_save_same_artifact_twice_keeps_one_entry() {
        let mut gallery = GalleryStore::load(MemoryStorage::new());
        let original = poster(20);
        let first = gallery.save(&original, &DownscaleOptions::default()).unwrap();
        let second = gallery.save(&original, &DownscaleOptions::default()).unwrap();

        assert_eq!(gallery.len(), 1);
        assert_eq!(second, SaveOutcome::AlreadySaved(first.id().to_string()));
        assert!(gallery.contains_source(&original.url));
    }

    #[test]
    fn test_newest_first() {
        let mut gallery = GalleryStore::load(MemoryStorage::new());
        let a = gallery.save(&poster(1), &DownscaleOptions::default()).unwrap();
        let b = gallery.save(&poster(2), &DownscaleOptions::default()).unwrap();
        assert_eq!(gallery.items()[0].id, b.id());
        assert_eq!(gallery.items()[1].id, a.id());
    }

    #[test]
    fn test_failed_write_keeps_memory_state() {
        let mut gallery = GalleryStore::load(MemoryStorage::new());
        gallery.save(&poster(1), &DownscaleOptions::default()).unwrap();
        let stored_len = gallery.storage().read(GALLERY_KEY).unwrap().unwrap().len();

        let storage = MemoryStorage::new()
            .with_quota(stored_len + 10)
            .with_value(GALLERY_KEY, gallery.storage().read(GALLERY_KEY).unwrap().unwrap());
        let mut gallery = GalleryStore::load(storage);
        assert_eq!(gallery.len(), 1);
        let existing_id = gallery.items()[0].id.clone();

        let err = gallery
            .save(&poster(2), &DownscaleOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PosterError::Storage(StorageError::QuotaExceeded { .. })
        ));
        assert_eq!(gallery.len(), 2);
        assert!(gallery.get(&existing_id).is_some());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut gallery = GalleryStore::load(MemoryStorage::new());
        let a = gallery.save(&poster(1), &DownscaleOptions::default()).unwrap();
        gallery.save(&poster(2), &DownscaleOptions::default()).unwrap();

        let removed = gallery.remove(a.id()).unwrap().unwrap();
        assert_eq!(removed.id, a.id());
        assert_eq!(gallery.len(), 1);
        assert!(gallery.remove("missing").unwrap().is_none());

        gallery.clear().unwrap();
        assert!(gallery.is_empty());
        assert_eq!(
            gallery.storage().read(GALLERY_KEY).unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_file_storage_round_trip_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("data"));
        let mut gallery = GalleryStore::load(storage.clone());
        let outcome = gallery.save(&poster(3), &DownscaleOptions::default()).unwrap();

        let reloaded = GalleryStore::load(storage.clone());
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.items()[0].id, outcome.id());
        assert!(storage.path_for(GALLERY_KEY).exists());
    }

    #[test]
    fn test_file_storage_quota() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).with_quota(Some(4));
        assert!(storage.write("k", "abc").is_ok());
        assert!(matches!(
            storage.write("k", "abcdef"),
            Err(StorageError::QuotaExceeded { needed: 6, quota: 4 })
        ));
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("abc"));
        assert_eq!(storage.read("absent").unwrap(), None);
    }
}
