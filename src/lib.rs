#![warn(missing_docs)]
//! Poster Studio - product photos to branded posters and short videos.
//!
//! A product photo is sent to Gemini together with a style preset and an
//! aspect ratio; the returned poster can be animated with Veo and kept in a
//! local gallery of downscaled thumbnails.
//!
//! # Quick Start
//!
//! ```no_run
//! use poster_studio::{
//!     load_image, EnvCredentials, FileStorage, GalleryStore, GeminiProvider, PosterFormat,
//!     Studio, VeoProvider,
//! };
//!
//! #[tokio::main]
//! async fn main() -> poster_studio::Result<()> {
//!     let mut studio = Studio::new(
//!         GeminiProvider::builder().build()?,
//!         VeoProvider::builder().build()?,
//!         EnvCredentials::new(None),
//!         GalleryStore::load(FileStorage::new("gallery")),
//!     );
//!     studio.set_image(load_image("coffee.jpg")?);
//!     studio.config_mut().format = PosterFormat::Story;
//!     studio.generate().await?;
//!     studio.save_to_gallery()?;
//!     Ok(())
//! }
//! ```
//!
//! # Layout
//!
//! - [`upload`]: data URIs and photo loading
//! - [`poster`]: formats, styles and prompt construction
//! - [`image`]: image generation (Gemini)
//! - [`video`]: long-running video generation (Veo) with bounded polling
//! - [`gallery`]: persisted, deduplicated, downscaled saves
//! - [`studio`]: the session state machine tying it together

mod error;

pub mod config;
pub mod credentials;
pub mod downscale;
pub mod gallery;
pub mod image;
pub mod poster;
pub mod studio;
pub mod upload;
pub mod video;

pub use error::{PosterError, Result, StorageError, GALLERY_FULL_MESSAGE};

pub use config::Settings;
pub use credentials::{CredentialBroker, EnvCredentials, StaticCredentials};
pub use downscale::DownscaleOptions;
pub use gallery::{FileStorage, GalleryStore, MemoryStorage, SaveOutcome, Storage};
pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};
pub use image::{AspectRatio, GeneratedImage, GenerationRequest, ImageFormat, ImageProvider};
pub use poster::{
    GeneratedPoster, PosterConfig, PosterFormat, PosterStyle, PromptBuilder, SavedItem,
};
pub use studio::{Status, Studio, View};
pub use upload::{load_image, DataUri};
pub use video::providers::{VeoModel, VeoProvider, VeoProviderBuilder};
pub use video::{
    CancelHandle, CancelToken, GeneratedVideo, PollPolicy, VideoGenerationRequest, VideoProvider,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{PosterError, Result};
    pub use crate::gallery::{GalleryStore, Storage};
    pub use crate::image::{GenerationRequest, ImageProvider};
    pub use crate::poster::{PosterConfig, PosterFormat, PosterStyle};
    pub use crate::studio::{Status, Studio};
    pub use crate::video::{CancelToken, VideoProvider};
}
