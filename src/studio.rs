//! The poster workflow: upload, configure, generate, animate, save.
//!
//! [`Studio`] owns all mutable session state and drives the status machine:
//!
//! ```text
//! Idle -> Loading -> Success | Error
//! Success -> Animating -> Success | PartialSuccess
//! ```
//!
//! Front ends render from [`Studio::view`] and [`Studio::status`], or watch
//! status changes through [`Studio::subscribe`].

use crate::credentials::CredentialBroker;
use crate::downscale::DownscaleOptions;
use crate::error::{PosterError, Result};
use crate::gallery::{GalleryStore, SaveOutcome, Storage};
use crate::image::{GenerationRequest, ImageFormat, ImageProvider};
use crate::poster::{GeneratedPoster, PosterConfig, PromptBuilder, SavedItem};
use crate::upload::DataUri;
use crate::video::{generate_video, CancelToken, PollPolicy, VideoGenerationRequest, VideoProvider};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// Session status. Exactly one holds at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Nothing running.
    #[default]
    Idle,
    /// Poster image generation in progress.
    Loading,
    /// Video generation in progress.
    Animating,
    /// A poster is available.
    Success,
    /// The poster is available but animating it failed.
    PartialSuccess,
    /// Poster generation failed.
    Error,
}

impl Status {
    /// Returns true while a blocking overlay should be shown.
    pub fn shows_overlay(&self) -> bool {
        matches!(self, Self::Loading | Self::Animating)
    }

    /// Returns true when the overlay is for video generation.
    pub fn overlay_is_video(&self) -> bool {
        matches!(self, Self::Animating)
    }
}

/// Which screen a front end should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// No photo yet.
    Upload,
    /// Photo loaded; style and format can be edited.
    Configure,
    /// A generated poster is on display.
    Preview,
}

/// Owns the session state and the collaborators that act on it.
pub struct Studio<I, V, C, S>
where
    I: ImageProvider,
    V: VideoProvider,
    C: CredentialBroker,
    S: Storage,
{
    image_provider: I,
    video_provider: V,
    credentials: C,
    gallery: GalleryStore<S>,
    prompts: PromptBuilder,
    poll_policy: PollPolicy,
    downscale: DownscaleOptions,
    image: Option<DataUri>,
    config: PosterConfig,
    result: Option<GeneratedPoster>,
    status: Status,
    status_tx: watch::Sender<Status>,
    error: Option<String>,
}

impl<I, V, C, S> Studio<I, V, C, S>
where
    I: ImageProvider,
    V: VideoProvider,
    C: CredentialBroker,
    S: Storage,
{
    /// Creates an idle session around a loaded gallery.
    pub fn new(image_provider: I, video_provider: V, credentials: C, gallery: GalleryStore<S>) -> Self {
        let (status_tx, _) = watch::channel(Status::Idle);
        Self {
            image_provider,
            video_provider,
            credentials,
            gallery,
            prompts: PromptBuilder::default(),
            poll_policy: PollPolicy::default(),
            downscale: DownscaleOptions::default(),
            image: None,
            config: PosterConfig::default(),
            result: None,
            status: Status::Idle,
            status_tx,
            error: None,
        }
    }

    /// Uses a custom prompt builder (brand text).
    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Uses custom polling limits for animation.
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Uses custom thumbnail parameters for gallery saves.
    pub fn with_downscale(mut self, options: DownscaleOptions) -> Self {
        self.downscale = options;
        self
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Receives every status transition.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status_tx.subscribe()
    }

    /// Screen to show for the current state.
    pub fn view(&self) -> View {
        let showing_result = matches!(
            self.status,
            Status::Success | Status::Animating | Status::PartialSuccess
        );
        if showing_result && self.result.is_some() {
            View::Preview
        } else if self.image.is_some() {
            View::Configure
        } else {
            View::Upload
        }
    }

    /// Last user-facing error message.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Dismisses the error message.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// The uploaded photo.
    pub fn image(&self) -> Option<&DataUri> {
        self.image.as_ref()
    }

    /// Replaces the uploaded photo.
    pub fn set_image(&mut self, image: DataUri) {
        self.image = Some(image);
    }

    /// Drops the uploaded photo ("change photo").
    pub fn clear_image(&mut self) {
        self.image = None;
    }

    /// Current generation options.
    pub fn config(&self) -> &PosterConfig {
        &self.config
    }

    /// Mutable access to the generation options.
    pub fn config_mut(&mut self) -> &mut PosterConfig {
        &mut self.config
    }

    /// The current artifact.
    pub fn result(&self) -> Option<&GeneratedPoster> {
        self.result.as_ref()
    }

    /// The gallery store.
    pub fn gallery(&self) -> &GalleryStore<S> {
        &self.gallery
    }

    fn set_status(&mut self, status: Status) {
        tracing::debug!(from = ?self.status, to = ?status, "status change");
        self.status = status;
        self.status_tx.send_replace(status);
    }

    /// Generates a poster from the uploaded photo and current options.
    ///
    /// Also used to regenerate from a successful result.
    pub async fn generate(&mut self) -> Result<GeneratedPoster> {
        let image = self
            .image
            .clone()
            .ok_or_else(|| PosterError::InvalidRequest("upload a product photo first".into()))?;

        self.error = None;
        self.set_status(Status::Loading);

        let prompt = self.prompts.poster_prompt(&self.config);
        tracing::info!(
            provider = self.image_provider.name(),
            format = %self.config.format,
            style = %self.config.style,
            "generating poster"
        );
        let request = GenerationRequest::new(prompt.clone())
            .with_aspect_ratio(self.config.format.aspect_ratio())
            .with_input_image(image);

        match self.image_provider.generate(&request).await {
            Ok(generated) => {
                let poster = GeneratedPoster::new(generated.to_data_url(), prompt);
                self.result = Some(poster.clone());
                self.set_status(Status::Success);
                Ok(poster)
            }
            Err(e) => {
                tracing::warn!(error = %e, "poster generation failed");
                self.error = Some(e.user_message());
                self.set_status(Status::Error);
                Err(e)
            }
        }
    }

    /// Animates the current poster into a video.
    ///
    /// On failure the still image is kept, the status becomes
    /// [`Status::PartialSuccess`] and the advisory message is recorded.
    pub async fn animate(&mut self, cancel: &CancelToken) -> Result<GeneratedPoster> {
        let poster = self
            .result
            .clone()
            .ok_or_else(|| PosterError::InvalidRequest("generate a poster first".into()))?;
        if poster.video_url.is_some() {
            return Ok(poster);
        }

        self.error = None;
        if !self.credentials.has_selected_key().await {
            if let Err(e) = self.credentials.select_key().await {
                return Err(self.animation_failed(e));
            }
        }

        self.set_status(Status::Animating);

        let image = match DataUri::parse(&poster.url) {
            Ok(image) => image,
            Err(e) => return Err(self.animation_failed(e)),
        };
        let request = VideoGenerationRequest::new(self.prompts.animation_prompt(&self.config))
            .with_image(image)
            .with_aspect_ratio(self.config.format.video_aspect_ratio());

        match generate_video(&self.video_provider, &request, &self.poll_policy, cancel).await {
            Ok(video) => {
                let animated = poster.with_video(video.to_data_url());
                self.result = Some(animated.clone());
                self.set_status(Status::Success);
                Ok(animated)
            }
            Err(e) => Err(self.animation_failed(e)),
        }
    }

    fn animation_failed(&mut self, e: PosterError) -> PosterError {
        tracing::warn!(error = %e, "animation failed, keeping still image");
        self.error = Some(e.user_message());
        self.set_status(Status::PartialSuccess);
        e
    }

    /// Returns true when the current artifact is already in the gallery.
    pub fn is_saved(&self) -> bool {
        self.result
            .as_ref()
            .is_some_and(|r| self.gallery.contains_source(&r.url))
    }

    /// Commits the current artifact to the gallery.
    pub fn save_to_gallery(&mut self) -> Result<SaveOutcome> {
        let poster = self
            .result
            .clone()
            .ok_or_else(|| PosterError::InvalidRequest("nothing to save".into()))?;
        self.gallery.save(&poster, &self.downscale).inspect_err(|e| {
            self.error = Some(e.user_message());
        })
    }

    /// Removes a gallery entry.
    pub fn remove_from_gallery(&mut self, id: &str) -> Result<Option<SavedItem>> {
        self.gallery.remove(id).inspect_err(|e| {
            self.error = Some(e.user_message());
        })
    }

    /// Starts over with a new upload.
    pub fn reset(&mut self) {
        self.image = None;
        self.result = None;
        self.error = None;
        self.set_status(Status::Idle);
    }

    /// Returns to the options screen, keeping photo and result.
    pub fn back_to_config(&mut self) {
        self.set_status(Status::Idle);
    }

    /// Writes the current artifact (video if present) into `dir`.
    pub fn download(&self, dir: &Path) -> Result<PathBuf> {
        let poster = self
            .result
            .as_ref()
            .ok_or_else(|| PosterError::InvalidRequest("nothing to download".into()))?;
        let url = poster.video_url.as_deref().unwrap_or(&poster.url);
        write_artifact(url, dir, "poster")
    }
}

/// Decodes a data URI and writes it as `<stem>-<millis>.<ext>` under `dir`.
pub fn write_artifact(url: &str, dir: &Path, stem: &str) -> Result<PathBuf> {
    let uri = DataUri::parse(url)?;
    let ext = if uri.is_video() {
        "mp4"
    } else {
        ImageFormat::from_mime_type(&uri.mime_type)
            .unwrap_or_default()
            .extension()
    };
    std::fs::create_dir_all(dir)?;
    let millis = chrono::Utc::now().timestamp_millis();
    let path = dir.join(format!("{stem}-{millis}.{ext}"));
    std::fs::write(&path, uri.decode()?)?;
    tracing::info!(path = %path.display(), "artifact written");
    Ok(path)
}
