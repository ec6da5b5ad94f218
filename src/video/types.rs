//! Core types for video generation.

use crate::image::AspectRatio;
use crate::upload::DataUri;
use serde::{Deserialize, Serialize};

/// Video provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProviderKind {
    /// Google Veo models.
    Veo,
}

impl std::fmt::Display for VideoProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Veo => write!(f, "veo"),
        }
    }
}

/// Metadata about the video generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Video resolution.
    pub resolution: Option<String>,
}

/// A request to animate a still image into a video.
#[derive(Debug, Clone)]
pub struct VideoGenerationRequest {
    /// The text prompt describing the desired motion.
    pub prompt: String,
    /// First frame of the video.
    pub image: Option<DataUri>,
    /// Number of videos to generate.
    pub number_of_videos: u32,
    /// Resolution (e.g., "720p").
    pub resolution: String,
    /// Aspect ratio, limited to 16:9 and 9:16 by Veo.
    pub aspect_ratio: Option<AspectRatio>,
}

impl VideoGenerationRequest {
    /// Creates a new request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
            number_of_videos: 1,
            resolution: "720p".to_string(),
            aspect_ratio: None,
        }
    }

    /// Sets the first frame to animate.
    pub fn with_image(mut self, image: DataUri) -> Self {
        self.image = Some(image);
        self
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }
}

/// Opaque reference to an in-progress video job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle(pub String);

impl JobHandle {
    /// Returns the provider's identifier for the job.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a finished video that still has to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoAsset {
    /// Download URI; retrieval needs the API credential.
    pub uri: String,
}

/// State of a video job as reported by one status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Still running.
    Pending,
    /// Finished with a downloadable asset.
    Done(VideoAsset),
    /// Finished without a video.
    Failed(String),
}

/// A generated video with its data and metadata.
#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    /// Raw video bytes.
    pub data: Vec<u8>,
    /// MIME type (e.g., "video/mp4").
    pub mime_type: String,
    /// Provider that generated this video.
    pub provider: VideoProviderKind,
    /// Generation metadata.
    pub metadata: VideoMetadata,
}

impl GeneratedVideo {
    /// Creates a new generated video.
    pub fn new(
        data: Vec<u8>,
        mime_type: impl Into<String>,
        provider: VideoProviderKind,
        metadata: VideoMetadata,
    ) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            provider,
            metadata,
        }
    }

    /// Returns the size of the video data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns the video as a locally referenceable data URL.
    pub fn to_data_url(&self) -> String {
        DataUri::from_bytes(&self.data, self.mime_type.clone()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = VideoGenerationRequest::new("Spin slowly");
        assert_eq!(req.number_of_videos, 1);
        assert_eq!(req.resolution, "720p");
        assert!(req.image.is_none());
        assert!(req.aspect_ratio.is_none());
    }

    #[test]
    fn test_video_data_url() {
        let video = GeneratedVideo::new(
            b"mp4".to_vec(),
            "video/mp4",
            VideoProviderKind::Veo,
            VideoMetadata::default(),
        );
        assert_eq!(video.to_data_url(), "data:video/mp4;base64,bXA0");
        assert_eq!(video.size(), 3);
    }
}
