//! Veo (Google) video generation provider.

use crate::error::{parse_retry_after, sanitize_error_message, PosterError, Result};
use crate::video::provider::VideoProvider;
use crate::video::types::{
    GeneratedVideo, JobHandle, JobStatus, VideoAsset, VideoGenerationRequest, VideoMetadata,
    VideoProviderKind,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Veo model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VeoModel {
    /// Veo 3.1 Fast Preview - lower latency.
    #[default]
    Veo31Fast,
    /// Veo 3.1 Preview - highest quality.
    Veo31Preview,
}

impl VeoModel {
    /// Returns the Gemini Developer API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Veo31Fast => "veo-3.1-fast-generate-preview",
            Self::Veo31Preview => "veo-3.1-generate-preview",
        }
    }

    /// Looks up a model by its API identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "veo-3.1-fast-generate-preview" => Some(Self::Veo31Fast),
            "veo-3.1-generate-preview" => Some(Self::Veo31Preview),
            _ => None,
        }
    }
}

/// Builder for VeoProvider.
#[derive(Debug, Clone, Default)]
pub struct VeoProviderBuilder {
    api_key: Option<String>,
    model: VeoModel,
    base_url: Option<String>,
}

impl VeoProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Veo model variant.
    pub fn model(mut self, model: VeoModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<VeoProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .ok_or_else(|| {
                PosterError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        Ok(VeoProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Veo video generation provider.
pub struct VeoProvider {
    client: reqwest::Client,
    api_key: String,
    model: VeoModel,
    base_url: String,
}

impl VeoProvider {
    /// Creates a new `VeoProviderBuilder`.
    pub fn builder() -> VeoProviderBuilder {
        VeoProviderBuilder::new()
    }

    /// Appends the API key as a query parameter (required by the file endpoint).
    fn authorized_download_url(&self, url: &str) -> Result<String> {
        if url.starts_with("gs://") {
            return Err(PosterError::VideoGeneration(format!(
                "Veo returned a Google Cloud Storage URI ({}) which cannot be downloaded directly.",
                url
            )));
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        Ok(format!("{}{}key={}", url, separator, self.api_key))
    }
}

/// Maps an HTTP error response onto a [`PosterError`].
fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> PosterError {
    if status == 404 {
        return PosterError::InvalidRequest(
            "Veo API not available. Veo requires a paid-tier API key with billing enabled."
                .to_string(),
        );
    }
    let text = sanitize_error_message(text);
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
        return PosterError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return PosterError::Auth(text);
    }
    let lower = text.to_lowercase();
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
    {
        return PosterError::ContentBlocked(text);
    }
    PosterError::Api {
        status,
        message: text,
    }
}

/// Translates one operation snapshot into a [`JobStatus`].
fn operation_status(operation: VeoOperationResponse) -> Result<JobStatus> {
    if let Some(err) = operation.error {
        return Ok(JobStatus::Failed(
            err.message.unwrap_or_else(|| "Unknown error".into()),
        ));
    }

    if !operation.done.unwrap_or(false) {
        return Ok(JobStatus::Pending);
    }

    if let Some(gen_resp) = operation.response.and_then(|r| r.generate_video_response) {
        if gen_resp.rai_media_filtered_count.unwrap_or(0) > 0
            && gen_resp
                .generated_samples
                .as_ref()
                .is_none_or(|s| s.is_empty())
        {
            let reason = gen_resp
                .rai_media_filtered_reasons
                .and_then(|r| r.into_iter().next())
                .unwrap_or_else(|| "Video was filtered by Veo safety filters".into());
            return Err(PosterError::ContentBlocked(reason));
        }

        if let Some(uri) = gen_resp
            .generated_samples
            .and_then(|samples| samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri)
        {
            return Ok(JobStatus::Done(VideoAsset { uri }));
        }
    }

    Err(PosterError::UnexpectedResponse(
        "Video generation completed but no video URL returned".into(),
    ))
}

#[async_trait]
impl VideoProvider for VeoProvider {
    async fn submit(&self, request: &VideoGenerationRequest) -> Result<JobHandle> {
        let url = format!(
            "{}/models/{}:predictLongRunning",
            self.base_url,
            self.model.as_str(),
        );

        let body = VeoRequest::from_request(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let operation: VeoOperationResponse = response.json().await?;
        Ok(JobHandle(operation.name))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus> {
        let url = format!("{}/{}", self.base_url, handle.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let operation: VeoOperationResponse = response.json().await?;
        operation_status(operation)
    }

    async fn download(&self, asset: &VideoAsset) -> Result<GeneratedVideo> {
        let url = self.authorized_download_url(&asset.uri)?;

        // The URL carries the key; keep it out of error text.
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        if !response.status().is_success() {
            return Err(PosterError::Api {
                status: response.status().as_u16(),
                message: "Failed to download video".into(),
            });
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("video/"))
            .unwrap_or("video/mp4")
            .to_string();

        let data = response
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)?
            .to_vec();

        Ok(GeneratedVideo::new(
            data,
            mime_type,
            VideoProviderKind::Veo,
            VideoMetadata {
                model: Some(self.model.as_str().to_string()),
                duration_ms: None,
                resolution: None,
            },
        ))
    }

    fn kind(&self) -> VideoProviderKind {
        VideoProviderKind::Veo
    }
}

// ── Gemini Developer API wire format ────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoRequest {
    instances: Vec<VeoInstance>,
    parameters: VeoParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoInstance {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<VeoImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
    resolution: String,
    number_of_videos: u32,
}

impl VeoRequest {
    fn from_request(req: &VideoGenerationRequest) -> Self {
        Self {
            instances: vec![VeoInstance {
                prompt: req.prompt.clone(),
                image: req.image.as_ref().map(|img| VeoImage {
                    bytes_base64_encoded: img.data.clone(),
                    mime_type: img.mime_type.clone(),
                }),
            }],
            parameters: VeoParameters {
                aspect_ratio: req.aspect_ratio.map(|ar| ar.as_str().to_string()),
                resolution: req.resolution.clone(),
                number_of_videos: req.number_of_videos,
            },
        }
    }
}

// ── Response types ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct VeoOperationResponse {
    name: String,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    response: Option<VeoVideoResponse>,
    #[serde(default)]
    error: Option<VeoError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoVideoResponse {
    #[serde(default)]
    generate_video_response: Option<VeoGenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoGenerateVideoResponse {
    #[serde(default)]
    generated_samples: Option<Vec<VeoGeneratedSample>>,
    #[serde(default)]
    rai_media_filtered_count: Option<u32>,
    #[serde(default)]
    rai_media_filtered_reasons: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct VeoGeneratedSample {
    #[serde(default)]
    video: Option<VeoVideo>,
}

#[derive(Debug, Deserialize)]
struct VeoVideo {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VeoError {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::AspectRatio;
    use crate::upload::DataUri;

    fn operation(json: &str) -> VeoOperationResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_veo_model_as_str() {
        assert_eq!(VeoModel::default().as_str(), "veo-3.1-fast-generate-preview");
        assert_eq!(
            VeoModel::from_id("veo-3.1-generate-preview"),
            Some(VeoModel::Veo31Preview)
        );
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = VeoProviderBuilder::new().api_key("test-key").build();
        assert!(provider.is_ok());
    }

    #[test]
    fn test_request_wire_format() {
        let image = DataUri::from_bytes(b"poster", "image/png");
        let req = VideoGenerationRequest::new("Luxurious animation")
            .with_image(image.clone())
            .with_aspect_ratio(AspectRatio::Landscape);
        let json = serde_json::to_value(VeoRequest::from_request(&req)).unwrap();

        let instance = &json["instances"][0];
        assert_eq!(instance["prompt"], "Luxurious animation");
        assert_eq!(instance["image"]["bytesBase64Encoded"], image.data);
        assert_eq!(instance["image"]["mimeType"], "image/png");

        let params = &json["parameters"];
        assert_eq!(params["aspectRatio"], "16:9");
        assert_eq!(params["resolution"], "720p");
        assert_eq!(params["numberOfVideos"], 1);
    }

    #[test]
    fn test_request_without_image_omits_field() {
        let req = VideoGenerationRequest::new("text only");
        let json = serde_json::to_value(VeoRequest::from_request(&req)).unwrap();
        assert!(json["instances"][0].get("image").is_none());
        assert!(json["parameters"].get("aspectRatio").is_none());
    }

    #[test]
    fn test_operation_not_done_is_pending() {
        let op = operation(r#"{"name": "operations/123", "done": false}"#);
        assert_eq!(op.name, "operations/123");
        assert_eq!(operation_status(op).unwrap(), JobStatus::Pending);

        let op = operation(r#"{"name": "operations/123"}"#);
        assert_eq!(operation_status(op).unwrap(), JobStatus::Pending);
    }

    #[test]
    fn test_operation_done_with_video() {
        let op = operation(
            r#"{
            "name": "operations/123",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [{
                        "video": {"uri": "https://example.com/video.mp4"}
                    }]
                }
            }
        }"#,
        );
        assert_eq!(
            operation_status(op).unwrap(),
            JobStatus::Done(VideoAsset {
                uri: "https://example.com/video.mp4".into()
            })
        );
    }

    #[test]
    fn test_operation_with_error_fails() {
        let op = operation(
            r#"{
            "name": "operations/123",
            "done": true,
            "error": {"message": "Quota exceeded"}
        }"#,
        );
        assert_eq!(
            operation_status(op).unwrap(),
            JobStatus::Failed("Quota exceeded".into())
        );
    }

    #[test]
    fn test_operation_filtered_is_content_blocked() {
        let op = operation(
            r#"{
            "name": "operations/123",
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "raiMediaFilteredCount": 1,
                    "raiMediaFilteredReasons": ["Contains a celebrity likeness"]
                }
            }
        }"#,
        );
        match operation_status(op).unwrap_err() {
            PosterError::ContentBlocked(reason) => {
                assert_eq!(reason, "Contains a celebrity likeness")
            }
            other => panic!("expected ContentBlocked, got {other:?}"),
        }
    }

    #[test]
    fn test_operation_done_without_uri_is_unexpected() {
        let op = operation(r#"{"name": "operations/123", "done": true, "response": {}}"#);
        assert!(matches!(
            operation_status(op),
            Err(PosterError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_download_url_carries_key() {
        let provider = VeoProviderBuilder::new().api_key("k1").build().unwrap();
        assert_eq!(
            provider
                .authorized_download_url("https://x/files/a:download?alt=media")
                .unwrap(),
            "https://x/files/a:download?alt=media&key=k1"
        );
        assert_eq!(
            provider.authorized_download_url("https://x/v.mp4").unwrap(),
            "https://x/v.mp4?key=k1"
        );
    }

    #[tokio::test]
    async fn test_failed_download_hides_key() {
        let provider = VeoProviderBuilder::new()
            .api_key("SECRET-KEY-123")
            .build()
            .unwrap();
        let asset = VideoAsset {
            uri: "http://127.0.0.1:1/files/v:download?alt=media".into(),
        };
        let err = provider.download(&asset).await.unwrap_err();
        assert!(matches!(err, PosterError::Network(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"));
        assert!(!err.user_message().contains("SECRET-KEY-123"));
    }

    #[test]
    fn test_gs_url_is_rejected() {
        let provider = VeoProviderBuilder::new().api_key("k1").build().unwrap();
        let err = provider
            .authorized_download_url("gs://my-bucket/video.mp4")
            .unwrap_err();
        assert!(err.to_string().contains("Google Cloud Storage"));
    }

    #[test]
    fn test_parse_error_404_gives_helpful_message() {
        let headers = reqwest::header::HeaderMap::new();
        let err = parse_error(404, "", &headers);
        assert!(err.to_string().contains("paid-tier"));
    }
}
