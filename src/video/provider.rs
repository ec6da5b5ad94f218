//! Video provider trait and the submit/poll/download flow.

use crate::error::Result;
use crate::video::poll::{wait_for_video, CancelToken, PollPolicy};
use crate::video::types::{
    GeneratedVideo, JobHandle, JobStatus, VideoAsset, VideoGenerationRequest, VideoProviderKind,
};
use async_trait::async_trait;
use std::time::Instant;

/// Trait for long-running video generation providers.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Starts a generation job.
    async fn submit(&self, request: &VideoGenerationRequest) -> Result<JobHandle>;

    /// Checks the status of a job once.
    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus>;

    /// Fetches a finished video.
    async fn download(&self, asset: &VideoAsset) -> Result<GeneratedVideo>;

    /// Returns the kind of this provider.
    fn kind(&self) -> VideoProviderKind;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str {
        match self.kind() {
            VideoProviderKind::Veo => "Veo (Google)",
        }
    }
}

/// Submits a job, waits for it under `policy` and downloads the result.
pub async fn generate_video<P: VideoProvider + ?Sized>(
    provider: &P,
    request: &VideoGenerationRequest,
    policy: &PollPolicy,
    cancel: &CancelToken,
) -> Result<GeneratedVideo> {
    let start = Instant::now();

    let handle = provider.submit(request).await?;
    tracing::debug!(job = %handle, provider = provider.name(), "submitted video generation request");

    let asset = wait_for_video(provider, &handle, policy, cancel).await?;
    tracing::debug!(job = %handle, uri = %asset.uri, "video generation complete");

    let mut video = provider.download(&asset).await?;
    video.metadata.duration_ms = Some(start.elapsed().as_millis() as u64);
    if video.metadata.resolution.is_none() {
        video.metadata.resolution = Some(request.resolution.clone());
    }

    tracing::info!(
        job = %handle,
        size = video.size(),
        elapsed_secs = start.elapsed().as_secs(),
        "video downloaded"
    );
    Ok(video)
}
