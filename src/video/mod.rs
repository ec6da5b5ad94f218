//! Video generation module.

mod poll;
mod provider;
pub mod providers;
mod types;

pub use poll::{wait_for_video, CancelHandle, CancelToken, PollPolicy};
pub use provider::{generate_video, VideoProvider};
pub use types::{
    GeneratedVideo, JobHandle, JobStatus, VideoAsset, VideoGenerationRequest, VideoMetadata,
    VideoProviderKind,
};
