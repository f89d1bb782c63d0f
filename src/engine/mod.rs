//! Recording engine interface
//!
//! The engine is the "recording primitive" the session controller observes
//! rather than reimplements: begin consuming frames, finish into an
//! artifact, and report asynchronous failures on a side channel. Any media
//! encoding facility with that shape can stand behind the trait; the
//! built-in implementation is H.264 in MP4 (`h264` module, feature
//! `recording`).

use crate::errors::RecorderError;
use crate::types::{MediaMime, RecordedArtifact, VideoFrame};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

#[cfg(feature = "recording")]
mod h264;

#[cfg(feature = "recording")]
pub use h264::H264Engine;

/// Encoding parameters for one recording.
#[derive(Debug, Clone)]
pub struct BlobOptions {
    pub mime: MediaMime,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub bitrate: u32,
}

impl Default for BlobOptions {
    fn default() -> Self {
        Self {
            mime: MediaMime::Mp4,
            width: 1280,
            height: 720,
            fps: 30.0,
            bitrate: 5_000_000,
        }
    }
}

#[async_trait]
pub trait RecordingEngine: Send {
    /// Container this engine produces.
    fn container(&self) -> MediaMime;

    /// Start consuming frames. Returns an error if the options are not
    /// representable (wrong container, zero dimensions).
    fn begin(
        &mut self,
        frames: broadcast::Receiver<VideoFrame>,
        opts: &BlobOptions,
    ) -> Result<(), RecorderError>;

    /// Stop consuming and finalize the artifact. If the frame channel closed
    /// before `finish` was called, whatever was captured up to that point is
    /// still returned.
    async fn finish(&mut self) -> Result<RecordedArtifact, RecorderError>;

    /// Drain one pending asynchronous failure, if any. The controller polls
    /// this; status alone is not the only error indicator.
    fn poll_error(&mut self) -> Option<RecorderError>;
}

/// Builds a fresh engine per recording.
pub type EngineFactory =
    Arc<dyn Fn(&BlobOptions) -> Result<Box<dyn RecordingEngine>, RecorderError> + Send + Sync>;

/// The engine this build ships with. Without the `recording` feature there
/// is none, and the factory reports the missing primitive instead of
/// panicking.
pub fn default_engine_factory() -> EngineFactory {
    #[cfg(feature = "recording")]
    {
        Arc::new(|_opts| Ok(Box::new(H264Engine::new()) as Box<dyn RecordingEngine>))
    }
    #[cfg(not(feature = "recording"))]
    {
        Arc::new(|_opts| {
            Err(RecorderError::Unsupported(
                "built without a recording engine".to_string(),
            ))
        })
    }
}
