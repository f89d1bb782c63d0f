//! Recording session controller
//!
//! A thin facade over a media backend and a recording engine. The
//! controller owns the status flag and mutates it only in response to
//! `start`/`stop` calls or asynchronous capture events, never on behalf of
//! the UI. Contracts:
//!
//! - `start` is a no-op while recording; `stop` is a no-op unless recording
//!   (or cancels a pending acquisition).
//! - Exactly one artifact is live after a stop; starting again discards the
//!   previous one before a replacement exists.
//! - Releasing the session stops every track synchronously regardless of
//!   what was in flight.

use crate::acquisition::{acquire_stream, MediaBackend, MediaStream};
use crate::engine::{default_engine_factory, BlobOptions, EngineFactory, RecordingEngine};
use crate::errors::RecorderError;
use crate::notify::NotificationSink;
use crate::types::{MediaConstraints, RecordedArtifact, RecordingStatus};
use crate::view::{view_state, ViewState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Serializable stream summary for the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaStreamInfo {
    pub id: Uuid,
    pub live_tracks: usize,
    pub is_live: bool,
}

struct SessionState {
    status: RecordingStatus,
    stream: Option<MediaStream>,
    events: Option<mpsc::UnboundedReceiver<RecorderError>>,
    engine: Option<Box<dyn RecordingEngine>>,
    artifact: Option<RecordedArtifact>,
    last_error: Option<RecorderError>,
    /// Set by `stop` while an acquisition is in flight.
    cancelled: bool,
    /// Bumped on every acquisition and on release, so a stale acquisition
    /// result can be recognized and its stream let go immediately.
    generation: u64,
}

pub struct RecordingController {
    backend: Arc<dyn MediaBackend>,
    sink: Arc<NotificationSink>,
    engine_factory: EngineFactory,
    constraints: MediaConstraints,
    device_id: Option<String>,
    blob: BlobOptions,
    state: Arc<Mutex<SessionState>>,
}

impl RecordingController {
    pub fn new(backend: Arc<dyn MediaBackend>, sink: Arc<NotificationSink>) -> Self {
        Self {
            backend,
            sink,
            engine_factory: default_engine_factory(),
            constraints: MediaConstraints::default(),
            device_id: None,
            blob: BlobOptions::default(),
            state: Arc::new(Mutex::new(SessionState {
                status: RecordingStatus::Idle,
                stream: None,
                events: None,
                engine: None,
                artifact: None,
                last_error: None,
                cancelled: false,
                generation: 0,
            })),
        }
    }

    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_device(mut self, device_id: Option<String>) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn with_blob_options(mut self, blob: BlobOptions) -> Self {
        self.blob = blob;
        self
    }

    pub fn with_engine_factory(mut self, factory: EngineFactory) -> Self {
        self.engine_factory = factory;
        self
    }

    pub async fn status(&self) -> RecordingStatus {
        self.state.lock().await.status
    }

    pub async fn last_error(&self) -> Option<RecorderError> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn artifact(&self) -> Option<RecordedArtifact> {
        self.state.lock().await.artifact.clone()
    }

    pub async fn media_info(&self) -> Option<MediaStreamInfo> {
        let state = self.state.lock().await;
        state.stream.as_ref().map(|s| MediaStreamInfo {
            id: s.id(),
            live_tracks: s.live_tracks(),
            is_live: s.is_live(),
        })
    }

    /// Current presentation state, a pure function of status and artifact.
    pub async fn view(&self) -> ViewState {
        let state = self.state.lock().await;
        view_state(state.status, state.artifact.as_ref())
    }

    /// Request camera+microphone access. Idempotent while a stream is held;
    /// acquisition happens once per session.
    pub async fn acquire(&self) -> Result<(), RecorderError> {
        let generation = {
            let mut state = self.state.lock().await;
            if state.stream.is_some()
                || matches!(
                    state.status,
                    RecordingStatus::Recording | RecordingStatus::AcquiringMedia
                )
            {
                return Ok(());
            }
            // Without a recording primitive there is nothing to record into;
            // don't touch the devices at all.
            if !self.backend.has_recording_support() {
                let err = RecorderError::Unsupported(
                    "no recording engine in this build".to_string(),
                );
                state.status = RecordingStatus::Failed;
                state.last_error = Some(err.clone());
                self.sink.report(&err);
                return Err(err);
            }
            if self.constraints.video && !self.backend.has_camera_support() {
                let err = RecorderError::Unsupported(
                    "no camera capture backend on this system".to_string(),
                );
                state.status = RecordingStatus::Failed;
                state.last_error = Some(err.clone());
                self.sink.report(&err);
                return Err(err);
            }
            state.status = RecordingStatus::AcquiringMedia;
            state.cancelled = false;
            state.generation += 1;
            state.generation
        };

        // Device access is blocking; do it off the async runtime with the
        // lock released so a concurrent `stop` can request cancellation.
        let backend = self.backend.clone();
        let constraints = self.constraints;
        let device_id = self.device_id.clone();
        let acquired = tokio::task::spawn_blocking(move || {
            acquire_stream(backend.as_ref(), &constraints, device_id.as_deref())
        })
        .await
        .map_err(|e| RecorderError::Acquisition(format!("acquisition task failed: {}", e)))?;

        let mut state = self.state.lock().await;
        match acquired {
            Ok(mut acquired) => {
                if state.cancelled || state.generation != generation {
                    // Stopped or released while we were acquiring: let the
                    // hardware go before anyone can observe the stream.
                    acquired.stream.stop_all();
                    state.cancelled = false;
                    if state.status == RecordingStatus::AcquiringMedia {
                        state.status = RecordingStatus::Idle;
                    }
                    log::info!("acquisition cancelled, stream released");
                    return Ok(());
                }
                state.stream = Some(acquired.stream);
                state.events = Some(acquired.events);
                state.status = RecordingStatus::Idle;
                Ok(())
            }
            Err(err) => {
                state.status = RecordingStatus::Failed;
                state.last_error = Some(err.clone());
                self.sink.report(&err);
                Err(err)
            }
        }
    }

    /// Start recording. No-op while already recording. Acquires the stream
    /// first if none is held; the previous artifact is discarded before a
    /// new recording can produce its replacement.
    pub async fn start(&self) -> Result<RecordingStatus, RecorderError> {
        {
            let mut state = self.state.lock().await;
            if state.status == RecordingStatus::Recording {
                log::debug!("start ignored: already recording");
                return Ok(RecordingStatus::Recording);
            }
            state.artifact = None;
        }

        self.acquire().await?;

        let mut state = self.state.lock().await;
        // Re-check under the lock: a concurrent start may have won the race
        // while we were acquiring, and its engine must not be overwritten.
        if state.status == RecordingStatus::Recording {
            log::debug!("start ignored: already recording");
            return Ok(RecordingStatus::Recording);
        }
        let stream = match state.stream.as_ref() {
            Some(stream) => stream,
            // Acquisition was cancelled from under us.
            None => return Ok(state.status),
        };

        let (width, height, fps) = stream
            .video_format()
            .unwrap_or((self.blob.width, self.blob.height, self.blob.fps));
        let opts = BlobOptions {
            mime: self.blob.mime,
            width,
            height,
            fps,
            bitrate: self.blob.bitrate,
        };

        let mut engine = match (self.engine_factory)(&opts) {
            Ok(engine) => engine,
            Err(err) => {
                state.status = RecordingStatus::Failed;
                state.last_error = Some(err.clone());
                self.sink.report(&err);
                return Err(err);
            }
        };

        if let Err(err) = engine.begin(stream.subscribe(), &opts) {
            state.status = RecordingStatus::Failed;
            state.last_error = Some(err.clone());
            self.sink.report(&err);
            return Err(err);
        }

        state.engine = Some(engine);
        state.status = RecordingStatus::Recording;
        log::info!("recording started ({}x{}@{:.0})", width, height, fps);
        Ok(RecordingStatus::Recording)
    }

    /// Stop recording and finalize the artifact. No-op (returns `None`)
    /// unless recording; cancels a pending acquisition instead of operating
    /// on a recording that does not exist yet.
    pub async fn stop(&self) -> Result<Option<RecordedArtifact>, RecorderError> {
        let mut state = self.state.lock().await;
        match state.status {
            RecordingStatus::AcquiringMedia => {
                state.cancelled = true;
                log::info!("stop during acquisition: pending acquisition cancelled");
                Ok(None)
            }
            RecordingStatus::Recording => {
                let engine = state.engine.take();
                match engine {
                    Some(mut engine) => match engine.finish().await {
                        Ok(artifact) => {
                            log::info!(
                                "recording stopped: {} bytes of {}",
                                artifact.len(),
                                artifact.mime
                            );
                            state.artifact = Some(artifact.clone());
                            state.status = RecordingStatus::Stopped;
                            Ok(Some(artifact))
                        }
                        Err(err) => {
                            state.status = RecordingStatus::Failed;
                            state.last_error = Some(err.clone());
                            self.sink.report(&err);
                            Err(err)
                        }
                    },
                    None => {
                        log::warn!("recording status without an engine; resetting to idle");
                        state.status = RecordingStatus::Idle;
                        Ok(None)
                    }
                }
            }
            _ => {
                log::debug!("stop ignored: status is {}", state.status);
                Ok(None)
            }
        }
    }

    /// Drain asynchronous capture/engine failures and apply their semantics:
    /// each is surfaced as exactly one notification, and a device loss while
    /// recording finalizes the session as `stopped` rather than leaving it
    /// hanging. Returns the drained errors for the caller.
    pub async fn poll_events(&self) -> Vec<RecorderError> {
        let mut state = self.state.lock().await;
        let mut drained = Vec::new();

        if let Some(events) = state.events.as_mut() {
            while let Ok(err) = events.try_recv() {
                drained.push(err);
            }
        }
        if let Some(engine) = state.engine.as_mut() {
            while let Some(err) = engine.poll_error() {
                drained.push(err);
            }
        }

        for err in &drained {
            log::warn!("session event: {}", err);
            self.sink.report(err);
            state.last_error = Some(err.clone());
        }

        let device_lost = drained
            .iter()
            .any(|e| matches!(e, RecorderError::DeviceLost(_)));
        let stream_dead = state.stream.as_ref().map(|s| !s.is_live()).unwrap_or(false);

        if state.status == RecordingStatus::Recording && (device_lost || stream_dead) {
            // Drop the stream first so the engine sees its frame channel
            // close and can finalize what it captured.
            state.stream = None;
            state.events = None;
            if let Some(mut engine) = state.engine.take() {
                match engine.finish().await {
                    Ok(artifact) => state.artifact = Some(artifact),
                    Err(err) => {
                        log::error!("failed to finalize after device loss: {}", err);
                        state.last_error = Some(err);
                    }
                }
            }
            state.status = RecordingStatus::Stopped;
        }

        drained
    }

    /// Tear the session down: stop the engine, release every track, drop the
    /// artifact reference. Must be called on unmount; also safe at any other
    /// time. The stream is released no matter what was in flight.
    pub async fn release(&self) {
        let mut state = self.state.lock().await;
        // Invalidate any in-flight acquisition.
        state.cancelled = true;
        state.generation += 1;

        if let Some(mut engine) = state.engine.take() {
            // Unblock the engine worker before waiting on it.
            state.stream = None;
            if let Err(e) = engine.finish().await {
                log::debug!("engine discarded during release: {}", e);
            }
        }
        if let Some(mut stream) = state.stream.take() {
            stream.stop_all();
        }
        state.events = None;
        state.artifact = None;
        state.status = RecordingStatus::Idle;
        log::info!("session released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Severity;
    use crate::testing::{SyntheticBackend, SyntheticEngine};

    fn controller(backend: SyntheticBackend) -> RecordingController {
        let sink = Arc::new(NotificationSink::with_default_ttl());
        RecordingController::new(Arc::new(backend), sink)
            .with_engine_factory(SyntheticEngine::factory())
    }

    #[tokio::test]
    async fn test_happy_path_idle_to_stopped() {
        let ctrl = controller(SyntheticBackend::new());
        assert_eq!(ctrl.status().await, RecordingStatus::Idle);
        ctrl.start().await.unwrap();
        assert_eq!(ctrl.status().await, RecordingStatus::Recording);
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let artifact = ctrl.stop().await.unwrap().expect("artifact");
        assert_eq!(ctrl.status().await, RecordingStatus::Stopped);
        assert!(!artifact.is_empty());
    }

    #[tokio::test]
    async fn test_start_is_noop_while_recording() {
        let ctrl = controller(SyntheticBackend::new());
        ctrl.start().await.unwrap();
        let stream_id = ctrl.media_info().await.unwrap().id;
        ctrl.start().await.unwrap();
        // Same stream, same status: no new acquisition happened.
        assert_eq!(ctrl.media_info().await.unwrap().id, stream_id);
        assert_eq!(ctrl.status().await, RecordingStatus::Recording);
    }

    #[tokio::test]
    async fn test_stop_is_noop_when_not_recording() {
        let ctrl = controller(SyntheticBackend::new());
        assert!(ctrl.stop().await.unwrap().is_none());
        assert_eq!(ctrl.status().await, RecordingStatus::Idle);
        assert!(ctrl.artifact().await.is_none());
    }

    #[tokio::test]
    async fn test_second_recording_supersedes_artifact() {
        let ctrl = controller(SyntheticBackend::new());
        ctrl.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        let first = ctrl.stop().await.unwrap().expect("first artifact");

        ctrl.start().await.unwrap();
        // The old artifact is discarded as soon as the new recording starts.
        assert!(ctrl.artifact().await.is_none());
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        let second = ctrl.stop().await.unwrap().expect("second artifact");
        assert_ne!(first.id, second.id);
        assert_eq!(ctrl.artifact().await.unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_acquisition_failure_notifies_once() {
        let backend = SyntheticBackend::new().with_video_failure(
            RecorderError::PermissionDenied("denied by user".to_string()),
        );
        let sink = Arc::new(NotificationSink::with_default_ttl());
        let ctrl = RecordingController::new(Arc::new(backend), sink.clone())
            .with_engine_factory(SyntheticEngine::factory());

        let err = ctrl.start().await.unwrap_err();
        assert!(matches!(err, RecorderError::PermissionDenied(_)));
        assert_eq!(ctrl.status().await, RecordingStatus::Failed);

        let active = sink.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_device_loss_settles_at_stopped() {
        let ctrl = controller(SyntheticBackend::new().with_video_failure_after(5));
        ctrl.start().await.unwrap();
        // Wait for the synthetic source to die.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        let events = ctrl.poll_events().await;
        assert!(events
            .iter()
            .any(|e| matches!(e, RecorderError::DeviceLost(_))));
        assert_eq!(ctrl.status().await, RecordingStatus::Stopped);
    }

    #[tokio::test]
    async fn test_release_drops_everything() {
        let ctrl = controller(SyntheticBackend::new());
        ctrl.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        ctrl.stop().await.unwrap();
        assert!(ctrl.artifact().await.is_some());

        ctrl.release().await;
        assert_eq!(ctrl.status().await, RecordingStatus::Idle);
        assert!(ctrl.artifact().await.is_none());
        assert!(ctrl.media_info().await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_camera_reported() {
        let ctrl = controller(SyntheticBackend::new().without_camera());
        let err = ctrl.acquire().await.unwrap_err();
        assert!(matches!(err, RecorderError::Unsupported(_)));
        assert_eq!(ctrl.status().await, RecordingStatus::Failed);
    }

    #[tokio::test]
    async fn test_missing_engine_skips_acquisition() {
        let backend = Arc::new(SyntheticBackend::new().without_recording());
        let sink = Arc::new(NotificationSink::with_default_ttl());
        let ctrl = RecordingController::new(backend.clone(), sink.clone())
            .with_engine_factory(SyntheticEngine::factory());

        let err = ctrl.acquire().await.unwrap_err();
        assert!(matches!(err, RecorderError::Unsupported(_)));
        // No device was opened and no stream is held.
        assert_eq!(backend.open_track_count(), 0);
        assert!(ctrl.media_info().await.is_none());
        assert_eq!(ctrl.status().await, RecordingStatus::Failed);
        assert_eq!(sink.len(), 1);
    }
}
