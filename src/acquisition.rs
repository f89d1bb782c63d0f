//! Device acquisition and media stream lifecycle
//!
//! Acquisition is all-or-nothing: a combined audio+video request either
//! yields a stream with every requested track live, or nothing is held.
//! Every acquired track must be explicitly stopped on teardown; a leaked
//! track is a leaked hardware lock and becomes the `DeviceUnavailable`
//! failure the *next* acquisition sees. `MediaStream` therefore stops all
//! tracks on drop, so no stream can outlive its owning session.

use crate::errors::RecorderError;
use crate::types::{MediaConstraints, VideoFrame};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// Fan-out capacity for live frames. Slow subscribers lag and skip frames
/// rather than stall the capture pump.
const FRAME_FANOUT_CAPACITY: usize = 16;

/// A chunk of interleaved f32 PCM samples from the microphone.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A blocking source of video frames (a camera, or a synthetic generator in
/// tests). `next_frame` paces itself at the device's frame rate.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<VideoFrame, RecorderError>;
    /// Native (width, height, fps) of this source.
    fn format(&self) -> (u32, u32, f64);
}

/// Capability query + device access, isolated behind a trait so detection
/// and capture logic can be swapped without touching callers.
pub trait MediaBackend: Send + Sync {
    fn has_camera_support(&self) -> bool;
    fn has_microphone_support(&self) -> bool;

    /// Whether a recording engine is available in this build.
    fn has_recording_support(&self) -> bool {
        cfg!(feature = "recording")
    }

    /// Open the camera. Failures must already be classified
    /// (`PermissionDenied` / `DeviceUnavailable` / `Acquisition`).
    fn open_video(&self, device_id: Option<&str>) -> Result<Box<dyn FrameSource>, RecorderError>;

    /// Open the microphone. The backend owns the capture thread and returns
    /// the track handle controlling it plus a bounded sample port (oldest
    /// chunks are dropped on overflow). Mid-session device failures go out
    /// on `err_tx`.
    fn open_audio(
        &self,
        device_id: Option<&str>,
        err_tx: mpsc::UnboundedSender<RecorderError>,
    ) -> Result<(MediaTrack, crossbeam_channel::Receiver<AudioChunk>), RecorderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Handle to one live capture track. Stopping is idempotent; the capture
/// thread is joined so the hardware lock is released before `stop` returns.
pub struct MediaTrack {
    pub kind: TrackKind,
    pub label: String,
    live: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> (Self, Arc<AtomicBool>) {
        let live = Arc::new(AtomicBool::new(true));
        let track = Self {
            kind,
            label: label.into(),
            live: live.clone(),
            worker: None,
        };
        (track, live)
    }

    pub fn with_worker(mut self, worker: JoinHandle<()>) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn stop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.join() {
                log::warn!("capture worker for '{}' panicked: {:?}", self.label, e);
            }
        }
    }
}

/// A live audio+video stream. Frames fan out over a broadcast channel so the
/// preview and the recording engine can both subscribe read-only.
pub struct MediaStream {
    id: Uuid,
    tracks: Vec<MediaTrack>,
    frame_tx: broadcast::Sender<VideoFrame>,
    video_format: Option<(u32, u32, f64)>,
    audio_rx: Option<crossbeam_channel::Receiver<AudioChunk>>,
}

impl MediaStream {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VideoFrame> {
        self.frame_tx.subscribe()
    }

    /// Native format of the video track, if one was requested.
    pub fn video_format(&self) -> Option<(u32, u32, f64)> {
        self.video_format
    }

    /// Microphone sample port, if an audio track was requested.
    pub fn audio_samples(&self) -> Option<&crossbeam_channel::Receiver<AudioChunk>> {
        self.audio_rx.as_ref()
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// Number of tracks still capturing.
    pub fn live_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    /// True while every requested track is still delivering.
    pub fn is_live(&self) -> bool {
        !self.tracks.is_empty() && self.tracks.iter().all(|t| t.is_live())
    }

    /// Stop every track and join its worker. Idempotent.
    pub fn stop_all(&mut self) {
        for track in &mut self.tracks {
            track.stop();
        }
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.stop_all();
        log::debug!("media stream {} released", self.id);
    }
}

/// A successfully acquired stream plus its asynchronous error channel.
/// Device loss mid-session arrives here, not through a status change.
pub struct Acquired {
    pub stream: MediaStream,
    pub events: mpsc::UnboundedReceiver<RecorderError>,
}

/// Request combined audio+video access.
///
/// On any per-track failure, tracks already opened are stopped before the
/// error propagates, so a partial acquisition never holds hardware.
pub fn acquire_stream(
    backend: &dyn MediaBackend,
    constraints: &MediaConstraints,
    device_id: Option<&str>,
) -> Result<Acquired, RecorderError> {
    if constraints.is_empty() {
        return Err(RecorderError::Acquisition(
            "at least one of audio or video must be requested".to_string(),
        ));
    }

    let (frame_tx, _) = broadcast::channel(FRAME_FANOUT_CAPACITY);
    let (err_tx, err_rx) = mpsc::unbounded_channel();
    let mut tracks: Vec<MediaTrack> = Vec::new();
    let mut video_format = None;

    if constraints.video {
        let source = backend.open_video(device_id)?;
        video_format = Some(source.format());
        tracks.push(spawn_video_pump(source, frame_tx.clone(), err_tx.clone()));
    }

    let mut audio_rx = None;
    if constraints.audio {
        match backend.open_audio(device_id, err_tx.clone()) {
            Ok((track, samples)) => {
                tracks.push(track);
                audio_rx = Some(samples);
            }
            Err(e) => {
                for track in &mut tracks {
                    track.stop();
                }
                return Err(e);
            }
        }
    }

    let stream = MediaStream {
        id: Uuid::new_v4(),
        tracks,
        frame_tx,
        video_format,
        audio_rx,
    };
    log::info!(
        "acquired media stream {} ({} tracks)",
        stream.id,
        stream.tracks.len()
    );

    Ok(Acquired {
        stream,
        events: err_rx,
    })
}

/// Run a frame source on a dedicated thread, broadcasting frames until the
/// track is stopped or the source fails. A mid-session source failure marks
/// the track ended and reports `DeviceLost` on the event channel.
fn spawn_video_pump(
    mut source: Box<dyn FrameSource>,
    frame_tx: broadcast::Sender<VideoFrame>,
    err_tx: mpsc::UnboundedSender<RecorderError>,
) -> MediaTrack {
    let (w, h, fps) = source.format();
    let label = format!("video {}x{}@{:.0}", w, h, fps);
    let (track, live) = MediaTrack::new(TrackKind::Video, label);

    let worker = std::thread::spawn(move || {
        let started = Instant::now();
        while live.load(Ordering::SeqCst) {
            match source.next_frame() {
                Ok(mut frame) => {
                    frame.timestamp = started.elapsed().as_secs_f64();
                    // No subscribers is fine; frames are simply discarded.
                    let _ = frame_tx.send(frame);
                }
                Err(e) => {
                    log::warn!("video source ended: {}", e);
                    live.store(false, Ordering::SeqCst);
                    let _ = err_tx.send(RecorderError::DeviceLost(e.to_string()));
                    break;
                }
            }
        }
    });

    track.with_worker(worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SyntheticBackend;

    #[test]
    fn test_acquire_holds_requested_tracks() {
        let backend = SyntheticBackend::new();
        let acquired = acquire_stream(&backend, &MediaConstraints::audio_video(), None).unwrap();
        assert_eq!(acquired.stream.tracks().len(), 2);
        assert!(acquired.stream.is_live());
        assert!(acquired.stream.video_format().is_some());
        assert!(acquired.stream.audio_samples().is_some());
    }

    #[test]
    fn test_stop_all_releases_every_track() {
        let backend = SyntheticBackend::new();
        let mut acquired = acquire_stream(&backend, &MediaConstraints::audio_video(), None).unwrap();
        acquired.stream.stop_all();
        assert_eq!(acquired.stream.live_tracks(), 0);
        // Idempotent.
        acquired.stream.stop_all();
        assert_eq!(acquired.stream.live_tracks(), 0);
    }

    #[test]
    fn test_drop_releases_hardware() {
        let backend = SyntheticBackend::new();
        let acquired = acquire_stream(&backend, &MediaConstraints::audio_video(), None).unwrap();
        assert_eq!(backend.open_track_count(), 2);
        drop(acquired);
        assert_eq!(backend.open_track_count(), 0);
    }

    #[test]
    fn test_audio_failure_releases_video() {
        let backend = SyntheticBackend::new()
            .with_audio_failure(RecorderError::DeviceUnavailable("mic is busy".to_string()));
        let result = acquire_stream(&backend, &MediaConstraints::audio_video(), None);
        assert!(matches!(result, Err(RecorderError::DeviceUnavailable(_))));
        // The video track opened first must have been released again.
        assert_eq!(backend.open_track_count(), 0);
    }

    #[test]
    fn test_empty_constraints_rejected() {
        let backend = SyntheticBackend::new();
        let result = acquire_stream(
            &backend,
            &MediaConstraints {
                audio: false,
                video: false,
            },
            None,
        );
        assert!(matches!(result, Err(RecorderError::Acquisition(_))));
    }

    #[tokio::test]
    async fn test_source_failure_reports_device_loss() {
        let backend = SyntheticBackend::new().with_video_failure_after(3);
        let mut acquired = acquire_stream(&backend, &MediaConstraints::video_only(), None).unwrap();
        let err = acquired.events.recv().await.expect("loss event");
        assert!(matches!(err, RecorderError::DeviceLost(_)));
        assert_eq!(acquired.stream.live_tracks(), 0);
    }

    #[test]
    fn test_audio_samples_flow() {
        let backend = SyntheticBackend::new();
        let acquired = acquire_stream(&backend, &MediaConstraints::audio_video(), None).unwrap();
        let port = acquired.stream.audio_samples().unwrap();
        let chunk = port
            .recv_timeout(std::time::Duration::from_secs(2))
            .expect("audio chunk");
        assert!(chunk.sample_rate > 0);
        assert!(!chunk.samples.is_empty());
    }
}
