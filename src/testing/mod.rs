//! Synthetic capture backends and engines for offline testing
//!
//! Real devices make tests flaky and CI-hostile, so everything hardware-
//! shaped has a synthetic twin here: a backend producing gradient frames
//! and sine-wave audio with scriptable failures, and an engine that counts
//! frames instead of encoding them. Also usable by downstream crates that
//! want to exercise their recording UI without a camera.

use crate::acquisition::{AudioChunk, FrameSource, MediaBackend, MediaTrack, TrackKind};
use crate::engine::{BlobOptions, EngineFactory, RecordingEngine};
use crate::errors::RecorderError;
use crate::types::{MediaMime, RecordedArtifact, VideoFrame};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

const SYNTH_WIDTH: u32 = 64;
const SYNTH_HEIGHT: u32 = 48;
const SYNTH_FPS: f64 = 60.0;
const SYNTH_SAMPLE_RATE: u32 = 48_000;

/// Generate a gradient frame whose content varies per frame number, so
/// temporal paths (encoders, rate limiting) see changing data.
pub fn synthetic_frame(frame_number: u64, width: u32, height: u32) -> VideoFrame {
    let mut data = vec![0u8; (width * height * 3) as usize];
    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 3) as usize;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }
    VideoFrame::new(data, width, height, 0.0)
}

/// Decrements the shared open-device counter when the fake hardware lock is
/// released, so tests can assert nothing leaks.
struct OpenGuard(Arc<AtomicUsize>);

impl OpenGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SyntheticFrameSource {
    frame_number: u64,
    fail_after: Option<u64>,
    _guard: OpenGuard,
}

impl FrameSource for SyntheticFrameSource {
    fn next_frame(&mut self) -> Result<VideoFrame, RecorderError> {
        if let Some(limit) = self.fail_after {
            if self.frame_number >= limit {
                return Err(RecorderError::DeviceLost(
                    "synthetic camera unplugged".to_string(),
                ));
            }
        }
        std::thread::sleep(Duration::from_secs_f64(1.0 / SYNTH_FPS));
        let frame = synthetic_frame(self.frame_number, SYNTH_WIDTH, SYNTH_HEIGHT);
        self.frame_number += 1;
        Ok(frame)
    }

    fn format(&self) -> (u32, u32, f64) {
        (SYNTH_WIDTH, SYNTH_HEIGHT, SYNTH_FPS)
    }
}

/// Scriptable stand-in for the system capture backend.
pub struct SyntheticBackend {
    camera: bool,
    microphone: bool,
    recording: bool,
    video_failure: Mutex<Option<RecorderError>>,
    audio_failure: Mutex<Option<RecorderError>>,
    video_fail_after: Option<u64>,
    open_tracks: Arc<AtomicUsize>,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self {
            camera: true,
            microphone: true,
            recording: true,
            video_failure: Mutex::new(None),
            audio_failure: Mutex::new(None),
            video_fail_after: None,
            open_tracks: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn without_camera(mut self) -> Self {
        self.camera = false;
        self
    }

    pub fn without_microphone(mut self) -> Self {
        self.microphone = false;
        self
    }

    pub fn without_recording(mut self) -> Self {
        self.recording = false;
        self
    }

    /// Fail the next camera open with the given classified error.
    pub fn with_video_failure(self, err: RecorderError) -> Self {
        *self.video_failure.lock().unwrap() = Some(err);
        self
    }

    /// Fail the next microphone open with the given classified error.
    pub fn with_audio_failure(self, err: RecorderError) -> Self {
        *self.audio_failure.lock().unwrap() = Some(err);
        self
    }

    /// Kill the camera mid-stream after `n` frames.
    pub fn with_video_failure_after(mut self, n: u64) -> Self {
        self.video_fail_after = Some(n);
        self
    }

    /// Number of fake hardware locks currently held.
    pub fn open_track_count(&self) -> usize {
        self.open_tracks.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for SyntheticBackend {
    fn has_camera_support(&self) -> bool {
        self.camera
    }

    fn has_microphone_support(&self) -> bool {
        self.microphone
    }

    fn has_recording_support(&self) -> bool {
        self.recording
    }

    fn open_video(&self, _device_id: Option<&str>) -> Result<Box<dyn FrameSource>, RecorderError> {
        if !self.camera {
            return Err(RecorderError::Unsupported(
                "synthetic backend has no camera".to_string(),
            ));
        }
        if let Some(err) = self.video_failure.lock().unwrap().take() {
            return Err(err);
        }
        Ok(Box::new(SyntheticFrameSource {
            frame_number: 0,
            fail_after: self.video_fail_after,
            _guard: OpenGuard::new(&self.open_tracks),
        }))
    }

    fn open_audio(
        &self,
        _device_id: Option<&str>,
        _err_tx: mpsc::UnboundedSender<RecorderError>,
    ) -> Result<(MediaTrack, crossbeam_channel::Receiver<AudioChunk>), RecorderError> {
        if !self.microphone {
            return Err(RecorderError::Unsupported(
                "synthetic backend has no microphone".to_string(),
            ));
        }
        if let Some(err) = self.audio_failure.lock().unwrap().take() {
            return Err(err);
        }

        let guard = OpenGuard::new(&self.open_tracks);
        let (track, live) = MediaTrack::new(TrackKind::Audio, "synthetic mic");
        let (tx, rx) = crossbeam_channel::bounded(64);
        let overflow_rx = rx.clone();

        let worker = std::thread::spawn(move || {
            let _guard = guard;
            let mut n: u64 = 0;
            while live.load(Ordering::SeqCst) {
                // 10ms of 440Hz sine, stereo interleaved.
                let samples_per_chunk = (SYNTH_SAMPLE_RATE / 100) as usize;
                let mut samples = vec![0.0f32; samples_per_chunk * 2];
                for i in 0..samples_per_chunk {
                    let t = (n as f64 * samples_per_chunk as f64 + i as f64)
                        / SYNTH_SAMPLE_RATE as f64;
                    let value = (2.0 * std::f64::consts::PI * 440.0 * t).sin() as f32 * 0.3;
                    samples[i * 2] = value;
                    samples[i * 2 + 1] = value;
                }
                let chunk = AudioChunk {
                    samples,
                    sample_rate: SYNTH_SAMPLE_RATE,
                    channels: 2,
                };
                // Bounded: drop oldest when the consumer is slow.
                if tx.is_full() {
                    let _ = overflow_rx.try_recv();
                }
                match tx.try_send(chunk) {
                    Ok(()) | Err(crossbeam_channel::TrySendError::Full(_)) => {}
                    Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
                }
                n += 1;
                std::thread::sleep(Duration::from_millis(10));
            }
        });

        Ok((track.with_worker(worker), rx))
    }
}

/// Frame-counting engine: artifact bytes encode how many frames were seen.
pub struct SyntheticEngine {
    mime: MediaMime,
    fail_on_begin: Option<RecorderError>,
    stop_tx: Option<watch::Sender<bool>>,
    result_rx: Option<oneshot::Receiver<u64>>,
    pending_error: Option<RecorderError>,
}

impl SyntheticEngine {
    pub fn new() -> Self {
        Self {
            mime: MediaMime::Mp4,
            fail_on_begin: None,
            stop_tx: None,
            result_rx: None,
            pending_error: None,
        }
    }

    pub fn with_container(mut self, mime: MediaMime) -> Self {
        self.mime = mime;
        self
    }

    pub fn failing_with(mut self, err: RecorderError) -> Self {
        self.fail_on_begin = Some(err);
        self
    }

    /// Factory producing a fresh frame-counting engine per recording.
    pub fn factory() -> EngineFactory {
        Arc::new(|_opts| Ok(Box::new(SyntheticEngine::new()) as Box<dyn RecordingEngine>))
    }

    /// Factory whose engines refuse to start.
    pub fn failing_factory(err: RecorderError) -> EngineFactory {
        Arc::new(move |_opts| Err(err.clone()))
    }

    /// Decode the frame count out of a synthetic artifact.
    pub fn frames_in(artifact: &RecordedArtifact) -> u64 {
        let tail: [u8; 8] = artifact.data[artifact.data.len() - 8..]
            .try_into()
            .unwrap_or([0; 8]);
        u64::from_le_bytes(tail)
    }
}

impl Default for SyntheticEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordingEngine for SyntheticEngine {
    fn container(&self) -> MediaMime {
        self.mime
    }

    fn begin(
        &mut self,
        mut frames: broadcast::Receiver<VideoFrame>,
        _opts: &BlobOptions,
    ) -> Result<(), RecorderError> {
        if let Some(err) = self.fail_on_begin.take() {
            return Err(err);
        }
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (result_tx, result_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut count: u64 = 0;
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            // Count whatever was already buffered before the
                            // stop arrived.
                            loop {
                                match frames.try_recv() {
                                    Ok(_) => count += 1,
                                    Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                                    Err(_) => break,
                                }
                            }
                            break;
                        }
                    }
                    received = frames.recv() => {
                        match received {
                            Ok(_) => count += 1,
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
            let _ = result_tx.send(count);
        });

        self.stop_tx = Some(stop_tx);
        self.result_rx = Some(result_rx);
        Ok(())
    }

    async fn finish(&mut self) -> Result<RecordedArtifact, RecorderError> {
        let result_rx = self.result_rx.take().ok_or_else(|| {
            RecorderError::Recording("synthetic engine was never started".to_string())
        })?;
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        let count = result_rx
            .await
            .map_err(|_| RecorderError::Recording("synthetic worker vanished".to_string()))?;

        let mut data = b"SYNTH".to_vec();
        data.extend_from_slice(&count.to_le_bytes());
        Ok(RecordedArtifact::new(Bytes::from(data), self.mime))
    }

    fn poll_error(&mut self) -> Option<RecorderError> {
        self.pending_error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_frame_shape() {
        let frame = synthetic_frame(7, 16, 8);
        assert_eq!(frame.size_bytes(), 16 * 8 * 3);
        // Content varies with frame number.
        let other = synthetic_frame(8, 16, 8);
        assert_ne!(frame.data, other.data);
    }

    #[tokio::test]
    async fn test_synthetic_engine_counts_frames() {
        let (tx, rx) = broadcast::channel(16);
        let mut engine = SyntheticEngine::new();
        engine.begin(rx, &BlobOptions::default()).unwrap();
        for i in 0..5 {
            tx.send(synthetic_frame(i, 8, 8)).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        let artifact = engine.finish().await.unwrap();
        assert_eq!(SyntheticEngine::frames_in(&artifact), 5);
        assert_eq!(artifact.mime, MediaMime::Mp4);
    }

    #[tokio::test]
    async fn test_synthetic_engine_counts_frames_buffered_at_stop() {
        // No sleep between send and finish: frames still queued when the
        // stop signal lands must be counted, not discarded.
        let (tx, rx) = broadcast::channel(16);
        let mut engine = SyntheticEngine::new();
        engine.begin(rx, &BlobOptions::default()).unwrap();
        for i in 0..5 {
            tx.send(synthetic_frame(i, 8, 8)).unwrap();
        }
        let artifact = engine.finish().await.unwrap();
        assert_eq!(SyntheticEngine::frames_in(&artifact), 5);
    }

    #[tokio::test]
    async fn test_synthetic_engine_survives_channel_close() {
        let (tx, rx) = broadcast::channel(16);
        let mut engine = SyntheticEngine::new();
        engine.begin(rx, &BlobOptions::default()).unwrap();
        tx.send(synthetic_frame(0, 8, 8)).unwrap();
        drop(tx);
        let artifact = engine.finish().await.unwrap();
        assert_eq!(SyntheticEngine::frames_in(&artifact), 1);
    }
}
