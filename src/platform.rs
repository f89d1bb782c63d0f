//! System capture backend
//!
//! Camera access goes through nokhwa, microphone access through cpal. The
//! cpal stream is not `Send`, so the microphone is owned by a dedicated
//! thread for its whole life; the acquisition layer only ever sees the
//! track handle and the bounded sample port.

use crate::acquisition::{AudioChunk, FrameSource, MediaBackend, MediaTrack, TrackKind};
use crate::errors::RecorderError;
use crate::types::VideoFrame;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

use std::sync::atomic::Ordering;
use std::sync::mpsc as std_mpsc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Bound on buffered microphone chunks; at ~10ms per callback this is a few
/// seconds of audio. Oldest chunks are dropped when the consumer is slow.
const MAX_AUDIO_CHUNKS: usize = 256;

pub struct SystemBackend;

impl SystemBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn camera_index(device_id: Option<&str>) -> CameraIndex {
    match device_id {
        None => CameraIndex::Index(0),
        Some(id) => id
            .parse::<u32>()
            .map(CameraIndex::Index)
            .unwrap_or_else(|_| CameraIndex::String(id.to_string())),
    }
}

struct SystemFrameSource {
    camera: Camera,
    width: u32,
    height: u32,
    fps: f64,
}

impl FrameSource for SystemFrameSource {
    fn next_frame(&mut self) -> Result<VideoFrame, RecorderError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| RecorderError::Acquisition(format!("camera frame failed: {}", e)))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| RecorderError::Acquisition(format!("frame decode failed: {}", e)))?;
        Ok(VideoFrame::new(
            decoded.into_raw(),
            self.width,
            self.height,
            0.0,
        ))
    }

    fn format(&self) -> (u32, u32, f64) {
        (self.width, self.height, self.fps)
    }
}

impl Drop for SystemFrameSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            log::debug!("camera stream already stopped: {}", e);
        }
    }
}

impl MediaBackend for SystemBackend {
    fn has_camera_support(&self) -> bool {
        match nokhwa::query(ApiBackend::Auto) {
            Ok(devices) => !devices.is_empty(),
            Err(e) => {
                log::warn!("camera backend query failed: {}", e);
                false
            }
        }
    }

    fn has_microphone_support(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    fn open_video(&self, device_id: Option<&str>) -> Result<Box<dyn FrameSource>, RecorderError> {
        let index = camera_index(device_id);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let mut camera = Camera::new(index, requested)
            .map_err(|e| RecorderError::classify_acquisition(&e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| RecorderError::classify_acquisition(&e.to_string()))?;

        let resolution = camera.resolution();
        let fps = (camera.frame_rate() as f64).max(1.0);
        log::info!(
            "camera opened: {}x{}@{:.0}",
            resolution.width(),
            resolution.height(),
            fps
        );

        Ok(Box::new(SystemFrameSource {
            width: resolution.width(),
            height: resolution.height(),
            fps,
            camera,
        }))
    }

    fn open_audio(
        &self,
        device_id: Option<&str>,
        err_tx: mpsc::UnboundedSender<RecorderError>,
    ) -> Result<(MediaTrack, crossbeam_channel::Receiver<AudioChunk>), RecorderError> {
        let host = cpal::default_host();
        let device = match device_id {
            Some(wanted) => host
                .input_devices()
                .map_err(|e| RecorderError::classify_acquisition(&e.to_string()))?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false)),
            None => host.default_input_device(),
        }
        .ok_or_else(|| {
            RecorderError::DeviceUnavailable("no audio input device found".to_string())
        })?;

        let label = device.name().unwrap_or_else(|_| "microphone".to_string());
        let (track, live) = MediaTrack::new(TrackKind::Audio, label);
        let (tx, rx) = crossbeam_channel::bounded(MAX_AUDIO_CHUNKS);
        let overflow_rx = rx.clone();

        // The cpal stream must be built and dropped on one thread. The
        // spawner blocks until the stream is playing (or failed to open) so
        // acquisition failures are classified synchronously.
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), RecorderError>>();
        let thread_live = live.clone();

        let worker = std::thread::spawn(move || {
            let supported = match device.default_input_config() {
                Ok(c) => c,
                Err(e) => {
                    let _ = ready_tx.send(Err(RecorderError::classify_acquisition(&e.to_string())));
                    return;
                }
            };
            let sample_format = supported.sample_format();
            let sample_rate = supported.sample_rate().0;
            let channels = supported.channels();
            let stream_config: cpal::StreamConfig = supported.into();

            let push = move |samples: Vec<f32>| {
                if tx.is_full() {
                    let _ = overflow_rx.try_recv();
                }
                let _ = tx.try_send(AudioChunk {
                    samples,
                    sample_rate,
                    channels,
                });
            };

            let cb_live = thread_live.clone();
            let cb_err = err_tx.clone();
            let on_error = move |e: cpal::StreamError| {
                log::warn!("microphone stream error: {}", e);
                cb_live.store(false, Ordering::SeqCst);
                let _ = cb_err.send(RecorderError::DeviceLost(format!(
                    "microphone stream error: {}",
                    e
                )));
            };

            let stream = match sample_format {
                SampleFormat::F32 => device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _| push(data.to_vec()),
                    on_error,
                    None,
                ),
                SampleFormat::I16 => device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _| {
                        push(data.iter().map(|&s| s as f32 / i16::MAX as f32).collect())
                    },
                    on_error,
                    None,
                ),
                other => {
                    let _ = ready_tx.send(Err(RecorderError::Acquisition(format!(
                        "unsupported microphone sample format: {:?}",
                        other
                    ))));
                    return;
                }
            };

            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(RecorderError::classify_acquisition(&e.to_string())));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(RecorderError::classify_acquisition(&e.to_string())));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            while thread_live.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(25));
            }
            // Dropping the stream here releases the device.
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok((track.with_worker(worker), rx)),
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(RecorderError::Acquisition(
                    "audio capture thread died during setup".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_index_parsing() {
        assert_eq!(camera_index(None), CameraIndex::Index(0));
        assert_eq!(camera_index(Some("2")), CameraIndex::Index(2));
        assert_eq!(
            camera_index(Some("FaceTime HD")),
            CameraIndex::String("FaceTime HD".to_string())
        );
    }

    #[test]
    #[ignore = "Requires camera hardware and OS permissions - run manually"]
    fn test_open_real_camera() {
        let backend = SystemBackend::new();
        if !backend.has_camera_support() {
            return;
        }
        let mut source = backend.open_video(None).expect("camera should open");
        let frame = source.next_frame().expect("frame");
        assert!(frame.size_bytes() > 0);
    }

    #[test]
    #[ignore = "Requires microphone hardware and OS permissions - run manually"]
    fn test_open_real_microphone() {
        let backend = SystemBackend::new();
        if !backend.has_microphone_support() {
            return;
        }
        let (err_tx, _err_rx) = mpsc::unbounded_channel();
        let (mut track, samples) = backend.open_audio(None, err_tx).expect("mic should open");
        let chunk = samples
            .recv_timeout(Duration::from_secs(3))
            .expect("audio chunk");
        assert!(chunk.sample_rate > 0);
        track.stop();
    }
}
