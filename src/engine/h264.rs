//! Built-in H.264/MP4 recording engine
//!
//! Encodes broadcast frames with openh264 and muxes them into an in-memory
//! MP4 buffer with muxide. Encoding runs on a dedicated thread; the async
//! side only exchanges a stop flag and a oneshot result.

use std::io::{Cursor, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytes::Bytes;
use muxide::api::{Metadata, Muxer, MuxerBuilder, VideoCodec};
use openh264::encoder::{Encoder, FrameType};
use openh264::formats::YUVBuffer;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::{BlobOptions, RecordingEngine};
use crate::errors::RecorderError;
use crate::types::{MediaMime, RecordedArtifact, VideoFrame};

/// Growable in-memory target for the muxer. Cloned handles share one buffer
/// so the worker can write through the muxer while the engine keeps a handle
/// to take the bytes back after finalization.
#[derive(Clone)]
struct SharedBuffer(Arc<Mutex<Cursor<Vec<u8>>>>);

impl SharedBuffer {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Cursor::new(Vec::new()))))
    }

    fn take(&self) -> Vec<u8> {
        let mut cursor = self.0.lock().expect("recording buffer poisoned");
        std::mem::take(cursor.get_mut())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("recording buffer poisoned").write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().expect("recording buffer poisoned").flush()
    }
}

impl Seek for SharedBuffer {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.0.lock().expect("recording buffer poisoned").seek(pos)
    }
}

/// H.264 encoder wrapper. Dimensions are fixed per recording; frames with
/// other dimensions are a fatal encoding error, matching the muxer contract.
struct FrameEncoder {
    encoder: Encoder,
    width: u32,
    height: u32,
}

struct EncodedFrame {
    data: Vec<u8>,
    is_keyframe: bool,
}

impl FrameEncoder {
    fn new(width: u32, height: u32) -> Result<Self, RecorderError> {
        let encoder = Encoder::new()
            .map_err(|e| RecorderError::Encoding(format!("failed to create encoder: {}", e)))?;
        Ok(Self {
            encoder,
            width,
            height,
        })
    }

    fn encode_rgb(&mut self, rgb: &[u8]) -> Result<EncodedFrame, RecorderError> {
        let expected = (self.width * self.height * 3) as usize;
        if rgb.len() != expected {
            return Err(RecorderError::Encoding(format!(
                "invalid frame size: expected {} bytes, got {}",
                expected,
                rgb.len()
            )));
        }

        let yuv = rgb_to_yuv420(rgb, self.width, self.height);
        let buffer = YUVBuffer::from_vec(yuv, self.width as usize, self.height as usize);

        let bitstream = self
            .encoder
            .encode(&buffer)
            .map_err(|e| RecorderError::Encoding(format!("encoding failed: {}", e)))?;

        let is_keyframe = matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I);
        Ok(EncodedFrame {
            data: bitstream.to_vec(),
            is_keyframe,
        })
    }
}

/// Convert packed RGB24 to planar YUV 4:2:0 (BT.601).
fn rgb_to_yuv420(rgb: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut out = vec![0u8; w * h + 2 * (w / 2) * (h / 2)];
    let (y_plane, uv) = out.split_at_mut(w * h);
    let (u_plane, v_plane) = uv.split_at_mut((w / 2) * (h / 2));

    for row in 0..h {
        for col in 0..w {
            let i = (row * w + col) * 3;
            let (r, g, b) = (rgb[i] as f32, rgb[i + 1] as f32, rgb[i + 2] as f32);
            let y = 0.299 * r + 0.587 * g + 0.114 * b;
            y_plane[row * w + col] = y.clamp(0.0, 255.0) as u8;

            // Chroma subsampled 2x2 from the top-left pixel of each block.
            if row % 2 == 0 && col % 2 == 0 {
                let u = -0.169 * r - 0.331 * g + 0.5 * b + 128.0;
                let v = 0.5 * r - 0.419 * g - 0.081 * b + 128.0;
                let ci = (row / 2) * (w / 2) + (col / 2);
                u_plane[ci] = u.clamp(0.0, 255.0) as u8;
                v_plane[ci] = v.clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

/// Recording engine producing H.264 video in an in-memory MP4.
pub struct H264Engine {
    stop: Arc<AtomicBool>,
    result_rx: Option<oneshot::Receiver<Result<RecordedArtifact, RecorderError>>>,
    err_rx: Option<mpsc::UnboundedReceiver<RecorderError>>,
}

impl H264Engine {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            result_rx: None,
            err_rx: None,
        }
    }
}

impl Default for H264Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RecordingEngine for H264Engine {
    fn container(&self) -> MediaMime {
        MediaMime::Mp4
    }

    fn begin(
        &mut self,
        frames: broadcast::Receiver<VideoFrame>,
        opts: &BlobOptions,
    ) -> Result<(), RecorderError> {
        if self.result_rx.is_some() {
            return Err(RecorderError::Recording(
                "engine already started".to_string(),
            ));
        }
        if opts.mime != MediaMime::Mp4 {
            return Err(RecorderError::Unsupported(format!(
                "this engine produces video/mp4, not {}",
                opts.mime
            )));
        }
        if opts.width == 0 || opts.height == 0 || opts.fps <= 0.0 {
            return Err(RecorderError::Recording(format!(
                "invalid recording format {}x{}@{}",
                opts.width, opts.height, opts.fps
            )));
        }
        // 4:2:0 subsampling needs even dimensions; odd ones would index
        // past the chroma planes.
        if opts.width % 2 != 0 || opts.height % 2 != 0 {
            return Err(RecorderError::Recording(format!(
                "recording dimensions must be even, got {}x{}",
                opts.width, opts.height
            )));
        }

        let (result_tx, result_rx) = oneshot::channel();
        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let stop = self.stop.clone();
        let opts = opts.clone();

        std::thread::spawn(move || {
            let outcome = run_worker(frames, &opts, stop, &err_tx);
            if let Err(ref e) = outcome {
                let _ = err_tx.send(e.clone());
            }
            let _ = result_tx.send(outcome);
        });

        self.result_rx = Some(result_rx);
        self.err_rx = Some(err_rx);
        Ok(())
    }

    async fn finish(&mut self) -> Result<RecordedArtifact, RecorderError> {
        let rx = self.result_rx.take().ok_or_else(|| {
            RecorderError::Recording("engine finished before it was started".to_string())
        })?;
        self.stop.store(true, Ordering::SeqCst);
        rx.await
            .map_err(|_| RecorderError::Recording("engine worker vanished".to_string()))?
    }

    fn poll_error(&mut self) -> Option<RecorderError> {
        self.err_rx.as_mut()?.try_recv().ok()
    }
}

/// Encode/mux loop. Runs until the stop flag is set or the frame channel
/// closes; a close without stop means the stream died under us, which is
/// reported but still finalized so the partial recording survives.
fn run_worker(
    mut frames: broadcast::Receiver<VideoFrame>,
    opts: &BlobOptions,
    stop: Arc<AtomicBool>,
    err_tx: &mpsc::UnboundedSender<RecorderError>,
) -> Result<RecordedArtifact, RecorderError> {
    let buffer = SharedBuffer::new();
    let mut encoder = FrameEncoder::new(opts.width, opts.height)?;
    let mut muxer: Muxer<SharedBuffer> = MuxerBuilder::new(buffer.clone())
        .video(VideoCodec::H264, opts.width, opts.height, opts.fps)
        .with_fast_start(true)
        .with_metadata(Metadata::new().with_current_time())
        .build()
        .map_err(|e| RecorderError::Muxing(format!("failed to create muxer: {}", e)))?;

    let frame_duration = 1.0 / opts.fps;
    let mut frame_count: u64 = 0;
    let mut dropped: u64 = 0;
    let mut last_frame_time: Option<Instant> = None;

    // The stop flag is polled between receives; an open but idle channel
    // (a stalled or dead camera that still holds the sender) must not be
    // able to block finalization.
    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        match frames.try_recv() {
            Ok(frame) => {
                if frame.width != opts.width || frame.height != opts.height {
                    return Err(RecorderError::Encoding(format!(
                        "frame dimensions {}x{} don't match recording format {}x{}",
                        frame.width, frame.height, opts.width, opts.height
                    )));
                }

                // Frame-rate limit: skip frames arriving faster than the
                // target cadence allows.
                let now = Instant::now();
                if let Some(last) = last_frame_time {
                    if now.duration_since(last).as_secs_f64() < frame_duration * 0.8 {
                        dropped += 1;
                        continue;
                    }
                }

                let encoded = encoder.encode_rgb(&frame.data)?;
                if encoded.data.is_empty() {
                    dropped += 1;
                    continue;
                }

                let pts = frame_count as f64 * frame_duration;
                muxer
                    .write_video(pts, &encoded.data, encoded.is_keyframe)
                    .map_err(|e| RecorderError::Muxing(format!("failed to write frame: {}", e)))?;
                frame_count += 1;
                last_frame_time = Some(now);
            }
            Err(TryRecvError::Empty) => {
                std::thread::sleep(std::time::Duration::from_millis(2));
            }
            Err(TryRecvError::Lagged(n)) => {
                dropped += n;
            }
            Err(TryRecvError::Closed) => {
                if !stop.load(Ordering::SeqCst) {
                    let _ = err_tx.send(RecorderError::DeviceLost(
                        "frame stream ended while recording".to_string(),
                    ));
                }
                break;
            }
        }
    }

    let stats = muxer
        .finish_with_stats()
        .map_err(|e| RecorderError::Muxing(format!("failed to finalize recording: {}", e)))?;
    log::info!(
        "recording finalized: {} frames ({} dropped), {:.2}s, {} bytes",
        stats.video_frames,
        dropped,
        stats.duration_secs,
        stats.bytes_written
    );

    Ok(RecordedArtifact::new(
        Bytes::from(buffer.take()),
        MediaMime::Mp4,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_yuv420_size() {
        let rgb = vec![128u8; 16 * 8 * 3];
        let yuv = rgb_to_yuv420(&rgb, 16, 8);
        assert_eq!(yuv.len(), 16 * 8 + 2 * 8 * 4);
    }

    #[test]
    fn test_rgb_to_yuv420_gray_midpoint() {
        // Uniform gray has no chroma: U and V sit at 128.
        let rgb = vec![100u8; 4 * 4 * 3];
        let yuv = rgb_to_yuv420(&rgb, 4, 4);
        assert!(yuv[16..].iter().all(|&c| (c as i32 - 128).abs() <= 1));
    }

    #[test]
    fn test_begin_rejects_wrong_container() {
        let mut engine = H264Engine::new();
        let (tx, rx) = broadcast::channel(4);
        drop(tx);
        let opts = BlobOptions {
            mime: MediaMime::WebM,
            ..Default::default()
        };
        assert!(matches!(
            engine.begin(rx, &opts),
            Err(RecorderError::Unsupported(_))
        ));
    }

    #[test]
    fn test_begin_rejects_odd_dimensions() {
        let mut engine = H264Engine::new();
        let (tx, rx) = broadcast::channel(4);
        drop(tx);
        let opts = BlobOptions {
            width: 63,
            height: 48,
            ..Default::default()
        };
        assert!(matches!(
            engine.begin(rx, &opts),
            Err(RecorderError::Recording(_))
        ));
    }

    #[tokio::test]
    async fn test_finish_before_begin_is_an_error() {
        let mut engine = H264Engine::new();
        assert!(matches!(
            engine.finish().await,
            Err(RecorderError::Recording(_))
        ));
    }
}
