use crate::capability::{self, CapabilityReport};
use crate::engine::BlobOptions;
use crate::platform::SystemBackend;
use crate::session::RecordingController;
use crate::types::{MediaMime, Platform};
use std::sync::Arc;
use tauri::command;

/// Initialize the recording session for the current platform.
///
/// Probes capture and recording capabilities, notifies the user about any
/// missing primitive, and installs the session controller. Safe to call
/// again; the previous session is released first.
#[command]
pub async fn initialize_recorder() -> Result<CapabilityReport, String> {
    let config = super::CONFIG.read().await.clone();
    let backend = Arc::new(SystemBackend::new());
    let report = capability::probe(backend.as_ref(), &super::SINK);

    let blob = BlobOptions {
        mime: config.container().unwrap_or(MediaMime::Mp4),
        width: config.media.width,
        height: config.media.height,
        fps: config.media.fps,
        bitrate: config.encode.bitrate,
    };
    let controller = RecordingController::new(backend, super::SINK.clone())
        .with_constraints(config.constraints())
        .with_device(config.media.device_id.clone())
        .with_blob_options(blob);

    let mut slot = super::CONTROLLER.write().await;
    if let Some(previous) = slot.take() {
        log::info!("reinitializing: releasing previous session");
        previous.release().await;
    }
    *slot = Some(Arc::new(controller));

    log::info!(
        "recorder initialized on {} (camera={} microphone={} recorder={})",
        report.platform,
        report.camera,
        report.microphone,
        report.recorder
    );
    Ok(report)
}

/// Get the capability report without touching session state.
#[command]
pub async fn get_capability_report() -> Result<CapabilityReport, String> {
    let backend = SystemBackend::new();
    Ok(CapabilityReport::collect(&backend))
}

/// Get the current platform name
#[command]
pub async fn get_current_platform() -> Result<String, String> {
    Ok(Platform::current().as_str().to_string())
}
