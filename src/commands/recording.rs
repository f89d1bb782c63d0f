//! Recording lifecycle commands
//!
//! `start_recording` while recording and `stop_recording` while not are
//! no-ops by contract; the frontend can wire buttons straight to them
//! without guarding on status.

use crate::errors::RecorderError;
use crate::types::ArtifactInfo;
use crate::view::ViewState;
use tauri::command;

/// Start recording. Acquires the media stream first if none is held and
/// returns the resulting status string.
#[command]
pub async fn start_recording() -> Result<String, String> {
    let controller = super::controller().await?;
    let status = controller.start().await.map_err(|e| e.to_string())?;
    Ok(status.as_str().to_string())
}

/// Stop recording and finalize the artifact. Returns the artifact summary,
/// or `None` when there was nothing to stop.
#[command]
pub async fn stop_recording() -> Result<Option<ArtifactInfo>, String> {
    let controller = super::controller().await?;
    let artifact = controller.stop().await.map_err(|e| e.to_string())?;
    Ok(artifact.map(|a| a.info()))
}

/// Get the current session status flag.
#[command]
pub async fn get_recording_status() -> Result<String, String> {
    let controller = super::controller().await?;
    Ok(controller.status().await.as_str().to_string())
}

/// Get the derived presentation state the frontend renders from.
#[command]
pub async fn get_view_state() -> Result<ViewState, String> {
    let controller = super::controller().await?;
    Ok(controller.view().await)
}

/// Get the summary of the last finished recording, if one exists.
#[command]
pub async fn get_artifact_info() -> Result<Option<ArtifactInfo>, String> {
    let controller = super::controller().await?;
    Ok(controller.artifact().await.map(|a| a.info()))
}

/// Save the last finished recording to disk.
///
/// Without an explicit path the file lands in the user's download directory
/// (or the temp directory as a fallback) under the artifact's own filename,
/// so the extension always matches the encoding.
#[command]
pub async fn save_artifact(output_path: Option<String>) -> Result<String, String> {
    let controller = super::controller().await?;
    let artifact = controller
        .artifact()
        .await
        .ok_or_else(|| "No recording to save".to_string())?;

    let path = match output_path {
        Some(p) => std::path::PathBuf::from(p),
        None => dirs_fallback().join(artifact.filename()),
    };

    tokio::fs::write(&path, artifact.data.as_ref())
        .await
        .map_err(|e| {
            let err = RecorderError::Io(format!("failed to write {}: {}", path.display(), e));
            super::SINK.report(&err);
            err.to_string()
        })?;

    log::info!(
        "saved {} bytes of {} to {}",
        artifact.len(),
        artifact.mime,
        path.display()
    );
    Ok(path.to_string_lossy().into_owned())
}

fn dirs_fallback() -> std::path::PathBuf {
    std::env::var_os("HOME")
        .map(|home| {
            let downloads = std::path::Path::new(&home).join("Downloads");
            if downloads.is_dir() {
                downloads
            } else {
                std::path::PathBuf::from(home)
            }
        })
        .unwrap_or_else(std::env::temp_dir)
}

/// Drain asynchronous capture and engine failures.
///
/// The frontend polls this; a device lost mid-recording finalizes the
/// session as stopped and each failure is surfaced as one notification.
/// Returns the drained error strings for diagnostics.
#[command]
pub async fn poll_session_events() -> Result<Vec<String>, String> {
    let controller = super::controller().await?;
    Ok(controller
        .poll_events()
        .await
        .iter()
        .map(|e| e.to_string())
        .collect())
}
