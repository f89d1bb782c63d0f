use crate::session::MediaStreamInfo;
use tauri::command;

/// Acquire camera and microphone access for the session.
///
/// Idempotent: a held stream is reused. On failure the session lands in the
/// failed state and the user has already been notified; the error string is
/// for the caller's log.
#[command]
pub async fn acquire_media() -> Result<(), String> {
    let controller = super::controller().await?;
    controller.acquire().await.map_err(|e| e.to_string())
}

/// Release every capture track and reset the session to idle.
///
/// Must be invoked when the recording view unmounts; also safe mid-recording
/// or mid-acquisition.
#[command]
pub async fn release_media() -> Result<(), String> {
    let controller = super::controller().await?;
    controller.release().await;
    Ok(())
}

/// Get a summary of the held media stream, if any.
#[command]
pub async fn get_media_info() -> Result<Option<MediaStreamInfo>, String> {
    let controller = super::controller().await?;
    Ok(controller.media_info().await)
}
